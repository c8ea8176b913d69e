//! # GST Calculation
//!
//! Splits a taxable amount into CGST/SGST (intra-state) or IGST
//! (inter-state).
//!
//! ## Supply Type
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  shop state (Settings)   customer state (snapshot)    supply            │
//! │  ─────────────────────   ─────────────────────────    ───────────       │
//! │        "27"                    None / ""              IntraState        │
//! │        "27"                    "27"                   IntraState        │
//! │        "27"                    "29"                   InterState        │
//! │                                                                         │
//! │  IntraState: CGST = SGST = GST / 2, IGST = 0                            │
//! │  InterState: IGST = GST,           CGST = SGST = 0                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each component is rounded to paise on its own, and `total` is the sum of
//! the rounded components. An intra-state total can therefore differ from
//! the exact GST by one paisa (two halves each rounding up), never more.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::TaxRate;

/// Whether a sale crosses a state border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SupplyType {
    IntraState,
    InterState,
}

impl SupplyType {
    /// Inter-state iff the customer's code is present, non-empty and
    /// differs from the shop's.
    ///
    /// ```rust
    /// use gstbill_core::tax::SupplyType;
    ///
    /// assert_eq!(SupplyType::determine("27", None), SupplyType::IntraState);
    /// assert_eq!(SupplyType::determine("27", Some("")), SupplyType::IntraState);
    /// assert_eq!(SupplyType::determine("27", Some("27")), SupplyType::IntraState);
    /// assert_eq!(SupplyType::determine("27", Some("29")), SupplyType::InterState);
    /// ```
    pub fn determine(shop_state_code: &str, customer_state_code: Option<&str>) -> SupplyType {
        match customer_state_code.map(str::trim) {
            Some(code) if !code.is_empty() && code != shop_state_code.trim() => SupplyType::InterState,
            _ => SupplyType::IntraState,
        }
    }

    #[inline]
    pub fn is_inter_state(&self) -> bool {
        matches!(self, SupplyType::InterState)
    }
}

/// Tax components for one amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GstBreakup {
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub total: Money,
}

/// Computes the GST on `amount` at `rate`.
///
/// ## Example
/// ```rust
/// use gstbill_core::money::Money;
/// use gstbill_core::tax::{compute_line_tax, SupplyType};
/// use gstbill_core::types::TaxRate;
///
/// let gst = compute_line_tax(Money::from_rupees(1000), TaxRate::from_bps(1800), SupplyType::IntraState);
/// assert_eq!(gst.cgst, Money::from_rupees(90));
/// assert_eq!(gst.sgst, Money::from_rupees(90));
/// assert_eq!(gst.igst, Money::zero());
/// assert_eq!(gst.total, Money::from_rupees(180));
/// ```
pub fn compute_line_tax(amount: Money, rate: TaxRate, supply: SupplyType) -> GstBreakup {
    let bps = rate.bps() as i128;
    let breakup = match supply {
        SupplyType::InterState => GstBreakup {
            igst: amount.apply_fraction(bps, 10_000),
            ..GstBreakup::default()
        },
        SupplyType::IntraState => {
            // half of amount × bps / 10000, in one rounding step
            let half = amount.apply_fraction(bps, 20_000);
            GstBreakup {
                cgst: half,
                sgst: half,
                ..GstBreakup::default()
            }
        }
    };
    GstBreakup {
        total: breakup.cgst + breakup.sgst + breakup.igst,
        ..breakup
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_intra_state_split() {
        let gst = compute_line_tax(Money::from_rupees(1000), TaxRate::from_bps(1800), SupplyType::IntraState);
        assert_eq!(gst.cgst.paise(), 9000);
        assert_eq!(gst.sgst.paise(), 9000);
        assert_eq!(gst.igst.paise(), 0);
        assert_eq!(gst.total.paise(), 18000);
    }

    #[test]
    fn test_inter_state_all_igst() {
        let gst = compute_line_tax(Money::from_rupees(1000), TaxRate::from_bps(1800), SupplyType::InterState);
        assert_eq!(gst.cgst, Money::zero());
        assert_eq!(gst.sgst, Money::zero());
        assert_eq!(gst.igst.paise(), 18000);
        assert_eq!(gst.total.paise(), 18000);
    }

    #[test]
    fn test_halves_round_independently() {
        // ₹9.99 at 18%: exact 179.82 paise, each half 89.91 → 90
        let gst = compute_line_tax(Money::from_paise(999), TaxRate::from_bps(1800), SupplyType::IntraState);
        assert_eq!(gst.cgst.paise(), 90);
        assert_eq!(gst.sgst.paise(), 90);
        assert_eq!(gst.total.paise(), 180);

        // ₹0.05 at 5%: exact 0.25 paise, each half 0.125 → 0
        let gst = compute_line_tax(Money::from_paise(5), TaxRate::from_bps(500), SupplyType::IntraState);
        assert_eq!(gst.total, Money::zero());
    }

    #[test]
    fn test_zero_rate() {
        let gst = compute_line_tax(Money::from_rupees(250), TaxRate::zero(), SupplyType::IntraState);
        assert_eq!(gst, GstBreakup::default());
    }

    #[test]
    fn test_determine_trims_codes() {
        assert_eq!(SupplyType::determine("27", Some(" 27 ")), SupplyType::IntraState);
        assert_eq!(SupplyType::determine("27 ", Some("33")), SupplyType::InterState);
        assert!(SupplyType::determine("07", Some("09")).is_inter_state());
    }

    proptest! {
        #[test]
        fn prop_components_reconcile(
            paise in 0i64..100_000_000,
            bps in prop::sample::select(vec![0u32, 25, 300, 500, 1200, 1800, 2800]),
            inter in any::<bool>(),
        ) {
            let supply = if inter { SupplyType::InterState } else { SupplyType::IntraState };
            let gst = compute_line_tax(Money::from_paise(paise), TaxRate::from_bps(bps), supply);

            prop_assert_eq!(gst.cgst + gst.sgst + gst.igst, gst.total);

            // within one paisa of exact: |total*10000 - paise*bps| <= 10000
            let exact_scaled = paise as i128 * bps as i128;
            let total_scaled = gst.total.paise() as i128 * 10_000;
            prop_assert!((total_scaled - exact_scaled).abs() <= 10_000);

            let intra_nonzero = !(gst.cgst + gst.sgst).is_zero();
            let inter_nonzero = !gst.igst.is_zero();
            prop_assert!(!(intra_nonzero && inter_nonzero));
            if inter {
                prop_assert!(!intra_nonzero);
            } else {
                prop_assert!(!inter_nonzero);
                prop_assert_eq!(gst.cgst, gst.sgst);
            }
        }
    }
}
