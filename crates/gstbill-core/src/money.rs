//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    999.5 + 179.91 - 50 = 1129.4099999999999  ❌ WRONG!                  │
//! │                                                                         │
//! │  Round that to the rupee and the 0.5 boundary cases drift:             │
//! │    Math.round(-0.5) = -0, Math.round(2.5) = 3, 1.005 * 100 = 100.49…   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    99950 + 17991 - 5000 = 112941 paise, exactly                        │
//! │    round_to_rupee(112941) = 112900 (half away from zero)               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Rule
//! Every rounding step in the crate goes through [`div_round_half_away`]:
//! ties round away from zero (0.5 → 1, -0.5 → -1, 2.5 → 3).
//!
//! ## Usage
//! ```rust
//! use gstbill_core::money::Money;
//!
//! let price = Money::from_paise(99950); // ₹999.50
//! let total = price + Money::from_paise(17991) - Money::from_paise(5000);
//! assert_eq!(total.paise(), 112941);
//! assert_eq!(total.round_to_rupee().paise(), 112900);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::quantity::Quantity;
use crate::types::TaxRate;

/// Paise per rupee.
pub const PAISE_PER_RUPEE: i64 = 100;

// =============================================================================
// Rounding
// =============================================================================

/// Integer division rounding half away from zero.
///
/// `denom` must be positive.
///
/// ```rust
/// use gstbill_core::money::div_round_half_away;
///
/// assert_eq!(div_round_half_away(5, 10), 1);
/// assert_eq!(div_round_half_away(-5, 10), -1);
/// assert_eq!(div_round_half_away(14, 10), 1);
/// assert_eq!(div_round_half_away(-14, 10), -1);
/// ```
#[inline]
pub fn div_round_half_away(numer: i128, denom: i128) -> i128 {
    let quotient = numer / denom;
    let remainder = numer % denom;
    if remainder.abs() * 2 >= denom {
        quotient + numer.signum()
    } else {
        quotient
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: round-off and refunds can be negative
/// - **Single field tuple struct**: zero-cost over i64, serializes as a plain number
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.selling_price ──► LineItem.rate ──► LineItem.amount            │
/// │                                   │                                     │
/// │                                   └──► per-unit CGST/SGST/IGST         │
/// │                                                                         │
/// │  Σ amount + Σ GST - discount ──► grand_total ──► paid / due            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(#[ts(type = "number")] i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * PAISE_PER_RUPEE)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / PAISE_PER_RUPEE
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % PAISE_PER_RUPEE).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Floors the value at zero.
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Applies a tax rate, rounding half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use gstbill_core::money::Money;
    /// use gstbill_core::types::TaxRate;
    ///
    /// // ₹1000.00 at 18% = ₹180.00
    /// let gst = Money::from_rupees(1000).apply_rate(TaxRate::from_bps(1800));
    /// assert_eq!(gst.paise(), 18000);
    ///
    /// // ₹9.99 at 18% = 1.7982 → ₹1.80
    /// let gst = Money::from_paise(999).apply_rate(TaxRate::from_bps(1800));
    /// assert_eq!(gst.paise(), 180);
    /// ```
    pub fn apply_rate(&self, rate: TaxRate) -> Money {
        self.apply_fraction(rate.bps() as i128, 10_000)
    }

    /// Multiplies by `numer / denom` with a single half-away rounding step.
    ///
    /// Used where an intermediate split (e.g. half of the GST) must not be
    /// rounded twice.
    ///
    /// Saturates at the `i64` bounds; amounts that passed validation never
    /// get there.
    pub fn apply_fraction(&self, numer: i128, denom: i128) -> Money {
        match self.checked_apply_fraction(numer, denom) {
            Some(result) => result,
            None if (self.0 < 0) != (numer < 0) => Money(i64::MIN),
            None => Money(i64::MAX),
        }
    }

    /// Like [`Money::apply_fraction`], but `None` when the result does not
    /// fit in paise.
    pub fn checked_apply_fraction(&self, numer: i128, denom: i128) -> Option<Money> {
        let scaled = (self.0 as i128).checked_mul(numer)?;
        i64::try_from(div_round_half_away(scaled, denom)).ok().map(Money)
    }

    /// `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Multiplies by a (possibly fractional) quantity, rounding to paise.
    ///
    /// ```rust
    /// use gstbill_core::money::Money;
    /// use gstbill_core::quantity::Quantity;
    ///
    /// let rate = Money::from_paise(4999); // ₹49.99 per Kg
    /// assert_eq!(rate.times(Quantity::from_units(3)).paise(), 14997);
    /// assert_eq!(rate.times(Quantity::from_milli(1500)).paise(), 7499); // 74.985 → 74.99
    /// ```
    pub fn times(&self, qty: Quantity) -> Money {
        self.apply_fraction(qty.milli() as i128, Quantity::SCALE as i128)
    }

    /// `None` when `self × qty` does not fit in paise.
    pub fn checked_times(&self, qty: Quantity) -> Option<Money> {
        self.checked_apply_fraction(qty.milli() as i128, Quantity::SCALE as i128)
    }

    /// Rounds to the nearest whole rupee, half away from zero.
    ///
    /// ```rust
    /// use gstbill_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(112941).round_to_rupee().paise(), 112900);
    /// assert_eq!(Money::from_paise(112950).round_to_rupee().paise(), 113000);
    /// assert_eq!(Money::from_paise(-50).round_to_rupee().paise(), -100);
    /// ```
    pub fn round_to_rupee(&self) -> Money {
        let rupees = div_round_half_away(self.0 as i128, PAISE_PER_RUPEE as i128);
        Money(rupees as i64 * PAISE_PER_RUPEE)
    }

    /// Rupees as a float, for export documents only.
    #[inline]
    pub fn to_rupees_f64(&self) -> f64 {
        self.0 as f64 / PAISE_PER_RUPEE as f64
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows `₹1129.41` / `-₹0.41`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

/// Parses decimal rupee strings such as `"999.50"`, `"-0.41"` or `"12"`.
///
/// At most two fractional digits are accepted.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::invalid_format("amount", format!("'{}' is not a rupee amount", s));

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() || frac.len() > 2 {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let rupees: i64 = whole.parse().map_err(|_| invalid())?;
        let paise: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        let total = rupees
            .checked_mul(PAISE_PER_RUPEE)
            .and_then(|r| r.checked_add(paise))
            .ok_or_else(invalid)?;

        Ok(Money(if negative { -total } else { total }))
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a whole count.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, count: i64) -> Self {
        Money(self.0 * count)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
