//! # Invoice Assembly
//!
//! Turns a draft from the billing screen into a fully priced invoice.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InvoiceDraft ──► resolve customer ──► SupplyType::determine            │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  BillLine[] ──► price_line (product defaults, per-unit GST)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InvoiceTotals::compute ──► PaymentState::at_creation                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  NewInvoice (no id, no number yet) ──► store.commit_invoice            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! ```text
//! subtotal       = Σ round(rate × qty)
//! total_cgst     = Σ round(unit_cgst × qty)         (same for SGST, IGST)
//! after_discount = subtotal + total_gst - discount
//! grand_total    = round_to_rupee(after_discount)
//! round_off      = grand_total - after_discount
//! ```

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::numbering::format_invoice_number;
use crate::payment::PaymentState;
use crate::quantity::Quantity;
use crate::tax::{compute_line_tax, SupplyType};
use crate::types::{
    Customer, Invoice, LineItem, PaymentMode, Product, Settings, TaxRate, TransactionStatus,
};
use crate::validation::{
    validate_amount, validate_gstin, validate_line_count, validate_name, validate_quantity,
    validate_state_code, validate_tax_rate,
};
use crate::DEFAULT_UNIT;

// =============================================================================
// Draft Input
// =============================================================================

/// Who the invoice is billed to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomerSelection {
    /// Anonymous counter sale.
    #[default]
    WalkIn,
    /// A saved customer; details are snapshotted from the record.
    Existing { customer_id: String },
    /// One-off details typed at the counter.
    Manual {
        name: String,
        #[serde(default)]
        phone: Option<String>,
        #[serde(default)]
        gstin: Option<String>,
        #[serde(default)]
        address: Option<String>,
        #[serde(default)]
        state_code: Option<String>,
    },
}

impl CustomerSelection {
    /// Id to look up before pricing, if any.
    pub fn customer_id(&self) -> Option<&str> {
        match self {
            CustomerSelection::Existing { customer_id } => Some(customer_id),
            _ => None,
        }
    }
}

/// One row on the billing screen.
///
/// Fields left out fall back to the referenced product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillLine {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub hsn_code: Option<String>,
    pub quantity: Quantity,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub rate: Option<Money>,
    #[serde(default)]
    pub gst_rate: Option<TaxRate>,
    #[serde(default)]
    pub discount: Money,
}

/// An unsaved invoice as submitted by the billing screen.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDraft {
    #[serde(default)]
    pub customer: CustomerSelection,
    pub items: Vec<BillLine>,
    /// Flat, applied after tax.
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    /// Omitted means paid in full (ignored for credit).
    #[serde(default)]
    pub paid_amount: Option<Money>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub transaction_status: TransactionStatus,
    #[serde(default)]
    pub return_amount: Money,
}

// =============================================================================
// Totals
// =============================================================================

/// Aggregated money figures of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub total_cgst: Money,
    pub total_sgst: Money,
    pub total_igst: Money,
    pub total_gst: Money,
    pub discount: Money,
    pub after_discount: Money,
    pub round_off: Money,
    pub grand_total: Money,
}

impl InvoiceTotals {
    /// Aggregates priced lines and a flat discount.
    pub fn compute(lines: &[LineItem], discount: Money) -> Self {
        let subtotal: Money = lines.iter().map(|l| l.amount).sum();
        let total_cgst: Money = lines.iter().map(LineItem::line_cgst).sum();
        let total_sgst: Money = lines.iter().map(LineItem::line_sgst).sum();
        let total_igst: Money = lines.iter().map(LineItem::line_igst).sum();
        let total_gst = total_cgst + total_sgst + total_igst;

        let after_discount = subtotal + total_gst - discount;
        let grand_total = after_discount.round_to_rupee();

        InvoiceTotals {
            subtotal,
            total_cgst,
            total_sgst,
            total_igst,
            total_gst,
            discount,
            after_discount,
            round_off: grand_total - after_discount,
            grand_total,
        }
    }
}

// =============================================================================
// Line Pricing
// =============================================================================

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Prices one line, filling gaps from the product.
pub fn price_line(line: &BillLine, product: Option<&Product>, supply: SupplyType) -> CoreResult<LineItem> {
    validate_quantity(line.quantity)?;

    let product_name = non_empty(line.product_name.as_deref())
        .or_else(|| product.map(|p| p.name.clone()))
        .ok_or_else(|| ValidationError::required("product_name"))?;

    let rate = line
        .rate
        .or_else(|| product.map(|p| p.selling_price))
        .ok_or_else(|| ValidationError::required("rate"))?;
    validate_amount("rate", rate)?;

    let gst_rate = line
        .gst_rate
        .or_else(|| product.map(|p| p.gst_rate))
        .unwrap_or_else(TaxRate::zero);
    validate_tax_rate(gst_rate)?;

    validate_amount("discount", line.discount)?;

    let unit = non_empty(line.unit.as_deref())
        .or_else(|| product.map(|p| p.unit.clone()).filter(|u| !u.is_empty()))
        .unwrap_or_else(|| DEFAULT_UNIT.to_string());

    let tax = compute_line_tax(rate, gst_rate, supply);
    let amount = rate
        .checked_times(line.quantity)
        .ok_or_else(|| ValidationError::invalid_format("amount", "rate × quantity is out of range"))?;

    Ok(LineItem {
        product_id: line.product_id.clone(),
        product_name,
        hsn_code: non_empty(line.hsn_code.as_deref()).or_else(|| product.and_then(|p| p.hsn_code.clone())),
        quantity: line.quantity,
        unit,
        rate,
        gst_rate,
        discount: line.discount,
        amount,
        cgst: tax.cgst,
        sgst: tax.sgst,
        igst: tax.igst,
    })
}

// =============================================================================
// New Invoice
// =============================================================================

/// Customer fields frozen onto an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerSnapshot {
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_gstin: Option<String>,
    pub customer_address: Option<String>,
    pub customer_state_code: Option<String>,
}

impl CustomerSnapshot {
    fn resolve(selection: &CustomerSelection, customer: Option<&Customer>) -> CoreResult<Self> {
        match selection {
            CustomerSelection::WalkIn => Ok(CustomerSnapshot::default()),
            CustomerSelection::Existing { customer_id } => {
                let customer = customer
                    .filter(|c| &c.id == customer_id)
                    .ok_or_else(|| CoreError::CustomerNotFound(customer_id.clone()))?;
                Ok(CustomerSnapshot {
                    customer_id: Some(customer.id.clone()),
                    customer_name: Some(customer.name.clone()),
                    customer_phone: customer.phone.clone(),
                    customer_gstin: customer.gstin.clone(),
                    customer_address: customer.address.clone(),
                    customer_state_code: customer.effective_state_code(),
                })
            }
            CustomerSelection::Manual {
                name,
                phone,
                gstin,
                address,
                state_code,
            } => {
                let name = validate_name("customer_name", name)?;
                let gstin = match non_empty(gstin.as_deref()) {
                    Some(g) => Some(validate_gstin(&g)?),
                    None => None,
                };
                let explicit_state = non_empty(state_code.as_deref());
                if let Some(code) = &explicit_state {
                    validate_state_code(code)?;
                }
                // an explicit state wins, else the GSTIN prefix
                let state_code = explicit_state.or_else(|| gstin.as_deref().and_then(|g| g.get(..2)).map(str::to_string));
                Ok(CustomerSnapshot {
                    customer_id: None,
                    customer_name: Some(name),
                    customer_phone: non_empty(phone.as_deref()),
                    customer_gstin: gstin,
                    customer_address: non_empty(address.as_deref()),
                    customer_state_code: state_code,
                })
            }
        }
    }
}

/// A fully priced invoice that has not been numbered or stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInvoice {
    pub customer: CustomerSnapshot,
    pub supply_type: SupplyType,
    pub items: Vec<LineItem>,
    pub totals: InvoiceTotals,
    pub payment: PaymentState,
    pub payment_mode: PaymentMode,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub receipt_time: String,
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub transaction_status: TransactionStatus,
    pub return_amount: Money,
    pub location_code: Option<String>,
    pub terminal_id: Option<String>,
    pub shift_no: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl NewInvoice {
    /// Quantity sold per product id, merged across lines.
    pub fn stock_movements(&self) -> Vec<(String, Quantity)> {
        let mut moves: Vec<(String, Quantity)> = Vec::new();
        for item in &self.items {
            let Some(product_id) = &item.product_id else {
                continue;
            };
            match moves.iter_mut().find(|(id, _)| id == product_id) {
                Some((_, qty)) => *qty += item.quantity,
                None => moves.push((product_id.clone(), item.quantity)),
            }
        }
        moves
    }

    /// Attaches the store-assigned id and sequence.
    pub fn into_invoice(self, id: String, prefix: &str, seq: i64) -> Invoice {
        Invoice {
            id,
            invoice_number: format_invoice_number(prefix, seq),
            customer_id: self.customer.customer_id,
            customer_name: self.customer.customer_name,
            customer_phone: self.customer.customer_phone,
            customer_gstin: self.customer.customer_gstin,
            customer_address: self.customer.customer_address,
            customer_state_code: self.customer.customer_state_code,
            items: self.items,
            subtotal: self.totals.subtotal,
            total_cgst: self.totals.total_cgst,
            total_sgst: self.totals.total_sgst,
            total_igst: self.totals.total_igst,
            total_gst: self.totals.total_gst,
            discount: self.totals.discount,
            round_off: self.totals.round_off,
            grand_total: self.totals.grand_total,
            paid_amount: self.payment.paid_amount,
            due_amount: self.payment.due_amount,
            payment_mode: self.payment_mode,
            status: self.payment.status,
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            notes: self.notes,
            receipt_time: Some(self.receipt_time),
            business_date: Some(self.business_date),
            transaction_status: self.transaction_status,
            return_amount: self.return_amount,
            location_code: self.location_code,
            terminal_id: self.terminal_id,
            shift_no: self.shift_no,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Everything pricing reads besides the draft itself.
#[derive(Debug, Clone, Copy)]
pub struct PricingContext<'a> {
    pub settings: &'a Settings,
    /// Products referenced by the draft, keyed by id.
    pub products: &'a HashMap<String, Product>,
    /// The customer named by `CustomerSelection::Existing`, if found.
    pub customer: Option<&'a Customer>,
    pub now: DateTime<Utc>,
    /// Shop-local time zone for dates and receipt time.
    pub offset: FixedOffset,
}

/// Prices a draft into a [`NewInvoice`].
///
/// ## Errors
/// - `EmptyInvoice` when there are no lines
/// - `ProductNotFound` / `CustomerNotFound` for dangling references
/// - `Validation` for bad quantities, rates, discounts or a missing
///   manual customer name
pub fn build_invoice(draft: &InvoiceDraft, ctx: PricingContext<'_>) -> CoreResult<NewInvoice> {
    if draft.items.is_empty() {
        return Err(CoreError::EmptyInvoice);
    }
    validate_line_count(draft.items.len())?;
    validate_amount("discount", draft.discount)?;
    validate_amount("return_amount", draft.return_amount)?;

    let customer = CustomerSnapshot::resolve(&draft.customer, ctx.customer)?;
    let supply = SupplyType::determine(&ctx.settings.state_code, customer.customer_state_code.as_deref());

    let items = draft
        .items
        .iter()
        .map(|line| {
            let product = match &line.product_id {
                Some(id) => Some(
                    ctx.products
                        .get(id)
                        .ok_or_else(|| CoreError::ProductNotFound(id.clone()))?,
                ),
                None => None,
            };
            price_line(line, product, supply)
        })
        .collect::<CoreResult<Vec<_>>>()?;

    let totals = InvoiceTotals::compute(&items, draft.discount);
    if totals.after_discount.is_negative() {
        return Err(ValidationError::invalid_format("discount", "exceeds the invoice value").into());
    }

    let payment = PaymentState::at_creation(draft.payment_mode, draft.paid_amount, totals.grand_total)?;

    let local = ctx.now.with_timezone(&ctx.offset);
    let invoice_date = local.date_naive();

    Ok(NewInvoice {
        customer,
        supply_type: supply,
        items,
        totals,
        payment,
        payment_mode: draft.payment_mode,
        invoice_date,
        due_date: draft.due_date,
        notes: non_empty(draft.notes.as_deref()),
        receipt_time: local.format("%H%M%S").to_string(),
        business_date: invoice_date,
        transaction_status: draft.transaction_status,
        return_amount: draft.return_amount,
        location_code: ctx.settings.location_code.clone(),
        terminal_id: ctx.settings.terminal_id.clone(),
        shift_no: ctx.settings.current_shift.clone(),
        created_at: ctx.now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InvoiceStatus;
    use crate::{MAX_AMOUNT_PAISE, MAX_INVOICE_LINES, MAX_ITEM_QUANTITY};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    fn settings() -> Settings {
        Settings::new("27", "Maharashtra", Utc::now())
    }

    fn product(id: &str, paise: i64, bps: u32) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            sku: None,
            hsn_code: Some("1006".into()),
            gst_rate: TaxRate::from_bps(bps),
            purchase_price: Money::zero(),
            selling_price: Money::from_paise(paise),
            stock: Quantity::from_units(10),
            low_stock_alert: Quantity::from_units(2),
            unit: "Kg".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn manual_line(name: &str, paise: i64, qty: i64, bps: u32) -> BillLine {
        BillLine {
            product_id: None,
            product_name: Some(name.into()),
            hsn_code: None,
            quantity: Quantity::from_units(qty),
            unit: None,
            rate: Some(Money::from_paise(paise)),
            gst_rate: Some(TaxRate::from_bps(bps)),
            discount: Money::zero(),
        }
    }

    fn draft(items: Vec<BillLine>) -> InvoiceDraft {
        InvoiceDraft {
            customer: CustomerSelection::WalkIn,
            items,
            discount: Money::zero(),
            payment_mode: PaymentMode::Cash,
            paid_amount: None,
            due_date: None,
            notes: None,
            transaction_status: TransactionStatus::Sales,
            return_amount: Money::zero(),
        }
    }

    fn build(draft: &InvoiceDraft, settings: &Settings, products: &HashMap<String, Product>) -> CoreResult<NewInvoice> {
        build_invoice(
            draft,
            PricingContext {
                settings,
                products,
                customer: None,
                now: Utc.with_ymd_and_hms(2024, 4, 1, 5, 30, 15).unwrap(),
                offset: ist(),
            },
        )
    }

    #[test]
    fn test_intra_state_scenario() {
        let invoice = build(&draft(vec![manual_line("Mixer", 100_000, 1, 1800)]), &settings(), &HashMap::new()).unwrap();
        assert_eq!(invoice.supply_type, SupplyType::IntraState);
        assert_eq!(invoice.totals.total_cgst, Money::from_rupees(90));
        assert_eq!(invoice.totals.total_sgst, Money::from_rupees(90));
        assert_eq!(invoice.totals.total_igst, Money::zero());
        assert_eq!(invoice.totals.grand_total, Money::from_rupees(1180));
        assert_eq!(invoice.payment.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_inter_state_scenario() {
        let mut d = draft(vec![manual_line("Mixer", 100_000, 1, 1800)]);
        d.customer = CustomerSelection::Manual {
            name: "Bengaluru Traders".into(),
            phone: None,
            gstin: Some("29ABCDE1234F1Z5".into()),
            address: None,
            state_code: None,
        };
        let invoice = build(&d, &settings(), &HashMap::new()).unwrap();
        assert_eq!(invoice.supply_type, SupplyType::InterState);
        assert_eq!(invoice.customer.customer_state_code.as_deref(), Some("29"));
        assert_eq!(invoice.totals.total_cgst, Money::zero());
        assert_eq!(invoice.totals.total_igst, Money::from_rupees(180));
        assert_eq!(invoice.totals.grand_total, Money::from_rupees(1180));
    }

    #[test]
    fn test_rounding_scenario() {
        let lines = vec![LineItem {
            product_id: None,
            product_name: "Kettle".into(),
            hsn_code: None,
            quantity: Quantity::from_units(1),
            unit: "pcs".into(),
            rate: Money::from_paise(99_950),
            gst_rate: TaxRate::from_bps(1800),
            discount: Money::zero(),
            amount: Money::from_paise(99_950),
            cgst: Money::from_paise(8_995),
            sgst: Money::from_paise(8_996),
            igst: Money::zero(),
        }];
        let totals = InvoiceTotals::compute(&lines, Money::from_rupees(50));
        assert_eq!(totals.total_gst, Money::from_paise(17_991));
        assert_eq!(totals.after_discount, Money::from_paise(112_941));
        assert_eq!(totals.grand_total, Money::from_rupees(1129));
        assert_eq!(totals.round_off, Money::from_paise(-41));
    }

    #[test]
    fn test_per_unit_tax_scaled_by_quantity() {
        // per-unit: round(0.8991) = 0.90 each, ×10 → 18.00
        // whole line would give round(8.991) = 8.99 each → 17.98
        let invoice = build(&draft(vec![manual_line("Pen", 999, 10, 1800)]), &settings(), &HashMap::new()).unwrap();
        assert_eq!(invoice.items[0].cgst, Money::from_paise(90));
        assert_eq!(invoice.totals.total_gst, Money::from_paise(1800));

        let whole_line = compute_line_tax(Money::from_paise(9990), TaxRate::from_bps(1800), SupplyType::IntraState);
        assert_eq!(whole_line.total, Money::from_paise(1798));
        assert_ne!(invoice.totals.total_gst, whole_line.total);
    }

    #[test]
    fn test_line_discount_is_not_subtracted() {
        let mut line = manual_line("Shirt", 50_000, 2, 500);
        line.discount = Money::from_rupees(100);
        let invoice = build(&draft(vec![line]), &settings(), &HashMap::new()).unwrap();
        assert_eq!(invoice.items[0].amount, Money::from_rupees(1000));
        assert_eq!(invoice.items[0].discount, Money::from_rupees(100));
        assert_eq!(invoice.totals.subtotal, Money::from_rupees(1000));
    }

    #[test]
    fn test_product_defaults_fill_line() {
        let mut products = HashMap::new();
        products.insert("p1".to_string(), product("p1", 4_999, 500));
        let line = BillLine {
            product_id: Some("p1".into()),
            product_name: None,
            hsn_code: None,
            quantity: Quantity::from_milli(1_500),
            unit: None,
            rate: None,
            gst_rate: None,
            discount: Money::zero(),
        };
        let invoice = build(&draft(vec![line]), &settings(), &products).unwrap();
        let item = &invoice.items[0];
        assert_eq!(item.product_name, "Product p1");
        assert_eq!(item.unit, "Kg");
        assert_eq!(item.hsn_code.as_deref(), Some("1006"));
        assert_eq!(item.rate, Money::from_paise(4_999));
        assert_eq!(item.amount, Money::from_paise(7_499));
        assert_eq!(invoice.stock_movements(), vec![("p1".to_string(), Quantity::from_milli(1_500))]);
    }

    #[test]
    fn test_stock_movements_merge_repeated_products() {
        let mut products = HashMap::new();
        products.insert("p1".to_string(), product("p1", 1_000, 0));
        let line = |qty| BillLine {
            product_id: Some("p1".into()),
            product_name: None,
            hsn_code: None,
            quantity: Quantity::from_units(qty),
            unit: None,
            rate: None,
            gst_rate: None,
            discount: Money::zero(),
        };
        let invoice = build(&draft(vec![line(2), manual_line("Bag", 500, 1, 0), line(3)]), &settings(), &products).unwrap();
        assert_eq!(invoice.stock_movements(), vec![("p1".to_string(), Quantity::from_units(5))]);
    }

    #[test]
    fn test_dates_use_shop_offset() {
        // 05:30:15 UTC is 11:00:15 IST
        let invoice = build(&draft(vec![manual_line("Tea", 1_000, 1, 500)]), &settings(), &HashMap::new()).unwrap();
        assert_eq!(invoice.invoice_date, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(invoice.receipt_time, "110015");
        assert_eq!(invoice.shift_no.as_deref(), Some("01"));
    }

    #[test]
    fn test_empty_invoice_rejected() {
        let err = build(&draft(vec![]), &settings(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, CoreError::EmptyInvoice));
    }

    #[test]
    fn test_unknown_product_rejected() {
        let mut line = manual_line("Ghost", 100, 1, 0);
        line.product_id = Some("missing".into());
        let err = build(&draft(vec![line]), &settings(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_unknown_existing_customer_rejected() {
        let mut d = draft(vec![manual_line("Tea", 1_000, 1, 500)]);
        d.customer = CustomerSelection::Existing {
            customer_id: "c-404".into(),
        };
        let err = build(&d, &settings(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, CoreError::CustomerNotFound(_)));
    }

    #[test]
    fn test_manual_customer_requires_name() {
        let mut d = draft(vec![manual_line("Tea", 1_000, 1, 500)]);
        d.customer = CustomerSelection::Manual {
            name: "  ".into(),
            phone: None,
            gstin: None,
            address: None,
            state_code: None,
        };
        let err = build(&d, &settings(), &HashMap::new()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_manual_customer_gstin_is_validated() {
        let manual = |gstin: &str| CustomerSelection::Manual {
            name: "Ravi".into(),
            phone: None,
            gstin: Some(gstin.into()),
            address: None,
            state_code: None,
        };

        for bad in ["2é", "é2ABCDE1234F1Z5", "29ABCDE1234F1Z", "12"] {
            let mut d = draft(vec![manual_line("Tea", 1_000, 1, 500)]);
            d.customer = manual(bad);
            let err = build(&d, &settings(), &HashMap::new()).unwrap_err();
            assert!(err.is_validation(), "{bad} should be rejected");
        }

        let mut d = draft(vec![manual_line("Tea", 1_000, 1, 500)]);
        d.customer = manual(" 29abcde1234f1z5 ");
        let invoice = build(&d, &settings(), &HashMap::new()).unwrap();
        assert_eq!(invoice.customer.customer_gstin.as_deref(), Some("29ABCDE1234F1Z5"));
        assert_eq!(invoice.customer.customer_state_code.as_deref(), Some("29"));
    }

    #[test]
    fn test_bad_line_inputs_rejected() {
        let mut zero_qty = manual_line("Tea", 1_000, 1, 500);
        zero_qty.quantity = Quantity::zero();
        assert!(build(&draft(vec![zero_qty]), &settings(), &HashMap::new()).is_err());

        let negative_rate = manual_line("Tea", -1, 1, 500);
        assert!(build(&draft(vec![negative_rate]), &settings(), &HashMap::new()).is_err());

        let over_rate = manual_line("Tea", 1_000, 1, 10_001);
        assert!(build(&draft(vec![over_rate]), &settings(), &HashMap::new()).is_err());

        let mut d = draft(vec![manual_line("Tea", 1_000, 1, 500)]);
        d.discount = Money::from_paise(-1);
        assert!(build(&d, &settings(), &HashMap::new()).is_err());
    }

    #[test]
    fn test_oversized_lines_rejected_not_wrapped() {
        // ₹1e12 × 1e6 units
        let huge = manual_line("Turbine", 100_000_000_000_000, 1_000_000, 1800);
        let err = build(&draft(vec![huge]), &settings(), &HashMap::new()).unwrap_err();
        assert!(err.is_validation());

        let mut d = draft(vec![manual_line("Tea", 1_000, 1, 500)]);
        d.discount = Money::from_paise(i64::MAX);
        assert!(build(&d, &settings(), &HashMap::new()).unwrap_err().is_validation());
    }

    #[test]
    fn test_largest_accepted_invoice_fits() {
        let lines = (0..MAX_INVOICE_LINES)
            .map(|_| manual_line("Bulk", MAX_AMOUNT_PAISE, MAX_ITEM_QUANTITY, 10_000))
            .collect();
        let invoice = build(&draft(lines), &settings(), &HashMap::new()).unwrap();
        assert_eq!(invoice.totals.subtotal, Money::from_paise(1_000_000_000_000_000_000));
        assert_eq!(invoice.totals.total_gst, Money::from_paise(1_000_000_000_000_000_000));
        assert_eq!(invoice.totals.grand_total, Money::from_paise(2_000_000_000_000_000_000));
    }

    #[test]
    fn test_credit_invoice_is_unpaid() {
        let mut d = draft(vec![manual_line("Mixer", 100_000, 1, 1800)]);
        d.payment_mode = PaymentMode::Credit;
        d.paid_amount = Some(Money::from_rupees(200));
        let invoice = build(&d, &settings(), &HashMap::new()).unwrap();
        assert_eq!(invoice.payment.paid_amount, Money::zero());
        assert_eq!(invoice.payment.due_amount, Money::from_rupees(1180));
        assert_eq!(invoice.payment.status, InvoiceStatus::Unpaid);
    }

    #[test]
    fn test_into_invoice_formats_number() {
        let new = build(&draft(vec![manual_line("Tea", 1_000, 1, 500)]), &settings(), &HashMap::new()).unwrap();
        let invoice = new.into_invoice("id-1".into(), "INV", 7);
        assert_eq!(invoice.invoice_number, "INV-00007");
        assert_eq!(invoice.receipt_time.as_deref(), Some("110015"));
        assert_eq!(invoice.created_at, invoice.updated_at);
    }

    fn arb_line() -> impl Strategy<Value = LineItem> {
        (1i64..1_000_000, 1i64..50_000, prop::sample::select(vec![0u32, 500, 1200, 1800, 2800]), any::<bool>()).prop_map(
            |(rate, milli, bps, inter)| {
                let supply = if inter { SupplyType::InterState } else { SupplyType::IntraState };
                let line = BillLine {
                    product_id: None,
                    product_name: Some("x".into()),
                    hsn_code: None,
                    quantity: Quantity::from_milli(milli),
                    unit: None,
                    rate: Some(Money::from_paise(rate)),
                    gst_rate: Some(TaxRate::from_bps(bps)),
                    discount: Money::zero(),
                };
                price_line(&line, None, supply).unwrap()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_totals_reconcile(lines in prop::collection::vec(arb_line(), 1..10), discount in 0i64..100_000) {
            let discount = Money::from_paise(discount);
            let totals = InvoiceTotals::compute(&lines, discount);

            prop_assert_eq!(totals.total_gst, totals.total_cgst + totals.total_sgst + totals.total_igst);
            prop_assert_eq!(totals.after_discount, totals.subtotal + totals.total_gst - discount);
            prop_assert_eq!(totals.grand_total, totals.after_discount.round_to_rupee());
            prop_assert_eq!(totals.round_off, totals.grand_total - totals.after_discount);
            prop_assert_eq!(totals.grand_total.paise() % 100, 0);
            prop_assert!(totals.round_off.paise().abs() <= 50);
        }
    }
}
