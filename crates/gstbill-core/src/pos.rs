//! # POS Aggregator Export
//!
//! Reshapes stored invoices into the field layout a third-party POS
//! aggregator polls for (`GET /pos/transactions`).
//!
//! ## Document Shape
//! ```text
//! {
//!   "success": true,
//!   "summary": { total_transactions, total_sales, total_returns,
//!                total_amount, total_tax, from_date, to_date, generated_at },
//!   "transactions": [
//!     { LOCATION_CODE, TERMINAL_ID, SHIFT_NO, RCPT_NUM, RCPT_DT, BUSINESS_DT,
//!       RCPT_TM, INV_AMT, TAX_AMT, RET_AMT, TRAN_STATUS, PAYMENT_MODE,
//!       CUSTOMER_NAME, CUSTOMER_PHONE, CUSTOMER_GSTIN,
//!       items: [ { ITEM_NO, ITEM_CODE, ITEM_NAME, ... } ],
//!       payments: [ { PAYMENT_NAME, PAYMENT_AMT } ] }
//!   ]
//! }
//! ```
//!
//! The two nested lists keep lowercase keys and missing customer phone or
//! GSTIN go out as `""`; the aggregator parses exactly this shape.
//!
//! Amounts leave here as rupee floats; this is the only place money is a
//! float.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Invoice, TransactionStatus};
use crate::{DEFAULT_POS_CODE, DEFAULT_UNIT, WALK_IN_CUSTOMER};

/// Aggregator payment code for a stored payment mode.
///
/// ```rust
/// use gstbill_core::pos::pos_payment_code;
///
/// assert_eq!(pos_payment_code("cash"), "CASH");
/// assert_eq!(pos_payment_code("card"), "CC");
/// assert_eq!(pos_payment_code("cheque"), "OTHERS");
/// ```
pub fn pos_payment_code(mode: &str) -> &'static str {
    match mode.trim().to_lowercase().as_str() {
        "cash" => "CASH",
        "card" => "CC",
        "credit" => "CREDIT",
        _ => "OTHERS",
    }
}

/// Parses a strict `YYYY-MM-DD` query date.
pub fn parse_pos_date(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shape_ok {
        return Err(ValidationError::invalid_format(field, "expected YYYY-MM-DD"));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::invalid_format(field, format!("'{}' is not a calendar date", value)))
}

// =============================================================================
// Export Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PosItem {
    pub item_no: u32,
    pub item_code: String,
    pub item_name: String,
    pub hsn_code: String,
    pub quantity: f64,
    pub unit: String,
    pub rate: f64,
    pub amount: f64,
    pub gst_percent: f64,
    pub cgst: f64,
    pub sgst: f64,
    pub igst: f64,
    pub discount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PosPayment {
    pub payment_name: String,
    pub payment_amt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PosTransaction {
    pub location_code: String,
    pub terminal_id: String,
    pub shift_no: String,
    pub rcpt_num: String,
    pub rcpt_dt: String,
    pub business_dt: String,
    pub rcpt_tm: String,
    pub inv_amt: f64,
    pub tax_amt: f64,
    pub ret_amt: f64,
    pub tran_status: String,
    pub payment_mode: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_gstin: String,
    #[serde(rename = "items")]
    pub items: Vec<PosItem>,
    #[serde(rename = "payments")]
    pub payments: Vec<PosPayment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosSummary {
    pub total_transactions: u32,
    pub total_sales: u32,
    pub total_returns: u32,
    pub total_amount: f64,
    pub total_tax: f64,
    pub from_date: String,
    pub to_date: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosExport {
    pub success: bool,
    pub summary: PosSummary,
    pub transactions: Vec<PosTransaction>,
}

// =============================================================================
// Transform
// =============================================================================

fn code_or_default(code: &Option<String>) -> String {
    code.as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_POS_CODE)
        .to_string()
}

fn yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn receipt_time(invoice: &Invoice, offset: FixedOffset) -> String {
    match invoice.receipt_time.as_deref() {
        Some(t) if t.len() == 6 && t.chars().all(|c| c.is_ascii_digit()) => t.to_string(),
        _ => invoice.created_at.with_timezone(&offset).format("%H%M%S").to_string(),
    }
}

fn transaction(invoice: &Invoice, offset: FixedOffset) -> PosTransaction {
    let items = invoice
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| PosItem {
            item_no: i as u32 + 1,
            item_code: item.product_id.clone().unwrap_or_default(),
            item_name: item.product_name.clone(),
            hsn_code: item.hsn_code.clone().unwrap_or_default(),
            quantity: item.quantity.to_f64(),
            unit: if item.unit.trim().is_empty() {
                DEFAULT_UNIT.to_string()
            } else {
                item.unit.clone()
            },
            rate: item.rate.to_rupees_f64(),
            amount: item.amount.to_rupees_f64(),
            gst_percent: item.gst_rate.percentage(),
            cgst: item.cgst.to_rupees_f64(),
            sgst: item.sgst.to_rupees_f64(),
            igst: item.igst.to_rupees_f64(),
            discount: item.discount.to_rupees_f64(),
        })
        .collect();

    let mode_code = pos_payment_code(invoice.payment_mode.as_str());
    let paid = if invoice.paid_amount.is_zero() {
        invoice.grand_total
    } else {
        invoice.paid_amount
    };

    PosTransaction {
        location_code: code_or_default(&invoice.location_code),
        terminal_id: code_or_default(&invoice.terminal_id),
        shift_no: code_or_default(&invoice.shift_no),
        rcpt_num: invoice.invoice_number.clone(),
        rcpt_dt: yyyymmdd(invoice.invoice_date),
        business_dt: yyyymmdd(invoice.business_date.unwrap_or(invoice.invoice_date)),
        rcpt_tm: receipt_time(invoice, offset),
        inv_amt: invoice.grand_total.to_rupees_f64(),
        tax_amt: invoice.total_gst.to_rupees_f64(),
        ret_amt: invoice.return_amount.to_rupees_f64(),
        tran_status: invoice.transaction_status.as_str().to_string(),
        payment_mode: mode_code.to_string(),
        customer_name: invoice
            .customer_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| WALK_IN_CUSTOMER.to_string()),
        customer_phone: invoice.customer_phone.clone().unwrap_or_default(),
        customer_gstin: invoice.customer_gstin.clone().unwrap_or_default(),
        items,
        payments: vec![PosPayment {
            payment_name: mode_code.to_string(),
            payment_amt: paid.to_rupees_f64(),
        }],
    }
}

/// Builds the aggregator document for invoices dated `from..=to`.
///
/// Invoices outside the range are skipped; the rest are ordered by
/// invoice date, then creation time.
pub fn build_pos_export(
    invoices: &[Invoice],
    from: NaiveDate,
    to: NaiveDate,
    generated_at: DateTime<Utc>,
    offset: FixedOffset,
) -> PosExport {
    let mut selected: Vec<&Invoice> = invoices
        .iter()
        .filter(|inv| inv.invoice_date >= from && inv.invoice_date <= to)
        .collect();
    selected.sort_by(|a, b| a.invoice_date.cmp(&b.invoice_date).then(a.created_at.cmp(&b.created_at)));

    let mut sales = 0u32;
    let mut returns = 0u32;
    let mut amount = Money::zero();
    let mut tax = Money::zero();
    for inv in &selected {
        match inv.transaction_status {
            TransactionStatus::Sales => {
                sales += 1;
                amount += inv.grand_total;
                tax += inv.total_gst;
            }
            TransactionStatus::Return => {
                returns += 1;
                amount -= inv.grand_total;
                tax -= inv.total_gst;
            }
        }
    }

    PosExport {
        success: true,
        summary: PosSummary {
            total_transactions: selected.len() as u32,
            total_sales: sales,
            total_returns: returns,
            total_amount: amount.to_rupees_f64(),
            total_tax: tax.to_rupees_f64(),
            from_date: from.format("%Y-%m-%d").to_string(),
            to_date: to.format("%Y-%m-%d").to_string(),
            generated_at: generated_at.to_rfc3339(),
        },
        transactions: selected.into_iter().map(|inv| transaction(inv, offset)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{build_invoice, BillLine, CustomerSelection, InvoiceDraft, PricingContext};
    use crate::quantity::Quantity;
    use crate::types::{PaymentMode, Settings, TaxRate};
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(19_800).unwrap()
    }

    fn sample(day: u32, hour: u32, mode: PaymentMode, status: TransactionStatus) -> Invoice {
        let settings = Settings::new("27", "Maharashtra", Utc::now());
        let draft = InvoiceDraft {
            customer: CustomerSelection::WalkIn,
            items: vec![BillLine {
                product_id: Some("p-rice".into()),
                product_name: Some("Basmati Rice".into()),
                hsn_code: Some("1006".into()),
                quantity: Quantity::from_milli(2_500),
                unit: Some("Kg".into()),
                rate: Some(Money::from_rupees(120)),
                gst_rate: Some(TaxRate::from_bps(500)),
                discount: Money::zero(),
            }],
            discount: Money::zero(),
            payment_mode: mode,
            paid_amount: None,
            due_date: None,
            notes: None,
            transaction_status: status,
            return_amount: Money::zero(),
        };
        let mut products = HashMap::new();
        let now = Utc::now();
        products.insert(
            "p-rice".to_string(),
            crate::types::Product {
                id: "p-rice".into(),
                name: "Basmati Rice".into(),
                sku: None,
                hsn_code: None,
                gst_rate: TaxRate::from_bps(500),
                purchase_price: Money::zero(),
                selling_price: Money::from_rupees(120),
                stock: Quantity::from_units(100),
                low_stock_alert: Quantity::zero(),
                unit: "Kg".into(),
                created_at: now,
                updated_at: now,
            },
        );
        let ctx = PricingContext {
            settings: &settings,
            products: &products,
            customer: None,
            now: Utc.with_ymd_and_hms(2024, 4, day, hour, 15, 30).unwrap(),
            offset: ist(),
        };
        build_invoice(&draft, ctx)
            .unwrap()
            .into_invoice(format!("id-{}-{}", day, hour), "INV", (day * 100 + hour) as i64)
    }

    #[test]
    fn test_transaction_fields() {
        let invoice = sample(2, 4, PaymentMode::Card, TransactionStatus::Sales);
        let from = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
        let export = build_pos_export(&[invoice], from, to, Utc::now(), ist());

        let tx = &export.transactions[0];
        assert_eq!(tx.location_code, "01");
        assert_eq!(tx.terminal_id, "01");
        assert_eq!(tx.rcpt_num, "INV-00204");
        assert_eq!(tx.rcpt_dt, "20240402");
        assert_eq!(tx.business_dt, "20240402");
        // 04:15:30 UTC → 09:45:30 IST
        assert_eq!(tx.rcpt_tm, "094530");
        assert_eq!(tx.payment_mode, "CC");
        assert_eq!(tx.customer_name, "Walk-in");
        // 120 × 2.5 = 300, 5% per unit = 6.00 → 15.00 on 2.5 Kg
        assert_eq!(tx.tax_amt, 15.0);
        assert_eq!(tx.inv_amt, 315.0);
        assert_eq!(tx.payments, vec![PosPayment { payment_name: "CC".into(), payment_amt: 315.0 }]);

        let item = &tx.items[0];
        assert_eq!(item.item_no, 1);
        assert_eq!(item.item_code, "p-rice");
        assert_eq!(item.quantity, 2.5);
        assert_eq!(item.unit, "Kg");
        assert_eq!(item.gst_percent, 5.0);
        assert_eq!(item.cgst, 3.0);
    }

    #[test]
    fn test_credit_payment_amount_falls_back_to_grand() {
        let invoice = sample(2, 4, PaymentMode::Credit, TransactionStatus::Sales);
        let d = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let export = build_pos_export(&[invoice], d, d, Utc::now(), ist());
        assert_eq!(export.transactions[0].payment_mode, "CREDIT");
        assert_eq!(export.transactions[0].payments[0].payment_amt, 315.0);
    }

    #[test]
    fn test_summary_subtracts_returns_and_filters_range() {
        let invoices = vec![
            sample(3, 4, PaymentMode::Cash, TransactionStatus::Sales),
            sample(2, 4, PaymentMode::Upi, TransactionStatus::Sales),
            sample(2, 8, PaymentMode::Cash, TransactionStatus::Return),
            sample(9, 4, PaymentMode::Cash, TransactionStatus::Sales),
        ];
        let from = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        let export = build_pos_export(&invoices, from, to, Utc::now(), ist());

        assert!(export.success);
        assert_eq!(export.summary.total_transactions, 3);
        assert_eq!(export.summary.total_sales, 2);
        assert_eq!(export.summary.total_returns, 1);
        assert_eq!(export.summary.total_amount, 315.0);
        assert_eq!(export.summary.total_tax, 15.0);
        assert_eq!(export.summary.from_date, "2024-04-01");

        let order: Vec<&str> = export.transactions.iter().map(|t| t.rcpt_num.as_str()).collect();
        assert_eq!(order, vec!["INV-00204", "INV-00208", "INV-00304"]);
        assert_eq!(export.transactions[0].payment_mode, "OTHERS");
    }

    #[test]
    fn test_return_subtracts_invoice_amount_not_return_amount() {
        let sale = sample(2, 4, PaymentMode::Cash, TransactionStatus::Sales);
        let mut ret = sample(2, 8, PaymentMode::Cash, TransactionStatus::Return);
        ret.return_amount = Money::from_rupees(100);
        let d = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let export = build_pos_export(&[sale, ret], d, d, Utc::now(), ist());

        assert_eq!(export.summary.total_amount, 0.0);
        assert_eq!(export.summary.total_tax, 0.0);
        assert_eq!(export.transactions[1].ret_amt, 100.0);
    }

    #[test]
    fn test_receipt_time_fallback() {
        let mut invoice = sample(2, 4, PaymentMode::Cash, TransactionStatus::Sales);
        invoice.receipt_time = Some("9:45".into());
        assert_eq!(receipt_time(&invoice, ist()), "094530");
        invoice.receipt_time = Some("235959".into());
        assert_eq!(receipt_time(&invoice, ist()), "235959");
    }

    #[test]
    fn test_json_field_names() {
        let invoice = sample(2, 4, PaymentMode::Cash, TransactionStatus::Sales);
        let d = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let json = serde_json::to_value(build_pos_export(&[invoice], d, d, Utc::now(), ist())).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["summary"]["total_transactions"], 1);
        assert_eq!(json["transactions"][0]["RCPT_NUM"], "INV-00204");
        assert_eq!(json["transactions"][0]["TRAN_STATUS"], "SALES");
        assert_eq!(json["transactions"][0]["items"][0]["HSN_CODE"], "1006");
        assert_eq!(json["transactions"][0]["payments"][0]["PAYMENT_NAME"], "CASH");
        assert!(json["transactions"][0].get("ITEMS").is_none());
        assert!(json["transactions"][0].get("PAYMENTS").is_none());
        // walk-in sale: no phone, no GSTIN
        assert_eq!(json["transactions"][0]["CUSTOMER_PHONE"], "");
        assert_eq!(json["transactions"][0]["CUSTOMER_GSTIN"], "");
    }

    #[test]
    fn test_parse_pos_date() {
        assert_eq!(
            parse_pos_date("from_date", "2024-04-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
        );
        assert!(parse_pos_date("from_date", "2024-4-1").is_err());
        assert!(parse_pos_date("from_date", "01-04-2024").is_err());
        assert!(parse_pos_date("from_date", "2024-02-30").is_err());
        assert!(parse_pos_date("from_date", "").is_err());
    }

    proptest! {
        #[test]
        fn prop_unknown_modes_map_to_others(mode in "[a-z]{1,10}") {
            let code = pos_payment_code(&mode);
            match mode.as_str() {
                "cash" => prop_assert_eq!(code, "CASH"),
                "card" => prop_assert_eq!(code, "CC"),
                "credit" => prop_assert_eq!(code, "CREDIT"),
                _ => prop_assert_eq!(code, "OTHERS"),
            }
        }
    }
}
