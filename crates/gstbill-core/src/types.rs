//! # Domain Types
//!
//! Core domain types used throughout the billing system.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Invoice      │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku / hsn      │   │  invoice_number │   │  invoice_id     │       │
//! │  │  gst_rate       │   │  items[]        │   │  amount         │       │
//! │  │  stock          │   │  totals, status │   │  payment_mode   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  InvoiceStatus  │   │  PaymentMode    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Paid           │   │  Cash  Upi      │       │
//! │  │  1800 = 18%     │   │  Partial        │   │  Card  Credit   │       │
//! │  └─────────────────┘   │  Unpaid         │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Invoices copy customer and product fields at creation time. A product
//! renamed next month does not rewrite last month's bills.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::SETTINGS_ID;

// =============================================================================
// Tax Rate
// =============================================================================

/// GST rate in basis points (bps).
///
/// 1 basis point = 0.01%. The GST slabs map to 0, 500, 1200, 1800 and 2800.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Upper bound: 100%.
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a rate from a percentage, rejecting negative, non-finite and
    /// >100% values.
    ///
    /// ```rust
    /// use gstbill_core::types::TaxRate;
    ///
    /// assert_eq!(TaxRate::try_from_percentage(18.0).unwrap().bps(), 1800);
    /// assert!(TaxRate::try_from_percentage(-5.0).is_err());
    /// assert!(TaxRate::try_from_percentage(101.0).is_err());
    /// ```
    pub fn try_from_percentage(pct: f64) -> Result<Self, ValidationError> {
        if !pct.is_finite() || pct < 0.0 || pct > 100.0 {
            return Err(ValidationError::OutOfRange {
                field: "gst_rate".to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(TaxRate((pct * 100.0).round() as u32))
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Percentage, for display and export only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Payment Mode
// =============================================================================

/// How an invoice (or a follow-up payment) was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[default]
    Cash,
    Upi,
    Card,
    /// Sold on credit: fully outstanding at creation.
    Credit,
}

impl PaymentMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::Upi => "upi",
            PaymentMode::Card => "card",
            PaymentMode::Credit => "credit",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMode::Cash),
            "upi" => Ok(PaymentMode::Upi),
            "card" => Ok(PaymentMode::Card),
            "credit" => Ok(PaymentMode::Credit),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_mode".to_string(),
                allowed: vec!["cash".into(), "upi".into(), "card".into(), "credit".into()],
            }),
        }
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Payment state of an invoice, always derived from paid vs grand total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Paid,
    Partial,
    Unpaid,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Partial => write!(f, "partial"),
            InvoiceStatus::Unpaid => write!(f, "unpaid"),
        }
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// POS-aggregator transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    #[default]
    Sales,
    Return,
}

impl TransactionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Sales => "SALES",
            TransactionStatus::Return => "RETURN",
        }
    }
}

// =============================================================================
// Stock Policy
// =============================================================================

/// What a sale does to stock that would go below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Floor stock at zero; the sale always goes through.
    #[default]
    ClampAtZero,
    /// Let stock go negative so shortages stay visible.
    AllowNegative,
}

impl StockPolicy {
    /// Stock after selling `sold` units.
    pub fn apply(&self, stock: Quantity, sold: Quantity) -> Quantity {
        match self {
            StockPolicy::ClampAtZero => stock.saturating_decrement(sold),
            StockPolicy::AllowNegative => stock - sold,
        }
    }
}

impl fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockPolicy::ClampAtZero => write!(f, "clamp_at_zero"),
            StockPolicy::AllowNegative => write!(f, "allow_negative"),
        }
    }
}

impl FromStr for StockPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clamp_at_zero" | "clamp" => Ok(StockPolicy::ClampAtZero),
            "allow_negative" | "negative" => Ok(StockPolicy::AllowNegative),
            _ => Err(ValidationError::NotAllowed {
                field: "stock_policy".to_string(),
                allowed: vec!["clamp_at_zero".into(), "allow_negative".into()],
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A sellable catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    /// HSN classification code for GST returns.
    pub hsn_code: Option<String>,
    pub gst_rate: TaxRate,
    pub purchase_price: Money,
    pub selling_price: Money,
    /// Signed; may go negative under `StockPolicy::AllowNegative`.
    pub stock: Quantity,
    pub low_stock_alert: Quantity,
    /// Free-form unit label ("pcs", "Kg", "box").
    pub unit: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.low_stock_alert
    }
}

/// Editable product fields (create and update).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub hsn_code: Option<String>,
    #[serde(default)]
    pub gst_rate: TaxRate,
    #[serde(default)]
    pub purchase_price: Money,
    pub selling_price: Money,
    #[serde(default)]
    pub stock: Quantity,
    #[serde(default)]
    pub low_stock_alert: Quantity,
    #[serde(default)]
    pub unit: Option<String>,
}

// =============================================================================
// Customer
// =============================================================================

/// A billing party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    /// 15-character GST identification number.
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    /// Two-digit GST state code.
    pub state_code: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Explicit state code, else the one embedded in the GSTIN.
    pub fn effective_state_code(&self) -> Option<String> {
        if let Some(code) = self.state_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            return Some(code.to_string());
        }
        self.gstin
            .as_deref()
            .map(str::trim)
            .filter(|g| g.len() >= 2)
            .map(|g| &g[..2])
            .filter(|prefix| prefix.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
    }
}

/// Editable customer fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerInput {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
}

// =============================================================================
// Line Item
// =============================================================================

/// One priced row of an invoice.
///
/// `cgst`, `sgst` and `igst` are PER UNIT. Invoice totals scale each by
/// the quantity; see [`crate::invoice::InvoiceTotals`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LineItem {
    pub product_id: Option<String>,
    /// Name frozen at time of sale.
    pub product_name: String,
    pub hsn_code: Option<String>,
    pub quantity: Quantity,
    pub unit: String,
    /// Unit price at time of sale.
    pub rate: Money,
    pub gst_rate: TaxRate,
    /// Informational; not subtracted from `amount`.
    pub discount: Money,
    /// rate × quantity, rounded to paise.
    pub amount: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
}

impl LineItem {
    /// Per-unit GST (sum of the three components).
    #[inline]
    pub fn unit_gst(&self) -> Money {
        self.cgst + self.sgst + self.igst
    }

    #[inline]
    pub fn line_cgst(&self) -> Money {
        self.cgst.times(self.quantity)
    }

    #[inline]
    pub fn line_sgst(&self) -> Money {
        self.sgst.times(self.quantity)
    }

    #[inline]
    pub fn line_igst(&self) -> Money {
        self.igst.times(self.quantity)
    }

    /// GST for the whole line: Σ component × quantity.
    #[inline]
    pub fn line_gst(&self) -> Money {
        self.line_cgst() + self.line_sgst() + self.line_igst()
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A committed invoice (aggregate root).
///
/// Invariants:
/// - `grand_total == round_to_rupee(subtotal + total_gst - discount)`
/// - `due_amount == max(0, grand_total - paid_amount)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// Human-readable `{prefix}-{seq:05}`.
    pub invoice_number: String,

    // ----- customer snapshot -----
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_gstin: Option<String>,
    pub customer_address: Option<String>,
    pub customer_state_code: Option<String>,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<LineItem>,

    // ----- totals -----
    pub subtotal: Money,
    pub total_cgst: Money,
    pub total_sgst: Money,
    pub total_igst: Money,
    pub total_gst: Money,
    pub discount: Money,
    pub round_off: Money,
    pub grand_total: Money,

    // ----- payment state -----
    pub paid_amount: Money,
    pub due_amount: Money,
    pub payment_mode: PaymentMode,
    pub status: InvoiceStatus,

    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,

    // ----- POS aggregator metadata -----
    /// `HHMMSS` in shop-local time.
    pub receipt_time: Option<String>,
    #[ts(as = "Option<String>")]
    pub business_date: Option<NaiveDate>,
    pub transaction_status: TransactionStatus,
    pub return_amount: Money,
    pub location_code: Option<String>,
    pub terminal_id: Option<String>,
    pub shift_no: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment appended to an invoice after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub amount: Money,
    pub payment_mode: PaymentMode,
    #[ts(as = "String")]
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Settings
// =============================================================================

/// Singleton shop profile (`id = "main"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Settings {
    pub id: String,
    pub shop_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gstin: Option<String>,
    /// Decides intra- vs inter-state supply.
    pub state_code: String,
    pub state_name: String,
    pub invoice_prefix: String,
    /// Next sequence to hand out.
    #[ts(type = "number")]
    pub next_invoice_number: i64,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub bank_ifsc: Option<String>,
    pub upi_id: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub logo_url: Option<String>,
    pub location_code: Option<String>,
    pub terminal_id: Option<String>,
    pub current_shift: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    /// Fresh settings for a new shop in the given state.
    pub fn new(state_code: impl Into<String>, state_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Settings {
            id: SETTINGS_ID.to_string(),
            shop_name: crate::DEFAULT_SHOP_NAME.to_string(),
            address: None,
            phone: None,
            email: None,
            gstin: None,
            state_code: state_code.into(),
            state_name: state_name.into(),
            invoice_prefix: crate::DEFAULT_INVOICE_PREFIX.to_string(),
            next_invoice_number: 1,
            bank_name: None,
            bank_account: None,
            bank_ifsc: None,
            upi_id: None,
            terms_and_conditions: None,
            logo_url: None,
            location_code: None,
            terminal_id: None,
            current_shift: Some(crate::DEFAULT_POS_CODE.to_string()),
            updated_at: now,
        }
    }

    /// Overwrites the editable fields from an update. The sequence counter
    /// is left alone; stores apply `next_invoice_number` themselves.
    pub fn apply(&mut self, update: SettingsUpdate, now: DateTime<Utc>) {
        self.shop_name = update.shop_name;
        self.address = update.address;
        self.phone = update.phone;
        self.email = update.email;
        self.gstin = update.gstin;
        self.state_code = update.state_code;
        self.state_name = update.state_name;
        self.invoice_prefix = update.invoice_prefix;
        self.bank_name = update.bank_name;
        self.bank_account = update.bank_account;
        self.bank_ifsc = update.bank_ifsc;
        self.upi_id = update.upi_id;
        self.terms_and_conditions = update.terms_and_conditions;
        self.logo_url = update.logo_url;
        self.location_code = update.location_code;
        self.terminal_id = update.terminal_id;
        self.current_shift = update.current_shift;
        self.updated_at = now;
    }
}

/// Editable settings. `next_invoice_number` is only touched when present,
/// and never moved back onto an issued number.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettingsUpdate {
    pub shop_name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    pub state_code: String,
    pub state_name: String,
    pub invoice_prefix: String,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub next_invoice_number: Option<i64>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub bank_account: Option<String>,
    #[serde(default)]
    pub bank_ifsc: Option<String>,
    #[serde(default)]
    pub upi_id: Option<String>,
    #[serde(default)]
    pub terms_and_conditions: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub location_code: Option<String>,
    #[serde(default)]
    pub terminal_id: Option<String>,
    #[serde(default)]
    pub current_shift: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
