//! # gstbill-core: Pure Billing Logic
//!
//! This crate is the **heart** of the GST billing engine. It contains the
//! accounting rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      GST Billing Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 gstbill-server (axum HTTP)                      │   │
//! │  │   /api/invoices  /api/products  /api/reports  /pos/transactions │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             gstbill-db (BillingService + BillingStore)          │   │
//! │  │        SQLite / memory backends, numbering, stock updates       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ gstbill-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │   tax   │ │ invoice │ │ payment │ │   pos   │  │   │
//! │  │   │quantity │ │ CGST/   │ │ totals  │ │ paid /  │ │ export  │  │   │
//! │  │   │         │ │SGST/IGST│ │ draft   │ │ due     │ │         │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Customer, Invoice, Payment, Settings)
//! - [`money`] / [`quantity`] - Integer paise and milli-units
//! - [`tax`] - GST split by supply type
//! - [`invoice`] - Draft pricing and invoice totals
//! - [`payment`] - Paid / due / status derivation
//! - [`numbering`] - Invoice number rendering
//! - [`validation`] - Business rule validation
//! - [`auth`] - Roles, principals, allowlist matching
//! - [`report`] - Sales summary, top products, dashboard
//! - [`pos`] - POS aggregator export document
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use gstbill_core::money::Money;
//! use gstbill_core::tax::{compute_line_tax, SupplyType};
//! use gstbill_core::types::TaxRate;
//!
//! // ₹1000 at 18% inside the shop's state
//! let gst = compute_line_tax(Money::from_rupees(1000), TaxRate::from_bps(1800), SupplyType::IntraState);
//! assert_eq!(gst.cgst, Money::from_rupees(90));
//! assert_eq!(gst.sgst, Money::from_rupees(90));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod error;
pub mod invoice;
pub mod money;
pub mod numbering;
pub mod payment;
pub mod pos;
pub mod quantity;
pub mod report;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use auth::{ApprovedUser, IdentityStatus, Principal, Role};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{InvoiceDraft, InvoiceTotals, NewInvoice};
pub use money::Money;
pub use payment::{NewPayment, PaymentInput, PaymentState};
pub use quantity::Quantity;
pub use tax::{GstBreakup, SupplyType};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Primary key of the singleton settings row.
pub const SETTINGS_ID: &str = "main";

pub const DEFAULT_SHOP_NAME: &str = "My Shop";

pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// Maximum lines on a single invoice.
///
/// Keeps a mistyped bulk paste from producing an unprintable bill.
pub const MAX_INVOICE_LINES: usize = 100;

/// Largest quantity on one invoice line, in whole units.
pub const MAX_ITEM_QUANTITY: i64 = 100_000;

/// Largest single amount a client may enter (₹100 crore), in paise.
///
/// Rates, discounts, prices and payments are capped here, so a full invoice
/// at the quantity cap still sums well inside `i64`.
pub const MAX_AMOUNT_PAISE: i64 = 100_000_000_000;

/// Customer name printed for anonymous counter sales.
pub const WALK_IN_CUSTOMER: &str = "Walk-in";

pub const DEFAULT_UNIT: &str = "pcs";

/// Location, terminal and shift code when none is configured.
pub const DEFAULT_POS_CODE: &str = "01";
