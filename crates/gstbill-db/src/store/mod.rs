//! # Persistence Provider
//!
//! The [`BillingStore`] trait is the one seam between the billing service and
//! storage. Two backends implement it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BillingService ── Arc<dyn BillingStore>                                │
//! │                          │                                              │
//! │            ┌─────────────┴──────────────┐                               │
//! │            ▼                            ▼                               │
//! │     SqliteStore                    MemoryStore                          │
//! │     (repositories, one            (tokio Mutex over plain               │
//! │      transaction per commit)       collections)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both backends give the same guarantees for `commit_invoice` and
//! `record_payment`: the whole write lands or none of it does, and invoice
//! numbers never repeat.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::DbResult;
use gstbill_core::{
    ApprovedUser, Customer, Invoice, Money, NewInvoice, NewPayment, Payment, Product, Settings, StockPolicy,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage operations the billing service needs.
#[async_trait]
pub trait BillingStore: Send + Sync {
    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    /// Reads the settings row. `NotFound` until `ensure_settings` has run.
    async fn settings(&self) -> DbResult<Settings>;

    /// Stores `defaults` if no settings exist yet, then returns what is stored.
    async fn ensure_settings(&self, defaults: &Settings) -> DbResult<Settings>;

    /// Writes the editable fields. The invoice counter is left to commits
    /// unless `next_invoice_number` asks for a value, which must be past
    /// every number issued under the prefix (`SequenceTaken` otherwise).
    async fn update_settings(&self, settings: &Settings, next_invoice_number: Option<i64>) -> DbResult<Settings>;

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    async fn list_products(&self) -> DbResult<Vec<Product>>;

    async fn get_product(&self, id: &str) -> DbResult<Option<Product>>;

    /// Loads the products with the given ids. Unknown ids are skipped.
    async fn get_products(&self, ids: &[String]) -> DbResult<Vec<Product>>;

    async fn insert_product(&self, product: &Product) -> DbResult<()>;

    async fn update_product(&self, product: &Product) -> DbResult<()>;

    async fn delete_product(&self, id: &str) -> DbResult<()>;

    /// Products at or below their alert level, lowest stock first.
    async fn low_stock_products(&self) -> DbResult<Vec<Product>>;

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    async fn list_customers(&self) -> DbResult<Vec<Customer>>;

    async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>>;

    async fn count_customers(&self) -> DbResult<u32>;

    async fn insert_customer(&self, customer: &Customer) -> DbResult<()>;

    async fn update_customer(&self, customer: &Customer) -> DbResult<()>;

    async fn delete_customer(&self, id: &str) -> DbResult<()>;

    // -------------------------------------------------------------------------
    // Invoices & payments
    // -------------------------------------------------------------------------

    /// Allocates the next number, stores the invoice and its lines, and
    /// decrements stock, atomically.
    async fn commit_invoice(&self, new: NewInvoice, policy: StockPolicy) -> DbResult<Invoice>;

    async fn get_invoice(&self, id: &str) -> DbResult<Option<Invoice>>;

    /// Invoices dated `from..=to`, ordered by date then creation time.
    async fn list_invoices(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Invoice>>;

    /// Newest first.
    async fn recent_invoices(&self, limit: u32) -> DbResult<Vec<Invoice>>;

    /// Σ due over all invoices.
    async fn total_outstanding(&self) -> DbResult<Money>;

    /// Appends a payment and updates the parent invoice, atomically.
    async fn record_payment(&self, new: NewPayment) -> DbResult<(Invoice, Payment)>;

    async fn payments_for(&self, invoice_id: &str) -> DbResult<Vec<Payment>>;

    // -------------------------------------------------------------------------
    // Approved users
    // -------------------------------------------------------------------------

    async fn list_approved_users(&self) -> DbResult<Vec<ApprovedUser>>;

    async fn find_approved_user(&self, email: &str) -> DbResult<Option<ApprovedUser>>;

    async fn insert_approved_user(&self, user: &ApprovedUser) -> DbResult<()>;

    async fn delete_approved_user(&self, email: &str) -> DbResult<()>;

    // -------------------------------------------------------------------------
    // Health
    // -------------------------------------------------------------------------

    async fn health_check(&self) -> bool;
}
