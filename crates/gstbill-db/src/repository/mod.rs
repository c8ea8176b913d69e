//! # Repository Module
//!
//! SQLite repository implementations.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  BillingStore for SqliteStore (store/sqlite.rs)                         │
//! │       │                                                                 │
//! │       │  db.invoices().commit(new, policy)                             │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── commit(&self, new, policy)   (transaction)                        │
//! │  ├── get_by_id(&self, id)                                              │
//! │  └── list_between(&self, from, to)                                     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SettingsRepository`] - Shop profile and invoice sequence
//! - [`ProductRepository`] - Catalog CRUD and stock
//! - [`CustomerRepository`] - Customer CRUD
//! - [`InvoiceRepository`] - Invoice commit and reads
//! - [`PaymentRepository`] - Follow-up payments
//! - [`ApprovedUserRepository`] - Email allowlist

pub mod customer;
pub mod invoice;
pub mod payment;
pub mod product;
pub mod settings;
pub mod user;

pub use customer::CustomerRepository;
pub use invoice::InvoiceRepository;
pub use payment::PaymentRepository;
pub use product::ProductRepository;
pub use settings::SettingsRepository;
pub use user::ApprovedUserRepository;
