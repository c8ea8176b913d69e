//! # gstbill-db: Persistence and Billing Service
//!
//! This crate owns everything that touches storage: the SQLite pool and
//! migrations, the repositories, the [`BillingStore`] persistence trait with
//! its SQLite and memory backends, and the [`BillingService`] that drives the
//! pure engine in `gstbill-core` against a store.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        GST Billing Data Flow                            │
//! │                                                                         │
//! │  HTTP handler (POST /api/invoices)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   gstbill-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   BillingService ──► Arc<dyn BillingStore>                      │   │
//! │  │                          │                                      │   │
//! │  │            ┌─────────────┴─────────────┐                        │   │
//! │  │            ▼                           ▼                        │   │
//! │  │   ┌────────────────┐          ┌────────────────┐               │   │
//! │  │   │  SqliteStore   │          │  MemoryStore   │               │   │
//! │  │   │  Database      │          │  tokio Mutex   │               │   │
//! │  │   │  Repositories  │          │                │               │   │
//! │  │   │  Migrations    │          │                │               │   │
//! │  │   └────────────────┘          └────────────────┘               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - SQLite repositories
//! - [`store`] - The persistence trait and both backends
//! - [`service`] - Billing orchestration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gstbill_db::{BillingService, Database, DbConfig, ServiceOptions, SqliteStore};
//!
//! let db = Database::new(DbConfig::new("gstbill.db")).await?;
//! let service = BillingService::new(Arc::new(SqliteStore::new(db)), ServiceOptions::default());
//! service.initialize(&Settings::new("27", "Maharashtra", Utc::now())).await?;
//!
//! let invoice = service.save_invoice(&draft).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::{BillingService, InvoiceDetail, ServiceError, ServiceOptions, ServiceResult};
pub use store::{BillingStore, MemoryStore, SqliteStore};
