//! # GST Billing Server
//!
//! HTTP API for the GST billing engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Billing Server                                  │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  routes        │  │  auth          │  │  error                     ││
//! │  │                │  │                │  │                            ││
//! │  │ • invoices     │  │ • JwtManager   │  │ • ApiError {code, message} ││
//! │  │ • catalog      │  │ • CurrentUser  │  │ • PosError {success:false} ││
//! │  │ • reports, pos │  │ • allowlist    │  │                            ││
//! │  └───────┬────────┘  └───────┬────────┘  └────────────────────────────┘│
//! │          │                   │                                          │
//! │          ▼                   ▼                                          │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  AppState { BillingService, JwtManager }                         │  │
//! │  │       │                                                          │  │
//! │  │       ▼                                                          │  │
//! │  │  Arc<dyn BillingStore>  (sqlite | memory, from [storage])        │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`] for the `gstbill.toml` layout and the `GSTBILL_*`
//! environment overrides.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::{ServerConfig, StorageBackend};
pub use error::{ApiError, ErrorCode};
pub use routes::router;
pub use state::AppState;
