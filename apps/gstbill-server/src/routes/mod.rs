//! # HTTP Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Billing API Surface                             │
//! │                                                                         │
//! │  Public                          Authenticated (/api, JWT + allowlist) │
//! │  ──────                          ───────────────────────────────────── │
//! │  GET /health                     /identity   (never rejects)           │
//! │  GET /pos/transactions           /invoices   preview, save, payments   │
//! │                                  /settings   PUT is admin only         │
//! │                                  /products   CRUD + low-stock          │
//! │                                  /customers  CRUD                      │
//! │                                  /reports    sales, dashboard          │
//! │                                  /users      admin only, except check  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod customers;
pub mod health;
pub mod identity;
pub mod invoices;
pub mod pos;
pub mod products;
pub mod reports;
pub mod settings;
pub mod users;

use axum::routing::{delete, get, post};
use axum::Router;
use chrono::NaiveDate;

use gstbill_core::pos::parse_pos_date;

use crate::error::ApiResult;
use crate::state::AppState;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/identity", get(identity::identity))
        .route("/invoices", get(invoices::list).post(invoices::create))
        .route("/invoices/preview", post(invoices::preview))
        .route("/invoices/{id}", get(invoices::get))
        .route(
            "/invoices/{id}/payments",
            get(invoices::payments).post(invoices::record_payment),
        )
        .route("/settings", get(settings::get).put(settings::update))
        .route("/products", get(products::list).post(products::create))
        .route("/products/low-stock", get(products::low_stock))
        .route(
            "/products/{id}",
            get(products::get).put(products::update).delete(products::remove),
        )
        .route("/customers", get(customers::list).post(customers::create))
        .route(
            "/customers/{id}",
            get(customers::get).put(customers::update).delete(customers::remove),
        )
        .route("/reports/sales", get(reports::sales))
        .route("/reports/dashboard", get(reports::dashboard))
        .route("/users", get(users::list).post(users::approve))
        .route("/users/check", get(users::check))
        .route("/users/{email}", delete(users::revoke));

    Router::new()
        .route("/health", get(health::health))
        .route("/pos/transactions", get(pos::transactions))
        .nest("/api", api)
        .with_state(state)
}

/// Parses a `YYYY-MM-DD` query parameter.
pub(crate) fn date_param(field: &str, value: &str) -> ApiResult<NaiveDate> {
    Ok(parse_pos_date(field, value)?)
}
