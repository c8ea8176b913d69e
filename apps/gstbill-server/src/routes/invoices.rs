//! Invoice routes: preview, save, read, and follow-up payments.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use gstbill_core::{Invoice, InvoiceDraft, NewInvoice, Payment, PaymentInput};
use gstbill_db::InvoiceDetail;

use super::date_param;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Page size for `GET /api/invoices` without a date range.
const DEFAULT_RECENT_LIMIT: u32 = 50;
const MAX_RECENT_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<u32>,
}

/// Response of `POST /api/invoices/{id}/payments`.
#[derive(Debug, Serialize)]
pub struct PaymentRecorded {
    pub invoice: Invoice,
    pub payment: Payment,
}

/// `POST /api/invoices/preview`: prices a draft, stores nothing.
pub async fn preview(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    body: Result<Json<InvoiceDraft>, JsonRejection>,
) -> ApiResult<Json<NewInvoice>> {
    let Json(draft) = body?;
    Ok(Json(state.service.preview_invoice(&draft).await?))
}

/// `POST /api/invoices`
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<InvoiceDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let Json(draft) = body?;
    let invoice = state.service.save_invoice(&draft).await?;
    info!(
        by = %user.email,
        invoice_number = %invoice.invoice_number,
        "Invoice created via API"
    );
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// `GET /api/invoices?from=&to=`, or the most recent invoices when no range
/// is given.
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    query: Result<Query<InvoiceQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Invoice>>> {
    let Query(query) = query?;

    let invoices = match (query.from.as_deref(), query.to.as_deref()) {
        (Some(from), Some(to)) => {
            let from = date_param("from", from)?;
            let to = date_param("to", to)?;
            state.service.list_invoices(from, to).await?
        }
        (None, None) => {
            let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_RECENT_LIMIT);
            state.service.recent_invoices(limit).await?
        }
        _ => return Err(ApiError::validation("from and to must be given together")),
    };

    Ok(Json(invoices))
}

/// `GET /api/invoices/{id}`: the invoice with its payments.
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceDetail>> {
    Ok(Json(state.service.get_invoice(&id).await?))
}

/// `GET /api/invoices/{id}/payments`
pub async fn payments(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(state.service.payments_for(&id).await?))
}

/// `POST /api/invoices/{id}/payments`
pub async fn record_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<PaymentInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PaymentRecorded>)> {
    let Json(input) = body?;
    let (invoice, payment) = state.service.record_payment(&id, input).await?;
    info!(
        by = %user.email,
        invoice_number = %invoice.invoice_number,
        amount = %payment.amount,
        status = %invoice.status,
        "Payment recorded via API"
    );
    Ok((StatusCode::CREATED, Json(PaymentRecorded { invoice, payment })))
}
