use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use gstbill_core::{Customer, CustomerInput};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, CurrentUser(_user): CurrentUser) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.service.list_customers().await?))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    body: Result<Json<CustomerInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let Json(input) = body?;
    let customer = state.service.create_customer(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.service.get_customer(&id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<CustomerInput>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let Json(input) = body?;
    Ok(Json(state.service.update_customer(&id, input).await?))
}

/// Invoices keep their snapshot of the customer.
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.delete_customer(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
