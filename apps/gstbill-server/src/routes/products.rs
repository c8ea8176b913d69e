//! Product catalog routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use gstbill_core::{Product, ProductInput};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, CurrentUser(_user): CurrentUser) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.service.list_products().await?))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let Json(input) = body?;
    let product = state.service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.service.get_product(&id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let Json(input) = body?;
    Ok(Json(state.service.update_product(&id, input).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.delete_product(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/products/low-stock`: lowest stock first.
pub async fn low_stock(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.service.low_stock().await?))
}
