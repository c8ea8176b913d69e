//! Approved-user allowlist routes.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use gstbill_core::auth::ApproveUserInput;
use gstbill_core::{ApprovedUser, Role};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub approved: bool,
    pub role: Option<Role>,
}

/// `GET /api/users` (admin only)
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<ApprovedUser>>> {
    Ok(Json(state.service.list_approved_users(&user).await?))
}

/// `POST /api/users` (admin only)
pub async fn approve(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<ApproveUserInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApprovedUser>)> {
    let Json(input) = body?;
    let approved = state.service.approve_user(input, &user).await?;
    Ok((StatusCode::CREATED, Json(approved)))
}

/// `DELETE /api/users/{email}` (admin only)
pub async fn revoke(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(email): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.revoke_user(&email, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/users/check?email=`
pub async fn check(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    query: Result<Query<CheckQuery>, QueryRejection>,
) -> ApiResult<Json<CheckResponse>> {
    let Query(query) = query?;
    let entry = state.service.check_approved(&query.email).await?;
    Ok(Json(CheckResponse {
        approved: entry.is_some(),
        role: entry.map(|u| u.role),
    }))
}
