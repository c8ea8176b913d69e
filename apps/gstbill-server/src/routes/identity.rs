use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use gstbill_core::IdentityStatus;

use crate::auth::{authenticate, is_identity_failure};
use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /api/identity`
///
/// Missing, invalid or unapproved credentials report
/// `is_authenticated: false` instead of failing.
pub async fn identity(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<IdentityStatus>> {
    match authenticate(&state, &headers).await {
        Ok(principal) => Ok(Json(IdentityStatus::of(&principal))),
        Err(err) if is_identity_failure(&err) => Ok(Json(IdentityStatus::anonymous())),
        Err(err) => Err(err),
    }
}
