use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use gstbill_core::{Settings, SettingsUpdate};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /api/settings`
pub async fn get(State(state): State<AppState>, CurrentUser(_user): CurrentUser) -> ApiResult<Json<Settings>> {
    Ok(Json(state.service.settings().await?))
}

/// `PUT /api/settings` (admin only)
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<SettingsUpdate>, JsonRejection>,
) -> ApiResult<Json<Settings>> {
    let Json(update) = body?;
    Ok(Json(state.service.update_settings(update, &user).await?))
}
