//! Report routes.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Datelike;
use serde::Deserialize;

use gstbill_core::report::{Dashboard, SalesReport};

use super::date_param;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub date: Option<String>,
}

/// `GET /api/reports/sales?from=&to=`
///
/// Defaults to month-to-date in the shop's time zone.
pub async fn sales(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<SalesReport>> {
    let Query(query) = query?;
    let today = state.service.today();

    let to = match query.to.as_deref() {
        Some(value) => date_param("to", value)?,
        None => today,
    };
    let from = match query.from.as_deref() {
        Some(value) => date_param("from", value)?,
        None => to.with_day(1).unwrap_or(to),
    };

    Ok(Json(state.service.sales_report(from, to).await?))
}

/// `GET /api/reports/dashboard[?date=]`
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> ApiResult<Json<Dashboard>> {
    let Query(query) = query?;
    let date = match query.date.as_deref() {
        Some(value) => date_param("date", value)?,
        None => state.service.today(),
    };

    Ok(Json(state.service.dashboard(date).await?))
}
