//! Public POS-aggregator feed.
//!
//! Read-only and unauthenticated; the aggregator polls it with a date range
//! and gets every invoice in that range as a flat transaction.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use gstbill_core::pos::{parse_pos_date, PosExport};

use crate::error::PosError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PosQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

/// `GET /pos/transactions?from_date=YYYY-MM-DD&to_date=YYYY-MM-DD`
pub async fn transactions(
    State(state): State<AppState>,
    query: Result<Query<PosQuery>, QueryRejection>,
) -> Result<Json<PosExport>, PosError> {
    let Query(query) = query.map_err(|e| PosError::bad_request(e.body_text()))?;

    let (Some(from), Some(to)) = (query.from_date, query.to_date) else {
        return Err(PosError::bad_request(
            "Missing required parameters: from_date and to_date",
        ));
    };

    let (from, to) = match (parse_pos_date("from_date", &from), parse_pos_date("to_date", &to)) {
        (Ok(from), Ok(to)) => (from, to),
        _ => return Err(PosError::bad_request("Invalid date format. Use YYYY-MM-DD")),
    };

    let export = state.service.pos_export(from, to, Utc::now()).await?;
    info!(
        %from,
        %to,
        transactions = export.summary.total_transactions,
        "POS transactions served"
    );
    Ok(Json(export))
}
