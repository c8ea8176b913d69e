//! # HTTP Errors
//!
//! Every `/api` failure leaves as `{"code": ..., "message": ...}` with the
//! status taken from [`ErrorCode::status`].
//!
//! ```text
//!  ServiceError ─┬─ Core(CoreError) ──────► 400 / 403 / 404 / 409
//!                └─ Persistence(DbError) ─► 404 / 409, else 500
//!                                           (cause logged, body generic)
//!  JsonRejection / QueryRejection ────────► 400 VALIDATION_ERROR
//! ```
//!
//! The public POS endpoint keeps its own envelope, [`PosError`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use gstbill_core::{CoreError, ValidationError};
use gstbill_db::{DbError, ServiceError};

/// Body of a failed `/api` call, e.g.
/// `{"code":"NOT_FOUND","message":"Invoice not found: 6f1c..."}`.
#[derive(Debug, Clone, Serialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

/// Stable machine-readable codes; clients branch on these, not on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    /// Missing, malformed or expired bearer token.
    Unauthorized,
    /// Valid token, but the email is not on the allowlist or the role is too low.
    Forbidden,
    NotFound,
    Conflict,
    DatabaseError,
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        let public = match &err {
            DbError::NotFound { entity, id } => return ApiError::not_found(entity, id),
            DbError::UniqueViolation { field, value } => {
                return ApiError::new(ErrorCode::Conflict, format!("{field} '{value}' already exists"));
            }
            DbError::ForeignKeyViolation { .. } => {
                tracing::warn!(error = %err, "Rejected dangling reference");
                return ApiError::validation("Referenced record does not exist");
            }
            DbError::SequenceTaken { .. } => return ApiError::validation(err.to_string()),
            DbError::Busy(_) | DbError::PoolExhausted => "Storage is busy, retry shortly",
            DbError::ConnectionFailed(_) | DbError::MigrationFailed(_) => "Storage is unavailable",
            DbError::QueryFailed(_) | DbError::TransactionFailed(_) | DbError::Internal(_) => {
                "Storage operation failed"
            }
        };
        tracing::error!(error = %err, "Storage failure");
        ApiError::new(ErrorCode::DatabaseError, public)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::CustomerNotFound(id) => ApiError::not_found("Customer", &id),
            CoreError::InvoiceNotFound(id) => ApiError::not_found("Invoice", &id),
            CoreError::Forbidden { .. } => ApiError::forbidden(err.to_string()),
            CoreError::Validation(inner) => inner.into(),
            CoreError::EmptyInvoice | CoreError::InvalidPaymentAmount { .. } => {
                ApiError::validation(err.to_string())
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Duplicate { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            _ => ApiError::validation(err.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Core(e) => e.into(),
            ServiceError::Persistence(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error envelope of `GET /pos/transactions`: `{"success": false, "error": ...}`.
#[derive(Debug, Clone)]
pub struct PosError {
    pub status: StatusCode,
    pub error: String,
}

impl PosError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        PosError {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }
}

impl IntoResponse for PosError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "success": false, "error": self.error }))).into_response()
    }
}

impl From<ServiceError> for PosError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Core(e) if e.is_validation() => PosError::bad_request(e.to_string()),
            other => {
                tracing::error!(error = %other, "POS export failed");
                PosError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: "Failed to fetch invoices".to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::DatabaseError.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_code_serialization() {
        let err = ApiError::validation("bad");
        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "bad");
        assert_eq!(
            serde_json::to_value(ErrorCode::DatabaseError).unwrap(),
            "DATABASE_ERROR"
        );
    }

    #[test]
    fn test_core_error_mapping() {
        assert_eq!(ApiError::from(CoreError::EmptyInvoice).code, ErrorCode::ValidationError);
        assert_eq!(
            ApiError::from(CoreError::InvoiceNotFound("x".into())).code,
            ErrorCode::NotFound
        );
        assert_eq!(
            ApiError::from(CoreError::forbidden("update settings", "staff")).code,
            ErrorCode::Forbidden
        );
        let dup = CoreError::Validation(ValidationError::Duplicate {
            field: "sku".into(),
            value: "A1".into(),
        });
        assert_eq!(ApiError::from(dup).code, ErrorCode::Conflict);
    }

    #[test]
    fn test_db_error_hides_details() {
        let err = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("SELEC"));

        let err = ApiError::from(DbError::duplicate("invoice_number", "INV-00001"));
        assert_eq!(err.code, ErrorCode::Conflict);

        let err = ApiError::from(DbError::SequenceTaken {
            prefix: "INV".into(),
            requested: 1,
            highest: 4,
        });
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
