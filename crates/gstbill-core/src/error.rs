//! # Domain Errors
//!
//! Failures the pure billing logic can report. Nothing here knows about
//! storage or HTTP; outer layers wrap these.
//!
//! ```text
//! ValidationError ──► CoreError ──► ServiceError (gstbill-db) ──► ApiError (server)
//!   bad input          domain rule,    + DbError                   code + message
//!                      lookup, role
//! ```

use thiserror::Error;

/// Billing rule failures, grouped as:
/// - validation (`EmptyInvoice`, `InvalidPaymentAmount`, `Validation`)
/// - lookups that failed before any write (`*NotFound`)
/// - authorization (`Forbidden`)
#[derive(Debug, Error)]
pub enum CoreError {
    /// An invoice was saved with no line items.
    ///
    /// ## User Workflow
    /// ```text
    /// Billing screen (cart empty)
    ///      │
    ///      ▼
    /// "Save Bill" ──► EmptyInvoice ──► toast: "Add at least one item"
    ///      │
    ///      ▼
    /// Nothing persisted, no sequence consumed, no stock touched
    /// ```
    #[error("Invoice must contain at least one item")]
    EmptyInvoice,

    /// Product referenced by a line does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer referenced by a draft does not exist.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Invoice referenced by a payment does not exist.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Payment amount or mode is invalid.
    #[error("Invalid payment: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// The caller's role does not allow the action.
    #[error("{role} is not allowed to {action}")]
    Forbidden { action: String, role: String },

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn forbidden(action: impl Into<String>, role: impl Into<String>) -> Self {
        CoreError::Forbidden {
            action: action.into(),
            role: role.into(),
        }
    }

    /// True for errors the caller caused with bad input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::EmptyInvoice | CoreError::InvalidPaymentAmount { .. } | CoreError::Validation(_)
        )
    }

    /// True for failed lookups.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::CustomerNotFound(_)
                | CoreError::InvoiceNotFound(_)
        )
    }
}

/// Field-level input problems, raised before any persistence call.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    Negative { field: String },

    /// GSTIN, state code, invoice prefix or date that does not parse.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Unique value already taken; maps to 409 at the HTTP edge.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn negative(field: &str) -> Self {
        ValidationError::Negative {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CoreError::EmptyInvoice.to_string(),
            "Invoice must contain at least one item"
        );

        let err = CoreError::forbidden("manage users", "staff");
        assert_eq!(err.to_string(), "staff is not allowed to manage users");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("customer name");
        assert_eq!(err.to_string(), "customer name is required");

        let err = ValidationError::OutOfRange {
            field: "gst_rate".to_string(),
            min: 0,
            max: 10000,
        };
        assert_eq!(err.to_string(), "gst_rate must be between 0 and 10000");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(core_err.is_validation());
    }

    #[test]
    fn test_classification() {
        assert!(CoreError::EmptyInvoice.is_validation());
        assert!(CoreError::InvoiceNotFound("x".into()).is_not_found());
        assert!(!CoreError::forbidden("a", "staff").is_validation());
        assert!(!CoreError::forbidden("a", "staff").is_not_found());
    }
}
