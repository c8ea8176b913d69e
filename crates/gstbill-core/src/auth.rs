//! # Identity & Authorization Rules
//!
//! The billing engine never authenticates anyone. An external identity
//! provider issues tokens; the server verifies them and hands the engine a
//! [`Principal`]. This module holds the rules applied to that principal.
//!
//! ```text
//! ┌────────────────┐  bearer JWT  ┌────────────────┐  Principal  ┌──────────────┐
//! │ Identity       │ ───────────► │ gstbill-server │ ──────────► │ BillingService│
//! │ provider       │              │ (verify + look │             │ require_admin │
//! └────────────────┘              │  up allowlist) │             └──────────────┘
//!                                 └────────────────┘
//! ```
//!
//! The allowlist role is authoritative: a token claiming `admin` for an
//! email listed as `staff` acts as staff.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

/// Access level of an approved user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Staff,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["admin".into(), "staff".into()],
            }),
        }
    }
}

/// An authenticated, allowlisted caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with `Forbidden` unless the caller is an admin.
    ///
    /// ```rust
    /// use gstbill_core::auth::{Principal, Role};
    ///
    /// let staff = Principal { user_id: "u1".into(), email: "a@b.in".into(), role: Role::Staff };
    /// assert!(staff.require_admin("update settings").is_err());
    /// ```
    pub fn require_admin(&self, action: &str) -> CoreResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::forbidden(action, self.role.as_str()))
        }
    }
}

/// What the identity endpoint reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IdentityStatus {
    pub is_authenticated: bool,
    pub role: Option<Role>,
}

impl IdentityStatus {
    pub const fn anonymous() -> Self {
        IdentityStatus {
            is_authenticated: false,
            role: None,
        }
    }

    pub fn of(principal: &Principal) -> Self {
        IdentityStatus {
            is_authenticated: true,
            role: Some(principal.role),
        }
    }
}

/// Allowlist row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ApprovedUser {
    pub id: String,
    /// Stored normalized.
    pub email: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Body for adding an email to the allowlist.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ApproveUserInput {
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

/// Trims and lowercases an email for allowlist comparison.
///
/// ```rust
/// use gstbill_core::auth::normalize_email;
///
/// assert_eq!(normalize_email("  Owner@Shop.IN "), "owner@shop.in");
/// ```
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Finds the allowlist entry for an email, comparing normalized forms.
pub fn find_approved<'a>(allowlist: &'a [ApprovedUser], email: &str) -> Option<&'a ApprovedUser> {
    let wanted = normalize_email(email);
    allowlist.iter().find(|u| normalize_email(&u.email) == wanted)
}
