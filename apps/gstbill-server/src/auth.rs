//! JWT authentication and the allowlist gate.
//!
//! Tokens are issued by the external identity provider (HS256, shared
//! secret). A verified token is only half the check: the email must also be
//! on the approved-user allowlist, and the allowlist row's role wins over
//! whatever the token claims.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gstbill_core::{Principal, Role};

use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (identity-provider user id)
    pub sub: String,

    pub email: String,

    /// Only consulted when unapproved users are allowed.
    #[serde(default)]
    pub role: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// JWT token manager.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a token for `email`. Used for local development and tests; in
    /// production the identity provider issues tokens.
    pub fn issue(
        &self,
        user_id: &str,
        email: &str,
        role: Option<Role>,
        lifetime: Duration,
    ) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.map(|r| r.to_string()),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        Ok(data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies the request's token and resolves it against the allowlist.
///
/// ## Returns
/// - `UNAUTHORIZED` when the header is missing or the token does not verify
/// - `FORBIDDEN` when the email is not approved (unless configured otherwise)
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let claims = state.jwt.validate(token)?;

    match state.service.check_approved(&claims.email).await? {
        Some(user) => {
            debug!(email = %user.email, role = %user.role, "Authenticated");
            Ok(Principal {
                user_id: claims.sub,
                email: user.email,
                role: user.role,
            })
        }
        None if state.allow_unapproved => {
            let role = claims
                .role
                .as_deref()
                .and_then(|r| r.parse::<Role>().ok())
                .unwrap_or_default();
            debug!(email = %claims.email, %role, "Authenticated without allowlist entry");
            Ok(Principal {
                user_id: claims.sub,
                email: gstbill_core::auth::normalize_email(&claims.email),
                role,
            })
        }
        None => {
            warn!(email = %claims.email, "Access denied: email is not approved");
            Err(ApiError::forbidden("Your email is not approved for access"))
        }
    }
}

/// An authenticated, allowlisted caller.
///
/// Handlers take this as an extractor; requests without a valid identity
/// never reach them.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(state, &parts.headers).await.map(CurrentUser)
    }
}

/// True when an auth failure means "not signed in" rather than a fault.
pub fn is_identity_failure(err: &ApiError) -> bool {
    matches!(err.code, ErrorCode::Unauthorized | ErrorCode::Forbidden)
}

// =============================================================================
// Unit Tests
// =============================================================================
