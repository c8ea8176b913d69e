//! # Approved User Repository
//!
//! The email allowlist. Emails are stored normalized (trimmed, lowercase)
//! and the column is `COLLATE NOCASE`, so lookups match either way.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use gstbill_core::auth::normalize_email;
use gstbill_core::ApprovedUser;

#[derive(Debug, Clone)]
pub struct ApprovedUserRepository {
    pool: SqlitePool,
}

impl ApprovedUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ApprovedUserRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<ApprovedUser>> {
        Ok(sqlx::query_as::<_, ApprovedUser>(
            "SELECT id, email, role, created_at FROM approved_users ORDER BY email",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<ApprovedUser>> {
        Ok(sqlx::query_as::<_, ApprovedUser>(
            "SELECT id, email, role, created_at FROM approved_users WHERE email = ?1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?)
    }

    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already approved
    pub async fn insert(&self, user: &ApprovedUser) -> DbResult<()> {
        debug!(email = %user.email, role = %user.role, "Approving user");

        sqlx::query("INSERT INTO approved_users (id, email, role, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&user.id)
            .bind(normalize_email(&user.email))
            .bind(user.role)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                    field,
                    value: user.email.clone(),
                },
                other => other,
            })?;

        Ok(())
    }

    pub async fn delete_by_email(&self, email: &str) -> DbResult<()> {
        debug!(email = %email, "Revoking user");

        let result = sqlx::query("DELETE FROM approved_users WHERE email = ?1")
            .bind(normalize_email(email))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Approved user", email));
        }

        Ok(())
    }
}
