//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied by [`Database::new`](crate::Database::new).
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   settings, products, customers, invoices,
//!                              invoice_items, payments, approved_users
//!
//! sqlx records every applied file in _sqlx_migrations (checksum + version),
//! so a second run is a no-op and an edited file is rejected.
//! ```
//!
//! Schema changes go in a new `NNN_description.sql`; shipped files stay
//! untouched.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations embedded from `migrations/sqlite` at compile time.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration that has not run yet, in version order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let embedded = MIGRATOR.migrations.len();
    MIGRATOR.run(pool).await?;
    info!(embedded, "Billing schema migrated");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let embedded = MIGRATOR.migrations.len();

    let tracked: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;
    if tracked.is_none() {
        return Ok((embedded, 0));
    }

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((embedded, usize::try_from(applied).unwrap_or(0)))
}
