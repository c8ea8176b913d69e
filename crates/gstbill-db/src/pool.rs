//! # SQLite Pool
//!
//! Opens the billing database and hands out repositories over one shared
//! `SqlitePool`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Opening the billing database                      │
//! │                                                                         │
//! │  [storage] section ──► DbConfig { path, pool sizes, busy_timeout }     │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  Database::new ──► connect (WAL, foreign_keys=ON) ──► MIGRATOR.run     │
//! │                               │                                         │
//! │          ┌──────────┬─────────┼──────────┬───────────┬──────────┐      │
//! │          ▼          ▼         ▼          ▼           ▼          ▼      │
//! │      settings   products  customers  invoices    payments   approved   │
//! │                                                               users    │
//! │                                                                         │
//! │  Readers never wait on the writer. Invoice commits queue on the        │
//! │  settings row inside their transaction.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A writer that finds the file locked waits up to `busy_timeout` before
//! SQLite reports `SQLITE_BUSY`, which the service treats as retryable.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    ApprovedUserRepository, CustomerRepository, InvoiceRepository, PaymentRepository, ProductRepository,
    SettingsRepository,
};

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how the pool behaves.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/gstbill/gstbill.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// File path, or `:memory:`.
    pub database_path: PathBuf,

    /// Default 5.
    pub max_connections: u32,

    /// Connections kept open while idle. Default 1.
    pub min_connections: u32,

    /// How long a caller waits for a free connection. Default 30s.
    pub connect_timeout: Duration,

    /// Default 10 minutes. Ignored for `:memory:`.
    pub idle_timeout: Duration,

    /// How long a writer waits on a locked file. Default 5s.
    pub busy_timeout: Duration,

    /// Apply embedded migrations in [`Database::new`]. Default on.
    pub run_migrations: bool,
}

impl DbConfig {
    /// Defaults for a file database; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// A private in-memory database, used by tests.
    ///
    /// Each `:memory:` connection is its own database, so the pool is pinned
    /// to a single connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the billing database.
///
/// Clones share the pool. Each accessor returns a repository bound to it.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./gstbill.db")).await?;
/// let invoice = db.invoices().commit(new_invoice, StockPolicy::ClampAtZero).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the database and applies migrations.
    ///
    /// ## Returns
    /// `ConnectionFailed` when the file cannot be opened, `MigrationFailed`
    /// when the schema cannot be brought up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening billing database");

        let base_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        let connect_options = base_options
            .synchronous(SqliteSynchronous::Normal)
            // off by default in SQLite; invoice_items and payments rely on it
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);

        debug!(busy_timeout_ms = config.busy_timeout.as_millis() as u64, "SQLite options ready");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout));
        if config.is_in_memory() {
            // The data lives in the one connection; never recycle it
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = match pool_options.connect_with(connect_options).await {
            Ok(pool) => pool,
            Err(e) => return Err(DbError::ConnectionFailed(e.to_string())),
        };
        info!(max_connections = config.max_connections, "SQLite pool open");

        let database = Database { pool };
        if config.run_migrations {
            database.run_migrations().await?;
        }
        Ok(database)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        let (embedded, applied) = self.schema_status().await?;
        debug!(embedded, applied, "Schema is current");
        Ok(())
    }

    /// `(embedded, applied)` migration counts.
    pub async fn schema_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    pub fn approved_users(&self) -> ApprovedUserRepository {
        ApprovedUserRepository::new(self.pool.clone())
    }

    /// Closes the connection pool. Repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing billing database");
        self.pool.close().await;
    }

    /// `SELECT 1` succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
