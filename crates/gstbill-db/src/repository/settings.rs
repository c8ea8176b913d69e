//! # Settings Repository
//!
//! The singleton shop profile and the invoice sequence counter.
//!
//! ## Sequence Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE settings                                                      │
//! │       SET next_invoice_number = next_invoice_number + 1                 │
//! │     WHERE id = 'main'                                                   │
//! │    RETURNING invoice_prefix, next_invoice_number - 1   ──► ("INV", 42)  │
//! │    INSERT INTO invoices (... 'INV-00042' ...)                           │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  The UPDATE takes SQLite's write lock, so a second commit waits for     │
//! │  the first and reads 43. A rollback returns 42 to the pool.             │
//! │                                                                         │
//! │  Settings edits never write the counter back, so a stale settings form  │
//! │  cannot rewind it.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use gstbill_core::numbering::format_invoice_number;
use gstbill_core::{Settings, SETTINGS_ID};

const SETTINGS_COLUMNS: &str = "id, shop_name, address, phone, email, gstin, state_code, state_name, \
     invoice_prefix, next_invoice_number, bank_name, bank_account, bank_ifsc, upi_id, \
     terms_and_conditions, logo_url, location_code, terminal_id, current_shift, updated_at";

/// Repository for the settings row.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads the settings row.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - `ensure` has never run
    pub async fn get(&self) -> DbResult<Settings> {
        let sql = format!("SELECT {} FROM settings WHERE id = ?1", SETTINGS_COLUMNS);
        sqlx::query_as::<_, Settings>(&sql)
            .bind(SETTINGS_ID)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Settings", SETTINGS_ID))
    }

    /// Inserts `defaults` unless a settings row already exists.
    ///
    /// Returns the row that is stored afterwards.
    pub async fn ensure(&self, defaults: &Settings) -> DbResult<Settings> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO settings (
                id, shop_name, state_code, state_name, invoice_prefix,
                next_invoice_number, current_shift, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(SETTINGS_ID)
        .bind(&defaults.shop_name)
        .bind(&defaults.state_code)
        .bind(&defaults.state_name)
        .bind(&defaults.invoice_prefix)
        .bind(defaults.next_invoice_number)
        .bind(&defaults.current_shift)
        .bind(defaults.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!(state_code = %defaults.state_code, "Created settings row");
        }

        self.get().await
    }

    /// Writes every editable column except the sequence counter, which
    /// commits own. A requested `next_invoice_number` is applied in the same
    /// transaction, and only when it is past every number already issued
    /// under the (possibly new) prefix.
    ///
    /// ## Returns
    /// The row as stored afterwards.
    ///
    /// ## Errors
    /// * `DbError::SequenceTaken` - the requested number would repeat one
    pub async fn update(&self, settings: &Settings, next_invoice_number: Option<i64>) -> DbResult<Settings> {
        debug!(prefix = %settings.invoice_prefix, ?next_invoice_number, "Updating settings");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE settings SET
                shop_name = ?2,
                address = ?3,
                phone = ?4,
                email = ?5,
                gstin = ?6,
                state_code = ?7,
                state_name = ?8,
                invoice_prefix = ?9,
                bank_name = ?10,
                bank_account = ?11,
                bank_ifsc = ?12,
                upi_id = ?13,
                terms_and_conditions = ?14,
                logo_url = ?15,
                location_code = ?16,
                terminal_id = ?17,
                current_shift = ?18,
                updated_at = ?19
            WHERE id = ?1
            "#,
        )
        .bind(SETTINGS_ID)
        .bind(&settings.shop_name)
        .bind(&settings.address)
        .bind(&settings.phone)
        .bind(&settings.email)
        .bind(&settings.gstin)
        .bind(&settings.state_code)
        .bind(&settings.state_name)
        .bind(&settings.invoice_prefix)
        .bind(&settings.bank_name)
        .bind(&settings.bank_account)
        .bind(&settings.bank_ifsc)
        .bind(&settings.upi_id)
        .bind(&settings.terms_and_conditions)
        .bind(&settings.logo_url)
        .bind(&settings.location_code)
        .bind(&settings.terminal_id)
        .bind(&settings.current_shift)
        .bind(settings.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Settings", SETTINGS_ID));
        }

        if let Some(requested) = next_invoice_number {
            let highest = highest_used_sequence(&mut tx, &settings.invoice_prefix).await?;
            if requested <= highest {
                return Err(DbError::SequenceTaken {
                    prefix: settings.invoice_prefix.clone(),
                    requested,
                    highest,
                });
            }
            sqlx::query("UPDATE settings SET next_invoice_number = ?2 WHERE id = ?1")
                .bind(SETTINGS_ID)
                .bind(requested)
                .execute(&mut *tx)
                .await?;
        }

        let sql = format!("SELECT {} FROM settings WHERE id = ?1", SETTINGS_COLUMNS);
        let stored = sqlx::query_as::<_, Settings>(&sql)
            .bind(SETTINGS_ID)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(stored)
    }
}

/// Highest sequence already issued under `prefix`, or 0.
async fn highest_used_sequence(conn: &mut SqliteConnection, prefix: &str) -> DbResult<i64> {
    let head = format!("{}-", prefix);
    let (highest,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(MAX(CAST(substr(invoice_number, ?2 + 1) AS INTEGER)), 0)
        FROM invoices
        WHERE substr(invoice_number, 1, ?2) = ?1
          AND substr(invoice_number, ?2 + 1) <> ''
          AND substr(invoice_number, ?2 + 1) NOT GLOB '*[^0-9]*'
        "#,
    )
    .bind(&head)
    .bind(head.chars().count() as i64)
    .fetch_one(conn)
    .await?;
    Ok(highest)
}

async fn number_in_use(conn: &mut SqliteConnection, number: &str) -> DbResult<bool> {
    let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM invoices WHERE invoice_number = ?1")
        .bind(number)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

async fn take_next_sequence(conn: &mut SqliteConnection, now: DateTime<Utc>) -> DbResult<(String, i64)> {
    let allocated: Option<(String, i64)> = sqlx::query_as(
        r#"
        UPDATE settings
        SET next_invoice_number = next_invoice_number + 1,
            updated_at = ?2
        WHERE id = ?1
        RETURNING invoice_prefix, next_invoice_number - 1
        "#,
    )
    .bind(SETTINGS_ID)
    .bind(now)
    .fetch_optional(conn)
    .await?;

    allocated.ok_or_else(|| DbError::not_found("Settings", SETTINGS_ID))
}

/// Takes the next free invoice sequence inside an open transaction.
///
/// A counter that points at an issued number (an older prefix brought
/// back, or a row edited outside the app) is moved past the highest
/// number used under the prefix.
///
/// ## Returns
/// `(invoice_prefix, sequence)`, where `sequence` is the value before the
/// increment.
pub(crate) async fn allocate_invoice_number(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
) -> DbResult<(String, i64)> {
    let (prefix, seq) = take_next_sequence(&mut *conn, now).await?;
    let number = format_invoice_number(&prefix, seq);
    if !number_in_use(&mut *conn, &number).await? {
        return Ok((prefix, seq));
    }

    let highest = highest_used_sequence(&mut *conn, &prefix).await?;
    warn!(%number, highest, "Invoice counter behind issued numbers, skipping ahead");
    sqlx::query("UPDATE settings SET next_invoice_number = ?2 WHERE id = ?1")
        .bind(SETTINGS_ID)
        .bind(highest + 1)
        .execute(&mut *conn)
        .await?;

    take_next_sequence(conn, now).await
}
