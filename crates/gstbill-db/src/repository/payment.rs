//! # Payment Repository
//!
//! Follow-up payments against invoices.
//!
//! ## Record Transaction
//! ```text
//! BEGIN
//!   UPDATE invoices SET updated_at = now WHERE id = ?   ← take the write lock first
//!   SELECT invoice                                      ← read under the lock
//!   PaymentState::apply(amount)                         ← pure, in gstbill-core
//!   UPDATE invoices SET paid, due, status
//!   INSERT payments
//! COMMIT
//! ```
//!
//! Taking the lock before reading means two concurrent payments never both
//! add to the same stale `paid_amount`.

use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::invoice::fetch_invoice;
use gstbill_core::{Invoice, NewPayment, Payment, PaymentState};

const PAYMENT_COLUMNS: &str = "id, invoice_id, amount, payment_mode, payment_date, notes, created_at";

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Payments for one invoice, oldest first.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE invoice_id = ?1 ORDER BY created_at, id",
            PAYMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Payment>(&sql)
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Appends a payment and re-derives the invoice's paid/due/status.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - invoice doesn't exist
    /// * `Err(DbError::Internal)` - the amount was rejected by the payment rules
    pub async fn record(&self, new: NewPayment) -> DbResult<(Invoice, Payment)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let touched = sqlx::query("UPDATE invoices SET updated_at = ?2 WHERE id = ?1")
            .bind(&new.invoice_id)
            .bind(new.created_at)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", &new.invoice_id));
        }

        let mut invoice = fetch_invoice(&mut tx, &new.invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", &new.invoice_id))?;

        let state = PaymentState::of(&invoice)
            .apply(new.amount, invoice.grand_total)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query("UPDATE invoices SET paid_amount = ?2, due_amount = ?3, status = ?4 WHERE id = ?1")
            .bind(&invoice.id)
            .bind(state.paid_amount)
            .bind(state.due_amount)
            .bind(state.status)
            .execute(&mut *tx)
            .await?;

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            invoice_id: new.invoice_id,
            amount: new.amount,
            payment_mode: new.payment_mode,
            payment_date: new.payment_date,
            notes: new.notes,
            created_at: new.created_at,
        };
        debug!(id = %payment.id, invoice_id = %payment.invoice_id, "Inserting payment");

        sqlx::query(
            r#"
            INSERT INTO payments (id, invoice_id, amount, payment_mode, payment_date, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.invoice_id)
        .bind(payment.amount)
        .bind(payment.payment_mode)
        .bind(payment.payment_date)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        invoice.paid_amount = state.paid_amount;
        invoice.due_amount = state.due_amount;
        invoice.status = state.status;
        invoice.updated_at = payment.created_at;

        info!(
            number = %invoice.invoice_number,
            amount = %payment.amount,
            due = %invoice.due_amount,
            status = %invoice.status,
            "Payment recorded"
        );
        Ok((invoice, payment))
    }
}
