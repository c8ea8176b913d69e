//! # Invoice Repository
//!
//! Invoice commit and reads.
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit(NewInvoice, StockPolicy)                                        │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. allocate_invoice_number  ── settings.next_invoice_number += 1     │
//! │   2. INSERT invoices           ── invoice_number UNIQUE                │
//! │      INSERT invoice_items × n  ── position 0..n                        │
//! │   3. decrement_stock × products ── per StockPolicy                     │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: sequence, rows and     │
//! │  stock all roll back together.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::decrement_stock;
use crate::repository::settings::allocate_invoice_number;
use gstbill_core::{Invoice, LineItem, Money, NewInvoice, StockPolicy};

pub(crate) const INVOICE_COLUMNS: &str = "id, invoice_number, customer_id, customer_name, customer_phone, \
     customer_gstin, customer_address, customer_state_code, subtotal, total_cgst, total_sgst, \
     total_igst, total_gst, discount, round_off, grand_total, paid_amount, due_amount, \
     payment_mode, status, invoice_date, due_date, notes, receipt_time, business_date, \
     transaction_status, return_amount, location_code, terminal_id, shift_no, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "product_id, product_name, hsn_code, quantity, unit, rate, gst_rate, discount, amount, cgst, sgst, igst";

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Numbers and stores an invoice, decrementing stock, in one transaction.
    pub async fn commit(&self, new: NewInvoice, policy: StockPolicy) -> DbResult<Invoice> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let (prefix, seq) = allocate_invoice_number(&mut tx, new.created_at).await?;
        let movements = new.stock_movements();
        let invoice = new.into_invoice(Uuid::new_v4().to_string(), &prefix, seq);

        debug!(id = %invoice.id, number = %invoice.invoice_number, "Inserting invoice");
        insert_invoice(&mut tx, &invoice).await?;

        for (product_id, sold) in &movements {
            decrement_stock(&mut tx, product_id, *sold, policy, invoice.created_at).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            number = %invoice.invoice_number,
            grand_total = %invoice.grand_total,
            status = %invoice.status,
            lines = invoice.items.len(),
            "Invoice committed"
        );
        Ok(invoice)
    }

    /// Gets an invoice with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        fetch_invoice(&mut conn, id).await
    }

    /// Invoices dated `from..=to`, ordered by date then creation time.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {} FROM invoices WHERE invoice_date BETWEEN ?1 AND ?2 ORDER BY invoice_date, created_at",
            INVOICE_COLUMNS
        );
        let mut invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        self.attach_items(&mut invoices).await?;
        debug!(%from, %to, count = invoices.len(), "Listed invoices");
        Ok(invoices)
    }

    /// Most recent invoices first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {} FROM invoices ORDER BY created_at DESC, invoice_number DESC LIMIT ?1",
            INVOICE_COLUMNS
        );
        let mut invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        self.attach_items(&mut invoices).await?;
        Ok(invoices)
    }

    /// Σ due over every invoice.
    pub async fn total_outstanding(&self) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(due_amount), 0) FROM invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(Money::from_paise(total))
    }

    async fn attach_items(&self, invoices: &mut [Invoice]) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        for invoice in invoices.iter_mut() {
            invoice.items = fetch_items(&mut conn, &invoice.id).await?;
        }
        Ok(())
    }
}

async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number,
            customer_id, customer_name, customer_phone, customer_gstin, customer_address, customer_state_code,
            subtotal, total_cgst, total_sgst, total_igst, total_gst, discount, round_off, grand_total,
            paid_amount, due_amount, payment_mode, status,
            invoice_date, due_date, notes,
            receipt_time, business_date, transaction_status, return_amount, location_code, terminal_id, shift_no,
            created_at, updated_at
        ) VALUES (
            ?1, ?2,
            ?3, ?4, ?5, ?6, ?7, ?8,
            ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
            ?17, ?18, ?19, ?20,
            ?21, ?22, ?23,
            ?24, ?25, ?26, ?27, ?28, ?29, ?30,
            ?31, ?32
        )
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.invoice_number)
    .bind(&invoice.customer_id)
    .bind(&invoice.customer_name)
    .bind(&invoice.customer_phone)
    .bind(&invoice.customer_gstin)
    .bind(&invoice.customer_address)
    .bind(&invoice.customer_state_code)
    .bind(invoice.subtotal)
    .bind(invoice.total_cgst)
    .bind(invoice.total_sgst)
    .bind(invoice.total_igst)
    .bind(invoice.total_gst)
    .bind(invoice.discount)
    .bind(invoice.round_off)
    .bind(invoice.grand_total)
    .bind(invoice.paid_amount)
    .bind(invoice.due_amount)
    .bind(invoice.payment_mode)
    .bind(invoice.status)
    .bind(invoice.invoice_date)
    .bind(invoice.due_date)
    .bind(&invoice.notes)
    .bind(&invoice.receipt_time)
    .bind(invoice.business_date)
    .bind(invoice.transaction_status)
    .bind(invoice.return_amount)
    .bind(&invoice.location_code)
    .bind(&invoice.terminal_id)
    .bind(&invoice.shift_no)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(&mut *conn)
    .await?;

    for (position, item) in invoice.items.iter().enumerate() {
        insert_item(&mut *conn, &invoice.id, position as i64, item).await?;
    }

    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, invoice_id: &str, position: i64, item: &LineItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, position, product_id, product_name, hsn_code,
            quantity, unit, rate, gst_rate, discount, amount, cgst, sgst, igst
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(invoice_id)
    .bind(position)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.hsn_code)
    .bind(item.quantity)
    .bind(&item.unit)
    .bind(item.rate)
    .bind(item.gst_rate)
    .bind(item.discount)
    .bind(item.amount)
    .bind(item.cgst)
    .bind(item.sgst)
    .bind(item.igst)
    .execute(conn)
    .await?;

    Ok(())
}

async fn fetch_items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<LineItem>> {
    let sql = format!(
        "SELECT {} FROM invoice_items WHERE invoice_id = ?1 ORDER BY position",
        ITEM_COLUMNS
    );
    Ok(sqlx::query_as::<_, LineItem>(&sql)
        .bind(invoice_id)
        .fetch_all(conn)
        .await?)
}

/// Loads one invoice and its lines on the given connection.
pub(crate) async fn fetch_invoice(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {} FROM invoices WHERE id = ?1", INVOICE_COLUMNS);
    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match invoice {
        Some(mut invoice) => {
            invoice.items = fetch_items(conn, &invoice.id).await?;
            Ok(Some(invoice))
        }
        None => Ok(None),
    }
}
