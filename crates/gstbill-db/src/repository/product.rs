//! Product catalog queries.
//!
//! Stock is only ever changed with a relative UPDATE inside the invoice
//! commit transaction, never read-modify-write:
//!
//! ```text
//! clamp_at_zero:  stock = MAX(stock - ?, 0)
//! allow_negative: stock = stock - ?
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use gstbill_core::{Product, Quantity, StockPolicy};

const PRODUCT_COLUMNS: &str = "id, name, sku, hsn_code, gst_rate, purchase_price, selling_price, \
     stock, low_stock_alert, unit, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY name COLLATE NOCASE, id", PRODUCT_COLUMNS);
        let products = sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?;
        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Fetches the given ids; missing ids are simply absent from the result.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT {} FROM products WHERE id IN ({})", PRODUCT_COLUMNS, placeholders);

        let mut query = sqlx::query_as::<_, Product>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Fails with `UniqueViolation` when the SKU is taken.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, sku, hsn_code, gst_rate, purchase_price, selling_price,
                stock, low_stock_alert, unit, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.hsn_code)
        .bind(product.gst_rate)
        .bind(product.purchase_price)
        .bind(product.selling_price)
        .bind(product.stock)
        .bind(product.low_stock_alert)
        .bind(&product.unit)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Full replace; stock is set absolutely here, unlike invoice commits.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = ?product.sku, "Saving product edit");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                sku = ?3,
                hsn_code = ?4,
                gst_rate = ?5,
                purchase_price = ?6,
                selling_price = ?7,
                stock = ?8,
                low_stock_alert = ?9,
                unit = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.hsn_code)
        .bind(product.gst_rate)
        .bind(product.purchase_price)
        .bind(product.selling_price)
        .bind(product.stock)
        .bind(product.low_stock_alert)
        .bind(&product.unit)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Hard-deletes a product. Invoice lines keep their snapshot and lose
    /// only the product link.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Products at or below their alert level, lowest stock first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE stock <= low_stock_alert ORDER BY stock, name",
            PRODUCT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?)
    }
}

/// Decrements stock for one sold product inside an open transaction.
///
/// A product deleted since pricing is skipped; the invoice line keeps its
/// snapshot either way.
pub(crate) async fn decrement_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    sold: Quantity,
    policy: StockPolicy,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let sql = match policy {
        StockPolicy::ClampAtZero => "UPDATE products SET stock = MAX(stock - ?2, 0), updated_at = ?3 WHERE id = ?1",
        StockPolicy::AllowNegative => "UPDATE products SET stock = stock - ?2, updated_at = ?3 WHERE id = ?1",
    };

    let result = sqlx::query(sql)
        .bind(product_id)
        .bind(sold)
        .bind(now)
        .execute(conn)
        .await?;

    debug!(
        product_id = %product_id,
        sold = %sold,
        policy = %policy,
        matched = result.rows_affected(),
        "Decremented stock"
    );

    Ok(())
}
