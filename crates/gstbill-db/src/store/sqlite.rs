//! SQLite backend: delegates each operation to the matching repository.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::DbResult;
use crate::pool::Database;
use crate::store::BillingStore;
use gstbill_core::{
    ApprovedUser, Customer, Invoice, Money, NewInvoice, NewPayment, Payment, Product, Settings, StockPolicy,
};

/// [`BillingStore`] over a [`Database`] pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        SqliteStore { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl BillingStore for SqliteStore {
    async fn settings(&self) -> DbResult<Settings> {
        self.db.settings().get().await
    }

    async fn ensure_settings(&self, defaults: &Settings) -> DbResult<Settings> {
        self.db.settings().ensure(defaults).await
    }

    async fn update_settings(&self, settings: &Settings, next_invoice_number: Option<i64>) -> DbResult<Settings> {
        self.db.settings().update(settings, next_invoice_number).await
    }

    async fn list_products(&self) -> DbResult<Vec<Product>> {
        self.db.products().list().await
    }

    async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        self.db.products().get_by_id(id).await
    }

    async fn get_products(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        self.db.products().get_many(ids).await
    }

    async fn insert_product(&self, product: &Product) -> DbResult<()> {
        self.db.products().insert(product).await
    }

    async fn update_product(&self, product: &Product) -> DbResult<()> {
        self.db.products().update(product).await
    }

    async fn delete_product(&self, id: &str) -> DbResult<()> {
        self.db.products().delete(id).await
    }

    async fn low_stock_products(&self) -> DbResult<Vec<Product>> {
        self.db.products().low_stock().await
    }

    async fn list_customers(&self) -> DbResult<Vec<Customer>> {
        self.db.customers().list().await
    }

    async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>> {
        self.db.customers().get_by_id(id).await
    }

    async fn count_customers(&self) -> DbResult<u32> {
        self.db.customers().count().await
    }

    async fn insert_customer(&self, customer: &Customer) -> DbResult<()> {
        self.db.customers().insert(customer).await
    }

    async fn update_customer(&self, customer: &Customer) -> DbResult<()> {
        self.db.customers().update(customer).await
    }

    async fn delete_customer(&self, id: &str) -> DbResult<()> {
        self.db.customers().delete(id).await
    }

    async fn commit_invoice(&self, new: NewInvoice, policy: StockPolicy) -> DbResult<Invoice> {
        self.db.invoices().commit(new, policy).await
    }

    async fn get_invoice(&self, id: &str) -> DbResult<Option<Invoice>> {
        self.db.invoices().get_by_id(id).await
    }

    async fn list_invoices(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Invoice>> {
        self.db.invoices().list_between(from, to).await
    }

    async fn recent_invoices(&self, limit: u32) -> DbResult<Vec<Invoice>> {
        self.db.invoices().list_recent(limit).await
    }

    async fn total_outstanding(&self) -> DbResult<Money> {
        self.db.invoices().total_outstanding().await
    }

    async fn record_payment(&self, new: NewPayment) -> DbResult<(Invoice, Payment)> {
        self.db.payments().record(new).await
    }

    async fn payments_for(&self, invoice_id: &str) -> DbResult<Vec<Payment>> {
        self.db.payments().list_for_invoice(invoice_id).await
    }

    async fn list_approved_users(&self) -> DbResult<Vec<ApprovedUser>> {
        self.db.approved_users().list().await
    }

    async fn find_approved_user(&self, email: &str) -> DbResult<Option<ApprovedUser>> {
        self.db.approved_users().find_by_email(email).await
    }

    async fn insert_approved_user(&self, user: &ApprovedUser) -> DbResult<()> {
        self.db.approved_users().insert(user).await
    }

    async fn delete_approved_user(&self, email: &str) -> DbResult<()> {
        self.db.approved_users().delete_by_email(email).await
    }

    async fn health_check(&self) -> bool {
        self.db.health_check().await
    }
}
