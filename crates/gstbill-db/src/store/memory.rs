//! # Memory Store
//!
//! In-process [`BillingStore`] for offline use and tests.
//!
//! Every operation takes one `tokio::sync::Mutex` over the whole state, so a
//! commit is trivially atomic: it validates everything first and only then
//! mutates. The constraints the SQLite schema enforces (unique SKU, unique
//! allowlist email, detached references on delete) are enforced here by hand
//! so both backends fail the same way, and a counter that points at an
//! issued invoice number skips past it as the SQLite allocator does.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::store::BillingStore;
use gstbill_core::auth::{find_approved, normalize_email};
use gstbill_core::numbering::{format_invoice_number, highest_sequence};
use gstbill_core::report::low_stock;
use gstbill_core::{
    ApprovedUser, Customer, Invoice, Money, NewInvoice, NewPayment, Payment, PaymentState, Product, Settings,
    StockPolicy,
};

#[derive(Debug, Default)]
struct MemoryState {
    settings: Option<Settings>,
    products: HashMap<String, Product>,
    customers: HashMap<String, Customer>,
    /// Insertion order is commit order.
    invoices: Vec<Invoice>,
    payments: Vec<Payment>,
    approved_users: Vec<ApprovedUser>,
}

impl MemoryState {
    fn sku_taken(&self, sku: Option<&str>, except_id: &str) -> bool {
        match sku {
            Some(sku) => self
                .products
                .values()
                .any(|p| p.id != except_id && p.sku.as_deref() == Some(sku)),
            None => false,
        }
    }

    fn highest_sequence(&self, prefix: &str) -> i64 {
        highest_sequence(prefix, self.invoices.iter().map(|i| i.invoice_number.as_str()))
    }

    fn invoice_mut(&mut self, id: &str) -> Option<&mut Invoice> {
        self.invoices.iter_mut().find(|i| i.id == id)
    }
}

/// [`BillingStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

fn by_name<T>(items: &mut [T], name: impl Fn(&T) -> (String, String)) {
    items.sort_by_cached_key(|item| name(item));
}

#[async_trait]
impl BillingStore for MemoryStore {
    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    async fn settings(&self) -> DbResult<Settings> {
        let state = self.state.lock().await;
        state
            .settings
            .clone()
            .ok_or_else(|| DbError::not_found("Settings", gstbill_core::SETTINGS_ID))
    }

    async fn ensure_settings(&self, defaults: &Settings) -> DbResult<Settings> {
        let mut state = self.state.lock().await;
        if state.settings.is_none() {
            debug!(state_code = %defaults.state_code, "Created settings row");
        }
        Ok(state.settings.get_or_insert_with(|| defaults.clone()).clone())
    }

    async fn update_settings(&self, settings: &Settings, next_invoice_number: Option<i64>) -> DbResult<Settings> {
        let mut state = self.state.lock().await;
        let counter = match state.settings.as_ref() {
            Some(stored) => stored.next_invoice_number,
            None => return Err(DbError::not_found("Settings", gstbill_core::SETTINGS_ID)),
        };

        let counter = match next_invoice_number {
            Some(requested) => {
                let highest = state.highest_sequence(&settings.invoice_prefix);
                if requested <= highest {
                    return Err(DbError::SequenceTaken {
                        prefix: settings.invoice_prefix.clone(),
                        requested,
                        highest,
                    });
                }
                requested
            }
            None => counter,
        };

        let stored = Settings {
            next_invoice_number: counter,
            ..settings.clone()
        };
        state.settings = Some(stored.clone());
        Ok(stored)
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    async fn list_products(&self) -> DbResult<Vec<Product>> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        by_name(&mut products, |p| (p.name.to_lowercase(), p.id.clone()));
        Ok(products)
    }

    async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(id).cloned())
    }

    async fn get_products(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }

    async fn insert_product(&self, product: &Product) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.products.contains_key(&product.id) {
            return Err(DbError::duplicate("products.id", &product.id));
        }
        if state.sku_taken(product.sku.as_deref(), &product.id) {
            return Err(DbError::duplicate("products.sku", product.sku.clone().unwrap_or_default()));
        }
        state.products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.sku_taken(product.sku.as_deref(), &product.id) {
            return Err(DbError::duplicate("products.sku", product.sku.clone().unwrap_or_default()));
        }
        let stored = state
            .products
            .get_mut(&product.id)
            .ok_or_else(|| DbError::not_found("Product", &product.id))?;
        let created_at = stored.created_at;
        *stored = Product {
            created_at,
            ..product.clone()
        };
        Ok(())
    }

    async fn delete_product(&self, id: &str) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.products.remove(id).is_none() {
            return Err(DbError::not_found("Product", id));
        }
        for item in state.invoices.iter_mut().flat_map(|i| i.items.iter_mut()) {
            if item.product_id.as_deref() == Some(id) {
                item.product_id = None;
            }
        }
        Ok(())
    }

    async fn low_stock_products(&self) -> DbResult<Vec<Product>> {
        let state = self.state.lock().await;
        let products: Vec<Product> = state.products.values().cloned().collect();
        Ok(low_stock(&products))
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    async fn list_customers(&self) -> DbResult<Vec<Customer>> {
        let state = self.state.lock().await;
        let mut customers: Vec<Customer> = state.customers.values().cloned().collect();
        by_name(&mut customers, |c| (c.name.to_lowercase(), c.id.clone()));
        Ok(customers)
    }

    async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>> {
        Ok(self.state.lock().await.customers.get(id).cloned())
    }

    async fn count_customers(&self) -> DbResult<u32> {
        Ok(self.state.lock().await.customers.len() as u32)
    }

    async fn insert_customer(&self, customer: &Customer) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.customers.contains_key(&customer.id) {
            return Err(DbError::duplicate("customers.id", &customer.id));
        }
        state.customers.insert(customer.id.clone(), customer.clone());
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .customers
            .get_mut(&customer.id)
            .ok_or_else(|| DbError::not_found("Customer", &customer.id))?;
        let created_at = stored.created_at;
        *stored = Customer {
            created_at,
            ..customer.clone()
        };
        Ok(())
    }

    async fn delete_customer(&self, id: &str) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.customers.remove(id).is_none() {
            return Err(DbError::not_found("Customer", id));
        }
        for invoice in state.invoices.iter_mut() {
            if invoice.customer_id.as_deref() == Some(id) {
                invoice.customer_id = None;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Invoices & payments
    // -------------------------------------------------------------------------

    async fn commit_invoice(&self, new: NewInvoice, policy: StockPolicy) -> DbResult<Invoice> {
        let mut state = self.state.lock().await;

        let (prefix, seq) = match state.settings.as_ref() {
            Some(settings) => (settings.invoice_prefix.clone(), settings.next_invoice_number),
            None => return Err(DbError::not_found("Settings", gstbill_core::SETTINGS_ID)),
        };

        let number = format_invoice_number(&prefix, seq);
        let seq = if state.invoices.iter().any(|i| i.invoice_number == number) {
            let highest = state.highest_sequence(&prefix);
            warn!(%number, highest, "Invoice counter behind issued numbers, skipping ahead");
            highest + 1
        } else {
            seq
        };

        let movements = new.stock_movements();
        let invoice = new.into_invoice(Uuid::new_v4().to_string(), &prefix, seq);

        // Nothing below can fail.
        if let Some(settings) = state.settings.as_mut() {
            settings.next_invoice_number = seq + 1;
            settings.updated_at = invoice.created_at;
        }
        for (product_id, sold) in &movements {
            if let Some(product) = state.products.get_mut(product_id) {
                product.stock = policy.apply(product.stock, *sold);
                product.updated_at = invoice.created_at;
            }
        }
        state.invoices.push(invoice.clone());

        info!(
            number = %invoice.invoice_number,
            grand_total = %invoice.grand_total,
            status = %invoice.status,
            lines = invoice.items.len(),
            "Invoice committed"
        );
        Ok(invoice)
    }

    async fn get_invoice(&self, id: &str) -> DbResult<Option<Invoice>> {
        let state = self.state.lock().await;
        Ok(state.invoices.iter().find(|i| i.id == id).cloned())
    }

    async fn list_invoices(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Invoice>> {
        let state = self.state.lock().await;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .iter()
            .filter(|i| i.invoice_date >= from && i.invoice_date <= to)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| {
            a.invoice_date
                .cmp(&b.invoice_date)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(invoices)
    }

    async fn recent_invoices(&self, limit: u32) -> DbResult<Vec<Invoice>> {
        let state = self.state.lock().await;
        let mut invoices = state.invoices.clone();
        invoices.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.invoice_number.cmp(&a.invoice_number))
        });
        invoices.truncate(limit as usize);
        Ok(invoices)
    }

    async fn total_outstanding(&self) -> DbResult<Money> {
        let state = self.state.lock().await;
        Ok(state.invoices.iter().map(|i| i.due_amount).sum())
    }

    async fn record_payment(&self, new: NewPayment) -> DbResult<(Invoice, Payment)> {
        let mut state = self.state.lock().await;

        let invoice = state
            .invoice_mut(&new.invoice_id)
            .ok_or_else(|| DbError::not_found("Invoice", &new.invoice_id))?;
        let next = PaymentState::of(invoice)
            .apply(new.amount, invoice.grand_total)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        invoice.paid_amount = next.paid_amount;
        invoice.due_amount = next.due_amount;
        invoice.status = next.status;
        invoice.updated_at = new.created_at;
        let invoice = invoice.clone();

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            invoice_id: new.invoice_id,
            amount: new.amount,
            payment_mode: new.payment_mode,
            payment_date: new.payment_date,
            notes: new.notes,
            created_at: new.created_at,
        };
        state.payments.push(payment.clone());

        info!(
            number = %invoice.invoice_number,
            amount = %payment.amount,
            due = %invoice.due_amount,
            status = %invoice.status,
            "Payment recorded"
        );
        Ok((invoice, payment))
    }

    async fn payments_for(&self, invoice_id: &str) -> DbResult<Vec<Payment>> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .iter()
            .filter(|p| p.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    // -------------------------------------------------------------------------
    // Approved users
    // -------------------------------------------------------------------------

    async fn list_approved_users(&self) -> DbResult<Vec<ApprovedUser>> {
        let state = self.state.lock().await;
        let mut users = state.approved_users.clone();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn find_approved_user(&self, email: &str) -> DbResult<Option<ApprovedUser>> {
        let state = self.state.lock().await;
        Ok(find_approved(&state.approved_users, email).cloned())
    }

    async fn insert_approved_user(&self, user: &ApprovedUser) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if find_approved(&state.approved_users, &user.email).is_some() {
            return Err(DbError::duplicate("approved_users.email", &user.email));
        }
        state.approved_users.push(ApprovedUser {
            email: normalize_email(&user.email),
            ..user.clone()
        });
        Ok(())
    }

    async fn delete_approved_user(&self, email: &str) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let normalized = normalize_email(email);
        let before = state.approved_users.len();
        state.approved_users.retain(|u| u.email != normalized);
        if state.approved_users.len() == before {
            return Err(DbError::not_found("Approved user", email));
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
