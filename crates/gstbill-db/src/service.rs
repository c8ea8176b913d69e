//! # Billing Service
//!
//! Orchestrates the pure engine in `gstbill-core` against a [`BillingStore`].
//!
//! ## Save Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save_invoice(draft)                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  price(draft)                                                           │
//! │   ├── store.settings()          ← shop state, prefix, POS codes         │
//! │   ├── store.get_products(ids)   ← catalog snapshot for the lines        │
//! │   ├── store.get_customer(id)    ← when an existing customer is chosen   │
//! │   └── build_invoice(draft, ctx) ← pure: tax, totals, payment state      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  store.commit_invoice(new, policy)   (atomic: number + rows + stock)    │
//! │       │                                                                 │
//! │       ├── Ok(invoice)                                                   │
//! │       ├── Err(retryable) && attempts left ──► warn!, commit again       │
//! │       └── Err(other) ──► surface                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::store::BillingStore;
use gstbill_core::auth::ApproveUserInput;
use gstbill_core::invoice::{build_invoice, PricingContext};
use gstbill_core::pos::{build_pos_export, PosExport};
use gstbill_core::report::{Dashboard, SalesReport};
use gstbill_core::validation::{
    validate_customer_input, validate_date_range, validate_email, validate_product_input, validate_settings_update,
};
use gstbill_core::{
    ApprovedUser, CoreError, Customer, CustomerInput, Invoice, InvoiceDraft, NewInvoice, NewPayment, Payment,
    PaymentInput, Principal, Product, ProductInput, Settings, SettingsUpdate, StockPolicy, ValidationError,
    DEFAULT_UNIT,
};

/// India Standard Time, UTC+05:30.
pub const IST_OFFSET_MINUTES: i32 = 330;

/// Default number of commit attempts before a retryable error surfaces.
pub const DEFAULT_COMMIT_ATTEMPTS: u32 = 3;

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced by [`BillingService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Validation, business-rule or authorization failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure.
    #[error(transparent)]
    Persistence(#[from] DbError),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(err.into())
    }
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            ServiceError::Core(e) => e.is_not_found(),
            ServiceError::Persistence(e) => e.is_not_found(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Maps a store `NotFound` to the domain error for `id`.
fn or_not_found(err: DbError, not_found: impl FnOnce() -> CoreError) -> ServiceError {
    if err.is_not_found() {
        ServiceError::Core(not_found())
    } else {
        ServiceError::Persistence(err)
    }
}

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    pub stock_policy: StockPolicy,
    /// The shop's local time zone; invoice dates and receipt times use it.
    pub utc_offset: FixedOffset,
    pub max_commit_attempts: u32,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        ServiceOptions {
            stock_policy: StockPolicy::default(),
            utc_offset: ist_offset(),
            max_commit_attempts: DEFAULT_COMMIT_ATTEMPTS,
        }
    }
}

/// A fixed offset east of UTC, `None` outside ±24h.
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

fn ist_offset() -> FixedOffset {
    offset_from_minutes(IST_OFFSET_MINUTES).unwrap_or_else(|| Utc.fix())
}

// =============================================================================
// Views
// =============================================================================

/// An invoice together with its follow-up payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub payments: Vec<Payment>,
}

// =============================================================================
// Service
// =============================================================================

/// The billing back-end's single entry point.
///
/// Cheap to clone; handlers share one instance.
#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn BillingStore>,
    options: ServiceOptions,
}

impl BillingService {
    pub fn new(store: Arc<dyn BillingStore>, options: ServiceOptions) -> Self {
        BillingService { store, options }
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Creates the settings row from `defaults` if there is none yet.
    pub async fn initialize(&self, defaults: &Settings) -> ServiceResult<Settings> {
        let settings = self.store.ensure_settings(defaults).await?;
        info!(
            shop = %settings.shop_name,
            state_code = %settings.state_code,
            next_invoice_number = settings.next_invoice_number,
            "Billing service ready"
        );
        Ok(settings)
    }

    /// Today's date in the shop's time zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.options.utc_offset).date_naive()
    }

    pub async fn health_check(&self) -> bool {
        self.store.health_check().await
    }

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    /// Prices a draft against the current settings and catalog without
    /// storing anything.
    pub async fn preview_invoice(&self, draft: &InvoiceDraft) -> ServiceResult<NewInvoice> {
        self.price(draft, Utc::now()).await
    }

    /// Prices and commits a draft.
    ///
    /// ## Returns
    /// The stored invoice, numbered and with stock already decremented.
    pub async fn save_invoice(&self, draft: &InvoiceDraft) -> ServiceResult<Invoice> {
        let priced = self.price(draft, Utc::now()).await?;
        let attempts = self.options.max_commit_attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.store.commit_invoice(priced.clone(), self.options.stock_policy).await {
                Ok(invoice) => return Ok(invoice),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(attempt, max_attempts = attempts, error = %e, "Invoice commit failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn price(&self, draft: &InvoiceDraft, now: DateTime<Utc>) -> ServiceResult<NewInvoice> {
        let settings = self.store.settings().await?;

        let mut ids: Vec<String> = draft.items.iter().filter_map(|l| l.product_id.clone()).collect();
        ids.sort();
        ids.dedup();
        let products: HashMap<String, Product> = self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let customer = match draft.customer.customer_id() {
            Some(id) => self.store.get_customer(id).await?,
            None => None,
        };

        debug!(lines = draft.items.len(), products = products.len(), "Pricing invoice draft");

        let priced = build_invoice(
            draft,
            PricingContext {
                settings: &settings,
                products: &products,
                customer: customer.as_ref(),
                now,
                offset: self.options.utc_offset,
            },
        )?;
        Ok(priced)
    }

    /// Appends a follow-up payment to an invoice.
    pub async fn record_payment(&self, invoice_id: &str, input: PaymentInput) -> ServiceResult<(Invoice, Payment)> {
        let new = NewPayment::from_input(invoice_id, input, Utc::now(), self.options.utc_offset)?;
        self.store
            .record_payment(new)
            .await
            .map_err(|e| or_not_found(e, || CoreError::InvoiceNotFound(invoice_id.to_string())))
    }

    pub async fn get_invoice(&self, id: &str) -> ServiceResult<InvoiceDetail> {
        let invoice = self
            .store
            .get_invoice(id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;
        let payments = self.store.payments_for(id).await?;
        Ok(InvoiceDetail { invoice, payments })
    }

    pub async fn list_invoices(&self, from: NaiveDate, to: NaiveDate) -> ServiceResult<Vec<Invoice>> {
        validate_date_range(from, to)?;
        Ok(self.store.list_invoices(from, to).await?)
    }

    pub async fn recent_invoices(&self, limit: u32) -> ServiceResult<Vec<Invoice>> {
        Ok(self.store.recent_invoices(limit).await?)
    }

    pub async fn payments_for(&self, invoice_id: &str) -> ServiceResult<Vec<Payment>> {
        Ok(self.store.payments_for(invoice_id).await?)
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    pub async fn settings(&self) -> ServiceResult<Settings> {
        Ok(self.store.settings().await?)
    }

    /// Admin only.
    pub async fn update_settings(&self, update: SettingsUpdate, principal: &Principal) -> ServiceResult<Settings> {
        principal.require_admin("update settings")?;
        let update = validate_settings_update(update)?;

        let next_invoice_number = update.next_invoice_number;
        let mut settings = self.store.settings().await?;
        settings.apply(update, Utc::now());

        let stored = self
            .store
            .update_settings(&settings, next_invoice_number)
            .await
            .map_err(|err| match err {
                DbError::SequenceTaken { prefix, highest, .. } => ServiceError::from(ValidationError::InvalidFormat {
                    field: "next_invoice_number".to_string(),
                    reason: format!("must be greater than {}, the last number issued under {}", highest, prefix),
                }),
                other => ServiceError::Persistence(other),
            })?;

        info!(
            by = %principal.email,
            prefix = %stored.invoice_prefix,
            next_invoice_number = stored.next_invoice_number,
            "Settings updated"
        );
        Ok(stored)
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    pub async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    pub async fn get_product(&self, id: &str) -> ServiceResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    pub async fn create_product(&self, input: ProductInput) -> ServiceResult<Product> {
        let input = validate_product_input(input)?;
        let now = Utc::now();
        let product = product_from_input(Uuid::new_v4().to_string(), input, now, now);
        self.store.insert_product(&product).await?;
        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: &str, input: ProductInput) -> ServiceResult<Product> {
        let input = validate_product_input(input)?;
        let existing = self.get_product(id).await?;
        let product = product_from_input(existing.id, input, existing.created_at, Utc::now());
        self.store
            .update_product(&product)
            .await
            .map_err(|e| or_not_found(e, || CoreError::ProductNotFound(id.to_string())))?;
        Ok(product)
    }

    pub async fn delete_product(&self, id: &str) -> ServiceResult<()> {
        self.store
            .delete_product(id)
            .await
            .map_err(|e| or_not_found(e, || CoreError::ProductNotFound(id.to_string())))
    }

    pub async fn low_stock(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.store.low_stock_products().await?)
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    pub async fn list_customers(&self) -> ServiceResult<Vec<Customer>> {
        Ok(self.store.list_customers().await?)
    }

    pub async fn get_customer(&self, id: &str) -> ServiceResult<Customer> {
        self.store
            .get_customer(id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()).into())
    }

    pub async fn create_customer(&self, input: CustomerInput) -> ServiceResult<Customer> {
        let input = validate_customer_input(input)?;
        let now = Utc::now();
        let customer = customer_from_input(Uuid::new_v4().to_string(), input, now, now);
        self.store.insert_customer(&customer).await?;
        info!(id = %customer.id, name = %customer.name, "Customer created");
        Ok(customer)
    }

    pub async fn update_customer(&self, id: &str, input: CustomerInput) -> ServiceResult<Customer> {
        let input = validate_customer_input(input)?;
        let existing = self.get_customer(id).await?;
        let customer = customer_from_input(existing.id, input, existing.created_at, Utc::now());
        self.store
            .update_customer(&customer)
            .await
            .map_err(|e| or_not_found(e, || CoreError::CustomerNotFound(id.to_string())))?;
        Ok(customer)
    }

    pub async fn delete_customer(&self, id: &str) -> ServiceResult<()> {
        self.store
            .delete_customer(id)
            .await
            .map_err(|e| or_not_found(e, || CoreError::CustomerNotFound(id.to_string())))
    }

    // -------------------------------------------------------------------------
    // Reports
    // -------------------------------------------------------------------------

    pub async fn sales_report(&self, from: NaiveDate, to: NaiveDate) -> ServiceResult<SalesReport> {
        let invoices = self.list_invoices(from, to).await?;
        Ok(SalesReport::build(from, to, &invoices))
    }

    pub async fn dashboard(&self, today: NaiveDate) -> ServiceResult<Dashboard> {
        let today_invoices = self.store.list_invoices(today, today).await?;
        let receivables = self.store.total_outstanding().await?;
        let products = self.store.list_products().await?;
        let customer_count = self.store.count_customers().await?;
        Ok(Dashboard::build(today, &today_invoices, receivables, &products, customer_count))
    }

    /// The POS-aggregator document for invoices dated `from..=to`.
    pub async fn pos_export(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        generated_at: DateTime<Utc>,
    ) -> ServiceResult<PosExport> {
        let invoices = self.list_invoices(from, to).await?;
        let export = build_pos_export(&invoices, from, to, generated_at, self.options.utc_offset);
        debug!(%from, %to, transactions = export.transactions.len(), "Built POS export");
        Ok(export)
    }

    // -------------------------------------------------------------------------
    // Approved users
    // -------------------------------------------------------------------------

    /// Admin only.
    pub async fn list_approved_users(&self, principal: &Principal) -> ServiceResult<Vec<ApprovedUser>> {
        principal.require_admin("list approved users")?;
        Ok(self.store.list_approved_users().await?)
    }

    /// Admin only.
    pub async fn approve_user(&self, input: ApproveUserInput, principal: &Principal) -> ServiceResult<ApprovedUser> {
        principal.require_admin("approve users")?;
        self.add_approved_user(input).await
    }

    /// Admin only.
    pub async fn revoke_user(&self, email: &str, principal: &Principal) -> ServiceResult<()> {
        principal.require_admin("revoke users")?;
        self.store.delete_approved_user(email).await?;
        info!(by = %principal.email, email = %email, "User revoked");
        Ok(())
    }

    /// The login gate: the allowlist entry for `email`, if any.
    pub async fn check_approved(&self, email: &str) -> ServiceResult<Option<ApprovedUser>> {
        Ok(self.store.find_approved_user(email).await?)
    }

    /// Adds an allowlist entry without an authorization check. Used to
    /// bootstrap the first admin.
    pub async fn add_approved_user(&self, input: ApproveUserInput) -> ServiceResult<ApprovedUser> {
        let email = gstbill_core::auth::normalize_email(&input.email);
        validate_email(&email)?;

        let user = ApprovedUser {
            id: Uuid::new_v4().to_string(),
            email,
            role: input.role,
            created_at: Utc::now(),
        };
        self.store.insert_approved_user(&user).await?;
        info!(email = %user.email, role = %user.role, "User approved");
        Ok(user)
    }
}

fn product_from_input(id: String, input: ProductInput, created_at: DateTime<Utc>, now: DateTime<Utc>) -> Product {
    Product {
        id,
        name: input.name,
        sku: input.sku,
        hsn_code: input.hsn_code,
        gst_rate: input.gst_rate,
        purchase_price: input.purchase_price,
        selling_price: input.selling_price,
        stock: input.stock,
        low_stock_alert: input.low_stock_alert,
        unit: input.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        created_at,
        updated_at: now,
    }
}

fn customer_from_input(id: String, input: CustomerInput, created_at: DateTime<Utc>, now: DateTime<Utc>) -> Customer {
    Customer {
        id,
        name: input.name,
        phone: input.phone,
        gstin: input.gstin,
        address: input.address,
        email: input.email,
        state_code: input.state_code,
        created_at,
        updated_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
