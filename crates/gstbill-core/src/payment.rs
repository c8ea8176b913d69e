//! # Payment State
//!
//! Derives paid / due / status for an invoice, at creation and after each
//! follow-up payment.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   save (credit)          save (cash, paid < grand)    save (cash)       │
//! │        │                          │                        │            │
//! │        ▼                          ▼                        ▼            │
//! │   ┌─────────┐  payment > 0   ┌─────────┐  paid ≥ grand ┌─────────┐     │
//! │   │ UNPAID  │ ─────────────► │ PARTIAL │ ────────────► │  PAID   │     │
//! │   └─────────┘                └─────────┘               └─────────┘     │
//! │        │                                                    ▲          │
//! │        └────────────────── paid ≥ grand ────────────────────┘          │
//! │                                                                         │
//! │   due = max(0, grand - paid) at every step                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus, PaymentMode};
use crate::MAX_AMOUNT_PAISE;

fn check_received(amount: Money) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "amount must be greater than zero".to_string(),
        });
    }
    if amount.paise() > MAX_AMOUNT_PAISE {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("amount must not exceed {} paise", MAX_AMOUNT_PAISE),
        });
    }
    Ok(())
}

/// Status from the paid amount against the grand total.
///
/// ```rust
/// use gstbill_core::money::Money;
/// use gstbill_core::payment::derive_status;
/// use gstbill_core::types::InvoiceStatus;
///
/// let grand = Money::from_rupees(1180);
/// assert_eq!(derive_status(Money::from_rupees(1180), grand), InvoiceStatus::Paid);
/// assert_eq!(derive_status(Money::from_rupees(500), grand), InvoiceStatus::Partial);
/// assert_eq!(derive_status(Money::zero(), grand), InvoiceStatus::Unpaid);
/// ```
pub fn derive_status(paid: Money, grand_total: Money) -> InvoiceStatus {
    if paid >= grand_total {
        InvoiceStatus::Paid
    } else if paid.is_positive() {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Unpaid
    }
}

/// Paid amount, due amount and status of one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentState {
    pub paid_amount: Money,
    pub due_amount: Money,
    pub status: InvoiceStatus,
}

impl PaymentState {
    fn derive(paid: Money, grand_total: Money) -> Self {
        PaymentState {
            paid_amount: paid,
            due_amount: (grand_total - paid).clamp_non_negative(),
            status: derive_status(paid, grand_total),
        }
    }

    /// State of a freshly saved invoice.
    ///
    /// Credit sales are fully outstanding whatever was requested. Otherwise
    /// an omitted amount means paid in full.
    pub fn at_creation(mode: PaymentMode, requested_paid: Option<Money>, grand_total: Money) -> CoreResult<Self> {
        if mode == PaymentMode::Credit {
            return Ok(PaymentState {
                paid_amount: Money::zero(),
                due_amount: grand_total.clamp_non_negative(),
                status: InvoiceStatus::Unpaid,
            });
        }

        let paid = requested_paid.unwrap_or(grand_total);
        if paid.is_negative() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "paid amount must not be negative".to_string(),
            });
        }
        if requested_paid.is_some() && paid.paise() > MAX_AMOUNT_PAISE {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!("paid amount must not exceed {} paise", MAX_AMOUNT_PAISE),
            });
        }
        Ok(Self::derive(paid, grand_total))
    }

    /// Current state of a stored invoice.
    pub fn of(invoice: &Invoice) -> Self {
        PaymentState {
            paid_amount: invoice.paid_amount,
            due_amount: invoice.due_amount,
            status: invoice.status,
        }
    }

    /// State after one more payment of `amount`.
    pub fn apply(&self, amount: Money, grand_total: Money) -> CoreResult<Self> {
        check_received(amount)?;
        let paid = self
            .paid_amount
            .checked_add(amount)
            .ok_or_else(|| CoreError::InvalidPaymentAmount {
                reason: "total paid is out of range".to_string(),
            })?;
        Ok(Self::derive(paid, grand_total))
    }
}

// =============================================================================
// Follow-up Payments
// =============================================================================

/// A payment as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentInput {
    pub amount: Money,
    pub payment_mode: PaymentMode,
    /// Defaults to today in the shop's time zone.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A validated payment ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub invoice_id: String,
    pub amount: Money,
    pub payment_mode: PaymentMode,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewPayment {
    /// Validates a client payment against an invoice id.
    ///
    /// Rejects non-positive or oversized amounts and the credit mode.
    pub fn from_input(
        invoice_id: impl Into<String>,
        input: PaymentInput,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> CoreResult<Self> {
        check_received(input.amount)?;
        if input.payment_mode == PaymentMode::Credit {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "credit is not a payment mode for a received payment".to_string(),
            });
        }

        let payment_date = input
            .payment_date
            .unwrap_or_else(|| now.with_timezone(&offset).date_naive());

        Ok(NewPayment {
            invoice_id: invoice_id.into(),
            amount: input.amount,
            payment_mode: input.payment_mode,
            payment_date,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            created_at: now,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
