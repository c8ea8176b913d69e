//! # Validation Module
//!
//! Input validation for catalog, customer, settings and invoice data.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP boundary (axum Json extractor)                          │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── Money / Quantity / enum parsing                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: business rule validation                        │
//! │  ├── GSTIN, state code, HSN, email formats                             │
//! │  └── Non-negative prices, positive quantities, GST ≤ 100%              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (sku, invoice_number, approved email)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validators that normalize (trim, uppercase) return the cleaned value.

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{CustomerInput, ProductInput, SettingsUpdate, TaxRate};
use crate::{MAX_AMOUNT_PAISE, MAX_INVOICE_LINES, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_PREFIX_LEN: usize = 20;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required display name (product, customer, shop).
///
/// Returns the trimmed name.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates a SKU.
///
/// ## Rules
/// - 1 to 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ```rust
/// use gstbill_core::validation::validate_sku;
///
/// assert!(validate_sku("RICE-5KG").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::invalid_format(
            "sku",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates and normalizes a GSTIN.
///
/// ## Format
/// ```text
/// 27 ABCDE1234F 1 Z 5
/// ── ────────── ─ ─ ─
/// │      │      │ │ └── checksum character
/// │      │      │ └──── always 'Z'
/// │      │      └────── entity number
/// │      └───────────── PAN of the holder
/// └──────────────────── state code
/// ```
///
/// The checksum character is not verified.
///
/// ```rust
/// use gstbill_core::validation::validate_gstin;
///
/// assert_eq!(validate_gstin(" 27abcde1234f1z5 ").unwrap(), "27ABCDE1234F1Z5");
/// assert!(validate_gstin("27ABCDE1234F1Z").is_err());
/// ```
pub fn validate_gstin(gstin: &str) -> ValidationResult<String> {
    let gstin = gstin.trim().to_uppercase();

    if gstin.len() != 15 || !gstin.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::invalid_format(
            "gstin",
            "must be 15 letters or digits",
        ));
    }

    validate_state_code(&gstin[..2]).map_err(|_| {
        ValidationError::invalid_format("gstin", "must start with a two-digit state code")
    })?;

    let pan = &gstin[2..12];
    let pan_ok = pan[..5].chars().all(|c| c.is_ascii_alphabetic())
        && pan[5..9].chars().all(|c| c.is_ascii_digit())
        && pan[9..].chars().all(|c| c.is_ascii_alphabetic());
    if !pan_ok {
        return Err(ValidationError::invalid_format(
            "gstin",
            "characters 3-12 must be a PAN (AAAAA9999A)",
        ));
    }

    if &gstin[13..14] != "Z" {
        return Err(ValidationError::invalid_format("gstin", "14th character must be 'Z'"));
    }

    Ok(gstin)
}

/// Validates a two-digit GST state code ("01".."99").
pub fn validate_state_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_digit()) || code == "00" {
        return Err(ValidationError::invalid_format(
            "state_code",
            "must be two digits between 01 and 99",
        ));
    }
    Ok(())
}

/// Validates an HSN/SAC code: 2 to 8 digits.
pub fn validate_hsn_code(hsn: &str) -> ValidationResult<()> {
    let hsn = hsn.trim();
    if !(2..=8).contains(&hsn.len()) || !hsn.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format("hsn_code", "must be 2 to 8 digits"));
    }
    Ok(())
}

/// Validates an invoice number prefix.
pub fn validate_invoice_prefix(prefix: &str) -> ValidationResult<()> {
    let prefix = prefix.trim();

    if prefix.is_empty() {
        return Err(ValidationError::required("invoice_prefix"));
    }

    if prefix.len() > MAX_PREFIX_LEN {
        return Err(ValidationError::TooLong {
            field: "invoice_prefix".to_string(),
            max: MAX_PREFIX_LEN,
        });
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '/' || c == '_') {
        return Err(ValidationError::invalid_format(
            "invoice_prefix",
            "must contain only letters, numbers, '/' and '_'",
        ));
    }

    Ok(())
}

/// Loose email shape check: `local@domain.tld`.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::invalid_format("email", "must look like name@example.com"));
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a money field that may be zero but not negative.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::negative(field));
    }
    Ok(())
}

/// Validates an entered amount: zero up to [`MAX_AMOUNT_PAISE`].
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    validate_non_negative(field, amount)?;
    if amount.paise() > MAX_AMOUNT_PAISE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_PAISE,
        });
    }
    Ok(())
}

/// Validates a sold quantity: above zero, at most [`MAX_ITEM_QUANTITY`] units.
pub fn validate_quantity(qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > Quantity::from_units(MAX_ITEM_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a GST rate: 0% to 100%.
///
/// ```rust
/// use gstbill_core::types::TaxRate;
/// use gstbill_core::validation::validate_tax_rate;
///
/// assert!(validate_tax_rate(TaxRate::from_bps(2800)).is_ok());
/// assert!(validate_tax_rate(TaxRate::from_bps(10_001)).is_err());
/// ```
pub fn validate_tax_rate(rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > TaxRate::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: "gst_rate".to_string(),
            min: 0,
            max: TaxRate::MAX_BPS as i64,
        });
    }
    Ok(())
}

/// Validates the number of lines on one invoice.
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines > MAX_INVOICE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_INVOICE_LINES as i64,
        });
    }
    Ok(())
}

/// Validates an inclusive date range.
pub fn validate_date_range(from: NaiveDate, to: NaiveDate) -> ValidationResult<()> {
    if from > to {
        return Err(ValidationError::invalid_format(
            "date range",
            format!("from ({}) is after to ({})", from, to),
        ));
    }
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Validates a product input, returning it with trimmed optional fields.
pub fn validate_product_input(input: ProductInput) -> ValidationResult<ProductInput> {
    let name = validate_name("name", &input.name)?;
    let sku = clean_optional(input.sku);
    if let Some(sku) = &sku {
        validate_sku(sku)?;
    }
    let hsn_code = clean_optional(input.hsn_code);
    if let Some(hsn) = &hsn_code {
        validate_hsn_code(hsn)?;
    }
    validate_tax_rate(input.gst_rate)?;
    validate_amount("purchase_price", input.purchase_price)?;
    validate_amount("selling_price", input.selling_price)?;
    if input.low_stock_alert.is_negative() {
        return Err(ValidationError::negative("low_stock_alert"));
    }

    Ok(ProductInput {
        name,
        sku,
        hsn_code,
        unit: clean_optional(input.unit),
        ..input
    })
}

/// Validates a customer input. A GSTIN is normalized to uppercase.
pub fn validate_customer_input(input: CustomerInput) -> ValidationResult<CustomerInput> {
    let name = validate_name("name", &input.name)?;
    let gstin = match clean_optional(input.gstin) {
        Some(g) => Some(validate_gstin(&g)?),
        None => None,
    };
    let state_code = clean_optional(input.state_code);
    if let Some(code) = &state_code {
        validate_state_code(code)?;
    }
    let email = clean_optional(input.email);
    if let Some(email) = &email {
        validate_email(email)?;
    }

    Ok(CustomerInput {
        name,
        phone: clean_optional(input.phone),
        gstin,
        address: clean_optional(input.address),
        email,
        state_code,
    })
}

/// Validates a settings update.
pub fn validate_settings_update(update: SettingsUpdate) -> ValidationResult<SettingsUpdate> {
    let shop_name = validate_name("shop_name", &update.shop_name)?;
    validate_state_code(&update.state_code)?;
    let state_name = validate_name("state_name", &update.state_name)?;
    validate_invoice_prefix(&update.invoice_prefix)?;
    if let Some(next) = update.next_invoice_number {
        if next < 1 {
            return Err(ValidationError::MustBePositive {
                field: "next_invoice_number".to_string(),
            });
        }
    }
    let gstin = match clean_optional(update.gstin) {
        Some(g) => Some(validate_gstin(&g)?),
        None => None,
    };
    let email = clean_optional(update.email);
    if let Some(email) = &email {
        validate_email(email)?;
    }

    Ok(SettingsUpdate {
        shop_name,
        state_code: update.state_code.trim().to_string(),
        state_name,
        invoice_prefix: update.invoice_prefix.trim().to_string(),
        gstin,
        email,
        ..update
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            sku: None,
            hsn_code: None,
            gst_rate: TaxRate::from_bps(1800),
            purchase_price: Money::from_rupees(80),
            selling_price: Money::from_rupees(100),
            stock: Quantity::from_units(10),
            low_stock_alert: Quantity::from_units(2),
            unit: None,
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("ATTA-10KG").is_ok());
        assert!(validate_sku("item_1").is_ok());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_gstin() {
        assert_eq!(validate_gstin("29ABCDE1234F1Z5").unwrap(), "29ABCDE1234F1Z5");
        assert!(validate_gstin("").is_err());
        assert!(validate_gstin("XXABCDE1234F1Z5").is_err());
        assert!(validate_gstin("29ABCDE12345FZ5").is_err());
        assert!(validate_gstin("29ABCDE1234F1Y5").is_err());
    }

    #[test]
    fn test_validate_state_code() {
        assert!(validate_state_code("27").is_ok());
        assert!(validate_state_code("07").is_ok());
        assert!(validate_state_code("00").is_err());
        assert!(validate_state_code("7").is_err());
        assert!(validate_state_code("MH").is_err());
    }

    #[test]
    fn test_validate_hsn_code() {
        assert!(validate_hsn_code("1006").is_ok());
        assert!(validate_hsn_code("998314").is_ok());
        assert!(validate_hsn_code("1").is_err());
        assert!(validate_hsn_code("10a6").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("owner@shop.in").is_ok());
        assert!(validate_email("owner@shop").is_err());
        assert!(validate_email("@shop.in").is_err());
        assert!(validate_email("a b@shop.in").is_err());
    }

    #[test]
    fn test_validate_tax_rate_bounds() {
        assert!(validate_tax_rate(TaxRate::zero()).is_ok());
        assert!(validate_tax_rate(TaxRate::from_bps(10_000)).is_ok());
        assert!(matches!(
            validate_tax_rate(TaxRate::from_bps(12_000)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_product_input_trims() {
        let mut input = product("  Basmati Rice 5kg ");
        input.sku = Some("  ".into());
        input.hsn_code = Some(" 1006 ".into());
        let cleaned = validate_product_input(input).unwrap();
        assert_eq!(cleaned.name, "Basmati Rice 5kg");
        assert_eq!(cleaned.sku, None);
        assert_eq!(cleaned.hsn_code.as_deref(), Some("1006"));
    }

    #[test]
    fn test_validate_product_input_rejects_bad_prices() {
        let mut input = product("Soap");
        input.selling_price = Money::from_paise(-1);
        assert!(matches!(
            validate_product_input(input),
            Err(ValidationError::Negative { .. })
        ));

        let mut input = product("Soap");
        input.gst_rate = TaxRate::from_bps(10_001);
        assert!(validate_product_input(input).is_err());
    }

    #[test]
    fn test_validate_customer_input() {
        let input = CustomerInput {
            name: "Sharma Stores".into(),
            phone: Some("9876543210".into()),
            gstin: Some("27aaapl1234c1z5".into()),
            address: None,
            email: None,
            state_code: Some("27".into()),
        };
        let cleaned = validate_customer_input(input).unwrap();
        assert_eq!(cleaned.gstin.as_deref(), Some("27AAAPL1234C1Z5"));

        let missing_name = CustomerInput {
            name: " ".into(),
            phone: None,
            gstin: None,
            address: None,
            email: None,
            state_code: None,
        };
        assert!(matches!(
            validate_customer_input(missing_name),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_date_range() {
        let d1 = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
        assert!(validate_date_range(d1, d2).is_ok());
        assert!(validate_date_range(d1, d1).is_ok());
        assert!(validate_date_range(d2, d1).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(MAX_INVOICE_LINES).is_ok());
        assert!(validate_line_count(MAX_INVOICE_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_quantity_bounds() {
        assert!(validate_quantity(Quantity::from_milli(1)).is_ok());
        assert!(validate_quantity(Quantity::from_units(MAX_ITEM_QUANTITY)).is_ok());
        assert!(matches!(
            validate_quantity(Quantity::from_milli(MAX_ITEM_QUANTITY * 1000 + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_quantity(Quantity::zero()),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_amount_bounds() {
        assert!(validate_amount("rate", Money::zero()).is_ok());
        assert!(validate_amount("rate", Money::from_paise(MAX_AMOUNT_PAISE)).is_ok());
        assert!(matches!(
            validate_amount("rate", Money::from_paise(MAX_AMOUNT_PAISE + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_amount("rate", Money::from_paise(-1)),
            Err(ValidationError::Negative { .. })
        ));

        let mut input = product("Gold Bar");
        input.selling_price = Money::from_paise(i64::MAX);
        assert!(validate_product_input(input).is_err());
    }
}
