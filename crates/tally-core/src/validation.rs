//! # Validation Module
//!
//! Input validation for catalog records and sale requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web client                                                   │
//! │  └── Immediate user feedback (out of scope here)                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Server handler (Rust)                                        │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: field rules, run before any store access             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  └── UNIQUE (email)                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{CustomerPatch, CustomerProfile, NewProduct, ProductPatch, SaleEdit};
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;
const MAX_PHONE_LEN: usize = 30;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_product_name;
///
/// assert!(validate_product_name("A5 Notebook").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name)
}

/// Validates a customer name.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_name("customer name", name)
}

fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::too_long(field, MAX_NAME_LEN));
    }

    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Required
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot that is neither first nor last
/// - No whitespace
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::too_long("email", MAX_EMAIL_LEN));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid_format("email", "must not contain spaces"));
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => {
            return Err(ValidationError::invalid_format(
                "email",
                "must contain exactly one '@'",
            ))
        }
    };

    let domain_ok = domain
        .find('.')
        .map(|i| i > 0 && !domain.ends_with('.'))
        .unwrap_or(false);

    if local.is_empty() || !domain_ok {
        return Err(ValidationError::invalid_format(
            "email",
            "must look like name@example.com",
        ));
    }

    Ok(())
}

/// Validates a phone number.
///
/// Digits plus `+ - ( ) .` and spaces; at least one digit.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::required("phone"));
    }

    if phone.len() > MAX_PHONE_LEN {
        return Err(ValidationError::too_long("phone", MAX_PHONE_LEN));
    }

    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' ');
    if !phone.chars().all(allowed) || !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "phone",
            "must contain digits and only + - ( ) . separators",
        ));
    }

    Ok(())
}

/// Validates an opaque identifier reference.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in minor units. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    non_negative("price", cents)
}

/// Validates a stock level.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    non_negative("stock", stock)
}

/// Validates a sale total in minor units.
pub fn validate_total_cents(cents: i64) -> ValidationResult<()> {
    non_negative("totalAmount", cents)
}

fn non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates the number of lines in a sale.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    if count > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_stock(product.stock)
}

pub fn validate_product_patch(patch: &ProductPatch) -> ValidationResult<()> {
    if let Some(name) = &patch.name {
        validate_product_name(name)?;
    }
    if let Some(price) = patch.price_cents {
        validate_price_cents(price)?;
    }
    if let Some(stock) = patch.stock {
        validate_stock(stock)?;
    }
    Ok(())
}

pub fn validate_customer_profile(profile: &CustomerProfile) -> ValidationResult<()> {
    validate_customer_name(&profile.name)?;
    validate_email(&profile.email)?;
    validate_phone(&profile.phone)
}

pub fn validate_customer_patch(patch: &CustomerPatch) -> ValidationResult<()> {
    if let Some(name) = &patch.name {
        validate_customer_name(name)?;
    }
    if let Some(email) = &patch.email {
        validate_email(email)?;
    }
    if let Some(phone) = &patch.phone {
        validate_phone(phone)?;
    }
    Ok(())
}

pub fn validate_sale_edit(edit: &SaleEdit) -> ValidationResult<()> {
    if let Some(name) = &edit.customer_name {
        validate_customer_name(name)?;
    }
    if let Some(email) = &edit.customer_email {
        validate_email(email)?;
    }
    if let Some(phone) = &edit.customer_phone {
        validate_phone(phone)?;
    }
    if let Some(total) = edit.total_amount_cents {
        validate_total_cents(total)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
