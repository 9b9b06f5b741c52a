//! # Validation Module
//!
//! Input rules shared by the HTTP layer and the repositories.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request body (serde)                                         │
//! │  └── Shape and types                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Lengths, ranges, formats                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── CHECK (quantity >= 0)                                             │
//! │  ├── UNIQUE (tenant_id, barcode) ...                                   │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rxpos_core::validation::{validate_length, validate_quantity};
//!
//! validate_length("pharmacy_name", "Nile Pharmacy", 2, 200).unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_MONEY_CENTS, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Checks the trimmed length of a required string.
///
/// ## Example
/// ```rust
/// use rxpos_core::validation::validate_length;
///
/// assert!(validate_length("city", "Giza", 2, 100).is_ok());
/// assert!(validate_length("city", " ", 2, 100).is_err());
/// assert!(validate_length("city", "G", 2, 100).is_err());
/// ```
pub fn validate_length(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Same as [`validate_length`] but accepts `None`.
pub fn validate_optional_length(
    field: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> ValidationResult<()> {
    match value {
        Some(v) => validate_length(field, v, min, max),
        None => Ok(()),
    }
}

/// Minimal structural e-mail check: one `@`, non-empty local part, a dot
/// in the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.contains(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(())
}

/// Usernames are global across tenants.
///
/// ## Rules
/// - 3 to 50 characters
/// - letters, digits, `.`, `_` and `-`
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_length("username", username, 3, 50)?;

    if !username
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < 6 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        });
    }
    if password.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }
    Ok(())
}

/// Validates a SKU or barcode.
///
/// ## Rules
/// - 1 to 50 characters
/// - letters, digits, hyphens, underscores
///
/// ## Example
/// ```rust
/// use rxpos_core::validation::validate_code;
///
/// assert!(validate_code("barcode", "6221000000017").is_ok());
/// assert!(validate_code("sku", "PRD-7K2QZ1").is_ok());
/// assert!(validate_code("sku", "has space").is_err());
/// ```
pub fn validate_code(field: &str, code: &str) -> ValidationResult<()> {
    validate_length(field, code, 1, 50)?;

    if !code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or stock-operation quantity: 1 to 999.
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

/// Units moved by one stock operation: 1 to `MAX_STOCK_QUANTITY`.
///
/// Stock received or transferred can exceed a single cart line.
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    validate_stock_level("quantity", qty)
}

/// A count that may be zero: a counted batch quantity, a received
/// quantity, a reorder threshold.
pub fn validate_stock_level(field: &str, qty: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_STOCK_QUANTITY,
        });
    }
    Ok(())
}

/// Money amounts that may be zero: 0 to `MAX_MONEY_CENTS`.
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_money_ceiling(field, cents)
}

pub fn validate_positive_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    validate_money_ceiling(field, cents)
}

fn validate_money_ceiling(field: &str, cents: i64) -> ValidationResult<()> {
    if cents > MAX_MONEY_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_MONEY_CENTS,
        });
    }
    Ok(())
}

/// Batch (lot) keys, after blank input has become `"DEFAULT"`.
pub fn validate_batch_number(batch: &str) -> ValidationResult<()> {
    validate_length("batch_number", batch, 1, 50)
}

/// Tax rate in basis points: 0 to 10000.
pub fn validate_tax_rate_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=10_000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use rxpos_core::validation::validate_uuid;
///
/// assert!(validate_uuid("product_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("product_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Rejects a transfer whose source and destination are the same.
pub fn validate_distinct(field: &str, value: &str, other_field: &str, other: &str) -> ValidationResult<()> {
    if value == other {
        return Err(ValidationError::MustDiffer {
            field: field.to_string(),
            other: other_field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
