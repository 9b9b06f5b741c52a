//! # Error Types
//!
//! Domain-specific error types for rxpos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rxpos-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  rxpos-db errors                                                       │
//! │  └── DbError          - Database failures (wraps CoreError)            │
//! │                                                                         │
//! │  rxpos-api errors                                                      │
//! │  └── ApiError         - HTTP status + { code, message }                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No batch of the product can satisfy the requested quantity.
    ///
    /// ## When This Occurs
    /// - Checkout line asks for more than the largest single batch holds
    /// - Transfer source batch is missing or holds too little
    /// - A conditional decrement lost a race with another transaction
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: Panadol × 12
    ///      │
    ///      ▼
    /// Batches in default inventory: [A: 5, B: 8]
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Panadol", available: 8, requested: 12 }
    ///      │
    ///      ▼
    /// Whole sale rolls back, cashier reduces quantity
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// The tenant has no default inventory to sell from or return into.
    #[error("Tenant {tenant_id} has no default inventory")]
    NoDefaultInventory { tenant_id: String },

    /// Refund requested for a sale that is not COMPLETED.
    #[error("Sale {sale_id} is {status} and cannot be refunded")]
    SaleNotRefundable { sale_id: String, status: String },

    /// A status change that the entity's state machine does not allow.
    ///
    /// ## When This Occurs
    /// - Approving a CANCELLED tenant
    /// - Receiving a purchase order twice
    /// - Suspending a tenant that is still PENDING
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// Owner and super-admin accounts cannot be disabled or re-roled by
    /// staff management.
    #[error("{role} account {username} cannot be changed this way")]
    ProtectedAccount { username: String, role: String },

    /// Cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidStatusTransition error from any displayable states.
    pub fn transition(
        entity: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        CoreError::InvalidStatusTransition {
            entity: entity.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A discount larger than the amount it applies to.
    #[error("{field} ({discount}) exceeds the amount it applies to ({amount})")]
    DiscountTooLarge {
        field: String,
        discount: i64,
        amount: i64,
    },

    /// Two fields that must differ are equal.
    #[error("{field} must differ from {other}")]
    MustDiffer { field: String, other: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product: "Panadol Extra".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Panadol Extra: available 3, requested 5"
        );
    }

    #[test]
    fn test_transition_helper() {
        let err = CoreError::transition("Tenant", "CANCELLED", "ACTIVE");
        assert_eq!(err.to_string(), "Tenant cannot move from CANCELLED to ACTIVE");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "reason".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: reason is required");
    }
}
