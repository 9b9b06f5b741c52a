//! Sales and sale lines.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
///
/// ## Transitions
/// ```text
/// PENDING ──► COMPLETED ──► REFUNDED   (terminal)
///    │            │
///    └────────────┴───────► CANCELLED  (terminal)
/// ```
/// Checkout writes COMPLETED directly; PENDING and CANCELLED exist for
/// completeness and no operation produces them today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Pending,
    #[default]
    Completed,
    Refunded,
    Cancelled,
}

impl SaleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "PENDING",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Refunded => "REFUNDED",
            SaleStatus::Cancelled => "CANCELLED",
        }
    }

    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Refunded | SaleStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: SaleStatus) -> bool {
        use SaleStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Cancelled) | (Completed, Refunded) | (Completed, Cancelled)
        )
    }

    #[inline]
    pub fn is_refundable(&self) -> bool {
        self.can_transition_to(SaleStatus::Refunded)
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    MobileWallet,
    /// Charged to the customer's running balance.
    Credit,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::MobileWallet => "MOBILE_WALLET",
            PaymentMethod::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A persisted checkout.
///
/// Monetary fields are frozen at creation; only `status` and `notes`
/// change afterwards (via refund).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub invoice_number: String,
    pub customer_id: Option<String>,
    pub user_id: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub change_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub prescription_number: Option<String>,
    pub doctor_name: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Amount charged to the customer's balance by this sale.
    ///
    /// Zero unless the sale was paid on credit.
    pub fn credit_amount(&self) -> Money {
        if self.payment_method == PaymentMethod::Credit {
            Money::from_cents(self.total_cents - self.paid_cents)
        } else {
            Money::zero()
        }
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a sale, with the batch it was drawn from.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    /// `unit_price × quantity − discount`, before tax.
    pub line_total_cents: i64,
    pub batch_number: String,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_completed_is_refundable() {
        assert!(SaleStatus::Completed.is_refundable());
        assert!(!SaleStatus::Refunded.is_refundable());
        assert!(!SaleStatus::Cancelled.is_refundable());
        assert!(!SaleStatus::Pending.is_refundable());
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for next in [
            SaleStatus::Pending,
            SaleStatus::Completed,
            SaleStatus::Refunded,
            SaleStatus::Cancelled,
        ] {
            assert!(!SaleStatus::Refunded.can_transition_to(next));
            assert!(!SaleStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_payment_method_wire_format() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::MobileWallet).unwrap(),
            "\"MOBILE_WALLET\""
        );
        assert_eq!(PaymentMethod::Credit.to_string(), "CREDIT");
    }
}
