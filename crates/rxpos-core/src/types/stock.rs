//! Stock locations, per-batch stock rows and the movement audit trail.
//!
//! ## Unit of Stock Truth
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  InventoryItem is keyed by (product_id, inventory_id, batch_number)    │
//! │                                                                         │
//! │   Panadol @ Main Store  batch "L2301"  qty 5   expires 2026-10-26       │
//! │   Panadol @ Main Store  batch "L2307"  qty 5   expires 2027-01-24       │
//! │   Panadol @ Back Room   batch "DEFAULT" qty 12  no expiry               │
//! │                                                                         │
//! │  Every change to a row is paired with one StockMovement                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::DEFAULT_BATCH;

// =============================================================================
// Inventory
// =============================================================================

/// A named stock location of a tenant.
///
/// Exactly one inventory per tenant has `is_default = true`; checkout,
/// refunds and purchase receiving all go through it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Inventory {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub location: Option<String>,
    pub is_default: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory Item
// =============================================================================

/// Quantity of one product, in one inventory, for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub product_id: String,
    pub inventory_id: String,
    /// Lot number, or `"DEFAULT"` for untracked stock.
    pub batch_number: String,
    /// Never negative.
    pub quantity: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    #[inline]
    pub fn is_untracked_batch(&self) -> bool {
        self.batch_number == DEFAULT_BATCH
    }

    /// True when the batch expires on or before `horizon`.
    pub fn expires_by(&self, horizon: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|d| d <= horizon)
    }
}

/// Normalises an optional batch number to the stored key.
///
/// Blank input counts as untracked.
///
/// ## Example
/// ```rust
/// use rxpos_core::types::stock::batch_key;
///
/// assert_eq!(batch_key(None), "DEFAULT");
/// assert_eq!(batch_key(Some("  ")), "DEFAULT");
/// assert_eq!(batch_key(Some(" L2301 ")), "L2301");
/// ```
pub fn batch_key(batch_number: Option<&str>) -> String {
    match batch_number.map(str::trim) {
        Some(b) if !b.is_empty() => b.to_string(),
        _ => DEFAULT_BATCH.to_string(),
    }
}

// =============================================================================
// Movement Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Stock received (manual add or purchase order).
    In,
    /// Stock sold.
    Out,
    /// Quantity overwritten; `quantity` holds the signed delta.
    Adjustment,
    /// Moved between two inventories of the same tenant.
    Transfer,
    /// Stock returned by a refund.
    Return,
    /// Stock written off as expired.
    Expired,
}

impl MovementType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Transfer => "TRANSFER",
            MovementType::Return => "RETURN",
            MovementType::Expired => "EXPIRED",
        }
    }

    /// Effect of a movement on the tenant-wide stock of its product.
    ///
    /// ## Direction Table
    /// ```text
    /// IN, RETURN      → +quantity
    /// OUT, EXPIRED    → −quantity
    /// ADJUSTMENT      → quantity (already a signed delta)
    /// TRANSFER        → 0 (moves between the tenant's own inventories)
    /// ```
    pub const fn net_effect(&self, quantity: i64) -> i64 {
        match self {
            MovementType::In | MovementType::Return => quantity,
            MovementType::Out | MovementType::Expired => -quantity,
            MovementType::Adjustment => quantity,
            MovementType::Transfer => 0,
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Append-only audit record of an inventory change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub from_inventory_id: Option<String>,
    pub to_inventory_id: Option<String>,
    pub user_id: String,
    pub reason: Option<String>,
    /// Invoice or purchase order number that caused the movement.
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    #[inline]
    pub fn net_effect(&self) -> i64 {
        self.movement_type.net_effect(self.quantity)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_effect_directions() {
        assert_eq!(MovementType::In.net_effect(5), 5);
        assert_eq!(MovementType::Return.net_effect(2), 2);
        assert_eq!(MovementType::Out.net_effect(3), -3);
        assert_eq!(MovementType::Expired.net_effect(1), -1);
        assert_eq!(MovementType::Adjustment.net_effect(-4), -4);
        assert_eq!(MovementType::Transfer.net_effect(9), 0);
    }

    #[test]
    fn test_expires_by() {
        let horizon = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let mut item = InventoryItem {
            id: "i-1".to_string(),
            product_id: "p-1".to_string(),
            inventory_id: "inv-1".to_string(),
            batch_number: "L1".to_string(),
            quantity: 4,
            expiry_date: NaiveDate::from_ymd_opt(2026, 11, 1),
            updated_at: Utc::now(),
        };
        assert!(item.expires_by(horizon));

        item.expiry_date = None;
        assert!(!item.expires_by(horizon));
        assert!(!item.is_untracked_batch());
    }
}
