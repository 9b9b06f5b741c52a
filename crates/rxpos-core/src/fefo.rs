//! # FEFO Batch Selection
//!
//! First-expiry-first-out: a sale line is drawn from the batch that
//! expires soonest among those that can cover it on their own.
//!
//! ## Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. batches with an expiry date, earliest first                         │
//! │  2. batches without an expiry date                                      │
//! │  3. ties broken by batch_number so the pick is deterministic            │
//! │                                                                         │
//! │  A line is never split: the first batch in this order whose             │
//! │  quantity ≥ requested wins, otherwise the line fails.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::types::InventoryItem;

/// FEFO comparison of two batches.
pub fn fefo_order(a: &InventoryItem, b: &InventoryItem) -> Ordering {
    compare_expiry(a.expiry_date, b.expiry_date).then_with(|| a.batch_number.cmp(&b.batch_number))
}

fn compare_expiry(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sorts batches in place, soonest expiry first.
pub fn sort_fefo(batches: &mut [InventoryItem]) {
    batches.sort_by(fefo_order);
}

/// Picks the batch a sale line of `requested` units should draw from.
///
/// Returns `None` when no single batch holds enough.
///
/// ## Example
/// ```rust
/// use chrono::{NaiveDate, Utc};
/// use rxpos_core::fefo::select_batch;
/// use rxpos_core::types::InventoryItem;
///
/// let batch = |n: &str, q: i64, d: Option<NaiveDate>| InventoryItem {
///     id: n.to_string(),
///     product_id: "p".to_string(),
///     inventory_id: "inv".to_string(),
///     batch_number: n.to_string(),
///     quantity: q,
///     expiry_date: d,
///     updated_at: Utc::now(),
/// };
/// let batches = vec![
///     batch("LATE", 5, NaiveDate::from_ymd_opt(2027, 1, 1)),
///     batch("SOON", 5, NaiveDate::from_ymd_opt(2026, 11, 1)),
/// ];
/// assert_eq!(select_batch(&batches, 3).unwrap().batch_number, "SOON");
/// assert!(select_batch(&batches, 6).is_none());
/// ```
pub fn select_batch(batches: &[InventoryItem], requested: i64) -> Option<&InventoryItem> {
    batches
        .iter()
        .filter(|b| b.quantity >= requested)
        .min_by(|a, b| fefo_order(a, b))
}

/// Largest quantity held by any single batch, reported when selection fails.
pub fn largest_batch_quantity(batches: &[InventoryItem]) -> i64 {
    batches.iter().map(|b| b.quantity).max().unwrap_or(0)
}

/// Sum of all batch quantities.
pub fn total_quantity(batches: &[InventoryItem]) -> i64 {
    batches.iter().map(|b| b.quantity).sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
