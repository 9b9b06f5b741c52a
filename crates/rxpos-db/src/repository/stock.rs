//! # Stock Primitives
//!
//! Statements shared by every operation that moves stock: inventory
//! lookups, batch upserts, the conditional decrement and the movement
//! insert. All of them run on a caller-supplied connection, which is the
//! open transaction of the operation that uses them.
//!
//! ## The Decrement
//! ```text
//! UPDATE inventory_items
//!    SET quantity = quantity - :n
//!  WHERE id = :item AND quantity >= :n
//!
//! rows_affected == 1  → stock taken
//! rows_affected == 0  → someone else got there first → InsufficientStock
//! ```
//! The `CHECK (quantity >= 0)` column constraint is the second barrier.
//!
//! ## The Increment
//! Every request quantity is at most `MAX_STOCK_QUANTITY`, and the upsert
//! refuses to grow a batch past `MAX_BATCH_QUANTITY`, so
//! `quantity + excluded.quantity` is always exact integer arithmetic.

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use rxpos_core::{
    CoreError, Inventory, InventoryItem, MovementType, Product, StockMovement, ValidationError,
    MAX_BATCH_QUANTITY,
};

pub(crate) const INVENTORY_COLUMNS: &str = "id, tenant_id, name, location, is_default, created_at";

pub(crate) const ITEM_COLUMNS: &str =
    "id, product_id, inventory_id, batch_number, quantity, expiry_date, updated_at";

pub(crate) const PRODUCT_COLUMNS: &str = "id, tenant_id, category_id, name, generic_name, \
    manufacturer, barcode, sku, product_type, cost_price_cents, selling_price_cents, \
    tax_rate_bps, is_vat_exempt, min_stock_level, requires_prescription, is_active, \
    created_at, updated_at";

pub(crate) const MOVEMENT_COLUMNS: &str = "id, tenant_id, product_id, movement_type, quantity, \
    from_inventory_id, to_inventory_id, user_id, reason, reference, created_at";

// =============================================================================
// Lookups
// =============================================================================

/// The tenant's default inventory.
///
/// ## Errors
/// `CoreError::NoDefaultInventory` when provisioning never created one.
pub async fn default_inventory(conn: &mut SqliteConnection, tenant_id: &str) -> DbResult<Inventory> {
    let sql = format!(
        "SELECT {INVENTORY_COLUMNS} FROM inventories WHERE tenant_id = ? AND is_default = 1"
    );
    sqlx::query_as::<_, Inventory>(&sql)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            CoreError::NoDefaultInventory {
                tenant_id: tenant_id.to_string(),
            }
            .into()
        })
}

/// An inventory of the tenant, or `NotFound`.
pub async fn require_inventory(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    inventory_id: &str,
) -> DbResult<Inventory> {
    let sql = format!("SELECT {INVENTORY_COLUMNS} FROM inventories WHERE id = ? AND tenant_id = ?");
    sqlx::query_as::<_, Inventory>(&sql)
        .bind(inventory_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Inventory", inventory_id))
}

/// A product of the tenant, or `NotFound`. Inactive products are included.
pub async fn require_product(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    product_id: &str,
) -> DbResult<Product> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ? AND tenant_id = ?");
    sqlx::query_as::<_, Product>(&sql)
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product_id))
}

pub async fn find_item(
    conn: &mut SqliteConnection,
    product_id: &str,
    inventory_id: &str,
    batch_number: &str,
) -> DbResult<Option<InventoryItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items \
         WHERE product_id = ? AND inventory_id = ? AND batch_number = ?"
    );
    let item = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(product_id)
        .bind(inventory_id)
        .bind(batch_number)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

/// Batches of a product in one inventory that still hold stock, in FEFO
/// order.
pub async fn in_stock_batches(
    conn: &mut SqliteConnection,
    product_id: &str,
    inventory_id: &str,
) -> DbResult<Vec<InventoryItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items \
         WHERE product_id = ? AND inventory_id = ? AND quantity > 0 \
         ORDER BY expiry_date IS NULL, expiry_date ASC, batch_number ASC"
    );
    let items = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(product_id)
        .bind(inventory_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

// =============================================================================
// Mutations
// =============================================================================

/// Adds `quantity` to a batch, creating the row when it doesn't exist.
///
/// A supplied expiry date overwrites the stored one; `None` keeps it.
///
/// ## Errors
/// `ValidationError::OutOfRange` when the batch would exceed
/// `MAX_BATCH_QUANTITY`.
pub async fn upsert_item(
    conn: &mut SqliteConnection,
    product_id: &str,
    inventory_id: &str,
    batch_number: &str,
    quantity: i64,
    expiry_date: Option<NaiveDate>,
) -> DbResult<InventoryItem> {
    debug!(product_id, inventory_id, batch_number, quantity, "Upserting inventory item");

    let sql = format!(
        "INSERT INTO inventory_items \
             (id, product_id, inventory_id, batch_number, quantity, expiry_date, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT (product_id, inventory_id, batch_number) DO UPDATE SET \
             quantity = inventory_items.quantity + excluded.quantity, \
             expiry_date = COALESCE(excluded.expiry_date, inventory_items.expiry_date), \
             updated_at = excluded.updated_at \
         WHERE inventory_items.quantity <= ? - excluded.quantity \
         RETURNING {ITEM_COLUMNS}"
    );
    sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(product_id)
        .bind(inventory_id)
        .bind(batch_number)
        .bind(quantity)
        .bind(expiry_date)
        .bind(Utc::now())
        .bind(MAX_BATCH_QUANTITY)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: MAX_BATCH_QUANTITY,
            }
            .into()
        })
}

/// Overwrites a batch quantity, creating the row when it doesn't exist.
pub async fn set_item_quantity(
    conn: &mut SqliteConnection,
    product_id: &str,
    inventory_id: &str,
    batch_number: &str,
    quantity: i64,
) -> DbResult<InventoryItem> {
    let sql = format!(
        "INSERT INTO inventory_items \
             (id, product_id, inventory_id, batch_number, quantity, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (product_id, inventory_id, batch_number) DO UPDATE SET \
             quantity = excluded.quantity, \
             updated_at = excluded.updated_at \
         RETURNING {ITEM_COLUMNS}"
    );
    let item = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(product_id)
        .bind(inventory_id)
        .bind(batch_number)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
    Ok(item)
}

/// Takes `quantity` from a batch only if it still holds that much.
///
/// Returns `false` when the guard rejected the update.
pub async fn decrement_item(conn: &mut SqliteConnection, item_id: &str, quantity: i64) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE inventory_items SET quantity = quantity - ?, updated_at = ? \
         WHERE id = ? AND quantity >= ?",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(item_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn fetch_item(conn: &mut SqliteConnection, item_id: &str) -> DbResult<InventoryItem> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?");
    sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("InventoryItem", item_id))
}

// =============================================================================
// Movements
// =============================================================================

/// A movement about to be written.
#[derive(Debug, Clone)]
pub struct NewMovement<'a> {
    pub tenant_id: &'a str,
    pub product_id: &'a str,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub from_inventory_id: Option<&'a str>,
    pub to_inventory_id: Option<&'a str>,
    pub user_id: &'a str,
    pub reason: Option<&'a str>,
    pub reference: Option<&'a str>,
}

/// Appends one row to the audit trail.
pub async fn record_movement(conn: &mut SqliteConnection, movement: &NewMovement<'_>) -> DbResult<StockMovement> {
    debug!(
        product_id = movement.product_id,
        movement_type = %movement.movement_type,
        quantity = movement.quantity,
        "Recording stock movement"
    );

    let sql = format!(
        "INSERT INTO stock_movements ({MOVEMENT_COLUMNS}) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING {MOVEMENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, StockMovement>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(movement.tenant_id)
        .bind(movement.product_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.from_inventory_id)
        .bind(movement.to_inventory_id)
        .bind(movement.user_id)
        .bind(movement.reason)
        .bind(movement.reference)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}
