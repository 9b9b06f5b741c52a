//! # Inventory Repository
//!
//! Stock locations and every manual stock mutation.
//!
//! ## Mutations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  operation      item change                       movement              │
//! │  ─────────      ───────────                       ────────              │
//! │  add_stock      upsert (+n)                       IN        → to        │
//! │  adjust_stock   overwrite (new)                   ADJUSTMENT  new − old │
//! │  transfer_stock source −n (guarded), dest +n      TRANSFER  from → to   │
//! │  write_off      −n (guarded)                      EXPIRED   from →      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Each operation is one transaction: the item change and its movement are
//! written together or not at all.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::stock::{self, NewMovement, INVENTORY_COLUMNS, MOVEMENT_COLUMNS};
use crate::repository::Actor;
use rxpos_core::types::stock::batch_key;
use rxpos_core::validation::{
    validate_batch_number, validate_distinct, validate_length, validate_non_negative_cents,
    validate_optional_length, validate_stock_level, validate_stock_quantity,
};
use rxpos_core::{
    CoreError, Inventory, InventoryItem, MovementType, Page, PageRequest, StockMovement,
};

// =============================================================================
// Inputs / Outputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewInventory {
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddStock {
    pub product_id: String,
    pub inventory_id: String,
    pub quantity: i64,
    /// `None` or blank stores untracked stock under `"DEFAULT"`.
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    /// Overwrites the product's cost price when present.
    pub cost_price_cents: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustStock {
    pub product_id: String,
    pub inventory_id: String,
    pub batch_number: Option<String>,
    pub new_quantity: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferStock {
    pub product_id: String,
    pub from_inventory_id: String,
    pub to_inventory_id: String,
    pub batch_number: Option<String>,
    pub quantity: i64,
    pub reason: Option<String>,
}

/// Removes expired units of one batch from stock.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteOffStock {
    pub product_id: String,
    pub inventory_id: String,
    pub batch_number: Option<String>,
    pub quantity: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<String>,
    /// Matches either side of the movement.
    pub inventory_id: Option<String>,
    pub movement_type: Option<MovementType>,
}

/// The item row after a mutation, with the movement that recorded it.
#[derive(Debug, Clone, Serialize)]
pub struct StockChange {
    pub item: InventoryItem,
    pub movement: StockMovement,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub source: InventoryItem,
    pub destination: InventoryItem,
    pub movement: StockMovement,
}

/// A batch row joined with the product it holds.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockLine {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: InventoryItem,
    pub product_name: String,
    pub barcode: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryDetail {
    #[serde(flatten)]
    pub inventory: Inventory,
    pub items: Vec<StockLine>,
}

/// A batch that expires inside the requested window.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExpiringBatch {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: InventoryItem,
    pub product_name: String,
    pub inventory_name: String,
    /// Negative when already expired.
    pub days_until_expiry: i64,
}

const STOCK_LINE_COLUMNS: &str = "ii.id, ii.product_id, ii.inventory_id, ii.batch_number, \
    ii.quantity, ii.expiry_date, ii.updated_at, p.name AS product_name, p.barcode AS barcode";

// =============================================================================
// Repository
// =============================================================================

/// Repository for inventories and stock mutations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    // =========================================================================
    // Locations
    // =========================================================================

    /// Default inventory first, then by name.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Inventory>> {
        let sql = format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventories WHERE tenant_id = ? \
             ORDER BY is_default DESC, name ASC"
        );
        let inventories = sqlx::query_as::<_, Inventory>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(inventories)
    }

    /// Creates an additional, non-default inventory.
    pub async fn create(&self, tenant_id: &str, input: &NewInventory) -> DbResult<Inventory> {
        validate_length("name", &input.name, 2, 100)?;
        validate_optional_length("location", input.location.as_deref(), 1, 200)?;

        let name = input.name.trim();
        let sql = format!(
            "INSERT INTO inventories ({INVENTORY_COLUMNS}) VALUES (?, ?, ?, ?, 0, ?) \
             RETURNING {INVENTORY_COLUMNS}"
        );
        let inventory = sqlx::query_as::<_, Inventory>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(tenant_id)
            .bind(name)
            .bind(&input.location)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(name))?;

        info!(inventory_id = %inventory.id, tenant_id, "Inventory created");
        Ok(inventory)
    }

    /// An inventory with every batch row it holds, including empty ones.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<InventoryDetail>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!("SELECT {INVENTORY_COLUMNS} FROM inventories WHERE id = ? AND tenant_id = ?");
        let Some(inventory) = sqlx::query_as::<_, Inventory>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {STOCK_LINE_COLUMNS} FROM inventory_items ii \
             JOIN products p ON p.id = ii.product_id \
             WHERE ii.inventory_id = ? \
             ORDER BY p.name, ii.expiry_date IS NULL, ii.expiry_date, ii.batch_number"
        );
        let items = sqlx::query_as::<_, StockLine>(&sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(Some(InventoryDetail { inventory, items }))
    }

    pub async fn default_inventory(&self, tenant_id: &str) -> DbResult<Inventory> {
        let mut conn = self.pool.acquire().await?;
        stock::default_inventory(&mut conn, tenant_id).await
    }

    // =========================================================================
    // Stock Mutations
    // =========================================================================

    /// Receives stock into a batch.
    ///
    /// ## Errors
    /// - `NotFound` when the product or inventory is not the actor's tenant's
    pub async fn add_stock(&self, actor: &Actor, input: &AddStock) -> DbResult<StockChange> {
        validate_stock_quantity(input.quantity)?;
        let batch = batch_key(input.batch_number.as_deref());
        validate_batch_number(&batch)?;
        if let Some(cost) = input.cost_price_cents {
            validate_non_negative_cents("cost_price", cost)?;
        }

        let mut tx = self.pool.begin().await?;

        stock::require_product(&mut tx, &actor.tenant_id, &input.product_id).await?;
        stock::require_inventory(&mut tx, &actor.tenant_id, &input.inventory_id).await?;

        let item = stock::upsert_item(
            &mut tx,
            &input.product_id,
            &input.inventory_id,
            &batch,
            input.quantity,
            input.expiry_date,
        )
        .await?;

        if let Some(cost) = input.cost_price_cents {
            sqlx::query("UPDATE products SET cost_price_cents = ?, updated_at = ? WHERE id = ? AND tenant_id = ?")
                .bind(cost)
                .bind(Utc::now())
                .bind(&input.product_id)
                .bind(&actor.tenant_id)
                .execute(&mut *tx)
                .await?;
        }

        let movement = stock::record_movement(
            &mut tx,
            &NewMovement {
                tenant_id: &actor.tenant_id,
                product_id: &input.product_id,
                movement_type: MovementType::In,
                quantity: input.quantity,
                from_inventory_id: None,
                to_inventory_id: Some(&input.inventory_id),
                user_id: &actor.user_id,
                reason: Some("stock received"),
                reference: None,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %input.product_id,
            inventory_id = %input.inventory_id,
            batch = %batch,
            quantity = input.quantity,
            "Stock added"
        );
        Ok(StockChange { item, movement })
    }

    /// Overwrites a batch quantity after a stock count.
    ///
    /// The movement carries the signed delta, so a count that finds fewer
    /// units than recorded produces a negative ADJUSTMENT.
    pub async fn adjust_stock(&self, actor: &Actor, input: &AdjustStock) -> DbResult<StockChange> {
        validate_stock_level("new_quantity", input.new_quantity)?;
        validate_length("reason", &input.reason, 1, 500)?;
        let batch = batch_key(input.batch_number.as_deref());
        validate_batch_number(&batch)?;

        let mut tx = self.pool.begin().await?;

        stock::require_product(&mut tx, &actor.tenant_id, &input.product_id).await?;
        stock::require_inventory(&mut tx, &actor.tenant_id, &input.inventory_id).await?;

        let current = stock::find_item(&mut tx, &input.product_id, &input.inventory_id, &batch)
            .await?
            .map(|item| item.quantity)
            .unwrap_or(0);
        let delta = input.new_quantity - current;

        let item = stock::set_item_quantity(
            &mut tx,
            &input.product_id,
            &input.inventory_id,
            &batch,
            input.new_quantity,
        )
        .await?;

        let movement = stock::record_movement(
            &mut tx,
            &NewMovement {
                tenant_id: &actor.tenant_id,
                product_id: &input.product_id,
                movement_type: MovementType::Adjustment,
                quantity: delta,
                from_inventory_id: None,
                to_inventory_id: Some(&input.inventory_id),
                user_id: &actor.user_id,
                reason: Some(input.reason.trim()),
                reference: None,
            },
        )
        .await?;

        tx.commit().await?;

        info!(product_id = %input.product_id, batch = %batch, from = current, to = input.new_quantity, "Stock adjusted");
        Ok(StockChange { item, movement })
    }

    /// Moves units of one batch between two inventories of the tenant.
    ///
    /// ## Errors
    /// - `ValidationError::MustDiffer` when source and destination are equal
    /// - `NotFound` for a product or inventory outside the tenant
    /// - `CoreError::InsufficientStock` when the source batch is missing or short
    pub async fn transfer_stock(&self, actor: &Actor, input: &TransferStock) -> DbResult<TransferResult> {
        validate_stock_quantity(input.quantity)?;
        validate_distinct(
            "to_inventory_id",
            &input.to_inventory_id,
            "from_inventory_id",
            &input.from_inventory_id,
        )?;
        let batch = batch_key(input.batch_number.as_deref());
        validate_batch_number(&batch)?;

        let mut tx = self.pool.begin().await?;

        let product = stock::require_product(&mut tx, &actor.tenant_id, &input.product_id).await?;
        stock::require_inventory(&mut tx, &actor.tenant_id, &input.from_inventory_id).await?;
        stock::require_inventory(&mut tx, &actor.tenant_id, &input.to_inventory_id).await?;

        let source = stock::find_item(&mut tx, &input.product_id, &input.from_inventory_id, &batch).await?;
        let available = source.as_ref().map(|item| item.quantity).unwrap_or(0);
        let insufficient = || CoreError::InsufficientStock {
            product: product.name.clone(),
            available,
            requested: input.quantity,
        };

        let source = match source {
            Some(item) if item.quantity >= input.quantity => item,
            _ => return Err(insufficient().into()),
        };
        if !stock::decrement_item(&mut tx, &source.id, input.quantity).await? {
            return Err(insufficient().into());
        }

        let destination = stock::upsert_item(
            &mut tx,
            &input.product_id,
            &input.to_inventory_id,
            &batch,
            input.quantity,
            source.expiry_date,
        )
        .await?;
        let source = stock::fetch_item(&mut tx, &source.id).await?;

        let movement = stock::record_movement(
            &mut tx,
            &NewMovement {
                tenant_id: &actor.tenant_id,
                product_id: &input.product_id,
                movement_type: MovementType::Transfer,
                quantity: input.quantity,
                from_inventory_id: Some(&input.from_inventory_id),
                to_inventory_id: Some(&input.to_inventory_id),
                user_id: &actor.user_id,
                reason: input.reason.as_deref(),
                reference: None,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %input.product_id,
            from = %input.from_inventory_id,
            to = %input.to_inventory_id,
            quantity = input.quantity,
            "Stock transferred"
        );
        Ok(TransferResult {
            source,
            destination,
            movement,
        })
    }

    /// Writes off units of a batch as expired.
    pub async fn write_off_expired(&self, actor: &Actor, input: &WriteOffStock) -> DbResult<StockChange> {
        validate_stock_quantity(input.quantity)?;
        let batch = batch_key(input.batch_number.as_deref());
        validate_batch_number(&batch)?;

        let mut tx = self.pool.begin().await?;

        let product = stock::require_product(&mut tx, &actor.tenant_id, &input.product_id).await?;
        stock::require_inventory(&mut tx, &actor.tenant_id, &input.inventory_id).await?;

        let item = stock::find_item(&mut tx, &input.product_id, &input.inventory_id, &batch).await?;
        let available = item.as_ref().map(|i| i.quantity).unwrap_or(0);
        let taken = match &item {
            Some(item) => stock::decrement_item(&mut tx, &item.id, input.quantity).await?,
            None => false,
        };
        let Some(item) = item.filter(|_| taken) else {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available,
                requested: input.quantity,
            }
            .into());
        };
        let item = stock::fetch_item(&mut tx, &item.id).await?;

        let movement = stock::record_movement(
            &mut tx,
            &NewMovement {
                tenant_id: &actor.tenant_id,
                product_id: &input.product_id,
                movement_type: MovementType::Expired,
                quantity: input.quantity,
                from_inventory_id: Some(&input.inventory_id),
                to_inventory_id: None,
                user_id: &actor.user_id,
                reason: Some(input.reason.as_deref().unwrap_or("expired")),
                reference: None,
            },
        )
        .await?;

        tx.commit().await?;

        info!(product_id = %input.product_id, batch = %batch, quantity = input.quantity, "Expired stock written off");
        Ok(StockChange { item, movement })
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// In-stock batches expiring within `days` (already-expired ones
    /// included), soonest first.
    pub async fn expiring(&self, tenant_id: &str, days: i64) -> DbResult<Vec<ExpiringBatch>> {
        let today = Utc::now().date_naive();
        let horizon = today + Duration::days(days.max(0));
        debug!(tenant_id, days, %horizon, "Loading expiring batches");

        let batches = sqlx::query_as::<_, ExpiringBatch>(
            "SELECT ii.id, ii.product_id, ii.inventory_id, ii.batch_number, ii.quantity, \
                 ii.expiry_date, ii.updated_at, \
                 p.name AS product_name, i.name AS inventory_name, \
                 CAST(julianday(ii.expiry_date) - julianday(?1) AS INTEGER) AS days_until_expiry \
             FROM inventory_items ii \
             JOIN inventories i ON i.id = ii.inventory_id \
             JOIN products p ON p.id = ii.product_id \
             WHERE i.tenant_id = ?2 AND ii.quantity > 0 \
               AND ii.expiry_date IS NOT NULL AND ii.expiry_date <= ?3 \
             ORDER BY ii.expiry_date ASC, p.name ASC",
        )
        .bind(today)
        .bind(tenant_id)
        .bind(horizon)
        .fetch_all(&self.pool)
        .await?;
        Ok(batches)
    }

    /// Audit trail, newest first.
    pub async fn movements(
        &self,
        tenant_id: &str,
        filter: &MovementFilter,
        page: PageRequest,
    ) -> DbResult<Page<StockMovement>> {
        let condition = "tenant_id = ?1 \
             AND (?2 IS NULL OR product_id = ?2) \
             AND (?3 IS NULL OR from_inventory_id = ?3 OR to_inventory_id = ?3) \
             AND (?4 IS NULL OR movement_type = ?4)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM stock_movements WHERE {condition}"))
            .bind(tenant_id)
            .bind(&filter.product_id)
            .bind(&filter.inventory_id)
            .bind(filter.movement_type)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE {condition} \
             ORDER BY created_at DESC, rowid DESC LIMIT ?5 OFFSET ?6"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(tenant_id)
            .bind(&filter.product_id)
            .bind(&filter.inventory_id)
            .bind(filter.movement_type)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(movements, page, total))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{fixture, tenant, Fixture};
    use rxpos_core::{ValidationError, MAX_BATCH_QUANTITY};

    async fn back_room(f: &Fixture) -> Inventory {
        f.db.inventory()
            .create(
                &f.actor.tenant_id,
                &NewInventory {
                    name: "Back Room".to_string(),
                    location: Some("Ground floor".to_string()),
                },
            )
            .await
            .unwrap()
    }

    async fn quantity(f: &Fixture, product_id: &str, inventory_id: &str, batch: &str) -> i64 {
        let mut conn = f.db.pool().acquire().await.unwrap();
        stock::find_item(&mut conn, product_id, inventory_id, batch)
            .await
            .unwrap()
            .map(|i| i.quantity)
            .unwrap_or(0)
    }

    async fn all_movements(f: &Fixture, product_id: &str) -> Vec<StockMovement> {
        f.db.inventory()
            .movements(
                &f.actor.tenant_id,
                &MovementFilter {
                    product_id: Some(product_id.to_string()),
                    ..MovementFilter::default()
                },
                PageRequest::new(None, Some(100)),
            )
            .await
            .unwrap()
            .items
    }

    #[tokio::test]
    async fn test_add_stock_upserts_batch() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;

        let first = f
            .db
            .inventory()
            .add_stock(
                &f.actor,
                &AddStock {
                    product_id: product.id.clone(),
                    inventory_id: f.default_inventory_id.clone(),
                    quantity: 10,
                    batch_number: None,
                    expiry_date: None,
                    cost_price_cents: Some(2_000),
                },
            )
            .await
            .unwrap();
        assert_eq!(first.item.batch_number, "DEFAULT");
        assert_eq!(first.movement.movement_type, MovementType::In);
        assert_eq!(first.movement.to_inventory_id.as_deref(), Some(f.default_inventory_id.as_str()));

        f.stock(&product.id, "DEFAULT", 5, None).await;
        assert_eq!(quantity(&f, &product.id, &f.default_inventory_id, "DEFAULT").await, 15);

        let reloaded = f.db.products().get(&f.actor.tenant_id, &product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.product.cost_price_cents, 2_000);
    }

    #[tokio::test]
    async fn test_adjust_records_signed_delta() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        f.stock(&product.id, "L1", 10, None).await;

        let change = f
            .db
            .inventory()
            .adjust_stock(
                &f.actor,
                &AdjustStock {
                    product_id: product.id.clone(),
                    inventory_id: f.default_inventory_id.clone(),
                    batch_number: Some("L1".to_string()),
                    new_quantity: 7,
                    reason: "Stock count".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(change.item.quantity, 7);
        assert_eq!(change.movement.quantity, -3);
        assert_eq!(change.movement.movement_type, MovementType::Adjustment);

        // Adjusting a batch that doesn't exist creates it.
        let created = f
            .db
            .inventory()
            .adjust_stock(
                &f.actor,
                &AdjustStock {
                    product_id: product.id.clone(),
                    inventory_id: f.default_inventory_id.clone(),
                    batch_number: Some("FOUND".to_string()),
                    new_quantity: 2,
                    reason: "Found on shelf".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(created.movement.quantity, 2);
        assert_eq!(f.total_stock(&product.id).await, 9);
    }

    #[tokio::test]
    async fn test_transfer_moves_stock_and_expiry() {
        let f = fixture().await;
        let back = back_room(&f).await;
        let product = f.product("Panadol", 4_500).await;
        let expiry = Utc::now().date_naive() + Duration::days(60);
        f.stock(&product.id, "L1", 10, Some(expiry)).await;

        let result = f
            .db
            .inventory()
            .transfer_stock(
                &f.actor,
                &TransferStock {
                    product_id: product.id.clone(),
                    from_inventory_id: f.default_inventory_id.clone(),
                    to_inventory_id: back.id.clone(),
                    batch_number: Some("L1".to_string()),
                    quantity: 4,
                    reason: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.source.quantity, 6);
        assert_eq!(result.destination.quantity, 4);
        assert_eq!(result.destination.expiry_date, Some(expiry));
        assert_eq!(result.movement.movement_type, MovementType::Transfer);
        assert_eq!(f.total_stock(&product.id).await, 10);
    }

    #[tokio::test]
    async fn test_failed_transfer_changes_nothing() {
        let f = fixture().await;
        let back = back_room(&f).await;
        let product = f.product("Panadol", 4_500).await;
        f.stock(&product.id, "L1", 3, None).await;

        let transfer = |qty| TransferStock {
            product_id: product.id.clone(),
            from_inventory_id: f.default_inventory_id.clone(),
            to_inventory_id: back.id.clone(),
            batch_number: Some("L1".to_string()),
            quantity: qty,
            reason: None,
        };

        let err = f.db.inventory().transfer_stock(&f.actor, &transfer(5)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 3, requested: 5, .. })
        ));
        assert_eq!(quantity(&f, &product.id, &f.default_inventory_id, "L1").await, 3);
        assert_eq!(quantity(&f, &product.id, &back.id, "L1").await, 0);
        assert_eq!(all_movements(&f, &product.id).await.len(), 1);

        let mut same = transfer(1);
        same.to_inventory_id = f.default_inventory_id.clone();
        assert!(matches!(
            f.db.inventory().transfer_stock(&f.actor, &same).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_write_off_expired() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        let expired = Utc::now().date_naive() - Duration::days(3);
        f.stock(&product.id, "OLD", 4, Some(expired)).await;

        let batches = f.db.inventory().expiring(&f.actor.tenant_id, 90).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].days_until_expiry, -3);

        let change = f
            .db
            .inventory()
            .write_off_expired(
                &f.actor,
                &WriteOffStock {
                    product_id: product.id.clone(),
                    inventory_id: f.default_inventory_id.clone(),
                    batch_number: Some("OLD".to_string()),
                    quantity: 4,
                    reason: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(change.item.quantity, 0);
        assert_eq!(change.movement.movement_type, MovementType::Expired);
        assert!(f.db.inventory().expiring(&f.actor.tenant_id, 90).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_movements_conserve_stock() {
        let f = fixture().await;
        let back = back_room(&f).await;
        let product = f.product("Panadol", 4_500).await;
        f.stock(&product.id, "L1", 20, None).await;
        f.stock(&product.id, "L2", 5, None).await;

        let inventory = f.db.inventory();
        inventory
            .adjust_stock(
                &f.actor,
                &AdjustStock {
                    product_id: product.id.clone(),
                    inventory_id: f.default_inventory_id.clone(),
                    batch_number: Some("L2".to_string()),
                    new_quantity: 2,
                    reason: "Damaged".to_string(),
                },
            )
            .await
            .unwrap();
        inventory
            .transfer_stock(
                &f.actor,
                &TransferStock {
                    product_id: product.id.clone(),
                    from_inventory_id: f.default_inventory_id.clone(),
                    to_inventory_id: back.id.clone(),
                    batch_number: Some("L1".to_string()),
                    quantity: 8,
                    reason: None,
                },
            )
            .await
            .unwrap();

        let net: i64 = all_movements(&f, &product.id).await.iter().map(|m| m.net_effect()).sum();
        assert_eq!(net, f.total_stock(&product.id).await);
        assert_eq!(net, 22);
    }

    #[tokio::test]
    async fn test_inventories_are_tenant_scoped() {
        let f = fixture().await;
        let other = tenant(&f.db, "delta").await;
        let product = f.product("Panadol", 4_500).await;

        let err = other
            .db
            .inventory()
            .add_stock(
                &other.actor,
                &AddStock {
                    product_id: product.id.clone(),
                    inventory_id: other.default_inventory_id.clone(),
                    quantity: 5,
                    batch_number: None,
                    expiry_date: None,
                    cost_price_cents: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        assert!(other
            .db
            .inventory()
            .get(&other.actor.tenant_id, &f.default_inventory_id)
            .await
            .unwrap()
            .is_none());

        let lists = other.db.inventory().list(&other.actor.tenant_id).await.unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(f.total_stock(&product.id).await, 0);
    }

    #[tokio::test]
    async fn test_list_puts_default_first_and_get_includes_items() {
        let f = fixture().await;
        back_room(&f).await;
        let product = f.product("Panadol", 4_500).await;
        f.stock(&product.id, "L1", 3, None).await;

        let inventories = f.db.inventory().list(&f.actor.tenant_id).await.unwrap();
        assert_eq!(inventories.len(), 2);
        assert!(inventories[0].is_default);

        let detail = f
            .db
            .inventory()
            .get(&f.actor.tenant_id, &f.default_inventory_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].product_name, "Panadol");
    }

    #[tokio::test]
    async fn test_quantities_and_batch_keys_are_bounded() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        f.stock(&product.id, "L1", 10, None).await;
        let inventory = f.db.inventory();

        let add = |quantity, batch: &str| AddStock {
            product_id: product.id.clone(),
            inventory_id: f.default_inventory_id.clone(),
            quantity,
            batch_number: Some(batch.to_string()),
            expiry_date: None,
            cost_price_cents: None,
        };
        let is_out_of_range =
            |err: DbError| matches!(err, DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. })));

        assert!(is_out_of_range(inventory.add_stock(&f.actor, &add(i64::MAX, "L1")).await.unwrap_err()));

        // A batch already at the ceiling cannot grow.
        sqlx::query("UPDATE inventory_items SET quantity = ? WHERE product_id = ? AND batch_number = 'L1'")
            .bind(MAX_BATCH_QUANTITY)
            .bind(&product.id)
            .execute(f.db.pool())
            .await
            .unwrap();
        assert!(is_out_of_range(inventory.add_stock(&f.actor, &add(1, "L1")).await.unwrap_err()));
        assert_eq!(quantity(&f, &product.id, &f.default_inventory_id, "L1").await, MAX_BATCH_QUANTITY);

        let adjust = |new_quantity, batch: &str| AdjustStock {
            product_id: product.id.clone(),
            inventory_id: f.default_inventory_id.clone(),
            batch_number: Some(batch.to_string()),
            new_quantity,
            reason: "Stock count".to_string(),
        };
        assert!(is_out_of_range(inventory.adjust_stock(&f.actor, &adjust(i64::MAX, "L1")).await.unwrap_err()));

        let long_batch = "L".repeat(51);
        assert!(matches!(
            inventory.adjust_stock(&f.actor, &adjust(3, &long_batch)).await,
            Err(DbError::Domain(CoreError::Validation(ValidationError::TooLong { .. })))
        ));
        assert!(matches!(
            inventory
                .write_off_expired(
                    &f.actor,
                    &WriteOffStock {
                        product_id: product.id.clone(),
                        inventory_id: f.default_inventory_id.clone(),
                        batch_number: Some(long_batch.clone()),
                        quantity: 1,
                        reason: None,
                    },
                )
                .await,
            Err(DbError::Domain(CoreError::Validation(ValidationError::TooLong { .. })))
        ));
        assert_eq!(all_movements(&f, &product.id).await.len(), 1);
    }
}
