//! # Purchase Order Repository
//!
//! Ordering stock from suppliers and receiving it into the default
//! inventory.
//!
//! ## Receiving
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PO-LX2K9A1B-7QF3   DRAFT                                               │
//! │    Panadol    × 100   ──receive 100, batch L2401──►  Main Store +100    │
//! │    Augmentin  ×  50   ──receive  48, batch A77  ──►  Main Store  +48    │
//! │                                                                         │
//! │  one IN movement per received line, reference = order number           │
//! │  status → RECEIVED, received_date = now       (single transaction)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::stock::{self, NewMovement};
use crate::repository::Actor;
use rxpos_core::numbering::new_purchase_order_number;
use rxpos_core::types::stock::batch_key;
use rxpos_core::validation::{
    validate_batch_number, validate_non_negative_cents, validate_optional_length,
    validate_stock_level, validate_stock_quantity,
};
use rxpos_core::{
    CoreError, Money, MovementType, Page, PageRequest, PurchaseOrder, PurchaseOrderItem,
    PurchaseOrderStatus, ValidationError,
};

const ORDER_COLUMNS: &str = "id, tenant_id, supplier_id, order_number, status, subtotal_cents, \
    total_cents, expected_date, received_date, notes, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, quantity, unit_price_cents, total_cents, received_quantity";

// =============================================================================
// Inputs / Outputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchaseOrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchaseOrder {
    pub supplier_id: String,
    pub items: Vec<NewPurchaseOrderItem>,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiveLine {
    pub item_id: String,
    pub received_quantity: i64,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Receipt of an order. An empty `items` list receives every line in full
/// as untracked stock.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiveOrder {
    #[serde(default)]
    pub items: Vec<ReceiveLine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderFilter {
    pub supplier_id: Option<String>,
    pub status: Option<PurchaseOrderStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub items: Vec<PurchaseOrderItem>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for purchase orders.
#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
}

impl PurchaseOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseOrderRepository { pool }
    }

    /// Creates a DRAFT order.
    ///
    /// ## Errors
    /// - `NotFound` when the supplier or a product is not the tenant's
    pub async fn create(&self, tenant_id: &str, input: &NewPurchaseOrder) -> DbResult<PurchaseOrderDetail> {
        if input.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }
        for item in &input.items {
            validate_stock_quantity(item.quantity)?;
            validate_non_negative_cents("unit_price", item.unit_price_cents)?;
        }
        validate_optional_length("notes", input.notes.as_deref(), 1, 1000)?;

        let total = input
            .items
            .iter()
            .try_fold(Money::zero(), |acc, i| {
                Money::from_cents(i.unit_price_cents)
                    .checked_mul_qty(i.quantity)
                    .and_then(|line| acc.checked_add(line))
            })
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "total".to_string(),
                min: 0,
                max: i64::MAX,
            })?
            .cents();
        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();
        let order_number = new_purchase_order_number();

        let mut tx = self.pool.begin().await?;

        let supplier_exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM suppliers WHERE id = ? AND tenant_id = ?")
                .bind(&input.supplier_id)
                .bind(tenant_id)
                .fetch_one(&mut *tx)
                .await?;
        if supplier_exists == 0 {
            return Err(DbError::not_found("Supplier", &input.supplier_id));
        }

        let sql = format!(
            "INSERT INTO purchase_orders ({ORDER_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?) RETURNING {ORDER_COLUMNS}"
        );
        let order = sqlx::query_as::<_, PurchaseOrder>(&sql)
            .bind(&order_id)
            .bind(tenant_id)
            .bind(&input.supplier_id)
            .bind(&order_number)
            .bind(PurchaseOrderStatus::Draft)
            .bind(total)
            .bind(total)
            .bind(input.expected_date)
            .bind(&input.notes)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(&order_number))?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            stock::require_product(&mut tx, tenant_id, &item.product_id).await?;

            let sql = format!(
                "INSERT INTO purchase_order_items ({ORDER_ITEM_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, 0) RETURNING {ORDER_ITEM_COLUMNS}"
            );
            let row = sqlx::query_as::<_, PurchaseOrderItem>(&sql)
                .bind(Uuid::new_v4().to_string())
                .bind(&order_id)
                .bind(&item.product_id)
                .bind(item.quantity)
                .bind(item.unit_price_cents)
                .bind(item.quantity * item.unit_price_cents)
                .fetch_one(&mut *tx)
                .await?;
            items.push(row);
        }

        tx.commit().await?;

        info!(order_id = %order.id, order_number = %order.order_number, tenant_id, "Purchase order created");
        Ok(PurchaseOrderDetail { order, items })
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<PurchaseOrderDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = find_order(&mut conn, tenant_id, id).await? else {
            return Ok(None);
        };
        let items = order_items(&mut conn, &order.id).await?;
        Ok(Some(PurchaseOrderDetail { order, items }))
    }

    /// Newest first.
    pub async fn list(
        &self,
        tenant_id: &str,
        filter: &PurchaseOrderFilter,
        page: PageRequest,
    ) -> DbResult<Page<PurchaseOrder>> {
        let condition = "tenant_id = ?1 \
             AND (?2 IS NULL OR supplier_id = ?2) \
             AND (?3 IS NULL OR status = ?3)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM purchase_orders WHERE {condition}"))
            .bind(tenant_id)
            .bind(&filter.supplier_id)
            .bind(filter.status)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE {condition} \
             ORDER BY created_at DESC LIMIT ?4 OFFSET ?5"
        );
        let orders = sqlx::query_as::<_, PurchaseOrder>(&sql)
            .bind(tenant_id)
            .bind(&filter.supplier_id)
            .bind(filter.status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(orders, page, total))
    }

    /// Receives an open order into the default inventory.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown order, or a line that isn't part of it
    /// - `CoreError::InvalidStatusTransition` when the order is RECEIVED or
    ///   CANCELLED, including a second receive of the same order
    /// - `CoreError::NoDefaultInventory`
    pub async fn receive(&self, actor: &Actor, id: &str, input: &ReceiveOrder) -> DbResult<PurchaseOrderDetail> {
        let mut tx = self.pool.begin().await?;

        let order = find_order(&mut tx, &actor.tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrder", id))?;
        if !order.status.can_transition_to(PurchaseOrderStatus::Received) {
            return Err(CoreError::transition("PurchaseOrder", order.status, PurchaseOrderStatus::Received).into());
        }

        let inventory = stock::default_inventory(&mut tx, &actor.tenant_id).await?;
        let items = order_items(&mut tx, &order.id).await?;

        let lines: Vec<ReceiveLine> = if input.items.is_empty() {
            items
                .iter()
                .map(|item| ReceiveLine {
                    item_id: item.id.clone(),
                    received_quantity: item.quantity,
                    batch_number: None,
                    expiry_date: None,
                })
                .collect()
        } else {
            input.items.clone()
        };

        for line in &lines {
            validate_stock_level("received_quantity", line.received_quantity)?;
            let batch = batch_key(line.batch_number.as_deref());
            validate_batch_number(&batch)?;

            let item = items
                .iter()
                .find(|i| i.id == line.item_id)
                .ok_or_else(|| DbError::not_found("PurchaseOrderItem", &line.item_id))?;

            if line.received_quantity > 0 {
                stock::upsert_item(
                    &mut tx,
                    &item.product_id,
                    &inventory.id,
                    &batch,
                    line.received_quantity,
                    line.expiry_date,
                )
                .await?;
                stock::record_movement(
                    &mut tx,
                    &NewMovement {
                        tenant_id: &actor.tenant_id,
                        product_id: &item.product_id,
                        movement_type: MovementType::In,
                        quantity: line.received_quantity,
                        from_inventory_id: None,
                        to_inventory_id: Some(&inventory.id),
                        user_id: &actor.user_id,
                        reason: Some("purchase order received"),
                        reference: Some(&order.order_number),
                    },
                )
                .await?;
            }

            sqlx::query("UPDATE purchase_order_items SET received_quantity = ? WHERE id = ?")
                .bind(line.received_quantity)
                .bind(&item.id)
                .execute(&mut *tx)
                .await?;
        }

        let now = Utc::now();
        let sql = format!(
            "UPDATE purchase_orders SET status = ?, received_date = ?, updated_at = ? \
             WHERE id = ? AND status = ? RETURNING {ORDER_COLUMNS}"
        );
        let received = sqlx::query_as::<_, PurchaseOrder>(&sql)
            .bind(PurchaseOrderStatus::Received)
            .bind(now)
            .bind(now)
            .bind(&order.id)
            .bind(order.status)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::transition("PurchaseOrder", order.status, PurchaseOrderStatus::Received))?;

        let items = order_items(&mut tx, &order.id).await?;
        tx.commit().await?;

        info!(order_id = %order.id, order_number = %order.order_number, lines = lines.len(), "Purchase order received");
        Ok(PurchaseOrderDetail { order: received, items })
    }

    pub async fn cancel(&self, tenant_id: &str, id: &str) -> DbResult<PurchaseOrder> {
        let mut conn = self.pool.acquire().await?;
        let order = find_order(&mut conn, tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrder", id))?;
        if !order.status.can_transition_to(PurchaseOrderStatus::Cancelled) {
            return Err(CoreError::transition("PurchaseOrder", order.status, PurchaseOrderStatus::Cancelled).into());
        }

        debug!(order_id = %id, from = %order.status, "Cancelling purchase order");

        let sql = format!(
            "UPDATE purchase_orders SET status = ?, updated_at = ? \
             WHERE id = ? AND status = ? RETURNING {ORDER_COLUMNS}"
        );
        let cancelled = sqlx::query_as::<_, PurchaseOrder>(&sql)
            .bind(PurchaseOrderStatus::Cancelled)
            .bind(Utc::now())
            .bind(id)
            .bind(order.status)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::transition("PurchaseOrder", order.status, PurchaseOrderStatus::Cancelled))?;
        Ok(cancelled)
    }
}

async fn find_order(conn: &mut SqliteConnection, tenant_id: &str, id: &str) -> DbResult<Option<PurchaseOrder>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = ? AND tenant_id = ?");
    let order = sqlx::query_as::<_, PurchaseOrder>(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(order)
}

async fn order_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<PurchaseOrderItem>> {
    let sql = format!("SELECT {ORDER_ITEM_COLUMNS} FROM purchase_order_items WHERE order_id = ? ORDER BY rowid");
    let items = sqlx::query_as::<_, PurchaseOrderItem>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::supplier::NewSupplier;
    use crate::repository::test_support::{fixture, tenant, Fixture};
    use chrono::Duration;

    async fn draft(f: &Fixture, product_id: &str, quantity: i64) -> PurchaseOrderDetail {
        let supplier = f
            .db
            .suppliers()
            .create(
                &f.actor.tenant_id,
                &NewSupplier {
                    name: "Ibnsina Pharma".to_string(),
                    ..NewSupplier::default()
                },
            )
            .await
            .unwrap();

        f.db.purchase_orders()
            .create(
                &f.actor.tenant_id,
                &NewPurchaseOrder {
                    supplier_id: supplier.id,
                    items: vec![NewPurchaseOrderItem {
                        product_id: product_id.to_string(),
                        quantity,
                        unit_price_cents: 2_000,
                    }],
                    expected_date: None,
                    notes: None,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_computes_totals() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        let order = draft(&f, &product.id, 100).await;

        assert_eq!(order.order.status, PurchaseOrderStatus::Draft);
        assert!(order.order.order_number.starts_with("PO-"));
        assert_eq!(order.order.total_cents, 200_000);
        assert_eq!(order.items[0].total_cents, 200_000);
        assert_eq!(order.items[0].received_quantity, 0);
    }

    #[tokio::test]
    async fn test_receive_adds_stock_once() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        let order = draft(&f, &product.id, 100).await;
        let expiry = Utc::now().date_naive() + Duration::days(365);

        let receipt = ReceiveOrder {
            items: vec![ReceiveLine {
                item_id: order.items[0].id.clone(),
                received_quantity: 96,
                batch_number: Some("L2401".to_string()),
                expiry_date: Some(expiry),
            }],
        };
        let received = f
            .db
            .purchase_orders()
            .receive(&f.actor, &order.order.id, &receipt)
            .await
            .unwrap();

        assert_eq!(received.order.status, PurchaseOrderStatus::Received);
        assert!(received.order.received_date.is_some());
        assert_eq!(received.items[0].received_quantity, 96);
        assert_eq!(f.total_stock(&product.id).await, 96);

        let again = f.db.purchase_orders().receive(&f.actor, &order.order.id, &receipt).await;
        assert!(matches!(
            again,
            Err(DbError::Domain(CoreError::InvalidStatusTransition { .. }))
        ));
        assert_eq!(f.total_stock(&product.id).await, 96);
    }

    #[tokio::test]
    async fn test_receive_everything_by_default() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        let order = draft(&f, &product.id, 40).await;

        f.db.purchase_orders()
            .receive(&f.actor, &order.order.id, &ReceiveOrder::default())
            .await
            .unwrap();
        assert_eq!(f.total_stock(&product.id).await, 40);
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_received() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        let order = draft(&f, &product.id, 10).await;

        let cancelled = f.db.purchase_orders().cancel(&f.actor.tenant_id, &order.order.id).await.unwrap();
        assert_eq!(cancelled.status, PurchaseOrderStatus::Cancelled);

        assert!(f
            .db
            .purchase_orders()
            .receive(&f.actor, &order.order.id, &ReceiveOrder::default())
            .await
            .is_err());
        assert_eq!(f.total_stock(&product.id).await, 0);
    }

    #[tokio::test]
    async fn test_orders_are_tenant_scoped() {
        let f = fixture().await;
        let other = tenant(&f.db, "delta").await;
        let product = f.product("Panadol", 4_500).await;
        let order = draft(&f, &product.id, 10).await;

        assert!(other
            .db
            .purchase_orders()
            .get(&other.actor.tenant_id, &order.order.id)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            other
                .db
                .purchase_orders()
                .receive(&other.actor, &order.order.id, &ReceiveOrder::default())
                .await,
            Err(DbError::NotFound { .. })
        ));

        let listed = f
            .db
            .purchase_orders()
            .list(&f.actor.tenant_id, &PurchaseOrderFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.pagination.total, 1);
    }
}
