//! # Sale Repository
//!
//! Checkout, refund and sales reporting.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        checkout(actor, cart)                            │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │  1. default inventory                       → NoDefaultInventory        │
//! │  2. customer (if any) in tenant             → NotFound                  │
//! │  3. products in tenant, price the cart      → NotFound / Validation     │
//! │  4. INSERT sale (COMPLETED, INV-…)                                      │
//! │  5. per line:                                                           │
//! │       FEFO batch with quantity ≥ requested  → InsufficientStock         │
//! │       UPDATE … WHERE quantity >= n          → InsufficientStock (race)  │
//! │       INSERT sale_item (batch, expiry)                                  │
//! │       INSERT movement OUT (reference = invoice)                         │
//! │  6. CREDIT + customer: balance += total − paid                          │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Any error drops the transaction, so a failed checkout leaves no sale,
//! no stock change and no movement behind.
//!
//! Batches are chosen line by line inside the transaction, so a product
//! that appears on two lines sees the stock the first line left.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::customer::{self, CUSTOMER_COLUMNS};
use crate::repository::like_pattern;
use crate::repository::stock::{self, NewMovement};
use crate::repository::Actor;
use rxpos_core::fefo::{largest_batch_quantity, select_batch};
use rxpos_core::numbering::new_invoice_number;
use rxpos_core::pricing::{price_cart, LineInput};
use rxpos_core::validation::{validate_length, validate_optional_length};
use rxpos_core::{
    CoreError, Customer, Money, MovementType, Page, PageRequest, PaymentMethod, Sale, SaleItem,
    SaleStatus, MAX_CART_ITEMS,
};

const SALE_COLUMNS: &str = "id, tenant_id, invoice_number, customer_id, user_id, subtotal_cents, \
    tax_cents, discount_cents, total_cents, paid_cents, change_cents, payment_method, status, \
    prescription_number, doctor_name, notes, created_at, updated_at";

const SALE_ITEM_COLUMNS: &str = "id, sale_id, product_id, quantity, unit_price_cents, \
    discount_cents, tax_cents, line_total_cents, batch_number, expiry_date, created_at";

// =============================================================================
// Inputs / Outputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSale {
    pub items: Vec<NewSaleItem>,
    pub customer_id: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Order-level discount, applied after tax.
    #[serde(default)]
    pub discount_cents: i64,
    pub paid_cents: i64,
    pub prescription_number: Option<String>,
    pub doctor_name: Option<String>,
    pub notes: Option<String>,
}

/// Whether a refund gives back the credit a CREDIT sale charged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefundPolicy {
    pub reverse_credit: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub customer_id: Option<String>,
    /// Matches the invoice number.
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// A sale line with the name of what was sold.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleLine {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: SaleItem,
    pub product_name: String,
}

/// A sale with its lines and customer expanded.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleLine>,
    pub customer: Option<Customer>,
}

/// Today's takings, COMPLETED sales only.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct DailySummary {
    pub sale_count: i64,
    pub total_cents: i64,
    pub tax_cents: i64,
    pub cash_cents: i64,
    pub card_cents: i64,
    pub mobile_wallet_cents: i64,
    pub credit_cents: i64,
    pub refunded_count: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Sells a cart from the default inventory.
    ///
    /// ## Errors
    /// - `CoreError::EmptyCart` / `CartTooLarge` / validation errors
    /// - `CoreError::NoDefaultInventory`
    /// - `NotFound` for a product or customer outside the tenant
    /// - `CoreError::InsufficientStock` naming the first line no single
    ///   batch can cover
    pub async fn checkout(&self, actor: &Actor, input: &NewSale) -> DbResult<SaleDetail> {
        if input.items.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        if input.items.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS }.into());
        }
        validate_optional_length("prescription_number", input.prescription_number.as_deref(), 1, 100)?;
        validate_optional_length("doctor_name", input.doctor_name.as_deref(), 1, 200)?;
        validate_optional_length("notes", input.notes.as_deref(), 1, 1000)?;

        let mut tx = self.pool.begin().await?;

        let inventory = stock::default_inventory(&mut tx, &actor.tenant_id).await?;

        if let Some(customer_id) = &input.customer_id {
            find_customer(&mut tx, &actor.tenant_id, customer_id)
                .await?
                .ok_or_else(|| DbError::not_found("Customer", customer_id))?;
        }

        let mut products = Vec::with_capacity(input.items.len());
        for item in &input.items {
            products.push(stock::require_product(&mut tx, &actor.tenant_id, &item.product_id).await?);
        }

        let lines: Vec<LineInput> = input
            .items
            .iter()
            .zip(&products)
            .map(|(item, product)| LineInput {
                quantity: item.quantity,
                unit_price: Money::from_cents(item.unit_price_cents),
                discount: Money::from_cents(item.discount_cents),
                tax_rate: product.effective_tax_rate(),
            })
            .collect();
        let totals = price_cart(
            &lines,
            Money::from_cents(input.discount_cents),
            Money::from_cents(input.paid_cents),
            input.payment_method,
        )?;

        let now = Utc::now();
        let sale_id = Uuid::new_v4().to_string();
        let invoice_number = new_invoice_number();

        debug!(sale_id = %sale_id, invoice = %invoice_number, lines = lines.len(), "Checking out");

        let sql = format!(
            "INSERT INTO sales ({SALE_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(&sale_id)
            .bind(&actor.tenant_id)
            .bind(&invoice_number)
            .bind(&input.customer_id)
            .bind(&actor.user_id)
            .bind(totals.subtotal.cents())
            .bind(totals.tax.cents())
            .bind(totals.discount.cents())
            .bind(totals.total.cents())
            .bind(totals.paid.cents())
            .bind(totals.change.cents())
            .bind(input.payment_method)
            .bind(SaleStatus::Completed)
            .bind(&input.prescription_number)
            .bind(&input.doctor_name)
            .bind(&input.notes)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(&invoice_number))?;

        for ((item, product), priced) in input.items.iter().zip(&products).zip(&totals.lines) {
            let batches = stock::in_stock_batches(&mut tx, &product.id, &inventory.id).await?;
            let insufficient = |available| CoreError::InsufficientStock {
                product: product.name.clone(),
                available,
                requested: item.quantity,
            };
            let Some(batch) = select_batch(&batches, item.quantity) else {
                return Err(insufficient(largest_batch_quantity(&batches)).into());
            };

            if !stock::decrement_item(&mut tx, &batch.id, item.quantity).await? {
                warn!(product_id = %product.id, batch = %batch.batch_number, "Batch decrement lost a race");
                return Err(insufficient(batch.quantity).into());
            }

            sqlx::query(&format!(
                "INSERT INTO sale_items ({SALE_ITEM_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ))
            .bind(Uuid::new_v4().to_string())
            .bind(&sale_id)
            .bind(&product.id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.discount_cents)
            .bind(priced.tax.cents())
            .bind(priced.line_total.cents())
            .bind(&batch.batch_number)
            .bind(batch.expiry_date)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            stock::record_movement(
                &mut tx,
                &NewMovement {
                    tenant_id: &actor.tenant_id,
                    product_id: &product.id,
                    movement_type: MovementType::Out,
                    quantity: item.quantity,
                    from_inventory_id: Some(&inventory.id),
                    to_inventory_id: None,
                    user_id: &actor.user_id,
                    reason: Some("sale"),
                    reference: Some(&invoice_number),
                },
            )
            .await?;
        }

        if let Some(customer_id) = &input.customer_id {
            if totals.credit.is_positive() {
                change_balance(&mut tx, &actor.tenant_id, customer_id, totals.credit.cents()).await?;
            }
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            invoice = %invoice_number,
            total_cents = totals.total.cents(),
            payment_method = %input.payment_method,
            "Sale completed"
        );

        self.get(&actor.tenant_id, &sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", &sale_id))
    }

    /// Returns every line of a COMPLETED sale to the default inventory and
    /// marks it REFUNDED.
    ///
    /// ## Errors
    /// - `NotFound` for a sale outside the tenant
    /// - `CoreError::SaleNotRefundable` unless the sale is COMPLETED
    /// - `CoreError::NoDefaultInventory`
    pub async fn refund(&self, actor: &Actor, id: &str, reason: &str, policy: RefundPolicy) -> DbResult<SaleDetail> {
        validate_length("reason", reason, 1, 500)?;
        let reason = reason.trim();

        let mut tx = self.pool.begin().await?;

        let sale = find_sale(&mut tx, &actor.tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;
        let not_refundable = |status: SaleStatus| CoreError::SaleNotRefundable {
            sale_id: id.to_string(),
            status: status.to_string(),
        };
        if !sale.status.is_refundable() {
            return Err(not_refundable(sale.status).into());
        }

        let inventory = stock::default_inventory(&mut tx, &actor.tenant_id).await?;
        let items = sale_items(&mut tx, &sale.id).await?;

        for item in &items {
            stock::upsert_item(
                &mut tx,
                &item.product_id,
                &inventory.id,
                &item.batch_number,
                item.quantity,
                item.expiry_date,
            )
            .await?;
            stock::record_movement(
                &mut tx,
                &NewMovement {
                    tenant_id: &actor.tenant_id,
                    product_id: &item.product_id,
                    movement_type: MovementType::Return,
                    quantity: item.quantity,
                    from_inventory_id: None,
                    to_inventory_id: Some(&inventory.id),
                    user_id: &actor.user_id,
                    reason: Some(reason),
                    reference: Some(&sale.invoice_number),
                },
            )
            .await?;
        }

        let note = format!("Refund: {reason}");
        let updated = sqlx::query(
            "UPDATE sales SET status = ?, \
                 notes = CASE WHEN notes IS NULL OR notes = '' THEN ? ELSE notes || char(10) || ? END, \
                 updated_at = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(SaleStatus::Refunded)
        .bind(&note)
        .bind(&note)
        .bind(Utc::now())
        .bind(&sale.id)
        .bind(SaleStatus::Completed)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(not_refundable(sale.status).into());
        }

        if policy.reverse_credit {
            if let Some(customer_id) = &sale.customer_id {
                let credit = sale.credit_amount();
                if credit.is_positive() {
                    change_balance(&mut tx, &actor.tenant_id, customer_id, -credit.cents()).await?;
                }
            }
        }

        tx.commit().await?;

        info!(sale_id = %sale.id, invoice = %sale.invoice_number, lines = items.len(), "Sale refunded");

        self.get(&actor.tenant_id, &sale.id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", &sale.id))
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;

        let Some(sale) = find_sale(&mut conn, tenant_id, id).await? else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, SaleLine>(
            "SELECT si.id, si.sale_id, si.product_id, si.quantity, si.unit_price_cents, \
                 si.discount_cents, si.tax_cents, si.line_total_cents, si.batch_number, \
                 si.expiry_date, si.created_at, p.name AS product_name \
             FROM sale_items si JOIN products p ON p.id = si.product_id \
             WHERE si.sale_id = ? ORDER BY si.rowid",
        )
        .bind(&sale.id)
        .fetch_all(&mut *conn)
        .await?;

        let customer = match &sale.customer_id {
            Some(customer_id) => find_customer(&mut conn, tenant_id, customer_id).await?,
            None => None,
        };

        Ok(Some(SaleDetail { sale, items, customer }))
    }

    /// Newest first.
    pub async fn list(&self, tenant_id: &str, filter: &SaleFilter, page: PageRequest) -> DbResult<Page<Sale>> {
        let search = like_pattern(filter.search.as_deref());
        let condition = "tenant_id = ?1 \
             AND (?2 IS NULL OR status = ?2) \
             AND (?3 IS NULL OR payment_method = ?3) \
             AND (?4 IS NULL OR customer_id = ?4) \
             AND (?5 IS NULL OR invoice_number LIKE ?5) \
             AND (?6 IS NULL OR created_at >= ?6) \
             AND (?7 IS NULL OR created_at < ?7)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM sales WHERE {condition}"))
            .bind(tenant_id)
            .bind(filter.status)
            .bind(filter.payment_method)
            .bind(&filter.customer_id)
            .bind(&search)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE {condition} \
             ORDER BY created_at DESC LIMIT ?8 OFFSET ?9"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(tenant_id)
            .bind(filter.status)
            .bind(filter.payment_method)
            .bind(&filter.customer_id)
            .bind(&search)
            .bind(filter.from)
            .bind(filter.to)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(sales, page, total))
    }

    /// Totals for sales created since midnight UTC.
    pub async fn today_summary(&self, tenant_id: &str) -> DbResult<DailySummary> {
        let since = Utc::now().date_naive().and_time(NaiveTime::default()).and_utc();

        let summary = sqlx::query_as::<_, DailySummary>(
            "SELECT \
                 COALESCE(SUM(status = 'completed'), 0) AS sale_count, \
                 COALESCE(SUM(CASE WHEN status = 'completed' THEN total_cents END), 0) AS total_cents, \
                 COALESCE(SUM(CASE WHEN status = 'completed' THEN tax_cents END), 0) AS tax_cents, \
                 COALESCE(SUM(CASE WHEN status = 'completed' AND payment_method = 'cash' \
                              THEN total_cents END), 0) AS cash_cents, \
                 COALESCE(SUM(CASE WHEN status = 'completed' AND payment_method = 'card' \
                              THEN total_cents END), 0) AS card_cents, \
                 COALESCE(SUM(CASE WHEN status = 'completed' AND payment_method = 'mobile_wallet' \
                              THEN total_cents END), 0) AS mobile_wallet_cents, \
                 COALESCE(SUM(CASE WHEN status = 'completed' AND payment_method = 'credit' \
                              THEN total_cents END), 0) AS credit_cents, \
                 COALESCE(SUM(status = 'refunded'), 0) AS refunded_count \
             FROM sales WHERE tenant_id = ? AND created_at >= ?",
        )
        .bind(tenant_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }
}

async fn find_sale(conn: &mut SqliteConnection, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ? AND tenant_id = ?");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(sale)
}

async fn sale_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let sql = format!("SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ? ORDER BY rowid");
    let items = sqlx::query_as::<_, SaleItem>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

async fn find_customer(conn: &mut SqliteConnection, tenant_id: &str, id: &str) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ? AND tenant_id = ?");
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(customer)
}

async fn change_balance(conn: &mut SqliteConnection, tenant_id: &str, customer_id: &str, delta_cents: i64) -> DbResult<()> {
    customer::apply_balance_delta(conn, tenant_id, customer_id, delta_cents).await?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::customer::NewCustomer;
    use crate::repository::inventory::{MovementFilter, WriteOffStock};
    use crate::repository::test_support::{fixture, new_product, tenant, Fixture};
    use rxpos_core::ValidationError;
    use chrono::Duration;

    fn line(product_id: &str, quantity: i64, unit_price_cents: i64) -> NewSaleItem {
        NewSaleItem {
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents,
            discount_cents: 0,
        }
    }

    fn cart(items: Vec<NewSaleItem>, paid_cents: i64) -> NewSale {
        NewSale {
            items,
            customer_id: None,
            payment_method: PaymentMethod::Cash,
            discount_cents: 0,
            paid_cents,
            prescription_number: None,
            doctor_name: None,
            notes: None,
        }
    }

    async fn batch_quantity(f: &Fixture, product_id: &str, batch: &str) -> i64 {
        let mut conn = f.db.pool().acquire().await.unwrap();
        stock::find_item(&mut conn, product_id, &f.default_inventory_id, batch)
            .await
            .unwrap()
            .map(|i| i.quantity)
            .unwrap_or(0)
    }

    async fn sale_count(f: &Fixture) -> i64 {
        f.db.sales()
            .list(&f.actor.tenant_id, &SaleFilter::default(), PageRequest::default())
            .await
            .unwrap()
            .pagination
            .total
    }

    async fn customer(f: &Fixture) -> Customer {
        f.db.customers()
            .create(
                &f.actor.tenant_id,
                &NewCustomer {
                    name: "Mona Ali".to_string(),
                    ..NewCustomer::default()
                },
            )
            .await
            .unwrap()
    }

    async fn exempt_product(f: &Fixture, name: &str, price_cents: i64) -> String {
        let mut input = new_product(name, price_cents);
        input.is_vat_exempt = true;
        f.db.products().create(&f.actor.tenant_id, &input).await.unwrap().id
    }

    #[tokio::test]
    async fn test_checkout_totals_at_fourteen_percent() {
        let f = fixture().await;
        let product = f.product("Augmentin 1g", 10_000).await;
        f.stock(&product.id, "L1", 5, None).await;

        let detail = f
            .db
            .sales()
            .checkout(&f.actor, &cart(vec![line(&product.id, 2, 10_000)], 22_800))
            .await
            .unwrap();

        assert_eq!(detail.sale.subtotal_cents, 20_000);
        assert_eq!(detail.sale.tax_cents, 2_800);
        assert_eq!(detail.sale.total_cents, 22_800);
        assert_eq!(detail.sale.change_cents, 0);
        assert_eq!(detail.sale.status, SaleStatus::Completed);
        assert!(detail.sale.invoice_number.starts_with("INV-"));
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].product_name, "Augmentin 1g");
        assert_eq!(detail.items[0].item.batch_number, "L1");
        assert_eq!(f.total_stock(&product.id).await, 3);
    }

    #[tokio::test]
    async fn test_checkout_picks_soonest_expiry() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        let today = Utc::now().date_naive();
        f.stock(&product.id, "A", 5, Some(today + Duration::days(10))).await;
        f.stock(&product.id, "B", 5, Some(today + Duration::days(100))).await;

        let detail = f
            .db
            .sales()
            .checkout(&f.actor, &cart(vec![line(&product.id, 3, 4_500)], 20_000))
            .await
            .unwrap();

        assert_eq!(detail.items[0].item.batch_number, "A");
        assert_eq!(detail.items[0].item.expiry_date, Some(today + Duration::days(10)));
        assert_eq!(batch_quantity(&f, &product.id, "A").await, 2);
        assert_eq!(batch_quantity(&f, &product.id, "B").await, 5);
    }

    #[tokio::test]
    async fn test_no_single_batch_large_enough() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        f.stock(&product.id, "A", 5, None).await;
        f.stock(&product.id, "B", 8, None).await;

        let err = f
            .db
            .sales()
            .checkout(&f.actor, &cart(vec![line(&product.id, 12, 4_500)], 100_000))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { ref product, available: 8, requested: 12 })
                if product == "Panadol"
        ));
        assert_eq!(f.total_stock(&product.id).await, 13);
        assert_eq!(sale_count(&f).await, 0);
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_whole_sale() {
        let f = fixture().await;
        let panadol = f.product("Panadol", 4_500).await;
        let brufen = f.product("Brufen", 3_000).await;
        f.stock(&panadol.id, "P1", 10, None).await;
        f.stock(&brufen.id, "B1", 1, None).await;

        let result = f
            .db
            .sales()
            .checkout(
                &f.actor,
                &cart(vec![line(&panadol.id, 2, 4_500), line(&brufen.id, 2, 3_000)], 50_000),
            )
            .await;

        assert!(matches!(result, Err(DbError::Domain(CoreError::InsufficientStock { .. }))));
        assert_eq!(f.total_stock(&panadol.id).await, 10);
        assert_eq!(f.total_stock(&brufen.id).await, 1);
        assert_eq!(sale_count(&f).await, 0);

        let movements = f
            .db
            .inventory()
            .movements(&f.actor.tenant_id, &Default::default(), PageRequest::default())
            .await
            .unwrap();
        assert!(movements.items.iter().all(|m| m.movement_type == MovementType::In));
    }

    #[tokio::test]
    async fn test_repeated_product_sees_earlier_lines() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        f.stock(&product.id, "A", 5, None).await;

        let result = f
            .db
            .sales()
            .checkout(
                &f.actor,
                &cart(vec![line(&product.id, 3, 4_500), line(&product.id, 3, 4_500)], 50_000),
            )
            .await;

        assert!(matches!(
            result,
            Err(DbError::Domain(CoreError::InsufficientStock { available: 2, .. }))
        ));
        assert_eq!(f.total_stock(&product.id).await, 5);
    }

    #[tokio::test]
    async fn test_credit_sale_charges_customer() {
        let f = fixture().await;
        let product_id = exempt_product(&f, "Glucometer strips", 15_000).await;
        f.stock(&product_id, "S1", 5, None).await;
        let mona = customer(&f).await;

        let mut credit = cart(vec![line(&product_id, 1, 15_000)], 0);
        credit.customer_id = Some(mona.id.clone());
        credit.payment_method = PaymentMethod::Credit;
        let detail = f.db.sales().checkout(&f.actor, &credit).await.unwrap();

        assert_eq!(detail.sale.total_cents, 15_000);
        let charged = detail.customer.unwrap();
        assert_eq!(charged.balance_cents, 15_000);

        let mut cash = cart(vec![line(&product_id, 1, 15_000)], 15_000);
        cash.customer_id = Some(mona.id.clone());
        f.db.sales().checkout(&f.actor, &cash).await.unwrap();

        let after = f.db.customers().get(&f.actor.tenant_id, &mona.id).await.unwrap().unwrap();
        assert_eq!(after.balance_cents, 15_000);
    }

    #[tokio::test]
    async fn test_credit_without_customer_is_allowed() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        f.stock(&product.id, "A", 5, None).await;

        let mut credit = cart(vec![line(&product.id, 1, 4_500)], 0);
        credit.payment_method = PaymentMethod::Credit;
        let detail = f.db.sales().checkout(&f.actor, &credit).await.unwrap();
        assert!(detail.customer.is_none());
    }

    #[tokio::test]
    async fn test_refund_restores_stock_once() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        let expiry = Utc::now().date_naive() + Duration::days(30);
        f.stock(&product.id, "A", 5, Some(expiry)).await;

        let sold = f
            .db
            .sales()
            .checkout(&f.actor, &cart(vec![line(&product.id, 3, 4_500)], 20_000))
            .await
            .unwrap();
        assert_eq!(f.total_stock(&product.id).await, 2);

        let refunded = f
            .db
            .sales()
            .refund(&f.actor, &sold.sale.id, "Wrong strength", RefundPolicy::default())
            .await
            .unwrap();
        assert_eq!(refunded.sale.status, SaleStatus::Refunded);
        assert_eq!(refunded.sale.notes.as_deref(), Some("Refund: Wrong strength"));
        assert_eq!(refunded.sale.total_cents, sold.sale.total_cents);
        assert_eq!(f.total_stock(&product.id).await, 5);
        assert_eq!(batch_quantity(&f, &product.id, "A").await, 5);

        let again = f
            .db
            .sales()
            .refund(&f.actor, &sold.sale.id, "Again", RefundPolicy::default())
            .await;
        assert!(matches!(again, Err(DbError::Domain(CoreError::SaleNotRefundable { .. }))));
        assert_eq!(f.total_stock(&product.id).await, 5);
    }

    #[tokio::test]
    async fn test_refund_credit_policy() {
        let f = fixture().await;
        let product_id = exempt_product(&f, "Glucometer strips", 15_000).await;
        f.stock(&product_id, "S1", 5, None).await;
        let mona = customer(&f).await;

        let mut credit = cart(vec![line(&product_id, 1, 15_000)], 0);
        credit.customer_id = Some(mona.id.clone());
        credit.payment_method = PaymentMethod::Credit;

        let first = f.db.sales().checkout(&f.actor, &credit).await.unwrap();
        let kept = f
            .db
            .sales()
            .refund(&f.actor, &first.sale.id, "Returned", RefundPolicy::default())
            .await
            .unwrap();
        assert_eq!(kept.customer.unwrap().balance_cents, 15_000);

        let second = f.db.sales().checkout(&f.actor, &credit).await.unwrap();
        let reversed = f
            .db
            .sales()
            .refund(&f.actor, &second.sale.id, "Returned", RefundPolicy { reverse_credit: true })
            .await
            .unwrap();
        assert_eq!(reversed.customer.unwrap().balance_cents, 15_000);
    }

    #[tokio::test]
    async fn test_tenants_cannot_touch_each_others_sales() {
        let f = fixture().await;
        let other = tenant(&f.db, "delta").await;
        let product = f.product("Panadol", 4_500).await;
        f.stock(&product.id, "A", 5, None).await;
        let sold = f
            .db
            .sales()
            .checkout(&f.actor, &cart(vec![line(&product.id, 1, 4_500)], 10_000))
            .await
            .unwrap();

        assert!(other.db.sales().get(&other.actor.tenant_id, &sold.sale.id).await.unwrap().is_none());
        assert!(matches!(
            other.db.sales().refund(&other.actor, &sold.sale.id, "x", RefundPolicy::default()).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            other
                .db
                .sales()
                .checkout(&other.actor, &cart(vec![line(&product.id, 1, 4_500)], 10_000))
                .await,
            Err(DbError::NotFound { .. })
        ));

        let mut foreign_customer = cart(vec![line(&product.id, 1, 4_500)], 10_000);
        foreign_customer.customer_id = Some(customer(&other).await.id);
        assert!(matches!(
            f.db.sales().checkout(&f.actor, &foreign_customer).await,
            Err(DbError::NotFound { .. })
        ));

        assert_eq!(f.total_stock(&product.id).await, 4);
        let mine = f.db.sales().get(&f.actor.tenant_id, &sold.sale.id).await.unwrap().unwrap();
        assert_eq!(mine.sale.status, SaleStatus::Completed);
    }

    #[tokio::test]
    async fn test_today_summary_and_filters() {
        let f = fixture().await;
        let product = f.product("Panadol", 10_000).await;
        f.stock(&product.id, "A", 10, None).await;

        let sales = f.db.sales();
        sales
            .checkout(&f.actor, &cart(vec![line(&product.id, 1, 10_000)], 11_400))
            .await
            .unwrap();
        let mut card = cart(vec![line(&product.id, 2, 10_000)], 22_800);
        card.payment_method = PaymentMethod::Card;
        let card_sale = sales.checkout(&f.actor, &card).await.unwrap();
        let refunded = sales
            .checkout(&f.actor, &cart(vec![line(&product.id, 1, 10_000)], 11_400))
            .await
            .unwrap();
        sales
            .refund(&f.actor, &refunded.sale.id, "Customer changed mind", RefundPolicy::default())
            .await
            .unwrap();

        let summary = sales.today_summary(&f.actor.tenant_id).await.unwrap();
        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.total_cents, 34_200);
        assert_eq!(summary.cash_cents, 11_400);
        assert_eq!(summary.card_cents, 22_800);
        assert_eq!(summary.refunded_count, 1);

        let cards = sales
            .list(
                &f.actor.tenant_id,
                &SaleFilter {
                    payment_method: Some(PaymentMethod::Card),
                    ..SaleFilter::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(cards.items.len(), 1);
        assert_eq!(cards.items[0].id, card_sale.sale.id);
    }

    #[tokio::test]
    async fn test_cart_limits() {
        let f = fixture().await;
        assert!(matches!(
            f.db.sales().checkout(&f.actor, &cart(vec![], 0)).await,
            Err(DbError::Domain(CoreError::EmptyCart))
        ));

        let product = f.product("Panadol", 4_500).await;
        let items = (0..=MAX_CART_ITEMS).map(|_| line(&product.id, 1, 4_500)).collect();
        assert!(matches!(
            f.db.sales().checkout(&f.actor, &cart(items, 0)).await,
            Err(DbError::Domain(CoreError::CartTooLarge { .. }))
        ));

        f.stock(&product.id, "A", 5, None).await;
        let mut discounted = cart(vec![line(&product.id, 1, 4_500)], 10_000);
        discounted.items[0].discount_cents = 5_000;
        assert!(matches!(
            f.db.sales().checkout(&f.actor, &discounted).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert_eq!(f.total_stock(&product.id).await, 5);
    }

    async fn movement_net(f: &Fixture, product_id: &str) -> i64 {
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
            .iter()
            .map(|m| m.net_effect())
            .sum()
    }

    #[tokio::test]
    async fn test_sale_refund_and_write_off_conserve_stock() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        let expired = Utc::now().date_naive() - Duration::days(1);
        f.stock(&product.id, "OLD", 4, Some(expired)).await;
        f.stock(&product.id, "L1", 10, None).await;
        assert_eq!(movement_net(&f, &product.id).await, 14);

        let sold = f
            .db
            .sales()
            .checkout(&f.actor, &cart(vec![line(&product.id, 3, 4_500)], 20_000))
            .await
            .unwrap();
        assert_eq!(f.total_stock(&product.id).await, 11);
        assert_eq!(movement_net(&f, &product.id).await, 11);

        f.db.sales()
            .refund(&f.actor, &sold.sale.id, "Returned", RefundPolicy::default())
            .await
            .unwrap();
        assert_eq!(f.total_stock(&product.id).await, 14);
        assert_eq!(movement_net(&f, &product.id).await, 14);

        f.db.inventory()
            .write_off_expired(
                &f.actor,
                &WriteOffStock {
                    product_id: product.id.clone(),
                    inventory_id: f.default_inventory_id.clone(),
                    batch_number: Some("OLD".to_string()),
                    quantity: 1,
                    reason: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(f.total_stock(&product.id).await, 13);
        assert_eq!(movement_net(&f, &product.id).await, 13);
    }

    #[tokio::test]
    async fn test_oversized_amounts_are_validation_errors() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        f.stock(&product.id, "L1", 10, None).await;

        let err = f
            .db
            .sales()
            .checkout(&f.actor, &cart(vec![line(&product.id, 4, 1 << 62)], 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let err = f
            .db
            .sales()
            .checkout(&f.actor, &cart(vec![line(&product.id, 1, 4_500)], i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        assert_eq!(sale_count(&f).await, 0);
        assert_eq!(f.total_stock(&product.id).await, 10);
    }
}
