//! # Product Repository
//!
//! Tenant catalog with live stock totals.
//!
//! ## Stock Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  total_stock = Σ inventory_items.quantity over every inventory/batch    │
//! │  is_low_stock = total_stock <= min_stock_level                          │
//! │                                                                         │
//! │  Panadol   min 10   Main Store L1: 4, L2: 3   Back Room: 2   → 9  LOW   │
//! │  Augmentin min 10   Main Store DEFAULT: 25                    → 25      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Totals are computed on read; there is no denormalised stock column to
//! drift out of sync with the batches.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use crate::repository::stock::{self, PRODUCT_COLUMNS};
use rxpos_core::numbering::{new_barcode, new_sku};
use rxpos_core::validation::{
    validate_code, validate_length, validate_non_negative_cents, validate_optional_length,
    validate_stock_level, validate_tax_rate_bps,
};
use rxpos_core::{
    InventoryItem, Page, PageRequest, Product, ProductType, DEFAULT_MIN_STOCK_LEVEL,
    DEFAULT_TAX_RATE_BPS,
};

/// Inserts tried before a colliding generated barcode is reported.
const GENERATED_CODE_ATTEMPTS: u32 = 3;

// =============================================================================
// Inputs / Outputs
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub generic_name: Option<String>,
    pub manufacturer: Option<String>,
    pub category_id: Option<String>,
    /// Generated (`PHB…`) when absent.
    pub barcode: Option<String>,
    /// Generated (`PRD-…`) when absent.
    pub sku: Option<String>,
    #[serde(default)]
    pub product_type: ProductType,
    pub cost_price_cents: Option<i64>,
    pub selling_price_cents: i64,
    /// Defaults to 1400 (14%).
    pub tax_rate_bps: Option<i64>,
    #[serde(default)]
    pub is_vat_exempt: bool,
    pub min_stock_level: Option<i64>,
    #[serde(default)]
    pub requires_prescription: bool,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub manufacturer: Option<String>,
    pub category_id: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub product_type: Option<ProductType>,
    pub cost_price_cents: Option<i64>,
    pub selling_price_cents: Option<i64>,
    pub tax_rate_bps: Option<i64>,
    pub is_vat_exempt: Option<bool>,
    pub min_stock_level: Option<i64>,
    pub requires_prescription: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Matches name, generic name, barcode or SKU.
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub low_stock: bool,
    #[serde(default)]
    pub include_inactive: bool,
}

/// A product with its stock summed over every inventory and batch.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductWithStock {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub total_stock: i64,
    pub is_low_stock: bool,
}

/// Barcode scan result: the product and the batches checkout would draw
/// from, soonest expiry first.
#[derive(Debug, Clone, Serialize)]
pub struct ProductLookup {
    #[serde(flatten)]
    pub product: ProductWithStock,
    pub batches: Vec<InventoryItem>,
}

fn validate_product(product: &Product) -> DbResult<()> {
    validate_length("name", &product.name, 1, 200)?;
    validate_optional_length("generic_name", product.generic_name.as_deref(), 1, 200)?;
    validate_optional_length("manufacturer", product.manufacturer.as_deref(), 1, 200)?;
    validate_code("barcode", &product.barcode)?;
    validate_code("sku", &product.sku)?;
    validate_non_negative_cents("cost_price", product.cost_price_cents)?;
    validate_non_negative_cents("selling_price", product.selling_price_cents)?;
    validate_tax_rate_bps(product.tax_rate_bps)?;
    validate_stock_level("min_stock_level", product.min_stock_level)?;
    Ok(())
}

/// Products of one tenant with `total_stock`; callers append their own
/// `WHERE` over the CTE. Parameter `?1` is the tenant id.
fn stocked_products_sql(condition: &str, tail: &str) -> String {
    format!(
        "WITH stocked AS ( \
             SELECT {PRODUCT_COLUMNS}, \
                 COALESCE((SELECT SUM(ii.quantity) FROM inventory_items ii \
                           WHERE ii.product_id = products.id), 0) AS total_stock \
             FROM products WHERE tenant_id = ?1 \
         ) \
         SELECT *, total_stock <= min_stock_level AS is_low_stock \
         FROM stocked WHERE {condition} {tail}"
    )
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product, generating barcode and SKU when not supplied.
    ///
    /// ## Errors
    /// - `UniqueViolation { field: "barcode" }` when the tenant already has it
    /// - `NotFound` when `category_id` is not a category of the tenant
    pub async fn create(&self, tenant_id: &str, input: &NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let generated_barcode = input.barcode.as_deref().map_or(true, |b| b.trim().is_empty());
        let mut product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            category_id: input.category_id.clone(),
            name: input.name.trim().to_string(),
            generic_name: input.generic_name.clone(),
            manufacturer: input.manufacturer.clone(),
            barcode: input
                .barcode
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string)
                .unwrap_or_else(new_barcode),
            sku: input
                .sku
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(new_sku),
            product_type: input.product_type,
            cost_price_cents: input.cost_price_cents.unwrap_or(0),
            selling_price_cents: input.selling_price_cents,
            tax_rate_bps: input.tax_rate_bps.unwrap_or(DEFAULT_TAX_RATE_BPS as i64),
            is_vat_exempt: input.is_vat_exempt,
            min_stock_level: input.min_stock_level.unwrap_or(DEFAULT_MIN_STOCK_LEVEL),
            requires_prescription: input.requires_prescription,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        validate_product(&product)?;
        self.check_category(tenant_id, product.category_id.as_deref()).await?;

        debug!(id = %product.id, barcode = %product.barcode, "Inserting product");

        let sql = format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        let mut attempt = 1;
        loop {
            match bind_product(sqlx::query(&sql), &product).execute(&self.pool).await {
                Ok(_) => break,
                Err(e) => match DbError::from(e) {
                    DbError::UniqueViolation { field, .. }
                        if field == "barcode" && generated_barcode && attempt < GENERATED_CODE_ATTEMPTS =>
                    {
                        warn!(barcode = %product.barcode, attempt, "Generated barcode collided, retrying");
                        product.barcode = new_barcode();
                        attempt += 1;
                    }
                    err => return Err(err.with_duplicate_value(&product.barcode)),
                },
            }
        }

        info!(product_id = %product.id, tenant_id, "Product created");
        Ok(product)
    }

    /// Applies a partial update.
    pub async fn update(&self, tenant_id: &str, id: &str, changes: &ProductUpdate) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        let mut product = stock::require_product(&mut conn, tenant_id, id).await?;
        drop(conn);

        if let Some(name) = &changes.name {
            product.name = name.trim().to_string();
        }
        if changes.generic_name.is_some() {
            product.generic_name = changes.generic_name.clone();
        }
        if changes.manufacturer.is_some() {
            product.manufacturer = changes.manufacturer.clone();
        }
        if changes.category_id.is_some() {
            product.category_id = changes.category_id.clone();
        }
        if let Some(barcode) = &changes.barcode {
            product.barcode = barcode.trim().to_string();
        }
        if let Some(sku) = &changes.sku {
            product.sku = sku.trim().to_string();
        }
        if let Some(product_type) = changes.product_type {
            product.product_type = product_type;
        }
        if let Some(cost) = changes.cost_price_cents {
            product.cost_price_cents = cost;
        }
        if let Some(price) = changes.selling_price_cents {
            product.selling_price_cents = price;
        }
        if let Some(bps) = changes.tax_rate_bps {
            product.tax_rate_bps = bps;
        }
        if let Some(exempt) = changes.is_vat_exempt {
            product.is_vat_exempt = exempt;
        }
        if let Some(level) = changes.min_stock_level {
            product.min_stock_level = level;
        }
        if let Some(rx) = changes.requires_prescription {
            product.requires_prescription = rx;
        }
        if let Some(active) = changes.is_active {
            product.is_active = active;
        }
        product.updated_at = Utc::now();

        validate_product(&product)?;
        self.check_category(tenant_id, product.category_id.as_deref()).await?;

        sqlx::query(
            "UPDATE products SET category_id = ?, name = ?, generic_name = ?, manufacturer = ?, \
                 barcode = ?, sku = ?, product_type = ?, cost_price_cents = ?, \
                 selling_price_cents = ?, tax_rate_bps = ?, is_vat_exempt = ?, \
                 min_stock_level = ?, requires_prescription = ?, is_active = ?, updated_at = ? \
             WHERE id = ? AND tenant_id = ?",
        )
        .bind(&product.category_id)
        .bind(&product.name)
        .bind(&product.generic_name)
        .bind(&product.manufacturer)
        .bind(&product.barcode)
        .bind(&product.sku)
        .bind(product.product_type)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.tax_rate_bps)
        .bind(product.is_vat_exempt)
        .bind(product.min_stock_level)
        .bind(product.requires_prescription)
        .bind(product.is_active)
        .bind(product.updated_at)
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&product.barcode))?;

        Ok(product)
    }

    /// Soft-deletes a product. Sales and movements keep referencing it.
    pub async fn deactivate(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        debug!(id, "Deactivating product");

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ? WHERE id = ? AND tenant_id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Gets a product with its stock total, active or not.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<ProductWithStock>> {
        let sql = stocked_products_sql("id = ?2", "");
        let product = sqlx::query_as::<_, ProductWithStock>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Barcode scan: active products only, with the in-stock batches of the
    /// default inventory in FEFO order.
    pub async fn get_by_barcode(&self, tenant_id: &str, barcode: &str) -> DbResult<Option<ProductLookup>> {
        let mut conn = self.pool.acquire().await?;

        let sql = stocked_products_sql("barcode = ?2 AND is_active = 1", "");
        let Some(product) = sqlx::query_as::<_, ProductWithStock>(&sql)
            .bind(tenant_id)
            .bind(barcode.trim())
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let inventory = stock::default_inventory(&mut conn, tenant_id).await?;
        let batches = stock::in_stock_batches(&mut conn, &product.product.id, &inventory.id).await?;

        Ok(Some(ProductLookup { product, batches }))
    }

    /// Lists products by name.
    pub async fn list(
        &self,
        tenant_id: &str,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> DbResult<Page<ProductWithStock>> {
        let search = like_pattern(filter.search.as_deref());
        let condition = "(?2 IS NULL OR name LIKE ?2 OR generic_name LIKE ?2 \
                              OR barcode LIKE ?2 OR sku LIKE ?2) \
             AND (?3 IS NULL OR category_id = ?3) \
             AND (?4 IS NULL OR product_type = ?4) \
             AND (?5 = 0 OR total_stock <= min_stock_level) \
             AND (?6 = 1 OR is_active = 1)";

        let count_sql = format!(
            "SELECT COUNT(*) FROM ({})",
            stocked_products_sql(condition, "")
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(tenant_id)
            .bind(&search)
            .bind(&filter.category_id)
            .bind(filter.product_type)
            .bind(filter.low_stock)
            .bind(filter.include_inactive)
            .fetch_one(&self.pool)
            .await?;

        let sql = stocked_products_sql(condition, "ORDER BY name ASC LIMIT ?7 OFFSET ?8");
        let items = sqlx::query_as::<_, ProductWithStock>(&sql)
            .bind(tenant_id)
            .bind(&search)
            .bind(&filter.category_id)
            .bind(filter.product_type)
            .bind(filter.low_stock)
            .bind(filter.include_inactive)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    async fn check_category(&self, tenant_id: &str, category_id: Option<&str>) -> DbResult<()> {
        let Some(category_id) = category_id else {
            return Ok(());
        };
        let exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ? AND tenant_id = ?")
                .bind(category_id)
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;
        if exists == 0 {
            return Err(DbError::not_found("Category", category_id));
        }
        Ok(())
    }
}

fn bind_product<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    product: &'q Product,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.category_id)
        .bind(&product.name)
        .bind(&product.generic_name)
        .bind(&product.manufacturer)
        .bind(&product.barcode)
        .bind(&product.sku)
        .bind(product.product_type)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.tax_rate_bps)
        .bind(product.is_vat_exempt)
        .bind(product.min_stock_level)
        .bind(product.requires_prescription)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{fixture, new_product, tenant};
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_generates_codes_and_defaults() {
        let f = fixture().await;
        let product = f.product("Panadol Extra", 4_500).await;

        assert!(product.barcode.starts_with("PHB"));
        assert!(product.sku.starts_with("PRD-"));
        assert_eq!(product.tax_rate_bps, 1400);
        assert_eq!(product.min_stock_level, 10);
        assert!(product.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_barcode_conflicts() {
        let f = fixture().await;
        let mut input = new_product("Panadol", 4_500);
        input.barcode = Some("6221000000017".to_string());
        f.db.products().create(&f.actor.tenant_id, &input).await.unwrap();

        let err = f.db.products().create(&f.actor.tenant_id, &input).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref field, ref value } if field == "barcode" && value == "6221000000017"
        ));
    }

    #[tokio::test]
    async fn test_generated_barcodes_stay_unique() {
        let f = fixture().await;
        let mut barcodes = std::collections::HashSet::new();
        for i in 0..50 {
            let product = f.product(&format!("Item {i}"), 1_000).await;
            assert!(barcodes.insert(product.barcode));
        }
    }

    #[tokio::test]
    async fn test_same_barcode_in_two_tenants() {
        let f = fixture().await;
        let other = tenant(&f.db, "delta").await;
        let mut input = new_product("Panadol", 4_500);
        input.barcode = Some("6221000000017".to_string());

        f.db.products().create(&f.actor.tenant_id, &input).await.unwrap();
        other.db.products().create(&other.actor.tenant_id, &input).await.unwrap();
    }

    #[tokio::test]
    async fn test_stock_total_and_low_stock() {
        let f = fixture().await;
        let product = f.product("Augmentin", 9_000).await;
        f.stock(&product.id, "L1", 4, None).await;
        f.stock(&product.id, "L2", 3, None).await;

        let with_stock = f.db.products().get(&f.actor.tenant_id, &product.id).await.unwrap().unwrap();
        assert_eq!(with_stock.total_stock, 7);
        assert!(with_stock.is_low_stock);

        let low = f
            .db
            .products()
            .list(
                &f.actor.tenant_id,
                &ProductFilter {
                    low_stock: true,
                    ..ProductFilter::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(low.items.len(), 1);

        f.stock(&product.id, "L3", 4, None).await;
        let with_stock = f.db.products().get(&f.actor.tenant_id, &product.id).await.unwrap().unwrap();
        assert!(!with_stock.is_low_stock);
    }

    #[tokio::test]
    async fn test_barcode_lookup_orders_batches_fefo() {
        let f = fixture().await;
        let product = f.product("Brufen 400", 3_000).await;
        let today = Utc::now().date_naive();
        f.stock(&product.id, "LATE", 5, Some(today + Duration::days(200))).await;
        f.stock(&product.id, "SOON", 5, Some(today + Duration::days(20))).await;
        f.stock(&product.id, "DEFAULT", 5, None).await;

        let lookup = f
            .db
            .products()
            .get_by_barcode(&f.actor.tenant_id, &product.barcode)
            .await
            .unwrap()
            .unwrap();
        let order: Vec<_> = lookup.batches.iter().map(|b| b.batch_number.as_str()).collect();
        assert_eq!(order, ["SOON", "LATE", "DEFAULT"]);
        assert_eq!(lookup.product.total_stock, 15);

        f.db.products().deactivate(&f.actor.tenant_id, &product.id).await.unwrap();
        assert!(f
            .db
            .products()
            .get_by_barcode(&f.actor.tenant_id, &product.barcode)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_and_search() {
        let f = fixture().await;
        let product = f.product("Panadol", 4_500).await;
        f.product("Voltaren Gel", 6_000).await;

        let updated = f
            .db
            .products()
            .update(
                &f.actor.tenant_id,
                &product.id,
                &ProductUpdate {
                    selling_price_cents: Some(5_000),
                    is_vat_exempt: Some(true),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.selling_price_cents, 5_000);
        assert!(updated.effective_tax_rate().is_zero());

        let found = f
            .db
            .products()
            .list(
                &f.actor.tenant_id,
                &ProductFilter {
                    search: Some("volt".to_string()),
                    ..ProductFilter::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(found.pagination.total, 1);
        assert_eq!(found.items[0].product.name, "Voltaren Gel");
    }

    #[tokio::test]
    async fn test_other_tenant_sees_nothing() {
        let f = fixture().await;
        let other = tenant(&f.db, "delta").await;
        let product = f.product("Panadol", 4_500).await;

        assert!(other
            .db
            .products()
            .get(&other.actor.tenant_id, &product.id)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            other.db.products().deactivate(&other.actor.tenant_id, &product.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            other
                .db
                .products()
                .update(&other.actor.tenant_id, &product.id, &ProductUpdate::default())
                .await,
            Err(DbError::NotFound { .. })
        ));
    }
}
