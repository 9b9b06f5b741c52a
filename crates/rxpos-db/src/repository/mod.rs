//! # Repository Module
//!
//! Tenant-scoped database access for rxpos.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Route handler                                                          │
//! │       │  db.sales().checkout(&actor, &new_sale)                         │
//! │       ▼                                                                 │
//! │  SaleRepository                                                         │
//! │  ├── BEGIN                                                              │
//! │  ├── stock::default_inventory(&mut tx, tenant)                         │
//! │  ├── stock::decrement_item(&mut tx, ...)   ← conditional UPDATE        │
//! │  ├── stock::record_movement(&mut tx, ...)                              │
//! │  └── COMMIT (or drop → ROLLBACK)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every method takes the caller's `tenant_id` and filters by it; a row of
//! another tenant is reported exactly like a missing one.
//!
//! ## Available Repositories
//!
//! - [`TenantRepository`](tenant::TenantRepository) - Provisioning and tenant admin
//! - [`UserRepository`](user::UserRepository) - Accounts and credentials
//! - [`ProductRepository`](product::ProductRepository) - Catalog with stock totals
//! - [`CategoryRepository`](category::CategoryRepository) - Product groupings
//! - [`InventoryRepository`](inventory::InventoryRepository) - Locations and stock mutations
//! - [`SaleRepository`](sale::SaleRepository) - Checkout, refund, reporting
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and balances
//! - [`SupplierRepository`](supplier::SupplierRepository) - Suppliers
//! - [`PurchaseOrderRepository`](purchase_order::PurchaseOrderRepository) - Ordering and receiving

pub mod category;
pub mod customer;
pub mod inventory;
pub mod product;
pub mod purchase_order;
pub mod sale;
pub mod stock;
pub mod supplier;
pub mod tenant;
pub mod user;

/// Who is performing a mutation: the tenant it is scoped to and the user
/// recorded on stock movements and sales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub tenant_id: String,
    pub user_id: String,
}

impl Actor {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Actor {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// `%term%` for `LIKE` filters, or `None` for a blank search.
pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the repository tests.

    use chrono::NaiveDate;

    use super::inventory::AddStock;
    use super::product::NewProduct;
    use super::tenant::NewRegistration;
    use super::Actor;
    use crate::{Database, DbConfig};
    use rxpos_core::{Product, TenantStatus};

    pub struct Fixture {
        pub db: Database,
        pub actor: Actor,
        pub default_inventory_id: String,
    }

    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn registration(username: &str) -> NewRegistration {
        NewRegistration {
            pharmacy_name: format!("{username} Pharmacy"),
            email: format!("{username}@pharmacy.example"),
            phone: "01001234567".to_string(),
            address: "12 Tahrir Street".to_string(),
            city: "Cairo".to_string(),
            owner_name: "Salma Adel".to_string(),
            username: username.to_string(),
            password_hash: "$argon2id$v=19$test".to_string(),
        }
    }

    /// Registers and activates a tenant on `db`.
    pub async fn tenant(db: &Database, username: &str) -> Fixture {
        let (tenant, owner) = db.tenants().register(&registration(username)).await.unwrap();
        db.tenants()
            .set_status(&tenant.id, TenantStatus::Active)
            .await
            .unwrap();
        let default_inventory = db.inventory().default_inventory(&tenant.id).await.unwrap();

        Fixture {
            db: db.clone(),
            actor: Actor::new(tenant.id, owner.id),
            default_inventory_id: default_inventory.id,
        }
    }

    pub async fn fixture() -> Fixture {
        let db = database().await;
        tenant(&db, "nile").await
    }

    pub fn new_product(name: &str, price_cents: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            selling_price_cents: price_cents,
            cost_price_cents: Some(price_cents / 2),
            ..NewProduct::default()
        }
    }

    impl Fixture {
        pub async fn product(&self, name: &str, price_cents: i64) -> Product {
            self.db
                .products()
                .create(&self.actor.tenant_id, &new_product(name, price_cents))
                .await
                .unwrap()
        }

        pub async fn stock(&self, product_id: &str, batch: &str, quantity: i64, expiry: Option<NaiveDate>) {
            self.db
                .inventory()
                .add_stock(
                    &self.actor,
                    &AddStock {
                        product_id: product_id.to_string(),
                        inventory_id: self.default_inventory_id.clone(),
                        quantity,
                        batch_number: Some(batch.to_string()),
                        expiry_date: expiry,
                        cost_price_cents: None,
                    },
                )
                .await
                .unwrap();
        }

        pub async fn total_stock(&self, product_id: &str) -> i64 {
            self.db
                .products()
                .get(&self.actor.tenant_id, product_id)
                .await
                .unwrap()
                .unwrap()
                .total_stock
        }
    }
}
