//! # Tenant Repository
//!
//! Provisioning of new pharmacies and the super-admin view of them.
//!
//! ## Registration
//! ```text
//! BEGIN
//!   INSERT tenants      (PENDING, FREE)
//!   INSERT users        (PHARMACY_OWNER)
//!   INSERT inventories  ("Main Store", is_default = 1)
//!   INSERT categories × 4
//! COMMIT
//! ```
//! A tenant therefore never exists without its default inventory.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use crate::repository::user::USER_COLUMNS;
use rxpos_core::validation::{validate_email, validate_length, validate_username};
use rxpos_core::{
    CoreError, Page, PageRequest, SubscriptionPlan, Tenant, TenantStatus, User, UserRole,
    DEFAULT_CATEGORIES, DEFAULT_INVENTORY_NAME,
};

const TENANT_COLUMNS: &str =
    "id, name, email, phone, address, city, status, plan, created_at, updated_at";

/// Self-registration of a pharmacy and its owner.
///
/// The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub pharmacy_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub owner_name: String,
    pub username: String,
    pub password_hash: String,
}

impl NewRegistration {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_length("pharmacy_name", &self.pharmacy_name, 2, 200)?;
        validate_email(&self.email)?;
        validate_length("phone", &self.phone, 10, 20)?;
        validate_length("address", &self.address, 5, 500)?;
        validate_length("city", &self.city, 2, 100)?;
        validate_length("owner_name", &self.owner_name, 2, 200)?;
        validate_username(&self.username)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    /// Matches name, email or city.
    pub search: Option<String>,
}

/// Platform-wide counts for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct PlatformStats {
    pub total_tenants: i64,
    pub pending_tenants: i64,
    pub active_tenants: i64,
    pub suspended_tenants: i64,
    pub cancelled_tenants: i64,
    pub total_users: i64,
    pub total_sales: i64,
}

/// Repository for tenant database operations.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TenantRepository { pool }
    }

    /// Creates a PENDING tenant with its owner, default inventory and
    /// default categories.
    ///
    /// ## Errors
    /// - `UniqueViolation { field: "username" }` when the username is taken
    pub async fn register(&self, input: &NewRegistration) -> DbResult<(Tenant, User)> {
        input.validate()?;

        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4().to_string(),
            name: input.pharmacy_name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            phone: Some(input.phone.trim().to_string()),
            address: Some(input.address.trim().to_string()),
            city: Some(input.city.trim().to_string()),
            status: TenantStatus::Pending,
            plan: SubscriptionPlan::Free,
            created_at: now,
            updated_at: now,
        };

        debug!(tenant_id = %tenant.id, username = %input.username, "Registering tenant");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO tenants (id, name, email, phone, address, city, status, plan, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.email)
        .bind(&tenant.phone)
        .bind(&tenant.address)
        .bind(&tenant.city)
        .bind(tenant.status)
        .bind(tenant.plan)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            "INSERT INTO users (id, tenant_id, username, email, name, password_hash, role, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?) RETURNING {USER_COLUMNS}"
        );
        let owner = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(&tenant.id)
            .bind(input.username.trim())
            .bind(&tenant.email)
            .bind(input.owner_name.trim())
            .bind(&input.password_hash)
            .bind(UserRole::PharmacyOwner)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(input.username.trim()))?;

        sqlx::query(
            "INSERT INTO inventories (id, tenant_id, name, location, is_default, created_at) \
             VALUES (?, ?, ?, NULL, 1, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&tenant.id)
        .bind(DEFAULT_INVENTORY_NAME)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for name in DEFAULT_CATEGORIES {
            sqlx::query(
                "INSERT INTO categories (id, tenant_id, name, description, created_at) \
                 VALUES (?, ?, ?, NULL, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&tenant.id)
            .bind(name)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(tenant_id = %tenant.id, owner_id = %owner.id, "Tenant registered");
        Ok((tenant, owner))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Tenant>> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?");
        let tenant = sqlx::query_as::<_, Tenant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    /// Newest first.
    pub async fn list(&self, filter: &TenantFilter, page: PageRequest) -> DbResult<Page<Tenant>> {
        let search = like_pattern(filter.search.as_deref());
        let condition = "(?1 IS NULL OR status = ?1) \
             AND (?2 IS NULL OR name LIKE ?2 OR email LIKE ?2 OR city LIKE ?2)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tenants WHERE {condition}"))
            .bind(filter.status)
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE {condition} \
             ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
        );
        let tenants = sqlx::query_as::<_, Tenant>(&sql)
            .bind(filter.status)
            .bind(&search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(tenants, page, total))
    }

    /// Moves a tenant along its lifecycle.
    ///
    /// The update is conditional on the status that was validated, so two
    /// concurrent admins cannot both apply a transition from the same state.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown tenant
    /// - `CoreError::InvalidStatusTransition` when the move is not allowed
    pub async fn set_status(&self, id: &str, next: TenantStatus) -> DbResult<Tenant> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Tenant", id))?;

        if !current.status.can_transition_to(next) {
            return Err(CoreError::transition("Tenant", current.status, next).into());
        }

        let sql = format!(
            "UPDATE tenants SET status = ?, updated_at = ? WHERE id = ? AND status = ? \
             RETURNING {TENANT_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Tenant>(&sql)
            .bind(next)
            .bind(Utc::now())
            .bind(id)
            .bind(current.status)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::transition("Tenant", current.status, next))?;

        info!(tenant_id = %id, from = %current.status, to = %next, "Tenant status changed");
        Ok(updated)
    }

    pub async fn stats(&self) -> DbResult<PlatformStats> {
        let stats = sqlx::query_as::<_, PlatformStats>(
            "SELECT \
                 COUNT(*) AS total_tenants, \
                 COALESCE(SUM(status = 'pending'), 0) AS pending_tenants, \
                 COALESCE(SUM(status = 'active'), 0) AS active_tenants, \
                 COALESCE(SUM(status = 'suspended'), 0) AS suspended_tenants, \
                 COALESCE(SUM(status = 'cancelled'), 0) AS cancelled_tenants, \
                 (SELECT COUNT(*) FROM users WHERE tenant_id IS NOT NULL) AS total_users, \
                 (SELECT COUNT(*) FROM sales) AS total_sales \
             FROM tenants",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{database, registration};

    #[tokio::test]
    async fn test_register_provisions_everything() {
        let db = database().await;
        let (tenant, owner) = db.tenants().register(&registration("nile")).await.unwrap();

        assert_eq!(tenant.status, TenantStatus::Pending);
        assert_eq!(tenant.plan, SubscriptionPlan::Free);
        assert_eq!(owner.role, UserRole::PharmacyOwner);
        assert_eq!(owner.tenant_id.as_deref(), Some(tenant.id.as_str()));

        let inventories = db.inventory().list(&tenant.id).await.unwrap();
        assert_eq!(inventories.len(), 1);
        assert!(inventories[0].is_default);
        assert_eq!(inventories[0].name, DEFAULT_INVENTORY_NAME);

        let categories = db.categories().list(&tenant.id).await.unwrap();
        assert_eq!(categories.len(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts_and_rolls_back() {
        let db = database().await;
        db.tenants().register(&registration("nile")).await.unwrap();

        let mut again = registration("nile");
        again.pharmacy_name = "Second Pharmacy".to_string();
        let err = db.tenants().register(&again).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "username"));

        let page = db
            .tenants()
            .list(&TenantFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let db = database().await;
        let mut bad = registration("nile");
        bad.phone = "123".to_string();
        assert!(matches!(
            db.tenants().register(&bad).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = database().await;
        let (tenant, _) = db.tenants().register(&registration("nile")).await.unwrap();
        let repo = db.tenants();

        // PENDING cannot be suspended
        assert!(matches!(
            repo.set_status(&tenant.id, TenantStatus::Suspended).await,
            Err(DbError::Domain(CoreError::InvalidStatusTransition { .. }))
        ));

        let active = repo.set_status(&tenant.id, TenantStatus::Active).await.unwrap();
        assert_eq!(active.status, TenantStatus::Active);
        let suspended = repo.set_status(&tenant.id, TenantStatus::Suspended).await.unwrap();
        assert_eq!(suspended.status, TenantStatus::Suspended);
        let reactivated = repo.set_status(&tenant.id, TenantStatus::Active).await.unwrap();
        assert_eq!(reactivated.status, TenantStatus::Active);

        assert!(matches!(
            repo.set_status("missing", TenantStatus::Active).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_stats() {
        let db = database().await;
        let (first, _) = db.tenants().register(&registration("nile")).await.unwrap();
        db.tenants().register(&registration("delta")).await.unwrap();
        db.tenants().set_status(&first.id, TenantStatus::Active).await.unwrap();

        let active = db
            .tenants()
            .list(
                &TenantFilter {
                    status: Some(TenantStatus::Active),
                    search: None,
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(active.items.len(), 1);
        assert_eq!(active.items[0].id, first.id);

        let searched = db
            .tenants()
            .list(
                &TenantFilter {
                    status: None,
                    search: Some("delta".to_string()),
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(searched.pagination.total, 1);

        let stats = db.tenants().stats().await.unwrap();
        assert_eq!(stats.total_tenants, 2);
        assert_eq!(stats.active_tenants, 1);
        assert_eq!(stats.pending_tenants, 1);
        assert_eq!(stats.total_users, 2);
    }
}
