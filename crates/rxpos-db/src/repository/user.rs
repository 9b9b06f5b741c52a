//! # User Repository
//!
//! Login accounts. Usernames are unique across the whole platform so a
//! login never needs to name its tenant.
//!
//! Accounts are never deleted; `deactivate` clears `is_active`, which
//! blocks the next login and keeps the user's sales and movements
//! attributable.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use rxpos_core::validation::{validate_email, validate_length, validate_username};
use rxpos_core::{CoreError, User, UserRole, ValidationError};

pub(crate) const USER_COLUMNS: &str =
    "id, tenant_id, username, email, name, password_hash, role, is_active, created_at, updated_at";

/// A staff account created by an owner or manager.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub name: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// Staff-management edit. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

fn reject_privileged_role(role: UserRole) -> DbResult<()> {
    if matches!(role, UserRole::SuperAdmin | UserRole::PharmacyOwner) {
        return Err(CoreError::from(ValidationError::InvalidFormat {
            field: "role".to_string(),
            reason: format!("{role} accounts cannot be created here"),
        })
        .into());
    }
    Ok(())
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list_by_tenant(&self, tenant_id: &str) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE tenant_id = ? ORDER BY created_at");
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Creates a staff user in `tenant_id`.
    ///
    /// Owners are only created by registration and super-admins only by
    /// bootstrap, so both roles are rejected here.
    pub async fn create(&self, tenant_id: &str, input: &NewUser) -> DbResult<User> {
        validate_username(&input.username)?;
        validate_length("name", &input.name, 2, 200)?;
        reject_privileged_role(input.role)?;

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO users (id, tenant_id, username, email, name, password_hash, role, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(tenant_id)
            .bind(input.username.trim())
            .bind(&input.email)
            .bind(input.name.trim())
            .bind(&input.password_hash)
            .bind(input.role)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(input.username.trim()))?;

        info!(user_id = %user.id, tenant_id, role = %user.role, "User created");
        Ok(user)
    }

    /// Edits a staff account of `tenant_id`.
    ///
    /// ## Errors
    /// - `NotFound` for a user outside the tenant
    /// - `ValidationError` when promoting to owner or super-admin
    /// - `CoreError::ProtectedAccount` when disabling or re-roling an owner
    pub async fn update(&self, tenant_id: &str, id: &str, changes: &UserUpdate) -> DbResult<User> {
        if let Some(name) = &changes.name {
            validate_length("name", name, 2, 200)?;
        }
        if let Some(email) = &changes.email {
            validate_email(email)?;
        }
        if let Some(role) = changes.role {
            reject_privileged_role(role)?;
        }

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND tenant_id = ?");
        let current = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        let protected = matches!(current.role, UserRole::SuperAdmin | UserRole::PharmacyOwner);
        if protected && (changes.role.is_some_and(|r| r != current.role) || changes.is_active == Some(false)) {
            return Err(CoreError::ProtectedAccount {
                username: current.username,
                role: current.role.to_string(),
            }
            .into());
        }

        let sql = format!(
            "UPDATE users SET \
                 name = COALESCE(?, name), \
                 email = COALESCE(?, email), \
                 role = COALESCE(?, role), \
                 is_active = COALESCE(?, is_active), \
                 password_hash = COALESCE(?, password_hash), \
                 updated_at = ? \
             WHERE id = ? AND tenant_id = ? RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(changes.name.as_deref().map(str::trim))
            .bind(changes.email.as_deref().map(str::trim))
            .bind(changes.role)
            .bind(changes.is_active)
            .bind(&changes.password_hash)
            .bind(Utc::now())
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        info!(user_id = %user.id, tenant_id, role = %user.role, is_active = user.is_active, "User updated");
        Ok(user)
    }

    /// Soft-deletes a staff account.
    pub async fn deactivate(&self, tenant_id: &str, id: &str) -> DbResult<User> {
        debug!(id, "Deactivating user");
        self.update(
            tenant_id,
            id,
            &UserUpdate {
                is_active: Some(false),
                ..UserUpdate::default()
            },
        )
        .await
    }

    pub async fn update_password(&self, id: &str, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    /// Creates the bootstrap super-admin unless the username already exists.
    ///
    /// Returns `true` when a new account was written.
    pub async fn ensure_super_admin(&self, username: &str, name: &str, password_hash: &str) -> DbResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (id, tenant_id, username, email, name, password_hash, role, is_active, created_at, updated_at) \
             VALUES (?, NULL, ?, NULL, ?, ?, ?, 1, ?, ?) \
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(username)
        .bind(name)
        .bind(password_hash)
        .bind(UserRole::SuperAdmin)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        debug!(username, created, "Super-admin bootstrap");
        Ok(created)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::fixture;

    fn cashier(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: None,
            name: "Omar Hassan".to_string(),
            password_hash: "hash".to_string(),
            role: UserRole::Cashier,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_staff() {
        let f = fixture().await;
        let users = f.db.users();

        let created = users.create(&f.actor.tenant_id, &cashier("omar")).await.unwrap();
        assert_eq!(created.role, UserRole::Cashier);

        let staff = users.list_by_tenant(&f.actor.tenant_id).await.unwrap();
        assert_eq!(staff.len(), 2);

        let found = users.get_by_username(" omar ").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_username_is_global() {
        let f = fixture().await;
        let err = f
            .db
            .users()
            .create(&f.actor.tenant_id, &cashier("nile"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_cannot_create_privileged_roles() {
        let f = fixture().await;
        let mut owner = cashier("second-owner");
        owner.role = UserRole::PharmacyOwner;
        assert!(f.db.users().create(&f.actor.tenant_id, &owner).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_deactivate_staff() {
        let f = fixture().await;
        let users = f.db.users();
        let omar = users.create(&f.actor.tenant_id, &cashier("omar")).await.unwrap();

        let promoted = users
            .update(
                &f.actor.tenant_id,
                &omar.id,
                &UserUpdate {
                    name: Some("Omar H. Hassan".to_string()),
                    role: Some(UserRole::PharmacyManager),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, UserRole::PharmacyManager);
        assert_eq!(promoted.name, "Omar H. Hassan");
        assert!(promoted.is_active);

        let disabled = users.deactivate(&f.actor.tenant_id, &omar.id).await.unwrap();
        assert!(!disabled.is_active);
        assert!(!users.get_by_username("omar").await.unwrap().unwrap().is_active);

        let to_owner = UserUpdate {
            role: Some(UserRole::PharmacyOwner),
            ..UserUpdate::default()
        };
        assert!(matches!(
            users.update(&f.actor.tenant_id, &omar.id, &to_owner).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_owner_and_admin_accounts_are_protected() {
        let f = fixture().await;
        let users = f.db.users();

        assert!(matches!(
            users.deactivate(&f.actor.tenant_id, &f.actor.user_id).await,
            Err(DbError::Domain(CoreError::ProtectedAccount { .. }))
        ));
        let demote = UserUpdate {
            role: Some(UserRole::Cashier),
            ..UserUpdate::default()
        };
        assert!(matches!(
            users.update(&f.actor.tenant_id, &f.actor.user_id, &demote).await,
            Err(DbError::Domain(CoreError::ProtectedAccount { .. }))
        ));
        assert!(users.get_by_id(&f.actor.user_id).await.unwrap().unwrap().is_active);

        users.ensure_super_admin("root", "Platform Admin", "h1").await.unwrap();
        let admin = users.get_by_username("root").await.unwrap().unwrap();
        assert!(matches!(
            users.deactivate(&f.actor.tenant_id, &admin.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_super_admin_bootstrap_is_idempotent() {
        let f = fixture().await;
        let users = f.db.users();
        assert!(users.ensure_super_admin("root", "Platform Admin", "h1").await.unwrap());
        assert!(!users.ensure_super_admin("root", "Platform Admin", "h2").await.unwrap());

        let admin = users.get_by_username("root").await.unwrap().unwrap();
        assert_eq!(admin.role, UserRole::SuperAdmin);
        assert!(admin.tenant_id.is_none());
        assert_eq!(admin.password_hash, "h1");

        users.update_password(&admin.id, "h3").await.unwrap();
        let admin = users.get_by_id(&admin.id).await.unwrap().unwrap();
        assert_eq!(admin.password_hash, "h3");
    }
}
