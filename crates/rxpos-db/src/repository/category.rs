//! # Category Repository
//!
//! Product groupings. Names are unique per tenant.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use rxpos_core::validation::{validate_length, validate_optional_length};
use rxpos_core::Category;

const CATEGORY_COLUMNS: &str = "id, tenant_id, name, description, created_at";

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE tenant_id = ? ORDER BY name");
        let categories = sqlx::query_as::<_, Category>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    /// ## Errors
    /// `UniqueViolation { field: "name" }` when the tenant already has it.
    pub async fn create(&self, tenant_id: &str, input: &NewCategory) -> DbResult<Category> {
        validate_length("name", &input.name, 2, 100)?;
        validate_optional_length("description", input.description.as_deref(), 1, 500)?;

        let name = input.name.trim();
        let sql = format!(
            "INSERT INTO categories ({CATEGORY_COLUMNS}) VALUES (?, ?, ?, ?, ?) \
             RETURNING {CATEGORY_COLUMNS}"
        );
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(tenant_id)
            .bind(name)
            .bind(&input.description)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(name))?;

        info!(category_id = %category.id, tenant_id, "Category created");
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::fixture;

    #[tokio::test]
    async fn test_create_and_duplicate() {
        let f = fixture().await;
        let categories = f.db.categories();
        let input = NewCategory {
            name: "Baby Care".to_string(),
            description: None,
        };

        let created = categories.create(&f.actor.tenant_id, &input).await.unwrap();
        assert_eq!(created.name, "Baby Care");

        let err = categories.create(&f.actor.tenant_id, &input).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "name"));

        let all = categories.list(&f.actor.tenant_id).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].name, "Baby Care");
    }
}
