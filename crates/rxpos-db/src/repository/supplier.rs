//! # Supplier Repository

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use rxpos_core::validation::{validate_email, validate_length, validate_optional_length};
use rxpos_core::{Page, PageRequest, Supplier};

pub(crate) const SUPPLIER_COLUMNS: &str = "id, tenant_id, name, contact_person, phone, email, \
    address, tax_number, payment_terms, notes, is_active, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub tax_number: Option<String>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
}

/// Replaces every field; the update form always sends the whole supplier.
pub type SupplierUpdate = NewSupplier;

fn validate_supplier(input: &NewSupplier) -> DbResult<()> {
    validate_length("name", &input.name, 2, 200)?;
    validate_optional_length("contact_person", input.contact_person.as_deref(), 2, 200)?;
    validate_optional_length("phone", input.phone.as_deref(), 5, 20)?;
    if let Some(email) = input.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    validate_optional_length("tax_number", input.tax_number.as_deref(), 1, 50)?;
    Ok(())
}

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn create(&self, tenant_id: &str, input: &NewSupplier) -> DbResult<Supplier> {
        validate_supplier(input)?;

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO suppliers ({SUPPLIER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?) \
             RETURNING {SUPPLIER_COLUMNS}"
        );
        let supplier = sqlx::query_as::<_, Supplier>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(tenant_id)
            .bind(input.name.trim())
            .bind(&input.contact_person)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(&input.address)
            .bind(&input.tax_number)
            .bind(&input.payment_terms)
            .bind(&input.notes)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        info!(supplier_id = %supplier.id, tenant_id, "Supplier created");
        Ok(supplier)
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ? AND tenant_id = ?");
        let supplier = sqlx::query_as::<_, Supplier>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(supplier)
    }

    pub async fn update(&self, tenant_id: &str, id: &str, input: &SupplierUpdate) -> DbResult<Supplier> {
        validate_supplier(input)?;

        let sql = format!(
            "UPDATE suppliers SET name = ?, contact_person = ?, phone = ?, email = ?, address = ?, \
                 tax_number = ?, payment_terms = ?, notes = ?, updated_at = ? \
             WHERE id = ? AND tenant_id = ? RETURNING {SUPPLIER_COLUMNS}"
        );
        sqlx::query_as::<_, Supplier>(&sql)
            .bind(input.name.trim())
            .bind(&input.contact_person)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(&input.address)
            .bind(&input.tax_number)
            .bind(&input.payment_terms)
            .bind(&input.notes)
            .bind(Utc::now())
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn deactivate(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE suppliers SET is_active = 0, updated_at = ? WHERE id = ? AND tenant_id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }
        Ok(())
    }

    /// Active suppliers by name.
    pub async fn list(&self, tenant_id: &str, search: Option<&str>, page: PageRequest) -> DbResult<Page<Supplier>> {
        let search = like_pattern(search);
        let condition = "tenant_id = ?1 AND is_active = 1 \
             AND (?2 IS NULL OR name LIKE ?2 OR contact_person LIKE ?2 OR phone LIKE ?2)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM suppliers WHERE {condition}"))
            .bind(tenant_id)
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE {condition} \
             ORDER BY name ASC LIMIT ?3 OFFSET ?4"
        );
        let suppliers = sqlx::query_as::<_, Supplier>(&sql)
            .bind(tenant_id)
            .bind(&search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(suppliers, page, total))
    }
}
