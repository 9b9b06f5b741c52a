//! # Customer Repository
//!
//! Tenant customers and their running credit balances.
//!
//! ## Balance
//! ```text
//! CREDIT sale      balance += total − paid     (sale repository, same tx)
//! refund           balance −= credit           (when the policy reverses it)
//! pay_balance      balance −= amount           (single UPDATE)
//! ```
//! Every change goes through [`apply_balance_delta`], whose guard keeps
//! the stored balance inside `±MAX_BALANCE_CENTS`. SQLite's own integer
//! arithmetic can therefore never overflow into a REAL.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use rxpos_core::validation::{
    validate_email, validate_length, validate_non_negative_cents, validate_optional_length,
    validate_positive_cents,
};
use rxpos_core::{Customer, Page, PageRequest, ValidationError, MAX_BALANCE_CENTS};

pub(crate) const CUSTOMER_COLUMNS: &str = "id, tenant_id, name, phone, email, address, \
    balance_cents, credit_limit_cents, is_active, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub credit_limit_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub credit_limit_cents: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerFilter {
    /// Matches name or phone.
    pub search: Option<String>,
    #[serde(default)]
    pub has_balance: bool,
}

fn validate_contact(name: &str, phone: Option<&str>, email: Option<&str>, address: Option<&str>) -> DbResult<()> {
    validate_length("name", name, 2, 200)?;
    validate_optional_length("phone", phone, 5, 20)?;
    if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    validate_optional_length("address", address, 1, 500)?;
    Ok(())
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn create(&self, tenant_id: &str, input: &NewCustomer) -> DbResult<Customer> {
        validate_contact(
            &input.name,
            input.phone.as_deref(),
            input.email.as_deref(),
            input.address.as_deref(),
        )?;
        validate_non_negative_cents("credit_limit", input.credit_limit_cents)?;

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO customers ({CUSTOMER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, 0, ?, 1, ?, ?) \
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(tenant_id)
            .bind(input.name.trim())
            .bind(&input.phone)
            .bind(&input.email)
            .bind(&input.address)
            .bind(input.credit_limit_cents)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        info!(customer_id = %customer.id, tenant_id, "Customer created");
        Ok(customer)
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ? AND tenant_id = ?");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn update(&self, tenant_id: &str, id: &str, changes: &CustomerUpdate) -> DbResult<Customer> {
        let mut customer = self
            .get(tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))?;

        if let Some(name) = &changes.name {
            customer.name = name.trim().to_string();
        }
        if changes.phone.is_some() {
            customer.phone = changes.phone.clone();
        }
        if changes.email.is_some() {
            customer.email = changes.email.clone();
        }
        if changes.address.is_some() {
            customer.address = changes.address.clone();
        }
        if let Some(limit) = changes.credit_limit_cents {
            validate_non_negative_cents("credit_limit", limit)?;
            customer.credit_limit_cents = limit;
        }
        validate_contact(
            &customer.name,
            customer.phone.as_deref(),
            customer.email.as_deref(),
            customer.address.as_deref(),
        )?;

        let sql = format!(
            "UPDATE customers SET name = ?, phone = ?, email = ?, address = ?, \
                 credit_limit_cents = ?, updated_at = ? \
             WHERE id = ? AND tenant_id = ? RETURNING {CUSTOMER_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Customer>(&sql)
            .bind(&customer.name)
            .bind(&customer.phone)
            .bind(&customer.email)
            .bind(&customer.address)
            .bind(customer.credit_limit_cents)
            .bind(Utc::now())
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))?;
        Ok(updated)
    }

    /// Soft delete: the customer stays attached to past sales.
    pub async fn deactivate(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        debug!(id, "Deactivating customer");

        let result = sqlx::query(
            "UPDATE customers SET is_active = 0, updated_at = ? WHERE id = ? AND tenant_id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        Ok(())
    }

    /// Active customers by name.
    pub async fn list(&self, tenant_id: &str, filter: &CustomerFilter, page: PageRequest) -> DbResult<Page<Customer>> {
        let search = like_pattern(filter.search.as_deref());
        let condition = "tenant_id = ?1 AND is_active = 1 \
             AND (?2 IS NULL OR name LIKE ?2 OR phone LIKE ?2) \
             AND (?3 = 0 OR balance_cents > 0)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM customers WHERE {condition}"))
            .bind(tenant_id)
            .bind(&search)
            .bind(filter.has_balance)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE {condition} \
             ORDER BY name ASC LIMIT ?4 OFFSET ?5"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(tenant_id)
            .bind(&search)
            .bind(filter.has_balance)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(customers, page, total))
    }

    /// Records a payment against the customer's balance.
    ///
    /// The balance may go negative, which leaves the customer in credit.
    pub async fn pay_balance(&self, tenant_id: &str, id: &str, amount_cents: i64) -> DbResult<Customer> {
        validate_positive_cents("amount", amount_cents)?;

        let mut conn = self.pool.acquire().await?;
        let customer = apply_balance_delta(&mut conn, tenant_id, id, -amount_cents).await?;

        info!(customer_id = %id, amount_cents, balance_cents = customer.balance_cents, "Customer payment recorded");
        Ok(customer)
    }
}

/// Adds `delta_cents` to a customer's balance in one guarded UPDATE.
///
/// ## Errors
/// - `NotFound` for a customer outside the tenant
/// - `ValidationError::OutOfRange` when the result would leave
///   `±MAX_BALANCE_CENTS`
pub(crate) async fn apply_balance_delta(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    delta_cents: i64,
) -> DbResult<Customer> {
    debug!(customer_id = id, delta_cents, "Changing customer balance");

    // balance + delta stays in range  ⇔  balance in [lo, hi]
    let lo = (-MAX_BALANCE_CENTS).saturating_sub(delta_cents);
    let hi = MAX_BALANCE_CENTS.saturating_sub(delta_cents);

    let sql = format!(
        "UPDATE customers SET balance_cents = balance_cents + ?, updated_at = ? \
         WHERE id = ? AND tenant_id = ? AND balance_cents BETWEEN ? AND ? \
         RETURNING {CUSTOMER_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Customer>(&sql)
        .bind(delta_cents)
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .bind(lo)
        .bind(hi)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(customer) = updated {
        return Ok(customer);
    }

    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ? AND tenant_id = ?")
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;
    match exists {
        Some(_) => Err(ValidationError::OutOfRange {
            field: "balance".to_string(),
            min: -MAX_BALANCE_CENTS,
            max: MAX_BALANCE_CENTS,
        }
        .into()),
        None => Err(DbError::not_found("Customer", id)),
    }
}
