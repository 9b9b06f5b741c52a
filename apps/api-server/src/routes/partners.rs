//! Customers and suppliers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rxpos_core::{Customer, Page, Supplier};
use rxpos_db::repository::customer::{CustomerFilter, CustomerUpdate, NewCustomer};
use rxpos_db::repository::supplier::{NewSupplier, SupplierUpdate};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, PageQuery};
use crate::middleware::TenantScope;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount_cents: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SupplierQuery {
    pub search: Option<String>,
}

// =============================================================================
// Customers
// =============================================================================

pub async fn list_customers(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiQuery(filter): ApiQuery<CustomerFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Customer>>> {
    Ok(Json(state.db.customers().list(&scope.tenant_id, &filter, page.into()).await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<NewCustomer>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state.db.customers().create(&scope.tenant_id, &input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    state
        .db
        .customers()
        .get(&scope.tenant_id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Customer", &id))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<CustomerUpdate>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.db.customers().update(&scope.tenant_id, &id, &changes).await?))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.customers().deactivate(&scope.tenant_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Settles part of an outstanding credit balance.
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PaymentRequest>,
) -> ApiResult<Json<Customer>> {
    let customer = state
        .db
        .customers()
        .pay_balance(&scope.tenant_id, &id, req.amount_cents)
        .await?;
    Ok(Json(customer))
}

// =============================================================================
// Suppliers
// =============================================================================

pub async fn list_suppliers(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiQuery(query): ApiQuery<SupplierQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Supplier>>> {
    let suppliers = state
        .db
        .suppliers()
        .list(&scope.tenant_id, query.search.as_deref(), page.into())
        .await?;
    Ok(Json(suppliers))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<NewSupplier>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let supplier = state.db.suppliers().create(&scope.tenant_id, &input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<Json<Supplier>> {
    state
        .db
        .suppliers()
        .get(&scope.tenant_id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Supplier", &id))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<SupplierUpdate>,
) -> ApiResult<Json<Supplier>> {
    Ok(Json(state.db.suppliers().update(&scope.tenant_id, &id, &input).await?))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.suppliers().deactivate(&scope.tenant_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
