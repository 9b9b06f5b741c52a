//! Stock locations, stock mutations and stock reports.
//!
//! Every mutation runs as one database transaction that also writes its
//! stock movement; see `InventoryRepository`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rxpos_core::{Inventory, Page, StockMovement};
use rxpos_db::repository::inventory::{
    AddStock, AdjustStock, ExpiringBatch, InventoryDetail, MovementFilter, NewInventory, StockChange, TransferResult,
    TransferStock, WriteOffStock,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, PageQuery};
use crate::middleware::TenantScope;
use crate::AppState;

const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 90;

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

// =============================================================================
// Inventories
// =============================================================================

pub async fn list_inventories(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
) -> ApiResult<Json<Vec<Inventory>>> {
    Ok(Json(state.db.inventory().list(&scope.tenant_id).await?))
}

pub async fn create_inventory(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<NewInventory>,
) -> ApiResult<(StatusCode, Json<Inventory>)> {
    let inventory = state.db.inventory().create(&scope.tenant_id, &input).await?;
    Ok((StatusCode::CREATED, Json(inventory)))
}

pub async fn get_inventory(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<Json<InventoryDetail>> {
    state
        .db
        .inventory()
        .get(&scope.tenant_id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Inventory", &id))
}

// =============================================================================
// Mutations
// =============================================================================

pub async fn add(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<AddStock>,
) -> ApiResult<(StatusCode, Json<StockChange>)> {
    let change = state.db.inventory().add_stock(&scope.actor(), &input).await?;
    Ok((StatusCode::CREATED, Json(change)))
}

pub async fn adjust(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<AdjustStock>,
) -> ApiResult<Json<StockChange>> {
    Ok(Json(state.db.inventory().adjust_stock(&scope.actor(), &input).await?))
}

pub async fn transfer(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<TransferStock>,
) -> ApiResult<Json<TransferResult>> {
    Ok(Json(state.db.inventory().transfer_stock(&scope.actor(), &input).await?))
}

pub async fn write_off(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<WriteOffStock>,
) -> ApiResult<Json<StockChange>> {
    Ok(Json(state.db.inventory().write_off_expired(&scope.actor(), &input).await?))
}

// =============================================================================
// Reports
// =============================================================================

pub async fn expiring(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiQuery(query): ApiQuery<ExpiringQuery>,
) -> ApiResult<Json<Vec<ExpiringBatch>>> {
    let days = query.days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
    if !(0..=3650).contains(&days) {
        return Err(ApiError::Validation("days must be between 0 and 3650".to_string()));
    }
    Ok(Json(state.db.inventory().expiring(&scope.tenant_id, days).await?))
}

pub async fn movements(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiQuery(filter): ApiQuery<MovementFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<StockMovement>>> {
    let movements = state.db.inventory().movements(&scope.tenant_id, &filter, page.into()).await?;
    Ok(Json(movements))
}
