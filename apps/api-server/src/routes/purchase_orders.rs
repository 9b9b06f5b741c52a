//! Ordering from suppliers and receiving into the default inventory.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rxpos_core::{Page, PurchaseOrder};
use rxpos_db::repository::purchase_order::{
    NewPurchaseOrder, PurchaseOrderDetail, PurchaseOrderFilter, ReceiveOrder,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, PageQuery};
use crate::middleware::TenantScope;
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiQuery(filter): ApiQuery<PurchaseOrderFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<PurchaseOrder>>> {
    let orders = state
        .db
        .purchase_orders()
        .list(&scope.tenant_id, &filter, page.into())
        .await?;
    Ok(Json(orders))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<NewPurchaseOrder>,
) -> ApiResult<(StatusCode, Json<PurchaseOrderDetail>)> {
    let order = state.db.purchase_orders().create(&scope.tenant_id, &input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<Json<PurchaseOrderDetail>> {
    state
        .db
        .purchase_orders()
        .get(&scope.tenant_id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("PurchaseOrder", &id))
}

/// `{}` receives every line in full.
pub async fn receive(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ReceiveOrder>,
) -> ApiResult<Json<PurchaseOrderDetail>> {
    Ok(Json(state.db.purchase_orders().receive(&scope.actor(), &id, &input).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<Json<PurchaseOrder>> {
    Ok(Json(state.db.purchase_orders().cancel(&scope.tenant_id, &id).await?))
}
