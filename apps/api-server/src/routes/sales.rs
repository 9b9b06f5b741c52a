//! Checkout, refunds and sales reporting.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rxpos_core::{Page, Sale};
use rxpos_db::repository::sale::{DailySummary, NewSale, SaleDetail, SaleFilter};
use rxpos_db::RefundPolicy;
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, PageQuery};
use crate::middleware::TenantScope;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub reason: String,
}

/// Sells from the default inventory, earliest expiry first.
pub async fn checkout(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<NewSale>,
) -> ApiResult<(StatusCode, Json<SaleDetail>)> {
    let sale = state.db.sales().checkout(&scope.actor(), &input).await?;
    if scope.impersonating {
        info!(admin = %scope.username, tenant_id = %scope.tenant_id, invoice = %sale.sale.invoice_number, "Sale recorded while impersonating");
    }
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiQuery(filter): ApiQuery<SaleFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Sale>>> {
    Ok(Json(state.db.sales().list(&scope.tenant_id, &filter, page.into()).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    state
        .db
        .sales()
        .get(&scope.tenant_id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Sale", &id))
}

pub async fn refund(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RefundRequest>,
) -> ApiResult<Json<SaleDetail>> {
    let policy = RefundPolicy {
        reverse_credit: state.config.refund_reverses_credit,
    };
    let sale = state.db.sales().refund(&scope.actor(), &id, &req.reason, policy).await?;
    Ok(Json(sale))
}

pub async fn today_summary(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
) -> ApiResult<Json<DailySummary>> {
    Ok(Json(state.db.sales().today_summary(&scope.tenant_id).await?))
}
