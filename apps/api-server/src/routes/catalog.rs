//! Products and categories.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rxpos_core::{Category, Page, Product};
use rxpos_db::repository::category::NewCategory;
use rxpos_db::repository::product::{NewProduct, ProductFilter, ProductLookup, ProductUpdate, ProductWithStock};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, PageQuery};
use crate::middleware::TenantScope;
use crate::AppState;

// =============================================================================
// Products
// =============================================================================

pub async fn list_products(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<ProductWithStock>>> {
    let products = state.db.products().list(&scope.tenant_id, &filter, page.into()).await?;
    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.db.products().create(&scope.tenant_id, &input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductWithStock>> {
    state
        .db
        .products()
        .get(&scope.tenant_id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", &id))
}

/// Point-of-sale scan: the product with its sellable batches.
pub async fn get_product_by_barcode(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(barcode): Path<String>,
) -> ApiResult<Json<ProductLookup>> {
    state
        .db
        .products()
        .get_by_barcode(&scope.tenant_id, &barcode)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", &barcode))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().update(&scope.tenant_id, &id, &changes).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.products().deactivate(&scope.tenant_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Categories
// =============================================================================

pub async fn list_categories(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db.categories().list(&scope.tenant_id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(input): ApiJson<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state.db.categories().create(&scope.tenant_id, &input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
