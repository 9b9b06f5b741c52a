//! Platform administration: tenant approval, stats and impersonation.
//!
//! ## Impersonation
//! ```text
//!  POST /api/admin/impersonate { tenant_id }
//!       │  check_impersonation (role, allowlist, tenant not CANCELLED)
//!       ▼
//!  new token with acting_tenant_id ──► pharmacy routes, re-checked
//!                                      on every request
//!  POST /api/admin/impersonate/stop
//!       ▼
//!  new token without the claim
//! ```
//!
//! Nothing is stored server-side; the claim lives only in the signed token.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use rxpos_core::{Page, Tenant, TenantStatus, User};
use rxpos_db::repository::tenant::{PlatformStats, TenantFilter};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Claims;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, PageQuery};
use crate::middleware::check_impersonation;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TenantDetail {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub struct ImpersonateRequest {
    pub tenant_id: String,
}

#[derive(Debug, Serialize)]
pub struct ImpersonationResponse {
    pub token: String,
    pub expires_in: i64,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
}

pub async fn list_tenants(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<TenantFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Tenant>>> {
    Ok(Json(state.db.tenants().list(&filter, page.into()).await?))
}

pub async fn get_tenant(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<TenantDetail>> {
    let tenant = state
        .db
        .tenants()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant", &id))?;
    let users = state.db.users().list_by_tenant(&id).await?;
    Ok(Json(TenantDetail { tenant, users }))
}

pub async fn approve_tenant(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.db.tenants().set_status(&id, TenantStatus::Active).await?))
}

pub async fn suspend_tenant(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.db.tenants().set_status(&id, TenantStatus::Suspended).await?))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<PlatformStats>> {
    Ok(Json(state.db.tenants().stats().await?))
}

/// Issues a token that acts for `tenant_id`.
pub async fn impersonate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ImpersonateRequest>,
) -> ApiResult<Json<ImpersonationResponse>> {
    let tenant = state
        .db
        .tenants()
        .get_by_id(&req.tenant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant", &req.tenant_id))?;
    check_impersonation(&state, &claims, &tenant.id).await?;

    let admin = admin_user(&state, &claims).await?;
    let token = state.jwt.issue(&admin, Some(&tenant.id))?;

    info!(admin = %admin.username, tenant_id = %tenant.id, "Impersonation started");
    Ok(Json(ImpersonationResponse {
        token,
        expires_in: state.jwt.access_lifetime_secs(),
        tenant_id: Some(tenant.id),
        tenant_name: Some(tenant.name),
    }))
}

/// Issues a plain admin token.
pub async fn stop_impersonation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ImpersonationResponse>> {
    let admin = admin_user(&state, &claims).await?;
    let token = state.jwt.issue(&admin, None)?;

    if let Some(tenant_id) = claims.acting_tenant_id.as_deref() {
        info!(admin = %admin.username, tenant_id, "Impersonation stopped");
    }
    Ok(Json(ImpersonationResponse {
        token,
        expires_in: state.jwt.access_lifetime_secs(),
        tenant_id: None,
        tenant_name: None,
    }))
}

async fn admin_user(state: &AppState, claims: &Claims) -> ApiResult<User> {
    state
        .db
        .users()
        .get_by_id(&claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::unauthorized("Account no longer available"))
}
