//! Request authentication and tenant scoping.
//!
//! ## Layers
//! ```text
//!  request
//!     │
//!     ▼
//!  authenticate ──── bearer token → Claims (401 if missing/invalid)
//!     │
//!     ├──► require_super_admin ── role must be SUPER_ADMIN (403)
//!     │
//!     └──► pharmacy_scope ─────── Claims → TenantScope
//!                                 ├─ acting_tenant_id present:
//!                                 │    SUPER_ADMIN + allowlisted +
//!                                 │    tenant exists, not CANCELLED
//!                                 └─ otherwise:
//!                                      pharmacy role + tenant ACTIVE
//! ```
//!
//! Handlers never read a tenant id from the request body or path; the only
//! source is the [`TenantScope`] inserted here.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use rxpos_core::{TenantStatus, UserRole};
use rxpos_db::Actor;
use tracing::{debug, warn};

use crate::auth::{extract_bearer_token, Claims};
use crate::error::ApiError;
use crate::AppState;

/// The tenant a pharmacy request operates on, and who is operating.
#[derive(Debug, Clone)]
pub struct TenantScope {
    pub tenant_id: String,
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
    /// A super-admin acting through an impersonation claim.
    pub impersonating: bool,
}

impl TenantScope {
    pub fn actor(&self) -> Actor {
        Actor::new(&self.tenant_id, &self.user_id)
    }

    /// Owners, managers and impersonating admins may manage staff.
    pub fn can_manage_staff(&self) -> bool {
        self.impersonating || self.role.can_manage_staff()
    }
}

/// Verifies the bearer token and stores its [`Claims`] on the request.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let claims = state.jwt.validate(token)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Admin routes.
pub async fn require_super_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    if claims(&request)?.role != UserRole::SuperAdmin {
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(next.run(request).await)
}

/// Pharmacy routes: resolves the [`TenantScope`] the handler will use.
pub async fn pharmacy_scope(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = claims(&request)?.clone();
    let scope = resolve_scope(&state, &claims).await?;
    debug!(tenant_id = %scope.tenant_id, user_id = %scope.user_id, impersonating = scope.impersonating, "Tenant scope resolved");
    request.extensions_mut().insert(scope);
    Ok(next.run(request).await)
}

fn claims(request: &Request) -> Result<&Claims, ApiError> {
    request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
}

async fn resolve_scope(state: &AppState, claims: &Claims) -> Result<TenantScope, ApiError> {
    if let Some(acting) = claims.acting_tenant_id.as_deref() {
        check_impersonation(state, claims, acting).await?;
        return Ok(TenantScope {
            tenant_id: acting.to_string(),
            user_id: claims.sub.clone(),
            username: claims.username.clone(),
            role: claims.role,
            impersonating: true,
        });
    }

    let tenant_id = match (claims.role.is_pharmacy_role(), claims.tenant_id.as_deref()) {
        (true, Some(tenant_id)) => tenant_id,
        _ => return Err(ApiError::forbidden("Pharmacy access required")),
    };

    let tenant = state
        .db
        .tenants()
        .get_by_id(tenant_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Pharmacy access required"))?;
    if !tenant.is_operational() {
        return Err(ApiError::forbidden(format!("Pharmacy is {}", tenant.status)));
    }

    Ok(TenantScope {
        tenant_id: tenant.id,
        user_id: claims.sub.clone(),
        username: claims.username.clone(),
        role: claims.role,
        impersonating: false,
    })
}

/// Rules for honouring an acting-tenant claim, shared with the endpoint that
/// issues one.
pub async fn check_impersonation(state: &AppState, claims: &Claims, tenant_id: &str) -> Result<(), ApiError> {
    if claims.role != UserRole::SuperAdmin {
        warn!(user_id = %claims.sub, tenant_id, "Acting-tenant claim from a non-admin");
        return Err(ApiError::forbidden("Impersonation requires a super-admin"));
    }
    if !state.config.may_impersonate(&claims.username) {
        warn!(username = %claims.username, tenant_id, "Super-admin not on the impersonation allowlist");
        return Err(ApiError::forbidden("Impersonation not allowed for this account"));
    }

    match state.db.tenants().get_by_id(tenant_id).await? {
        Some(tenant) if tenant.status != TenantStatus::Cancelled => Ok(()),
        Some(_) => Err(ApiError::forbidden("Pharmacy is cancelled")),
        None => Err(ApiError::forbidden("Pharmacy not found")),
    }
}
