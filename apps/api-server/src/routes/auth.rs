//! Registration, login and the caller's own account.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use rxpos_core::validation::validate_password;
use rxpos_core::{Tenant, User};
use rxpos_db::repository::tenant::NewRegistration;
use rxpos_db::DbError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, Claims};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub pharmacy_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub owner_name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub tenant: Tenant,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
    pub tenant: Option<Tenant>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub tenant: Option<Tenant>,
    /// Set while a super-admin acts for a pharmacy.
    pub acting_tenant: Option<Tenant>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Self-registration. The pharmacy starts PENDING until an admin approves it.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    validate_password(&req.password)?;

    let mut registration = NewRegistration {
        pharmacy_name: req.pharmacy_name,
        email: req.email,
        phone: req.phone,
        address: req.address,
        city: req.city,
        owner_name: req.owner_name,
        username: req.username,
        password_hash: String::new(),
    };
    registration.validate().map_err(DbError::from)?;
    registration.password_hash = hash_password(&req.password)?;

    let (tenant, user) = state.db.tenants().register(&registration).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { tenant, user })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state
        .db
        .users()
        .get_by_username(&req.username)
        .await?
        .filter(|user| verify_password(&req.password, &user.password_hash))
        .ok_or_else(|| {
            warn!(username = %req.username, "Failed login");
            ApiError::unauthorized("Invalid username or password")
        })?;

    if !user.is_active {
        return Err(ApiError::forbidden("Account is disabled"));
    }

    let tenant = match user.tenant_id.as_deref() {
        Some(tenant_id) => state.db.tenants().get_by_id(tenant_id).await?,
        None => None,
    };
    let token = state.jwt.issue(&user, None)?;

    info!(user_id = %user.id, role = %user.role, "User logged in");
    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer",
        expires_in: state.jwt.access_lifetime_secs(),
        user,
        tenant,
    }))
}

pub async fn me(State(state): State<AppState>, Extension(claims): Extension<Claims>) -> ApiResult<Json<MeResponse>> {
    let user = current_user(&state, &claims).await?;
    let tenants = state.db.tenants();

    let tenant = match user.tenant_id.as_deref() {
        Some(id) => tenants.get_by_id(id).await?,
        None => None,
    };
    let acting_tenant = match claims.acting_tenant_id.as_deref() {
        Some(id) => tenants.get_by_id(id).await?,
        None => None,
    };

    Ok(Json(MeResponse {
        user,
        tenant,
        acting_tenant,
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    let user = current_user(&state, &claims).await?;
    if !verify_password(&req.current_password, &user.password_hash) {
        return Err(ApiError::Validation("Current password is incorrect".to_string()));
    }
    validate_password(&req.new_password)?;

    let hash = hash_password(&req.new_password)?;
    state.db.users().update_password(&user.id, &hash).await?;

    info!(user_id = %user.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// The token's user, which may have been removed or disabled since the
/// token was issued.
async fn current_user(state: &AppState, claims: &Claims) -> ApiResult<User> {
    state
        .db
        .users()
        .get_by_id(&claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::unauthorized("Account no longer available"))
}
