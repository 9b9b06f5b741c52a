//! Staff accounts of the current pharmacy.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rxpos_core::validation::validate_password;
use rxpos_core::{User, UserRole};
use rxpos_db::repository::user::{NewUser, UserUpdate};
use serde::Deserialize;

use crate::auth::hash_password;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::TenantScope;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: Option<String>,
    pub name: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

fn ensure_staff_manager(scope: &TenantScope) -> ApiResult<()> {
    if scope.can_manage_staff() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only owners and managers can manage staff"))
    }
}

pub async fn list(State(state): State<AppState>, Extension(scope): Extension<TenantScope>) -> ApiResult<Json<Vec<User>>> {
    ensure_staff_manager(&scope)?;
    Ok(Json(state.db.users().list_by_tenant(&scope.tenant_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    ensure_staff_manager(&scope)?;
    validate_password(&req.password)?;

    let input = NewUser {
        username: req.username,
        email: req.email,
        name: req.name,
        password_hash: hash_password(&req.password)?,
        role: req.role,
    };
    let user = state.db.users().create(&scope.tenant_id, &input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    ensure_staff_manager(&scope)?;
    let password_hash = match req.password.as_deref() {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let changes = UserUpdate {
        name: req.name,
        email: req.email,
        role: req.role,
        is_active: req.is_active,
        password_hash,
    };
    Ok(Json(state.db.users().update(&scope.tenant_id, &id, &changes).await?))
}

/// Soft delete: the account stays, login is refused.
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    ensure_staff_manager(&scope)?;
    state.db.users().deactivate(&scope.tenant_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
