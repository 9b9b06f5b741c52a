//! # rxpos API
//!
//! HTTP server for pharmacy staff and platform admins.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           rxpos API Server                              │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Auth          │  │  Pharmacy      │  │  Admin                     ││
//! │  │                │  │                │  │                            ││
//! │  │ • Register     │  │ • Catalog      │  │ • Tenants (approve,        ││
//! │  │ • Login        │  │ • Stock        │  │   suspend)                 ││
//! │  │ • Me/Password  │  │ • Sales/Refund │  │ • Stats                    ││
//! │  │                │  │ • Purchasing   │  │ • Impersonate              ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                              │                                          │
//! │                     TenantScope (middleware)                            │
//! │                              │                                          │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────────────┐  ┌──────────────────────────────────┐  │  │
//! │  │  │  rxpos-db (SQLite)   │  │  JWT Auth                        │  │  │
//! │  │  │                      │  │                                  │  │  │
//! │  │  │ Repositories and     │  │ HS256 access tokens, argon2      │  │  │
//! │  │  │ transactions         │  │ password hashes                  │  │  │
//! │  │  └──────────────────────┘  └──────────────────────────────────┘  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - listen port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./rxpos.db)
//! - `DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_ACCESS_LIFETIME_SECS` - Access token lifetime (default: 3600)
//! - `ADMIN_USERNAME` / `ADMIN_PASSWORD` - bootstrap super-admin
//! - `IMPERSONATION_ALLOWLIST` - comma-separated admin usernames
//! - `REFUND_REVERSES_CREDIT` - reverse customer credit on refund (default: false)

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use rxpos_db::Database;

// Re-exports
pub use auth::JwtManager;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_access_lifetime_secs);
        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        }
    }
}
