//! HTTP routes.
//!
//! ```text
//!  public ─────────── /health, /api/auth/register, /api/auth/login
//!  authenticate ───┬─ /api/auth/me, /api/auth/password
//!                  ├─ pharmacy_scope ──── /api/{products,categories,inventories,
//!                  │                            stock,sales,customers,suppliers,
//!                  │                            purchase-orders,users}
//!                  └─ require_super_admin ─ /api/admin/*
//! ```

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod partners;
pub mod purchase_orders;
pub mod sales;
pub mod stock;
pub mod users;

use axum::routing::{get, patch, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{authenticate, pharmacy_scope, require_super_admin};
use crate::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let account = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", post(auth::change_password));

    let pharmacy = Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/{id}", patch(users::update).delete(users::deactivate))
        // Catalog
        .route("/api/products", get(catalog::list_products).post(catalog::create_product))
        .route(
            "/api/products/{id}",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/api/products/barcode/{barcode}", get(catalog::get_product_by_barcode))
        .route("/api/categories", get(catalog::list_categories).post(catalog::create_category))
        // Stock
        .route("/api/inventories", get(stock::list_inventories).post(stock::create_inventory))
        .route("/api/inventories/{id}", get(stock::get_inventory))
        .route("/api/stock/add", post(stock::add))
        .route("/api/stock/adjust", post(stock::adjust))
        .route("/api/stock/transfer", post(stock::transfer))
        .route("/api/stock/expire", post(stock::write_off))
        .route("/api/stock/expiring", get(stock::expiring))
        .route("/api/stock/movements", get(stock::movements))
        // Sales
        .route("/api/sales", get(sales::list).post(sales::checkout))
        .route("/api/sales/summary/today", get(sales::today_summary))
        .route("/api/sales/{id}", get(sales::get))
        .route("/api/sales/{id}/refund", post(sales::refund))
        // Customers and suppliers
        .route("/api/customers", get(partners::list_customers).post(partners::create_customer))
        .route(
            "/api/customers/{id}",
            get(partners::get_customer)
                .put(partners::update_customer)
                .delete(partners::delete_customer),
        )
        .route("/api/customers/{id}/payments", post(partners::record_payment))
        .route("/api/suppliers", get(partners::list_suppliers).post(partners::create_supplier))
        .route(
            "/api/suppliers/{id}",
            get(partners::get_supplier)
                .put(partners::update_supplier)
                .delete(partners::delete_supplier),
        )
        // Purchasing
        .route("/api/purchase-orders", get(purchase_orders::list).post(purchase_orders::create))
        .route("/api/purchase-orders/{id}", get(purchase_orders::get))
        .route("/api/purchase-orders/{id}/receive", post(purchase_orders::receive))
        .route("/api/purchase-orders/{id}/cancel", post(purchase_orders::cancel))
        .route_layer(middleware::from_fn_with_state(state.clone(), pharmacy_scope));

    let admin = Router::new()
        .route("/api/admin/tenants", get(admin::list_tenants))
        .route("/api/admin/tenants/{id}", get(admin::get_tenant))
        .route("/api/admin/tenants/{id}/approve", post(admin::approve_tenant))
        .route("/api/admin/tenants/{id}/suspend", post(admin::suspend_tenant))
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/impersonate", post(admin::impersonate))
        .route("/api/admin/impersonate/stop", post(admin::stop_impersonation))
        .route_layer(middleware::from_fn(require_super_admin));

    let authenticated = account
        .merge(pharmacy)
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public)
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
