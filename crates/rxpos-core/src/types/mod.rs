//! # Domain Types
//!
//! Core domain types used throughout rxpos.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  tenant        catalog          stock              sale                 │
//! │  ──────        ───────          ─────              ────                 │
//! │  Tenant ─┬──►  Product ──┬──►   InventoryItem ◄──  SaleItem             │
//! │  User    │     Category  │      Inventory          Sale                 │
//! │          │               │      StockMovement                           │
//! │          │               │                                              │
//! │          │   partner     │                                              │
//! │          │   ───────     │                                              │
//! │          └─► Customer    └──►   PurchaseOrderItem                      │
//! │              Supplier           PurchaseOrder                           │
//! │                                                                         │
//! │  Every entity except Tenant carries (or derives) a tenant_id           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire vs Storage Form of Enums
//! - JSON: `SCREAMING_SNAKE_CASE` (`"MOBILE_WALLET"`)
//! - SQLite: `snake_case` (`'mobile_wallet'`)

pub mod catalog;
pub mod partner;
pub mod sale;
pub mod stock;
pub mod tenant;

pub use catalog::{Category, Product, ProductType, TaxRate};
pub use partner::{Customer, PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus, Supplier};
pub use sale::{PaymentMethod, Sale, SaleItem, SaleStatus};
pub use stock::{Inventory, InventoryItem, MovementType, StockMovement};
pub use tenant::{SubscriptionPlan, Tenant, TenantStatus, User, UserRole};
