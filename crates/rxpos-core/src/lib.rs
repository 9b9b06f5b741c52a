//! # rxpos-core: Pure Business Logic for rxpos
//!
//! Domain types and the arithmetic of a multi-tenant pharmacy POS. Nothing
//! in this crate touches a database, a socket or the clock except the
//! convenience generators in [`numbering`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          rxpos Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 rxpos-api (axum HTTP server)                    │   │
//! │  │   JWT auth ──► tenant scope ──► route handlers ──► ApiError     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              rxpos-db (SQLite repositories)                     │   │
//! │  │   checkout, refund, stock moves, PO receive: one tx each        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rxpos-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   types   money   pricing   fefo   numbering   validation       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Tenants, products, stock, sales, partners
//! - [`money`] - Integer money and VAT rounding
//! - [`pricing`] - Checkout totals, change and credit
//! - [`fefo`] - First-expiry-first-out batch selection
//! - [`numbering`] - Invoice, PO, barcode and SKU generation
//! - [`pagination`] - Page requests and paged results
//! - [`validation`] - Input rules shared by every surface
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rxpos_core::money::Money;
//! use rxpos_core::types::TaxRate;
//!
//! let line = Money::from_cents(10_000).multiply_quantity(2);
//! let tax = line.calculate_tax(TaxRate::from_bps(rxpos_core::DEFAULT_TAX_RATE_BPS));
//! assert_eq!(tax.cents(), 2_800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fefo;
pub mod money;
pub mod numbering;
pub mod pagination;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pagination::{Page, PageRequest, Pagination};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single cart line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum units moved by one stock operation (add, transfer, write-off,
/// purchase-order line) or set by one count.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000;

/// Maximum units a single batch row may hold.
pub const MAX_BATCH_QUANTITY: i64 = 1_000_000_000;

/// Upper bound of any money amount taken from a request (10 billion in
/// major units).
pub const MAX_MONEY_CENTS: i64 = 1_000_000_000_000;

/// A customer balance stays within `±MAX_BALANCE_CENTS`.
pub const MAX_BALANCE_CENTS: i64 = 1_000_000_000_000_000;

/// Standard VAT applied to new products (14%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 1400;

/// Default horizon of the expiring-stock report, in days.
pub const EXPIRY_WARNING_DAYS: i64 = 90;

/// Batch key for stock received without a lot number.
pub const DEFAULT_BATCH: &str = "DEFAULT";

pub const DEFAULT_MIN_STOCK_LEVEL: i64 = 10;

pub const INVOICE_PREFIX: &str = "INV";
pub const PURCHASE_ORDER_PREFIX: &str = "PO";
pub const BARCODE_PREFIX: &str = "PHB";
pub const SKU_PREFIX: &str = "PRD";

/// Name of the inventory created with every tenant.
pub const DEFAULT_INVENTORY_NAME: &str = "Main Store";

/// Categories seeded into every new tenant.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["Medicines", "Cosmetics", "Supplements", "Medical Devices"];

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;
