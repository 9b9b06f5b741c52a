//! Catalog types: products, categories and tax rates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1400 bps = 14% (standard VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Rate as a percentage, for display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    #[default]
    Medicine,
    Cosmetic,
    Supplement,
    MedicalDevice,
    Other,
}

impl ProductType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductType::Medicine => "MEDICINE",
            ProductType::Cosmetic => "COSMETIC",
            ProductType::Supplement => "SUPPLEMENT",
            ProductType::MedicalDevice => "MEDICAL_DEVICE",
            ProductType::Other => "OTHER",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A sellable item owned by exactly one tenant.
///
/// `barcode` is unique per tenant. Products are never hard-deleted;
/// `is_active = false` hides them from the catalog and the barcode scanner.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub generic_name: Option<String>,
    pub manufacturer: Option<String>,
    pub barcode: String,
    pub sku: String,
    pub product_type: ProductType,
    pub cost_price_cents: i64,
    pub selling_price_cents: i64,
    /// VAT in basis points (1400 = 14%).
    pub tax_rate_bps: i64,
    /// Exempt products carry no VAT regardless of `tax_rate_bps`.
    pub is_vat_exempt: bool,
    /// Low-stock threshold: flagged when total stock is at or below it.
    pub min_stock_level: i64,
    pub requires_prescription: bool,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// The rate checkout applies: zero for VAT-exempt products.
    pub fn effective_tax_rate(&self) -> TaxRate {
        if self.is_vat_exempt {
            TaxRate::zero()
        } else {
            TaxRate::from_bps(self.tax_rate_bps.clamp(0, u32::MAX as i64) as u32)
        }
    }

    #[inline]
    pub fn is_low_stock(&self, total_stock: i64) -> bool {
        total_stock <= self.min_stock_level
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(tax_rate_bps: i64, is_vat_exempt: bool) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            tenant_id: "t-1".to_string(),
            category_id: None,
            name: "Panadol Extra".to_string(),
            generic_name: Some("Paracetamol".to_string()),
            manufacturer: None,
            barcode: "6221000000017".to_string(),
            sku: "PAN-EXT".to_string(),
            product_type: ProductType::Medicine,
            cost_price_cents: 3_000,
            selling_price_cents: 4_500,
            tax_rate_bps,
            is_vat_exempt,
            min_stock_level: 10,
            requires_prescription: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_effective_tax_rate() {
        assert_eq!(product(1400, false).effective_tax_rate().bps(), 1400);
        assert!(product(1400, true).effective_tax_rate().is_zero());
    }

    #[test]
    fn test_low_stock_is_inclusive() {
        let p = product(1400, false);
        assert!(p.is_low_stock(10));
        assert!(p.is_low_stock(0));
        assert!(!p.is_low_stock(11));
    }

    #[test]
    fn test_tax_rate_percentage() {
        let rate = TaxRate::from_bps(1400);
        assert!((rate.percentage() - 14.0).abs() < f64::EPSILON);
    }
}
