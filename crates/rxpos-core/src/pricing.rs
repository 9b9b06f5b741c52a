//! # Checkout Pricing
//!
//! Turns priced cart lines into the sale's monetary fields. No stock,
//! no database: the caller supplies each line's tax rate from the product.
//!
//! ## Arithmetic
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line                                                               │
//! │    line_total = unit_price × quantity − line_discount                   │
//! │    line_tax   = round(line_total × rate_bps / 10000)   (0 if exempt)    │
//! │                                                                         │
//! │  per sale                                                               │
//! │    subtotal   = Σ line_total                                            │
//! │    tax        = Σ line_tax                                              │
//! │    total      = subtotal + tax − order_discount                         │
//! │    change     = max(0, paid − total)                                    │
//! │    credit     = total − paid          (CREDIT payments only)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use rxpos_core::money::Money;
//! use rxpos_core::pricing::{price_cart, LineInput};
//! use rxpos_core::types::{PaymentMethod, TaxRate};
//!
//! let lines = [LineInput {
//!     quantity: 2,
//!     unit_price: Money::from_cents(10_000),
//!     discount: Money::zero(),
//!     tax_rate: TaxRate::from_bps(1400),
//! }];
//! let totals = price_cart(&lines, Money::zero(), Money::from_cents(22_800), PaymentMethod::Cash).unwrap();
//! assert_eq!(totals.subtotal.cents(), 20_000);
//! assert_eq!(totals.tax.cents(), 2_800);
//! assert_eq!(totals.total.cents(), 22_800);
//! assert_eq!(totals.change.cents(), 0);
//! ```

use serde::Serialize;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, TaxRate};
use crate::validation::{validate_non_negative_cents, validate_quantity};
use crate::MAX_CART_ITEMS;

fn overflow(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

// =============================================================================
// Inputs / Outputs
// =============================================================================

/// One cart line, already joined with its product's effective tax rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    /// Zero for VAT-exempt products.
    pub tax_rate: TaxRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    /// Net of the line discount, before tax.
    pub line_total: Money,
    pub tax: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutTotals {
    /// Same order as the input lines.
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub paid: Money,
    pub change: Money,
    /// Amount to add to the customer's balance. Zero unless CREDIT.
    pub credit: Money,
}

// =============================================================================
// Pricing
// =============================================================================

/// Prices a single line.
///
/// ## Errors
/// - quantity outside 1..=999
/// - negative unit price or discount
/// - unit price or discount above `MAX_MONEY_CENTS`
/// - discount larger than `unit_price × quantity`
pub fn price_line(line: &LineInput) -> CoreResult<PricedLine> {
    validate_quantity(line.quantity)?;
    validate_non_negative_cents("unit_price", line.unit_price.cents())?;
    validate_non_negative_cents("discount", line.discount.cents())?;

    let gross = line
        .unit_price
        .checked_mul_qty(line.quantity)
        .ok_or_else(|| overflow("unit_price"))?;
    if line.discount > gross {
        return Err(ValidationError::DiscountTooLarge {
            field: "discount".to_string(),
            discount: line.discount.cents(),
            amount: gross.cents(),
        }
        .into());
    }

    let line_total = gross - line.discount;
    Ok(PricedLine {
        line_total,
        tax: line_total.calculate_tax(line.tax_rate),
    })
}

/// Prices a whole cart.
///
/// Tax is rounded per line, then summed; the order discount applies after
/// tax.
pub fn price_cart(
    lines: &[LineInput],
    order_discount: Money,
    paid: Money,
    payment_method: PaymentMethod,
) -> CoreResult<CheckoutTotals> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    if lines.len() > MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }
    validate_non_negative_cents("discount_amount", order_discount.cents())?;
    validate_non_negative_cents("paid_amount", paid.cents())?;

    let priced = lines.iter().map(price_line).collect::<CoreResult<Vec<_>>>()?;

    let subtotal = Money::checked_sum(priced.iter().map(|l| l.line_total)).ok_or_else(|| overflow("subtotal"))?;
    let tax = Money::checked_sum(priced.iter().map(|l| l.tax)).ok_or_else(|| overflow("tax"))?;
    let gross = subtotal.checked_add(tax).ok_or_else(|| overflow("total"))?;

    if order_discount > gross {
        return Err(ValidationError::DiscountTooLarge {
            field: "discount_amount".to_string(),
            discount: order_discount.cents(),
            amount: gross.cents(),
        }
        .into());
    }

    // Both operands are within 0..=i64::MAX from here on.
    let total = gross - order_discount;
    let change = (paid - total).non_negative();
    let credit = if payment_method == PaymentMethod::Credit {
        total - paid
    } else {
        Money::zero()
    };

    Ok(CheckoutTotals {
        lines: priced,
        subtotal,
        tax,
        discount: order_discount,
        total,
        paid,
        change,
        credit,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MAX_ITEM_QUANTITY, MAX_MONEY_CENTS};

    fn line(quantity: i64, unit: i64, discount: i64, bps: u32) -> LineInput {
        LineInput {
            quantity,
            unit_price: Money::from_cents(unit),
            discount: Money::from_cents(discount),
            tax_rate: TaxRate::from_bps(bps),
        }
    }

    #[test]
    fn test_two_units_at_fourteen_percent() {
        let totals = price_cart(
            &[line(2, 10_000, 0, 1400)],
            Money::zero(),
            Money::from_cents(22_800),
            PaymentMethod::Cash,
        )
        .unwrap();

        assert_eq!(totals.subtotal.cents(), 20_000);
        assert_eq!(totals.tax.cents(), 2_800);
        assert_eq!(totals.total.cents(), 22_800);
        assert_eq!(totals.change.cents(), 0);
        assert_eq!(totals.credit.cents(), 0);
    }

    #[test]
    fn test_line_discount_before_tax_and_order_discount_after() {
        // (50.00 × 3 − 10.00) = 140.00, tax 19.60, minus 9.60 order discount
        let totals = price_cart(
            &[line(3, 5_000, 1_000, 1400)],
            Money::from_cents(960),
            Money::from_cents(20_000),
            PaymentMethod::Cash,
        )
        .unwrap();

        assert_eq!(totals.lines[0].line_total.cents(), 14_000);
        assert_eq!(totals.tax.cents(), 1_960);
        assert_eq!(totals.total.cents(), 15_000);
        assert_eq!(totals.change.cents(), 5_000);
    }

    #[test]
    fn test_exempt_line_has_no_tax() {
        let totals = price_cart(
            &[line(1, 8_000, 0, 0), line(1, 2_000, 0, 1400)],
            Money::zero(),
            Money::zero(),
            PaymentMethod::Card,
        )
        .unwrap();
        assert_eq!(totals.lines[0].tax.cents(), 0);
        assert_eq!(totals.lines[1].tax.cents(), 280);
        assert_eq!(totals.total.cents(), 10_280);
    }

    #[test]
    fn test_credit_amount_is_total_minus_paid() {
        let full = price_cart(
            &[line(1, 15_000, 0, 0)],
            Money::zero(),
            Money::zero(),
            PaymentMethod::Credit,
        )
        .unwrap();
        assert_eq!(full.credit.cents(), 15_000);

        let partial = price_cart(
            &[line(1, 15_000, 0, 0)],
            Money::zero(),
            Money::from_cents(5_000),
            PaymentMethod::Credit,
        )
        .unwrap();
        assert_eq!(partial.credit.cents(), 10_000);
        assert_eq!(partial.change.cents(), 0);
    }

    #[test]
    fn test_rejects_bad_carts() {
        assert!(matches!(
            price_cart(&[], Money::zero(), Money::zero(), PaymentMethod::Cash),
            Err(CoreError::EmptyCart)
        ));

        let too_many = vec![line(1, 100, 0, 0); MAX_CART_ITEMS + 1];
        assert!(matches!(
            price_cart(&too_many, Money::zero(), Money::zero(), PaymentMethod::Cash),
            Err(CoreError::CartTooLarge { .. })
        ));

        assert!(price_line(&line(0, 100, 0, 0)).is_err());
        assert!(price_line(&line(1, -1, 0, 0)).is_err());
        assert!(price_line(&line(2, 100, 201, 0)).is_err());

        let over_discounted = price_cart(
            &[line(1, 1_000, 0, 0)],
            Money::from_cents(1_001),
            Money::zero(),
            PaymentMethod::Cash,
        );
        assert!(matches!(
            over_discounted,
            Err(CoreError::Validation(ValidationError::DiscountTooLarge { .. }))
        ));
    }

    #[test]
    fn test_huge_amounts_are_rejected_not_wrapped() {
        let huge_price = price_cart(
            &[line(4, 1 << 62, 0, 1400)],
            Money::zero(),
            Money::zero(),
            PaymentMethod::Cash,
        );
        assert!(matches!(
            huge_price,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let huge_paid = price_cart(
            &[line(1, 1_000, 0, 0)],
            Money::zero(),
            Money::from_cents(i64::MAX),
            PaymentMethod::Credit,
        );
        assert!(matches!(
            huge_paid,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        // The largest accepted cart still prices exactly.
        let ceiling = vec![line(MAX_ITEM_QUANTITY, MAX_MONEY_CENTS, 0, 10_000); MAX_CART_ITEMS];
        let totals = price_cart(&ceiling, Money::zero(), Money::zero(), PaymentMethod::Credit).unwrap();
        let expected = MAX_MONEY_CENTS * MAX_ITEM_QUANTITY * MAX_CART_ITEMS as i64;
        assert_eq!(totals.subtotal.cents(), expected);
        assert_eq!(totals.total.cents(), expected * 2);
        assert_eq!(totals.credit.cents(), expected * 2);
    }
}
