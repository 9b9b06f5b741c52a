//! Human-readable identifiers: invoice and purchase-order numbers,
//! generated barcodes and SKUs.
//!
//! The formatting functions are pure and take their clock and entropy as
//! arguments; the `new_*` helpers feed them `Utc::now()` and `rand::random`.
//! Uniqueness per tenant is enforced by the database, not here.

use chrono::{DateTime, Utc};

use crate::{BARCODE_PREFIX, INVOICE_PREFIX, PURCHASE_ORDER_PREFIX, SKU_PREFIX};

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Uppercase base-36 rendering of an unsigned value.
///
/// ## Example
/// ```rust
/// use rxpos_core::numbering::to_base36;
///
/// assert_eq!(to_base36(0), "0");
/// assert_eq!(to_base36(35), "Z");
/// assert_eq!(to_base36(36), "10");
/// ```
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// `len` base-36 characters taken from `entropy`.
fn base36_suffix(entropy: u64, len: usize) -> String {
    let mut value = entropy;
    (0..len)
        .map(|_| {
            let c = BASE36[(value % 36) as usize] as char;
            value /= 36;
            c
        })
        .collect()
}

fn millis(now: DateTime<Utc>) -> u64 {
    now.timestamp_millis().max(0) as u64
}

/// `INV-<base36 millis>-<4 chars>`, e.g. `INV-MC1X9Z2K-7Q4B`.
pub fn invoice_number(now: DateTime<Utc>, entropy: u64) -> String {
    format!(
        "{}-{}-{}",
        INVOICE_PREFIX,
        to_base36(millis(now)),
        base36_suffix(entropy, 4)
    )
}

/// `PO-<base36 millis>-<4 chars>`.
pub fn purchase_order_number(now: DateTime<Utc>, entropy: u64) -> String {
    format!(
        "{}-{}-{}",
        PURCHASE_ORDER_PREFIX,
        to_base36(millis(now)),
        base36_suffix(entropy, 4)
    )
}

/// `PHB` + last 8 digits of the epoch millis + 4 random digits.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use rxpos_core::numbering::barcode;
///
/// let now = Utc.timestamp_millis_opt(1_760_000_123_456).unwrap();
/// assert_eq!(barcode(now, 42), "PHB001234560042");
/// ```
pub fn barcode(now: DateTime<Utc>, entropy: u64) -> String {
    format!(
        "{}{:08}{:04}",
        BARCODE_PREFIX,
        millis(now) % 100_000_000,
        entropy % 10_000
    )
}

/// `PRD-` + 6 random base-36 characters.
pub fn sku(entropy: u64) -> String {
    format!("{}-{}", SKU_PREFIX, base36_suffix(entropy, 6))
}

pub fn new_invoice_number() -> String {
    invoice_number(Utc::now(), rand::random())
}

pub fn new_purchase_order_number() -> String {
    purchase_order_number(Utc::now(), rand::random())
}

pub fn new_barcode() -> String {
    barcode(Utc::now(), rand::random())
}

pub fn new_sku() -> String {
    sku(rand::random())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_invoice_number_shape() {
        let now = Utc.timestamp_millis_opt(1_760_000_000_000).unwrap();
        let number = invoice_number(now, 0);
        assert!(number.starts_with("INV-"));
        assert!(number.ends_with("-0000"));
        assert_eq!(number, format!("INV-{}-0000", to_base36(1_760_000_000_000)));
        assert!(number
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn test_entropy_changes_suffix() {
        let now = Utc.timestamp_millis_opt(1_760_000_000_000).unwrap();
        assert_ne!(invoice_number(now, 1), invoice_number(now, 2));
        assert!(purchase_order_number(now, 7).starts_with("PO-"));
    }

    #[test]
    fn test_sku_and_barcode() {
        let s = sku(u64::MAX);
        assert!(s.starts_with("PRD-"));
        assert_eq!(s.len(), 10);

        let now = Utc.timestamp_millis_opt(5).unwrap();
        assert_eq!(barcode(now, 123_456), "PHB000000053456");
    }

    #[test]
    fn test_generators_are_distinct() {
        assert_ne!(new_invoice_number(), new_invoice_number());
        assert_ne!(new_sku(), new_sku());
        assert_eq!(new_barcode().len(), 15);
    }
}
