//! # Request Signature
//!
//! Authentication material for the outbound payment-initiation call.
//!
//! The gateway expects `hex(sha256(api_key || order_id || amount || api_secret))`
//! where `amount` is the price in minor units. The digest is deterministic so
//! it can be recomputed later for diagnosis without contacting the gateway.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Convert a major-unit price to minor units, truncating (never rounding)
/// any fraction below one minor unit. `19.999 -> 1999`.
///
/// Returns `None` if the result does not fit in an `i64`.
pub fn to_minor_units(price: Decimal) -> Option<i64> {
    price
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))?
        .trunc()
        .to_i64()
}

/// Compute the initiation signature
pub fn sign(api_key: &str, order_id: &str, amount_minor_units: i64, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(order_id.as_bytes());
    hasher.update(amount_minor_units.to_string().as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minor_units_truncate() {
        assert_eq!(to_minor_units(dec!(199.99)), Some(19999));
        assert_eq!(to_minor_units(dec!(19.999)), Some(1999));
        assert_eq!(to_minor_units(dec!(100.00)), Some(10000));
        assert_eq!(to_minor_units(dec!(0.009)), Some(0));
    }

    #[test]
    fn test_minor_units_overflow() {
        assert_eq!(to_minor_units(Decimal::MAX), None);
    }

    #[test]
    fn test_sign_is_deterministic() {
        let a = sign("key", "order-1", 19999, "secret");
        let b = sign("key", "order-1", 19999, "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_sign_matches_concatenated_digest() {
        let expected = hex::encode(Sha256::digest(b"keyorder-119999secret"));
        assert_eq!(sign("key", "order-1", 19999, "secret"), expected);
    }

    #[test]
    fn test_sign_depends_on_every_input() {
        let base = sign("key", "order-1", 100, "secret");
        assert_ne!(base, sign("key2", "order-1", 100, "secret"));
        assert_ne!(base, sign("key", "order-2", 100, "secret"));
        assert_ne!(base, sign("key", "order-1", 101, "secret"));
        assert_ne!(base, sign("key", "order-1", 100, "secret2"));
    }
}
