//! Human-facing reference numbers.
//!
//! Orders and complaints carry a user-visible number distinct from their
//! internal id: a prefix, the creation timestamp in unix milliseconds, and
//! a 9-character uppercase alphanumeric suffix
//! (`ORD-1717171717171-4F7K2QX9B`). The suffix gives ~36^9 combinations
//! per millisecond; the database still enforces uniqueness and the order
//! placement workflow retries once on a collision.

use chrono::Utc;
use rand::Rng;

const SUFFIX_LEN: usize = 9;
const SUFFIX_CHARSET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate an order number (`ORD-<unix-ms>-<suffix>`).
#[must_use]
pub fn order_number() -> String {
    with_prefix("ORD")
}

/// Generate a complaint number (`COMP-<unix-ms>-<suffix>`).
#[must_use]
pub fn complaint_number() -> String {
    with_prefix("COMP")
}

fn with_prefix(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("{prefix}-{}-{suffix}", Utc::now().timestamp_millis())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn assert_shape(number: &str, prefix: &str) {
        let mut parts = number.split('-');
        assert_eq!(parts.next().unwrap(), prefix);

        let millis: i64 = parts.next().unwrap().parse().unwrap();
        assert!(millis > 0);

        let suffix = parts.next().unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

        assert!(parts.next().is_none());
    }

    #[test]
    fn test_order_number_shape() {
        assert_shape(&order_number(), "ORD");
    }

    #[test]
    fn test_complaint_number_shape() {
        assert_shape(&complaint_number(), "COMP");
    }

    #[test]
    fn test_numbers_do_not_repeat() {
        let numbers: std::collections::HashSet<String> =
            (0..1000).map(|_| order_number()).collect();
        assert_eq!(numbers.len(), 1000);
    }
}
