//! Attempt tracking through the `x-retry-count` header.

use crate::types::{RetryCountHeader, RetryHeaders};

const FIRST_ATTEMPT: u64 = 1;
const SATURATED: i64 = i32::MAX as i64;

/// Attempt number for the next delivery of a message, always >= 1.
///
/// Malformed or unsupported header values count as a first attempt. A
/// counter sitting exactly at `i32::MAX` is returned unchanged so the
/// increment cannot overflow the 32-bit header.
pub fn retry_count(header: RetryCountHeader<'_>) -> u64 {
    let current = match header {
        RetryCountHeader::Absent | RetryCountHeader::Unsupported => return FIRST_ATTEMPT,
        RetryCountHeader::Int32(n) => i64::from(n),
        RetryCountHeader::Int64(n) => n,
        RetryCountHeader::Text(s) => match s.parse::<i64>() {
            Ok(n) => n,
            Err(_) => return FIRST_ATTEMPT,
        },
    };

    let current = current.max(0);
    if current == SATURATED {
        return current as u64;
    }
    (current as u64).saturating_add(1)
}

/// Convenience over [`retry_count`] for anything carrying retry headers.
pub fn message_retry_count<H: RetryHeaders>(headers: &H) -> u64 {
    retry_count(headers.retry_count_header())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_header_is_first_attempt() {
        assert_eq!(retry_count(RetryCountHeader::Absent), 1);
    }

    #[test]
    fn integer_headers_increment() {
        assert_eq!(retry_count(RetryCountHeader::Int32(3)), 4);
        assert_eq!(retry_count(RetryCountHeader::Int64(2)), 3);
        assert_eq!(retry_count(RetryCountHeader::Int32(0)), 1);
    }

    #[test]
    fn numeric_text_increments() {
        assert_eq!(retry_count(RetryCountHeader::Text("5")), 6);
    }

    #[test]
    fn garbage_degrades_to_first_attempt() {
        assert_eq!(retry_count(RetryCountHeader::Text("abc")), 1);
        assert_eq!(retry_count(RetryCountHeader::Text("")), 1);
        assert_eq!(retry_count(RetryCountHeader::Unsupported), 1);
    }

    #[test]
    fn negative_counts_as_zero() {
        assert_eq!(retry_count(RetryCountHeader::Int32(-7)), 1);
        assert_eq!(retry_count(RetryCountHeader::Int64(i64::MIN)), 1);
        assert_eq!(retry_count(RetryCountHeader::Text("-3")), 1);
    }

    #[test]
    fn saturates_only_at_i32_max() {
        let max = i32::MAX as u64;
        assert_eq!(retry_count(RetryCountHeader::Int32(i32::MAX)), max);
        assert_eq!(retry_count(RetryCountHeader::Int64(i32::MAX as i64)), max);
        assert_eq!(retry_count(RetryCountHeader::Text("2147483647")), max);
        assert_eq!(retry_count(RetryCountHeader::Int32(i32::MAX - 1)), max);
    }

    #[test]
    fn counts_above_32_bit_range_still_increment() {
        assert_eq!(retry_count(RetryCountHeader::Int64(3_000_000_000)), 3_000_000_001);
        assert_eq!(retry_count(RetryCountHeader::Text("2147483648")), 2_147_483_649);
        assert_eq!(retry_count(RetryCountHeader::Int64(i64::MAX)), i64::MAX as u64 + 1);
    }
}
