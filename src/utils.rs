//! Useful functions for lexing and rendering.

use crate::{Date, Decimal};
use chrono::Local;
use std::str::FromStr;

/// Returns the current local date. Never cache the result: undated entries
/// must render with the date of the moment they are rendered.
pub fn today() -> Date {
    Local::now().date_naive()
}

/// Parses a [`Decimal`](crate::Decimal) like `-1,024.50`, `3.` or `.5` from a
/// [`&str`]. Thousands separators are dropped. Returns `None` when the text is
/// not a number.
pub fn parse_decimal(num_str: &str) -> Option<Decimal> {
    let unsigned = num_str.strip_prefix('-').unwrap_or(num_str);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };
    if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if int_part.is_empty() {
        if frac_part.is_empty() {
            return None;
        }
    } else if !is_grouped_integer(int_part) {
        return None;
    }

    let mut normalized = String::with_capacity(num_str.len() + 1);
    if num_str.starts_with('-') {
        normalized.push('-');
    }
    if int_part.is_empty() {
        normalized.push('0');
    }
    normalized.extend(int_part.chars().filter(|&c| c != ','));
    if !frac_part.is_empty() {
        normalized.push('.');
        normalized.push_str(frac_part);
    }
    Decimal::from_str(&normalized).ok()
}

/// Digits, optionally with `,` separators between them.
fn is_grouped_integer(text: &str) -> bool {
    let bytes = text.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) if first.is_ascii_digit() && last.is_ascii_digit() => bytes
            .iter()
            .all(|b| b.is_ascii_digit() || *b == b','),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_numbers() {
        assert_eq!(parse_decimal("24"), Some(dec!(24)));
        assert_eq!(parse_decimal("-59.61"), Some(dec!(-59.61)));
        assert_eq!(parse_decimal("1,024.50"), Some(dec!(1024.50)));
        assert_eq!(parse_decimal("3."), Some(dec!(3)));
        assert_eq!(parse_decimal(".5"), Some(dec!(0.5)));
        assert_eq!(parse_decimal("-.5"), Some(dec!(-0.5)));
    }

    #[test]
    fn rejects_words() {
        for text in ["", "-", ".", "bofa", "Paris,", ",100", "1.2.3", "12a", "1,000,"] {
            assert_eq!(parse_decimal(text), None, "{}", text);
        }
    }

    #[test]
    fn keeps_scale() {
        assert_eq!(parse_decimal("10.20").unwrap().scale(), 2);
    }
}
