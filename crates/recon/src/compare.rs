//! Field comparison: structural inequality and lenient numeric deltas.

use std::borrow::Cow;

use crate::model::CellValue;

/// Absent and empty cells normalize to `""`; numbers to their canonical text.
pub fn normalize(value: Option<&CellValue>) -> Cow<'_, str> {
    match value {
        Some(v) => v.as_text(),
        None => Cow::Borrowed(""),
    }
}

/// Structural inequality. Compared as text, so `"1.0"` and `"1"` differ.
pub fn differs(a: Option<&CellValue>, b: Option<&CellValue>) -> bool {
    normalize(a) != normalize(b)
}

/// Read a cell as a number, coercing anything unreadable (absent, empty,
/// non-numeric text, NaN) to 0.
pub fn lenient_number(value: Option<&CellValue>) -> f64 {
    let n = match value {
        Some(CellValue::Number(n)) => *n,
        Some(CellValue::Text(s)) => parse_float_prefix(s).unwrap_or(0.0),
        Some(CellValue::Empty) | None => 0.0,
    };
    if n.is_nan() || n == 0.0 {
        0.0
    } else {
        n
    }
}

/// `lenient(a) - lenient(b)`.
pub fn delta(a: Option<&CellValue>, b: Option<&CellValue>) -> f64 {
    lenient_number(a) - lenient_number(b)
}

/// Parse the longest leading decimal literal of `input`, after leading
/// whitespace: optional sign, digits with an optional fraction, optional
/// exponent. `Infinity` is accepted. Trailing text is ignored, so `"12abc"`
/// reads as 12 while `"abc"` and `""` do not parse.
pub fn parse_float_prefix(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();

    let mut end = 0;
    let negative = bytes.first() == Some(&b'-');
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        let frac_digits = frac_end - (end + 1);
        if digits + frac_digits > 0 {
            end = frac_end;
            digits += frac_digits;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    #[test]
    fn absent_and_empty_are_equal() {
        assert!(!differs(None, Some(&CellValue::Empty)));
        assert!(!differs(None, Some(&text(""))));
        assert!(differs(None, Some(&text("x"))));
    }

    #[test]
    fn numeric_looking_text_compares_textually() {
        assert!(differs(Some(&text("1.0")), Some(&text("1"))));
        assert!(!differs(Some(&text("1")), Some(&CellValue::Number(1.0))));
        assert!(differs(Some(&text("1.5")), Some(&CellValue::Number(1.25))));
    }

    #[test]
    fn parse_prefix_basic() {
        assert_eq!(parse_float_prefix("123.45"), Some(123.45));
        assert_eq!(parse_float_prefix("  -50"), Some(-50.0));
        assert_eq!(parse_float_prefix("+.5"), Some(0.5));
        assert_eq!(parse_float_prefix("5."), Some(5.0));
        assert_eq!(parse_float_prefix("1e3"), Some(1000.0));
        assert_eq!(parse_float_prefix("2E-2x"), Some(0.02));
    }

    #[test]
    fn parse_prefix_ignores_trailing_text() {
        assert_eq!(parse_float_prefix("12abc"), Some(12.0));
        assert_eq!(parse_float_prefix("7 apples"), Some(7.0));
        assert_eq!(parse_float_prefix("1e"), Some(1.0));
        assert_eq!(parse_float_prefix("3.2.1"), Some(3.2));
    }

    #[test]
    fn parse_prefix_rejects_non_numeric() {
        assert_eq!(parse_float_prefix(""), None);
        assert_eq!(parse_float_prefix("abc"), None);
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("-"), None);
        assert_eq!(parse_float_prefix("$100"), None);
        assert_eq!(parse_float_prefix("N/A"), None);
    }

    #[test]
    fn parse_prefix_infinity() {
        assert_eq!(parse_float_prefix("Infinity"), Some(f64::INFINITY));
        assert_eq!(parse_float_prefix("-Infinity and beyond"), Some(f64::NEG_INFINITY));
    }

    #[test]
    fn lenient_coerces_to_zero() {
        assert_eq!(lenient_number(None), 0.0);
        assert_eq!(lenient_number(Some(&CellValue::Empty)), 0.0);
        assert_eq!(lenient_number(Some(&text("abc"))), 0.0);
        assert_eq!(lenient_number(Some(&CellValue::Number(f64::NAN))), 0.0);
        assert_eq!(lenient_number(Some(&CellValue::Number(2.5))), 2.5);
    }

    #[test]
    fn delta_subtracts_b_from_a() {
        assert_eq!(delta(Some(&text("10")), Some(&text("4"))), 6.0);
        assert_eq!(delta(Some(&text("abc")), Some(&text(""))), 0.0);
        assert_eq!(delta(None, Some(&CellValue::Number(3.0))), -3.0);
    }
}
