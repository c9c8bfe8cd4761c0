//! Numeric text decoding.
//!
//! Numeric columns bound as character data arrive as text such as `"-12.50"`,
//! `".5"` or `"1.5E+10"`. Parsing never consults the process locale and the
//! decimal separator is always `.`.

use crate::error::{Error, Result};

fn normalize(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\0')
}

/// Parse decimal text into an f64.
pub fn parse_numeric_text(text: &str) -> Result<f64> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Err(Error::type_conversion("empty numeric text"));
    }
    normalized
        .parse::<f64>()
        .map_err(|_| Error::type_conversion(format!("invalid numeric text {:?}", text)))
}

/// Parse integer text into an i64.
///
/// Text with an all-zero fraction (`"42.000"`) is accepted and parsed without
/// passing through a float, so values beyond 2^53 keep every digit. Any other
/// fraction is rejected rather than rounded.
pub fn parse_integer_text(text: &str) -> Result<i64> {
    let normalized = normalize(text);
    let not_integer = || Error::type_conversion(format!("{:?} is not an integer", text));

    let digits = match normalized.split_once('.') {
        Some((whole, fraction)) if fraction.bytes().all(|b| b == b'0') => whole,
        Some(_) => return Err(not_integer()),
        None => normalized,
    };
    match digits {
        "" | "-" | "+" => Err(not_integer()),
        _ => digits.parse::<i64>().map_err(|_| not_integer()),
    }
}

/// Parse boolean text: `1`/`0`, `true`/`false`, `y`/`n`.
pub fn parse_bool_text(text: &str) -> Result<bool> {
    match normalize(text).to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "y" | "yes" => Ok(true),
        "0" | "false" | "f" | "n" | "no" => Ok(false),
        _ => Err(Error::type_conversion(format!(
            "invalid boolean text {:?}",
            text
        ))),
    }
}

/// Render an f64 as decimal text, never in exponent form.
pub fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_text() {
        assert_eq!(parse_numeric_text("123.45").unwrap(), 123.45);
        assert_eq!(parse_numeric_text(" -0.5 ").unwrap(), -0.5);
        assert_eq!(parse_numeric_text(".25").unwrap(), 0.25);
        assert_eq!(parse_numeric_text("1.5E+3").unwrap(), 1500.0);
        assert_eq!(parse_numeric_text("7\0\0").unwrap(), 7.0);
    }

    #[test]
    fn test_parse_numeric_ignores_locale_separators() {
        assert!(parse_numeric_text("3,75").is_err());
        assert!(parse_numeric_text("1,234").is_err());
        assert!(parse_numeric_text("1,000,000").is_err());
    }

    #[test]
    fn test_parse_numeric_rejects_garbage() {
        assert!(parse_numeric_text("").is_err());
        assert!(parse_numeric_text("abc").is_err());
    }

    #[test]
    fn test_parse_integer_text() {
        assert_eq!(parse_integer_text("9007199254740993").unwrap(), 9_007_199_254_740_993);
        assert_eq!(parse_integer_text("42.000").unwrap(), 42);
        assert_eq!(parse_integer_text("-17").unwrap(), -17);
        assert!(parse_integer_text("4.2").is_err());
        assert!(parse_integer_text("1,234").is_err());
        assert!(parse_integer_text(".").is_err());
    }

    #[test]
    fn test_parse_integer_text_beyond_float_precision() {
        assert_eq!(
            parse_integer_text("9007199254740993.0").unwrap(),
            9_007_199_254_740_993
        );
        assert_eq!(
            parse_integer_text(" -9223372036854775807.000 ").unwrap(),
            -9_223_372_036_854_775_807
        );
        assert!(parse_integer_text("9223372036854775808.0").is_err());
    }

    #[test]
    fn test_parse_bool_text() {
        assert!(parse_bool_text("1").unwrap());
        assert!(!parse_bool_text("FALSE").unwrap());
        assert!(parse_bool_text("maybe").is_err());
    }

    #[test]
    fn test_format_numeric() {
        assert_eq!(format_numeric(42.0), "42");
        assert_eq!(format_numeric(-1.25), "-1.25");
        assert_eq!(format_numeric(0.1), "0.1");
    }
}
