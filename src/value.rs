// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Values passed to and computed by compiled capabilities

use std::fmt;

/// Types of values a capability can use
///
/// Numeric values are always integers. Floating point inputs are truncated
/// toward zero when converted, so fractional parts never reach the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Text(String),
}

impl Value {
    /// Integer interpretation of the value
    ///
    /// Text is parsed as an optionally signed decimal prefix, anything
    /// unparseable counts as 0.
    #[must_use]
    pub fn to_integer(&self) -> i64 {
        match self {
            Self::Integer(value) => *value,
            Self::Text(text) => parse_leading_integer(text),
        }
    }

    /// Truthiness as used by `%t`, `%A`, `%O` and `%!`
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Integer(value) => *value != 0,
            Self::Text(text) => !text.is_empty(),
        }
    }

    /// Length reported by `%l`
    #[must_use]
    pub fn length(&self) -> i64 {
        match self {
            Self::Integer(value) => value.to_string().len() as i64,
            Self::Text(text) => text.chars().count() as i64,
        }
    }
}

fn parse_leading_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let mut value: i64 = 0;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.wrapping_mul(10).wrapping_add(i64::from(digit - b'0'));
    }
    if negative { value.wrapping_neg() } else { value }
}

impl Default for Value {
    fn default() -> Self {
        Self::Integer(0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

// `as` saturates out of range values and maps NaN to 0.
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Integer(value.trunc() as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::from(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Self::Integer(i64::from(u32::from(value)))
    }
}

#[cfg(test)]
mod test {
    use super::Value;

    #[test]
    #[allow(clippy::approx_constant)]
    fn float_truncation() {
        assert_eq!(Value::from(42.7), Value::Integer(42));
        assert_eq!(Value::from(3.14159), Value::Integer(3));
        assert_eq!(Value::from(-2.9), Value::Integer(-2));
        assert_eq!(Value::from(f64::NAN), Value::Integer(0));
        assert_eq!(Value::from(1e300), Value::Integer(i64::MAX));
    }

    #[test]
    fn text_to_integer() {
        let tests = [
            ("42", 42),
            ("  -17abc", -17),
            ("+8", 8),
            ("abc", 0),
            ("", 0),
            ("-", 0),
        ];
        for (text, expected) in tests {
            assert_eq!(Value::from(text).to_integer(), expected, "Failed for {text:?}");
        }
    }

    #[test]
    fn truthiness() {
        assert!(Value::from(1).is_truthy());
        assert!(Value::from(-1).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(!Value::from("").is_truthy());
    }

    #[test]
    fn length() {
        assert_eq!(Value::from("Hello, World!").length(), 13);
        assert_eq!(Value::from("héllo").length(), 5);
        assert_eq!(Value::from(-120).length(), 4);
    }

    #[test]
    fn char_code() {
        assert_eq!(Value::from('A'), Value::Integer(65));
    }
}
