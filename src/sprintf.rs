// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! printf-style formatting of single values
//!
//! This is the formatting primitive behind the `%d`, `%o`, `%x`, `%X`, `%s`
//! and `%c` directives of compiled capabilities, also exposed directly as
//! [`sprintf`].

use std::{iter::Peekable, str::Chars};

use crate::value::Value;

/// Conversion selected by the final letter of a format directive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conversion {
    /// `%d`
    Decimal,
    /// `%o`
    Octal,
    /// `%x`
    LowerHex,
    /// `%X`
    UpperHex,
    /// `%s`
    String,
    /// `%c`
    Char,
}

impl Conversion {
    /// Map a conversion letter to the conversion
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'd' => Some(Self::Decimal),
            'o' => Some(Self::Octal),
            'x' => Some(Self::LowerHex),
            'X' => Some(Self::UpperHex),
            's' => Some(Self::String),
            'c' => Some(Self::Char),
            _ => None,
        }
    }
}

/// Modifiers between `%` and the conversion letter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    /// Minimum field width, zero-padded unless `left` is set
    pub width: u16,
    /// Minimum digits for numbers, maximum characters for strings
    pub precision: Option<u16>,
    /// `#`
    pub alternate: bool,
    /// `-`
    pub left: bool,
    /// `+`
    pub sign: bool,
    /// ` `
    pub space: bool,
}

/// Complete description of one format directive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatSpec {
    pub flags: Flags,
    pub conversion: Conversion,
}

impl FormatSpec {
    #[must_use]
    pub const fn new(conversion: Conversion, flags: Flags) -> Self {
        Self { flags, conversion }
    }
}

/// Format a single value
///
/// A missing value formats as 0, or as an empty string for `%s`.
#[must_use]
pub fn format_value(value: Option<&Value>, spec: FormatSpec) -> String {
    let flags = spec.flags;
    let (prefix, body) = match spec.conversion {
        Conversion::Decimal => {
            let d = value.map_or(0, Value::to_integer);
            let prefix = if d < 0 {
                "-"
            } else if flags.sign {
                "+"
            } else if flags.space {
                " "
            } else {
                ""
            };
            (prefix, with_precision(d.unsigned_abs().to_string(), flags))
        }
        Conversion::Octal => {
            let d = value.map_or(0, Value::to_integer);
            let body = with_precision(format!("{d:o}"), flags);
            // Leading octal zero counts against precision.
            if flags.alternate && !body.starts_with('0') {
                ("0", body)
            } else {
                ("", body)
            }
        }
        Conversion::LowerHex => {
            let d = value.map_or(0, Value::to_integer);
            let prefix = if flags.alternate && d != 0 { "0x" } else { "" };
            (prefix, with_precision(format!("{d:x}"), flags))
        }
        Conversion::UpperHex => {
            let d = value.map_or(0, Value::to_integer);
            let prefix = if flags.alternate && d != 0 { "0X" } else { "" };
            (prefix, with_precision(format!("{d:X}"), flags))
        }
        Conversion::String => {
            let mut s = value.map(ToString::to_string).unwrap_or_default();
            if let Some(precision) = flags.precision
                && let Some((index, _)) = s.char_indices().nth(usize::from(precision))
            {
                s.truncate(index);
            }
            return pad_text(s, flags);
        }
        Conversion::Char => {
            let code = value.map_or(0, Value::to_integer);
            return pad_text(char_from_code(code).to_string(), flags);
        }
    };
    pad_number(prefix, body, flags)
}

/// `%c` of 0 emits 0200 (U+0080) for ncurses compatibility
fn char_from_code(code: i64) -> char {
    if code == 0 {
        return '\u{80}';
    }
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn with_precision(digits: String, flags: Flags) -> String {
    match flags.precision {
        Some(precision) if usize::from(precision) > digits.len() => {
            format!("{digits:0>width$}", width = usize::from(precision))
        }
        _ => digits,
    }
}

fn pad_number(prefix: &str, body: String, flags: Flags) -> String {
    let width = usize::from(flags.width);
    let len = prefix.len() + body.len();
    if width <= len {
        return format!("{prefix}{body}");
    }
    if flags.left {
        format!("{prefix}{body}{:width$}", "", width = width - len)
    } else {
        format!("{prefix}{body:0>width$}", width = width - prefix.len())
    }
}

fn pad_text(s: String, flags: Flags) -> String {
    let width = usize::from(flags.width);
    let len = s.chars().count();
    if width <= len {
        s
    } else if flags.left {
        format!("{s:<width$}")
    } else {
        format!("{s:>width$}")
    }
}

/// Read a decimal number, saturating at `u16::MAX`
fn read_u16(chars: &mut Peekable<impl Iterator<Item = char>>) -> u16 {
    let mut value: u16 = 0;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(digit as u16);
        chars.next();
    }
    value
}

/// Parse `[-+# ]*[width][.precision]` followed by a conversion letter
fn parse_spec(chars: &mut Peekable<Chars<'_>>) -> Option<FormatSpec> {
    let mut flags = Flags::default();
    while let Some(&c) = chars.peek() {
        match c {
            '-' => flags.left = true,
            '+' => flags.sign = true,
            '#' => flags.alternate = true,
            ' ' => flags.space = true,
            _ => break,
        }
        chars.next();
    }
    flags.width = read_u16(chars);
    if chars.next_if_eq(&'.').is_some() {
        flags.precision = Some(read_u16(chars));
    }
    let conversion = Conversion::from_char(chars.next()?)?;
    Some(FormatSpec::new(conversion, flags))
}

/// Format `args` according to `format`
///
/// Supports `%d`, `%o`, `%x`, `%X`, `%s` and `%c` with optional flags, width
/// and precision, plus `%%`. Every directive consumes the next argument, a
/// missing argument formats as 0 (or as an empty string for `%s`). Sequences
/// that are not valid directives are copied to the output unchanged.
///
/// ```
/// use terminfo_compile::{Value, sprintf};
///
/// assert_eq!(sprintf("%2d:%x", &[Value::from(5), Value::from(255)]), "05:ff");
/// ```
#[must_use]
pub fn sprintf(format: &str, args: &[Value]) -> String {
    let mut output = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            output.push(c);
            continue;
        }
        if chars.next_if_eq(&'%').is_some() {
            output.push('%');
            continue;
        }
        let rest = chars.clone();
        if let Some(spec) = parse_spec(&mut chars) {
            output.push_str(&format_value(args.next(), spec));
        } else {
            // Not a directive, copy `%` and let the rest be literal text.
            output.push('%');
            chars = rest;
        }
    }
    output
}
