// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tokenizing capability templates
//!
//! Literal text is decoded here: backslash escapes (`\E`, `\n`, octal `\nnn`
//! and friends) and caret notation (`^X`) are resolved into the characters
//! they stand for, so later stages only see plain text and directives.

use std::{iter::Peekable, str::CharIndices};

use crate::sprintf::{Conversion, Flags, FormatSpec};

const ESC: char = '\x1b';

/// ncurses stores NUL as 0200 so strings stay NUL-terminated
const ENCODED_NUL: char = '\u{80}';

/// Variable referenced by `%P` and `%g`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variable {
    /// `a`-`z`, reset for every call
    Dynamic(u8),
    /// `A`-`Z`, kept in the caller's `StaticVariables`
    Static(u8),
}

/// Operators taking two operands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    BitXor,
    Equal,
    Less,
    Greater,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    const fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            'm' => Some(Self::Modulo),
            '&' => Some(Self::BitAnd),
            '|' => Some(Self::BitOr),
            '^' => Some(Self::BitXor),
            '=' => Some(Self::Equal),
            '<' => Some(Self::Less),
            '>' => Some(Self::Greater),
            'A' => Some(Self::LogicalAnd),
            'O' => Some(Self::LogicalOr),
            _ => None,
        }
    }
}

/// Operators taking one operand
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `%!`
    LogicalNot,
    /// `%~`
    Complement,
}

/// Lexical element of a capability template
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Decoded literal text
    Literal(String),
    /// Padding specification such as `$<5*>`, kept verbatim
    Padding(String),
    /// `%p1`..`%p9`, stored 1-based
    PushParam(u8),
    /// `%{n}` and `%'c'`
    PushInteger(i64),
    /// `%P`
    SetVariable(Variable),
    /// `%g`
    GetVariable(Variable),
    /// `%l`
    StringLength,
    Binary(BinaryOp),
    Unary(UnaryOp),
    /// `%d`, `%x`, `%:-5s` and the like
    Format(FormatSpec),
    /// `%i`
    Increment,
    /// `%?`
    If,
    /// `%t`
    Then,
    /// `%e`
    Else,
    /// `%;`
    EndIf,
}

/// Errors reported when tokenizing a template
///
/// Offsets are byte offsets of the `%` that starts the bad directive.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("Unrecognized format option {1:?} at offset {0}")]
    UnrecognizedFormatOption(usize, char),
    #[error("Invalid variable name {1:?} at offset {0}")]
    InvalidVariableName(usize, char),
    #[error("Invalid parameter index {1:?} at offset {0}")]
    InvalidParameterIndex(usize, char),
    #[error("Malformed character constant at offset {0}")]
    MalformedCharacterConstant(usize),
    #[error("Integer constant too large at offset {0}")]
    IntegerConstantOverflow(usize),
    #[error("Integer constant malformed at offset {0}")]
    MalformedIntegerConstant(usize),
    #[error("Overflow in format width at offset {0}")]
    FormatWidthOverflow(usize),
    #[error("Overflow in format precision at offset {0}")]
    FormatPrecisionOverflow(usize),
    #[error("Directive at offset {0} is cut short by the end of the string")]
    UnexpectedEnd(usize),
}

#[derive(Clone, Copy, PartialEq)]
enum FormatState {
    Flags,
    Width,
    Precision,
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
    literal: String,
}

/// Split a template into tokens
pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer {
        chars: source.char_indices().peekable(),
        tokens: Vec::new(),
        literal: String::with_capacity(source.len()),
    };
    while let Some((offset, c)) = lexer.chars.next() {
        match c {
            '%' => lexer.directive(offset)?,
            '\\' => {
                let decoded = lexer.escape();
                lexer.literal.push(decoded);
            }
            '^' => {
                let decoded = lexer.caret();
                lexer.literal.push(decoded);
            }
            '$' => lexer.padding(),
            c => lexer.literal.push(c),
        }
    }
    lexer.flush_literal();
    Ok(lexer.tokens)
}

impl Lexer<'_> {
    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            let text = std::mem::take(&mut self.literal);
            self.tokens.push(Token::Literal(text));
        }
    }

    fn push(&mut self, token: Token) {
        self.flush_literal();
        self.tokens.push(token);
    }

    fn next_char(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    /// Decode the character after a backslash
    fn escape(&mut self) -> char {
        let Some(c) = self.next_char() else {
            return '\\';
        };
        match c {
            'E' | 'e' => ESC,
            'n' | 'l' => '\n',
            'r' => '\r',
            't' => '\t',
            'b' => '\x08',
            'f' => '\x0c',
            's' => ' ',
            '0'..='7' => {
                let mut code = c as u32 - '0' as u32;
                for _ in 0..2 {
                    let Some((_, digit @ '0'..='7')) = self.chars.peek().copied() else {
                        break;
                    };
                    code = code * 8 + (digit as u32 - '0' as u32);
                    self.chars.next();
                }
                match code {
                    0 => ENCODED_NUL,
                    code => char::from_u32(code).unwrap_or(ENCODED_NUL),
                }
            }
            // `\\`, `\^`, `\:`, `\,` and anything unknown stand for themselves
            c => c,
        }
    }

    /// Decode the character after a caret
    fn caret(&mut self) -> char {
        match self.chars.peek().map(|&(_, c)| c) {
            Some('?') => {
                self.chars.next();
                '\x7f'
            }
            Some(c @ ('@'..='_' | 'a'..='z')) => {
                self.chars.next();
                char::from(c as u8 & 0x1f)
            }
            _ => '^',
        }
    }

    /// Recognize `$<digits[.digit][*][/]>`, anything else is literal text
    fn padding(&mut self) {
        let mut lookahead = self.chars.clone();
        let mut spec = String::from("$");
        if lookahead.next_if(|&(_, c)| c == '<').is_none() {
            self.literal.push('$');
            return;
        }
        spec.push('<');
        while let Some((_, c)) =
            lookahead.next_if(|&(_, c)| matches!(c, '0'..='9' | '.' | '*' | '/'))
        {
            spec.push(c);
        }
        if lookahead.next_if(|&(_, c)| c == '>').is_none() {
            self.literal.push('$');
            return;
        }
        spec.push('>');
        self.chars = lookahead;
        self.push(Token::Padding(spec));
    }

    fn directive(&mut self, start: usize) -> Result<(), Error> {
        let Some(c) = self.next_char() else {
            // A lone trailing `%` is kept as text
            self.literal.push('%');
            return Ok(());
        };
        if let Some(op) = BinaryOp::from_char(c) {
            self.push(Token::Binary(op));
            return Ok(());
        }
        if let Some(conversion) = Conversion::from_char(c) {
            self.push(Token::Format(FormatSpec::new(conversion, Flags::default())));
            return Ok(());
        }
        match c {
            '%' => self.literal.push('%'),
            'p' => match self.next_char() {
                Some(index @ '1'..='9') => self.push(Token::PushParam(index as u8 - b'0')),
                Some(other) => return Err(Error::InvalidParameterIndex(start, other)),
                None => return Err(Error::UnexpectedEnd(start)),
            },
            'P' => {
                let variable = self.variable(start)?;
                self.push(Token::SetVariable(variable));
            }
            'g' => {
                let variable = self.variable(start)?;
                self.push(Token::GetVariable(variable));
            }
            '\'' => {
                let value = self.char_constant(start)?;
                self.push(Token::PushInteger(value));
            }
            '{' => {
                let value = self.int_constant(start)?;
                self.push(Token::PushInteger(value));
            }
            'l' => self.push(Token::StringLength),
            '!' => self.push(Token::Unary(UnaryOp::LogicalNot)),
            '~' => self.push(Token::Unary(UnaryOp::Complement)),
            'i' => self.push(Token::Increment),
            '?' => self.push(Token::If),
            't' => self.push(Token::Then),
            'e' => self.push(Token::Else),
            ';' => self.push(Token::EndIf),
            ':' | '#' | ' ' | '.' | '0'..='9' => {
                let spec = self.format_pattern(start, c)?;
                self.push(Token::Format(spec));
            }
            c => return Err(Error::UnrecognizedFormatOption(start, c)),
        }
        Ok(())
    }

    fn variable(&mut self, start: usize) -> Result<Variable, Error> {
        match self.next_char() {
            Some(c @ 'a'..='z') => Ok(Variable::Dynamic(c as u8 - b'a')),
            Some(c @ 'A'..='Z') => Ok(Variable::Static(c as u8 - b'A')),
            Some(c) => Err(Error::InvalidVariableName(start, c)),
            None => Err(Error::UnexpectedEnd(start)),
        }
    }

    fn char_constant(&mut self, start: usize) -> Result<i64, Error> {
        let c = match self.next_char() {
            Some('\\') => self.escape(),
            Some(c) => c,
            None => return Err(Error::UnexpectedEnd(start)),
        };
        match self.next_char() {
            Some('\'') => Ok(i64::from(u32::from(c))),
            Some(_) => Err(Error::MalformedCharacterConstant(start)),
            None => Err(Error::UnexpectedEnd(start)),
        }
    }

    fn int_constant(&mut self, start: usize) -> Result<i64, Error> {
        let negative = self.chars.next_if(|&(_, c)| c == '-').is_some();
        let mut value: i64 = 0;
        loop {
            match self.next_char() {
                Some('}') => break,
                Some(c) => {
                    let Some(digit) = c.to_digit(10) else {
                        return Err(Error::MalformedIntegerConstant(start));
                    };
                    value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(i64::from(digit)))
                        .ok_or(Error::IntegerConstantOverflow(start))?;
                }
                None => return Err(Error::UnexpectedEnd(start)),
            }
        }
        Ok(if negative { -value } else { value })
    }

    /// Parse `%[[:]flags][width][.precision]conversion`, `first` already consumed
    fn format_pattern(&mut self, start: usize, first: char) -> Result<FormatSpec, Error> {
        let mut flags = Flags::default();
        let mut state = match first {
            '#' => {
                flags.alternate = true;
                FormatState::Flags
            }
            ' ' => {
                flags.space = true;
                FormatState::Flags
            }
            '.' => {
                flags.precision = Some(0);
                FormatState::Precision
            }
            '0'..='9' => {
                flags.width = first as u16 - '0' as u16;
                FormatState::Width
            }
            _ => FormatState::Flags,
        };
        loop {
            let Some(c) = self.next_char() else {
                return Err(Error::UnexpectedEnd(start));
            };
            if let Some(conversion) = Conversion::from_char(c) {
                return Ok(FormatSpec::new(conversion, flags));
            }
            match (state, c) {
                (FormatState::Flags, '#') => flags.alternate = true,
                (FormatState::Flags, '-') => flags.left = true,
                (FormatState::Flags, '+') => flags.sign = true,
                (FormatState::Flags, ' ') => flags.space = true,
                (FormatState::Flags, '0'..='9') => {
                    flags.width = c as u16 - '0' as u16;
                    state = FormatState::Width;
                }
                (FormatState::Width, '0'..='9') => {
                    flags.width = flags
                        .width
                        .checked_mul(10)
                        .and_then(|w| w.checked_add(c as u16 - '0' as u16))
                        .ok_or(Error::FormatWidthOverflow(start))?;
                }
                (FormatState::Flags | FormatState::Width, '.') => {
                    flags.precision = Some(0);
                    state = FormatState::Precision;
                }
                (FormatState::Precision, '0'..='9') => {
                    flags.precision = Some(
                        flags
                            .precision
                            .unwrap_or(0)
                            .checked_mul(10)
                            .and_then(|p| p.checked_add(c as u16 - '0' as u16))
                            .ok_or(Error::FormatPrecisionOverflow(start))?,
                    );
                }
                _ => return Err(Error::UnrecognizedFormatOption(start, c)),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{BinaryOp, Error, Token, UnaryOp, Variable, tokenize};
    use crate::sprintf::{Conversion, Flags, FormatSpec};

    fn literal(text: &str) -> Token {
        Token::Literal(text.to_owned())
    }

    fn format(conversion: Conversion) -> Token {
        Token::Format(FormatSpec::new(conversion, Flags::default()))
    }

    #[test]
    fn plain_text() {
        assert_eq!(tokenize("hello"), Ok(vec![literal("hello")]));
        assert_eq!(tokenize(""), Ok(vec![]));
    }

    #[test]
    fn backslash_escapes() {
        let tests = [
            (r"\E[0m", "\x1b[0m"),
            (r"\e", "\x1b"),
            (r"\n\l\r\t\b\f\s", "\n\n\r\t\x08\x0c "),
            (r"\\\:\^\,", "\\:^,"),
            (r"\0", "\u{80}"),
            (r"\000", "\u{80}"),
            (r"\033[", "\x1b["),
            (r"\177", "\x7f"),
            (r"\q", "q"),
            ("end\\", "end\\"),
        ];
        for (source, expected) in tests {
            assert_eq!(
                tokenize(source),
                Ok(vec![literal(expected)]),
                "Failed for {source}"
            );
        }
    }

    #[test]
    fn caret_escapes() {
        let tests = [
            ("^[", "\x1b"),
            ("^G", "\x07"),
            ("^g", "\x07"),
            ("^@", "\0"),
            ("^?", "\x7f"),
            ("^", "^"),
            ("a^1", "a^1"),
        ];
        for (source, expected) in tests {
            assert_eq!(
                tokenize(source),
                Ok(vec![literal(expected)]),
                "Failed for {source}"
            );
        }
    }

    #[test]
    fn colons_pass_through() {
        assert_eq!(
            tokenize(r"\E[58:2::%p1%dm"),
            Ok(vec![
                literal("\x1b[58:2::"),
                Token::PushParam(1),
                format(Conversion::Decimal),
                literal("m"),
            ])
        );
    }

    #[test]
    fn percent_literal() {
        assert_eq!(tokenize("100%%"), Ok(vec![literal("100%")]));
        assert_eq!(tokenize("50%"), Ok(vec![literal("50%")]));
    }

    #[test]
    fn directives() {
        assert_eq!(
            tokenize("%i%p1%p2%+%{-12}%'A'%Pa%gZ%l%!%~%?%t%e%;"),
            Ok(vec![
                Token::Increment,
                Token::PushParam(1),
                Token::PushParam(2),
                Token::Binary(BinaryOp::Add),
                Token::PushInteger(-12),
                Token::PushInteger(65),
                Token::SetVariable(Variable::Dynamic(0)),
                Token::GetVariable(Variable::Static(25)),
                Token::StringLength,
                Token::Unary(UnaryOp::LogicalNot),
                Token::Unary(UnaryOp::Complement),
                Token::If,
                Token::Then,
                Token::Else,
                Token::EndIf,
            ])
        );
    }

    #[test]
    fn all_binary_operators() {
        let tokens = tokenize("%+%-%*%/%m%&%|%^%=%<%>%A%O").unwrap();
        let ops: Vec<BinaryOp> = tokens
            .into_iter()
            .map(|token| match token {
                Token::Binary(op) => op,
                other => panic!("unexpected token {other:?}"),
            })
            .collect();
        assert_eq!(
            ops,
            [
                BinaryOp::Add,
                BinaryOp::Subtract,
                BinaryOp::Multiply,
                BinaryOp::Divide,
                BinaryOp::Modulo,
                BinaryOp::BitAnd,
                BinaryOp::BitOr,
                BinaryOp::BitXor,
                BinaryOp::Equal,
                BinaryOp::Less,
                BinaryOp::Greater,
                BinaryOp::LogicalAnd,
                BinaryOp::LogicalOr,
            ]
        );
    }

    #[test]
    fn escaped_char_constant() {
        assert_eq!(tokenize(r"%'\E'"), Ok(vec![Token::PushInteger(0x1b)]));
    }

    #[test]
    fn format_patterns() {
        let tests = [
            ("%2d", Conversion::Decimal, Flags { width: 2, ..Flags::default() }),
            (
                "%:-6x",
                Conversion::LowerHex,
                Flags { width: 6, left: true, ..Flags::default() },
            ),
            ("%#o", Conversion::Octal, Flags { alternate: true, ..Flags::default() }),
            ("% d", Conversion::Decimal, Flags { space: true, ..Flags::default() }),
            (
                "%.3X",
                Conversion::UpperHex,
                Flags { precision: Some(3), ..Flags::default() },
            ),
            (
                "%:+ #10.5s",
                Conversion::String,
                Flags {
                    width: 10,
                    precision: Some(5),
                    alternate: true,
                    sign: true,
                    space: true,
                    ..Flags::default()
                },
            ),
        ];
        for (source, conversion, flags) in tests {
            assert_eq!(
                tokenize(source),
                Ok(vec![Token::Format(FormatSpec::new(conversion, flags))]),
                "Failed for {source}"
            );
        }
    }

    #[test]
    fn padding() {
        assert_eq!(
            tokenize("a$<5*/>b$<10.5>"),
            Ok(vec![
                literal("a"),
                Token::Padding("$<5*/>".to_owned()),
                literal("b"),
                Token::Padding("$<10.5>".to_owned()),
            ])
        );
        assert_eq!(tokenize("$5 $<x> $<3"), Ok(vec![literal("$5 $<x> $<3")]));
    }

    #[test]
    fn errors() {
        let tests = [
            ("ab%Y", Error::UnrecognizedFormatOption(2, 'Y')),
            ("%p0", Error::InvalidParameterIndex(0, '0')),
            ("%p", Error::UnexpectedEnd(0)),
            ("%p1%P7", Error::InvalidVariableName(3, '7')),
            ("%g8", Error::InvalidVariableName(0, '8')),
            ("%'ab'", Error::MalformedCharacterConstant(0)),
            ("%{2b}", Error::MalformedIntegerConstant(0)),
            ("%{12", Error::UnexpectedEnd(0)),
            ("%{9223372036854775808}", Error::IntegerConstantOverflow(0)),
            ("%{1}%65536d", Error::FormatWidthOverflow(4)),
            ("%{1}%.65536d", Error::FormatPrecisionOverflow(4)),
            ("%:^x", Error::UnrecognizedFormatOption(0, '^')),
            ("%:5", Error::UnexpectedEnd(0)),
        ];
        for (source, expected) in tests {
            assert_eq!(tokenize(source), Err(expected), "Failed for {source}");
        }
    }
}
