//! List literals found in repeated-group columns
//!
//! Group columns hold one list per row, written like `[1,2,3]` or
//! `['2024-01-01 10:00:00','2024-01-01 10:05:00']`. The grammar accepted here is
//! deliberately small:
//!
//! ```text
//! list   := ws '[' ws ( item ( ws ',' ws item )* ( ws ',' )? )? ws ']' ws
//! item   := number | string | word
//! number := [+-]? digits ( '.' digits )? ( [eE] [+-]? digits )?
//!           (integers must fit in i64 or u64)
//! string := '\'' chars '\'' | '"' chars '"'      (backslash escapes: \n \t \r \0 \\ \' \")
//! word   := null | None | true | True | false | False
//! ```
//!
//! Nested lists, dicts and expressions are rejected.

use serde::Serialize;
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

/// One value inside a group list
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    /// `null` / `None`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Integer literal above `i64::MAX`
    UInt(u64),
    /// Floating point literal
    Float(f64),
    /// Quoted string
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::UInt(n) => write!(f, "{n}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// Why a list literal could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListParseError {
    /// Input does not start with `[`
    #[error("expected '[' at offset {0}")]
    ExpectedOpen(usize),

    /// A character that does not fit the grammar
    #[error("unexpected '{found}' at offset {pos}")]
    Unexpected {
        /// Byte offset of the character
        pos: usize,
        /// The offending character
        found: char,
    },

    /// Input ended inside the list
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// A quoted string was never closed
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),

    /// Something number-like that is not a number
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    /// A bare word other than null/true/false
    #[error("unknown literal '{0}'")]
    UnknownLiteral(String),
}

/// Parse a list literal into its scalar items
pub fn parse_list(input: &str) -> Result<Vec<Scalar>, ListParseError> {
    ListParser {
        chars: input.char_indices().peekable(),
    }
    .parse()
}

struct ListParser<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl ListParser<'_> {
    fn parse(mut self) -> Result<Vec<Scalar>, ListParseError> {
        self.skip_ws();
        match self.chars.next() {
            Some((_, '[')) => {}
            Some((pos, _)) => return Err(ListParseError::ExpectedOpen(pos)),
            None => return Err(ListParseError::UnexpectedEnd),
        }

        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(']') => {
                    self.chars.next();
                    break;
                }
                None => return Err(ListParseError::UnexpectedEnd),
                _ => {}
            }

            items.push(self.item()?);

            self.skip_ws();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, ']')) => break,
                Some((pos, found)) => return Err(ListParseError::Unexpected { pos, found }),
                None => return Err(ListParseError::UnexpectedEnd),
            }
        }

        self.skip_ws();
        if let Some((pos, found)) = self.chars.next() {
            return Err(ListParseError::Unexpected { pos, found });
        }
        Ok(items)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.chars.next();
        }
    }

    fn item(&mut self) -> Result<Scalar, ListParseError> {
        match self.chars.peek().copied() {
            Some((pos, quote @ ('\'' | '"'))) => {
                self.chars.next();
                self.string(pos, quote)
            }
            Some((_, c)) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some((_, c)) if c.is_alphabetic() || c == '_' => self.word(),
            Some((pos, found)) => Err(ListParseError::Unexpected { pos, found }),
            None => Err(ListParseError::UnexpectedEnd),
        }
    }

    fn string(&mut self, start: usize, quote: char) -> Result<Scalar, ListParseError> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(ListParseError::UnterminatedString(start)),
                Some((_, c)) if c == quote => return Ok(Scalar::Text(out)),
                Some((_, '\\')) => match self.chars.next() {
                    None => return Err(ListParseError::UnterminatedString(start)),
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '0')) => out.push('\0'),
                    Some((_, c @ ('\\' | '\'' | '"'))) => out.push(c),
                    // Unknown escapes are kept verbatim
                    Some((_, c)) => {
                        out.push('\\');
                        out.push(c);
                    }
                },
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Scalar, ListParseError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }

        // Integers stay exact or are rejected, never rounded through f64
        if !text.contains(['.', 'e', 'E']) {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Scalar::Int(n));
            }
            let unsigned = text.strip_prefix('+').unwrap_or(&text).parse::<u64>();
            return match unsigned {
                Ok(n) => Ok(Scalar::UInt(n)),
                Err(_) => Err(ListParseError::InvalidNumber(text)),
            };
        }
        match text.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(Scalar::Float(x)),
            _ => Err(ListParseError::InvalidNumber(text)),
        }
    }

    fn word(&mut self) -> Result<Scalar, ListParseError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }

        match text.as_str() {
            "null" | "None" => Ok(Scalar::Null),
            "true" | "True" => Ok(Scalar::Bool(true)),
            "false" | "False" => Ok(Scalar::Bool(false)),
            _ => Err(ListParseError::UnknownLiteral(text)),
        }
    }
}
