//! Query tokens

use std::fmt;

/// A token with its byte span in the query text
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self { kind, start, end }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// Numeric literal as written, before range checks
#[derive(Clone, Debug, PartialEq)]
pub enum NumberLiteral {
    /// Integer digits with underscores removed
    Integer {
        radix: u32,
        digits: String,
        long: bool,
    },
    /// Decimal floating-point text accepted by `str::parse`
    Decimal { text: String, single: bool },
    /// Hexadecimal floating point: `0x<mantissa>p<exponent>`
    HexFloat {
        mantissa: String,
        exponent: String,
        single: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    Minus,
    Instanceof,
    True,
    False,
    Null,
    /// Identifier or dotted identifier path
    Name(String),
    Number(NumberLiteral),
    Char(char),
    Str(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::Bang => write!(f, "'!'"),
            Self::AndAnd => write!(f, "'&&'"),
            Self::OrOr => write!(f, "'||'"),
            Self::EqEq => write!(f, "'=='"),
            Self::Minus => write!(f, "'-'"),
            Self::Instanceof => write!(f, "'instanceof'"),
            Self::True => write!(f, "'true'"),
            Self::False => write!(f, "'false'"),
            Self::Null => write!(f, "'null'"),
            Self::Name(name) => write!(f, "'{}'", name),
            Self::Number(_) => write!(f, "numeric literal"),
            Self::Char(_) => write!(f, "character literal"),
            Self::Str(_) => write!(f, "string literal"),
            Self::Eof => write!(f, "end of query"),
        }
    }
}
