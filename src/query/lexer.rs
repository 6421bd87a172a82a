//! Query lexer implementation using winnow.
//!
//! Literal forms follow the usual C-family rules: decimal, hex, octal and
//! binary integers with `_` separators and an `L` suffix; decimal and hex
//! floats with exponents and `f`/`d` suffixes; character and string
//! literals with simple, octal and `\uXXXX` escapes.

use winnow::combinator::{alt, opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::stream::Location;
use winnow::token::{any, one_of, take_while};
use winnow::{LocatingSlice, ModalResult, Parser};

use super::token::{NumberLiteral, Token, TokenKind};
use crate::error::{CredentialsError, Result};

/// Input type for the lexer; tracks byte positions for spans
pub type Input<'a> = LocatingSlice<&'a str>;

/// Lexer for query text
pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Tokenizes the whole input, ending with an `Eof` token
    ///
    /// Fails on the first invalid token; the error offset is the character
    /// index where that token starts.
    pub fn tokenize(self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut input = LocatingSlice::new(self.input);

        loop {
            skip_whitespace(&mut input);

            if input.is_empty() {
                let pos = input.current_token_start();
                tokens.push(Token::new(TokenKind::Eof, pos, pos));
                break;
            }

            let start = input.current_token_start();
            match next_token(&mut input) {
                Ok(kind) => {
                    let end = input.current_token_start();
                    tokens.push(Token::new(kind, start, end));
                }
                Err(_) => return Err(self.make_error(start)),
            }
        }

        Ok(tokens)
    }

    fn make_error(&self, position: usize) -> CredentialsError {
        let rest = &self.input[position..];
        let bad_char = rest.chars().next().unwrap_or(' ');
        let message = match bad_char {
            '"' => "malformed or unterminated string literal".to_string(),
            '\'' => "malformed or unterminated character literal".to_string(),
            '&' => "expected '&&'".to_string(),
            '|' => "expected '||'".to_string(),
            '=' => "expected '=='".to_string(),
            c if c.is_ascii_digit() || c == '.' => "malformed numeric literal".to_string(),
            c => format!("unexpected character '{}'", c.escape_default()),
        };
        CredentialsError::syntax(char_offset(self.input, position), message)
    }
}

/// Converts a byte position into a character index
pub fn char_offset(text: &str, byte_pos: usize) -> usize {
    text.get(..byte_pos)
        .map(|prefix| prefix.chars().count())
        .unwrap_or_else(|| text.chars().count())
}

fn backtrack<T>() -> ModalResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

fn skip_whitespace(input: &mut Input<'_>) {
    let _: ModalResult<&str, ContextError> =
        take_while(0.., |c: char| c.is_whitespace()).parse_next(input);
}

fn next_token(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((
        parse_operator,
        parse_string,
        parse_char,
        parse_number,
        parse_name,
    ))
    .parse_next(input)
}

// =============================================================================
// Operators and names
// =============================================================================

fn parse_operator(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((
        "&&".value(TokenKind::AndAnd),
        "||".value(TokenKind::OrOr),
        "==".value(TokenKind::EqEq),
        '('.value(TokenKind::LParen),
        ')'.value(TokenKind::RParen),
        '!'.value(TokenKind::Bang),
        '-'.value(TokenKind::Minus),
    ))
    .parse_next(input)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn parse_ident<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    (one_of(is_ident_start), take_while(0.., is_ident_part))
        .take()
        .parse_next(input)
}

/// Identifier, dotted identifier path or keyword
fn parse_name(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let mut name = String::from(parse_ident(input)?);

    loop {
        if !input.starts_with('.') {
            break;
        }
        if !input.chars().nth(1).is_some_and(is_ident_start) {
            break;
        }
        '.'.parse_next(input)?;
        name.push('.');
        name.push_str(parse_ident(input)?);
    }

    Ok(match name.as_str() {
        "instanceof" => TokenKind::Instanceof,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        _ => TokenKind::Name(name),
    })
}

// =============================================================================
// Numbers
// =============================================================================

fn parse_number(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let literal = alt((
        parse_hex_number,
        parse_binary_integer,
        parse_decimal_float,
        parse_decimal_or_octal_integer,
    ))
    .parse_next(input)?;

    // 12abc, 1.2.3
    if input
        .chars()
        .next()
        .is_some_and(|c| is_ident_part(c) || c == '.')
    {
        return backtrack();
    }

    Ok(TokenKind::Number(literal))
}

/// Digits of one radix with `_` allowed only between digits
fn digit_run(input: &mut Input<'_>, is_digit: fn(char) -> bool) -> ModalResult<String> {
    let run: &str = take_while(1.., |c: char| is_digit(c) || c == '_').parse_next(input)?;
    if run.starts_with('_') || run.ends_with('_') {
        return backtrack();
    }
    Ok(run.replace('_', ""))
}

fn is_dec(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_hex(c: char) -> bool {
    c.is_ascii_hexdigit()
}

fn is_bin(c: char) -> bool {
    c == '0' || c == '1'
}

fn dec_run(input: &mut Input<'_>) -> ModalResult<String> {
    digit_run(input, is_dec)
}

fn hex_run(input: &mut Input<'_>) -> ModalResult<String> {
    digit_run(input, is_hex)
}

fn signed_exponent(input: &mut Input<'_>) -> ModalResult<String> {
    let sign = opt(one_of(['+', '-'])).parse_next(input)?;
    let digits = dec_run(input)?;
    Ok(match sign {
        Some('-') => format!("-{}", digits),
        _ => digits,
    })
}

fn float_suffix(input: &mut Input<'_>) -> ModalResult<Option<char>> {
    opt(one_of(['f', 'F', 'd', 'D'])).parse_next(input)
}

fn long_suffix(input: &mut Input<'_>) -> ModalResult<bool> {
    Ok(opt(one_of(['l', 'L'])).parse_next(input)?.is_some())
}

fn parse_hex_number(input: &mut Input<'_>) -> ModalResult<NumberLiteral> {
    ('0', one_of(['x', 'X'])).parse_next(input)?;
    let whole = opt(hex_run).parse_next(input)?;
    let fraction = opt(preceded('.', opt(hex_run))).parse_next(input)?;
    let exponent = opt(preceded(one_of(['p', 'P']), signed_exponent)).parse_next(input)?;

    match exponent {
        Some(exponent) => {
            let fraction = fraction.flatten();
            if whole.is_none() && fraction.is_none() {
                return backtrack();
            }
            let single = matches!(float_suffix(input)?, Some('f' | 'F'));
            Ok(NumberLiteral::HexFloat {
                mantissa: format!(
                    "{}.{}",
                    whole.unwrap_or_default(),
                    fraction.unwrap_or_default()
                ),
                exponent,
                single,
            })
        }
        None => {
            // A hex fraction needs a binary exponent
            let (Some(digits), None) = (whole, fraction) else {
                return backtrack();
            };
            Ok(NumberLiteral::Integer {
                radix: 16,
                digits,
                long: long_suffix(input)?,
            })
        }
    }
}

fn parse_binary_integer(input: &mut Input<'_>) -> ModalResult<NumberLiteral> {
    ('0', one_of(['b', 'B'])).parse_next(input)?;
    let digits = digit_run(input, is_bin)?;
    Ok(NumberLiteral::Integer {
        radix: 2,
        digits,
        long: long_suffix(input)?,
    })
}

fn parse_decimal_float(input: &mut Input<'_>) -> ModalResult<NumberLiteral> {
    let whole = opt(dec_run).parse_next(input)?;
    let fraction = opt(preceded('.', opt(dec_run))).parse_next(input)?;

    let has_fraction_digits = matches!(fraction, Some(Some(_)));
    if whole.is_none() && !has_fraction_digits {
        return backtrack();
    }

    let exponent = opt(preceded(one_of(['e', 'E']), signed_exponent)).parse_next(input)?;
    let suffix = float_suffix(input)?;

    if fraction.is_none() && exponent.is_none() && suffix.is_none() {
        return backtrack();
    }

    let mut text = format!(
        "{}.{}",
        whole.as_deref().unwrap_or("0"),
        fraction.flatten().as_deref().unwrap_or("0")
    );
    if let Some(exponent) = exponent {
        text.push('e');
        text.push_str(&exponent);
    }

    Ok(NumberLiteral::Decimal {
        text,
        single: matches!(suffix, Some('f' | 'F')),
    })
}

fn parse_decimal_or_octal_integer(input: &mut Input<'_>) -> ModalResult<NumberLiteral> {
    let digits = dec_run(input)?;
    let long = long_suffix(input)?;

    if digits.len() > 1 && digits.starts_with('0') {
        let octal = &digits[1..];
        if !octal.chars().all(|c| ('0'..='7').contains(&c)) {
            return backtrack();
        }
        return Ok(NumberLiteral::Integer {
            radix: 8,
            digits: octal.to_string(),
            long,
        });
    }

    Ok(NumberLiteral::Integer {
        radix: 10,
        digits,
        long,
    })
}

// =============================================================================
// Character and string literals
// =============================================================================

fn parse_string(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    '"'.parse_next(input)?;
    let mut result = String::new();

    loop {
        let chunk: &str = take_while(0.., |c: char| c != '"' && c != '\\' && c != '\n' && c != '\r')
            .parse_next(input)?;
        result.push_str(chunk);

        if input.starts_with('"') {
            '"'.parse_next(input)?;
            return Ok(TokenKind::Str(result));
        }
        if input.starts_with('\\') {
            '\\'.parse_next(input)?;
            result.push(parse_escape(input)?);
            continue;
        }
        // newline or end of input
        return backtrack();
    }
}

fn parse_char(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    '\''.parse_next(input)?;

    let c = if input.starts_with('\\') {
        '\\'.parse_next(input)?;
        parse_escape(input)?
    } else {
        let c: char = any.parse_next(input)?;
        if matches!(c, '\'' | '\n' | '\r') {
            return backtrack();
        }
        c
    };

    '\''.parse_next(input)?;
    Ok(TokenKind::Char(c))
}

/// Parses the escape after a backslash
fn parse_escape(input: &mut Input<'_>) -> ModalResult<char> {
    let c: char = any.parse_next(input)?;
    match c {
        'b' => Ok('\u{8}'),
        't' => Ok('\t'),
        'n' => Ok('\n'),
        'f' => Ok('\u{c}'),
        'r' => Ok('\r'),
        's' => Ok(' '),
        '"' => Ok('"'),
        '\'' => Ok('\''),
        '\\' => Ok('\\'),
        '0'..='7' => {
            // \377 is the largest octal escape
            let max_extra: usize = if c <= '3' { 2 } else { 1 };
            let more: &str =
                take_while(0..=max_extra, |d: char| ('0'..='7').contains(&d)).parse_next(input)?;
            let mut digits = String::from(c);
            digits.push_str(more);
            let code = u32::from_str_radix(&digits, 8).or_else(|_| backtrack())?;
            char::from_u32(code).map_or_else(backtrack, Ok)
        }
        'u' => {
            let high = parse_unicode_units(input)?;
            if !(0xD800..0xDC00).contains(&high) {
                return char::from_u32(high).map_or_else(backtrack, Ok);
            }
            "\\u".parse_next(input)?;
            let low = parse_unicode_units(input)?;
            if !(0xDC00..0xE000).contains(&low) {
                return backtrack();
            }
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            char::from_u32(code).map_or_else(backtrack, Ok)
        }
        _ => backtrack(),
    }
}

/// Four hex digits after `\u`; repeated `u`s are allowed
fn parse_unicode_units(input: &mut Input<'_>) -> ModalResult<u32> {
    let _: &str = take_while(0.., 'u').parse_next(input)?;
    let hex: &str = take_while(4..=4, |c: char| c.is_ascii_hexdigit()).parse_next(input)?;
    u32::from_str_radix(hex, 16).or_else(|_| backtrack())
}
