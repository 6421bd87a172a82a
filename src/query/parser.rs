//! Recursive-descent parser compiling tokens into matcher trees
//!
//! ```text
//! expression := conjunction ('||' conjunction)*
//! conjunction := unary ('&&' unary)*
//! unary      := '!' unary | primary
//! primary    := '(' expression ')'
//!             | 'instanceof' qualifiedName
//!             | identifier '==' literal
//!             | 'true' | 'false'
//! literal    := '-'? number | char | string | 'true' | 'false' | 'null'
//!             | qualifiedName '.' identifier
//! ```
//!
//! `&&` binds tighter than `||` and both associate to the left. A chain of
//! the same operator compiles to a single all-of or any-of matcher.

use std::sync::Arc;

use super::lexer::{char_offset, Lexer};
use super::literal::decode_number;
use super::token::{Token, TokenKind};
use crate::credential::{AttributeValue, KindRegistry};
use crate::error::{CredentialsError, Result};
use crate::matchers::{
    AllOfMatcher, AnyOfMatcher, BeanPropertyMatcher, ConstantMatcher, InstanceOfMatcher,
    NotMatcher, SharedMatcher,
};

/// Parses query text into a matcher
///
/// `registry`, when given, must know every `instanceof` kind; names are
/// canonicalized to the registered qualified name.
pub fn parse_query(
    text: &str,
    max_nesting_depth: usize,
    registry: Option<&KindRegistry>,
) -> Result<SharedMatcher> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = QueryParser {
        text,
        tokens,
        pos: 0,
        depth: 0,
        max_depth: max_nesting_depth,
        registry,
    };

    let matcher = parser.parse_expression()?;
    let trailing = parser.peek().clone();
    if !trailing.is_eof() {
        return Err(parser.error_at(&trailing, format!("unexpected {}", trailing.kind)));
    }
    Ok(matcher)
}

struct QueryParser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
    registry: Option<&'a KindRegistry>,
}

impl QueryParser<'_> {
    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().kind == *kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> CredentialsError {
        CredentialsError::syntax(char_offset(self.text, token.start), message)
    }

    fn unexpected(&self, token: &Token, expected: &str) -> CredentialsError {
        if token.is_eof() {
            self.error_at(token, format!("unexpected end of query, expected {}", expected))
        } else {
            self.error_at(token, format!("expected {}, found {}", expected, token.kind))
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(CredentialsError::QueryTooComplex {
                reason: format!("nesting deeper than {} levels", self.max_depth),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_expression(&mut self) -> Result<SharedMatcher> {
        let mut operands = vec![self.parse_conjunction()?];
        while self.eat(&TokenKind::OrOr) {
            operands.push(self.parse_conjunction()?);
        }
        Ok(if operands.len() == 1 {
            operands.swap_remove(0)
        } else {
            Arc::new(AnyOfMatcher::new(operands))
        })
    }

    fn parse_conjunction(&mut self) -> Result<SharedMatcher> {
        let mut operands = vec![self.parse_unary()?];
        while self.eat(&TokenKind::AndAnd) {
            operands.push(self.parse_unary()?);
        }
        Ok(if operands.len() == 1 {
            operands.swap_remove(0)
        } else {
            Arc::new(AllOfMatcher::new(operands))
        })
    }

    fn parse_unary(&mut self) -> Result<SharedMatcher> {
        if self.eat(&TokenKind::Bang) {
            self.enter()?;
            let inner = self.parse_unary()?;
            self.leave();
            return Ok(Arc::new(NotMatcher::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<SharedMatcher> {
        let token = self.advance();
        match &token.kind {
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.parse_expression()?;
                let close = self.advance();
                if close.kind != TokenKind::RParen {
                    return Err(self.unexpected(&close, "')'"));
                }
                self.leave();
                Ok(inner)
            }
            TokenKind::Instanceof => self.parse_instance_of(),
            TokenKind::True => Ok(Arc::new(ConstantMatcher(true))),
            TokenKind::False => Ok(Arc::new(ConstantMatcher(false))),
            TokenKind::Name(name) => {
                if name.contains('.') {
                    return Err(self.error_at(
                        &token,
                        format!("property name '{}' must be a simple identifier", name),
                    ));
                }
                let operator = self.advance();
                if operator.kind != TokenKind::EqEq {
                    return Err(self.unexpected(&operator, "'=='"));
                }
                let expected = self.parse_literal()?;
                Ok(Arc::new(BeanPropertyMatcher::new(name.clone(), expected)))
            }
            _ => Err(self.unexpected(&token, "expression")),
        }
    }

    fn parse_instance_of(&mut self) -> Result<SharedMatcher> {
        let token = self.advance();
        let TokenKind::Name(name) = &token.kind else {
            return Err(self.unexpected(&token, "type name"));
        };

        let type_name = match self.registry {
            Some(registry) => match registry.resolve(name) {
                Some(kind) => kind.name().to_string(),
                None => {
                    return Err(
                        self.error_at(&token, format!("unknown credential kind '{}'", name))
                    );
                }
            },
            None => name.clone(),
        };
        Ok(Arc::new(InstanceOfMatcher::new(type_name)))
    }

    fn parse_literal(&mut self) -> Result<AttributeValue> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Minus => {
                let number = self.advance();
                match &number.kind {
                    TokenKind::Number(literal) => {
                        decode_number(literal, true).map_err(|m| self.error_at(&token, m))
                    }
                    _ => Err(self.unexpected(&number, "numeric literal after '-'")),
                }
            }
            TokenKind::Number(literal) => {
                decode_number(literal, false).map_err(|m| self.error_at(&token, m))
            }
            TokenKind::Char(c) => Ok(AttributeValue::Char(*c)),
            TokenKind::Str(s) => Ok(AttributeValue::Str(s.clone())),
            TokenKind::True => Ok(AttributeValue::Bool(true)),
            TokenKind::False => Ok(AttributeValue::Bool(false)),
            TokenKind::Null => Ok(AttributeValue::Null),
            TokenKind::Name(name) => match name.rsplit_once('.') {
                Some((type_name, constant)) => {
                    Ok(AttributeValue::enumeration(type_name, constant))
                }
                None => Err(self.error_at(
                    &token,
                    format!(
                        "expected literal, found identifier '{}' (enum constants need their type, e.g. Type.{})",
                        name, name
                    ),
                )),
            },
            _ => Err(self.unexpected(&token, "literal")),
        }
    }
}
