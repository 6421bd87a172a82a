//! Credentials query language
//!
//! Query text compiles to the same matcher trees the combinators in
//! [`crate::matchers`] build:
//!
//! ```text
//! (username == "bob") && !(instanceof LegacyCredential)
//! scope == CredentialsScope.GLOBAL || id == "deploy-key"
//! ```
//!
//! `&&` binds tighter than `||`. Parse failures are all-or-nothing and carry
//! the character offset of the offending token.

mod compiler;
mod lexer;
mod literal;
mod parser;
mod token;

pub use compiler::{CacheStats, QueryCompiler, QueryConfig};
pub use lexer::Lexer;
pub use token::{NumberLiteral, Token, TokenKind};

use crate::error::Result;
use crate::matchers::SharedMatcher;

/// Compiles query text with the default limits and no kind registry
///
/// # Examples
///
/// ```
/// use credscope::query;
///
/// let matcher = query::parse(r#"username == "bob" || id == "deploy""#).unwrap();
/// assert_eq!(
///     matcher.describe().as_deref(),
///     Some(r#"(username == "bob" || id == "deploy")"#)
/// );
///
/// let err = query::parse("username = \"bob\"").unwrap_err();
/// assert_eq!(err.offset(), Some(9));
/// ```
pub fn parse(text: &str) -> Result<SharedMatcher> {
    compiler::compile_uncached(text, &QueryConfig::default(), None)
}

#[cfg(test)]
mod tests;
