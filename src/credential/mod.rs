//! Credential model consumed by the matching engine
//!
//! The engine never owns or mutates credentials. It reads them through the
//! [`Credential`] capability trait: a kind tag, an optional scope, and a
//! small set of named attributes the predicate layer can compare against.

pub mod kind;
mod standard;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use kind::{builtin, simple_name, CredentialKind, KindRegistry};
pub use standard::{
    CertificateCredentials, Secret, SecretTextCredentials, UsernamePasswordCredentials,
};

/// Visibility scope tag of a stored credential
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialScope {
    /// Visible only to the system itself
    System,
    /// Visible to the system and everything it runs
    Global,
    /// Owned by an individual user
    User,
}

impl CredentialScope {
    /// Enum type name used for scope literals in queries
    pub const TYPE_NAME: &'static str = "CredentialsScope";

    /// Returns the enum constant name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::Global => "GLOBAL",
            Self::User => "USER",
        }
    }

    /// Parses an enum constant name
    pub fn from_constant(constant: &str) -> Option<Self> {
        match constant {
            "SYSTEM" => Some(Self::System),
            "GLOBAL" => Some(Self::Global),
            "USER" => Some(Self::User),
            _ => None,
        }
    }

    /// All scopes in declaration order
    pub fn all() -> [CredentialScope; 3] {
        [Self::System, Self::Global, Self::User]
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value of a credential attribute or of a query literal
///
/// Comparison is strict per variant: an `Int` never equals a `Float`, a
/// `Char` never equals a one-letter `Str`. Enum values compare by the
/// simple name of their type plus the constant, so `CredentialsScope.GLOBAL`
/// and `credscope.CredentialsScope.GLOBAL` are the same value.
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Enum { type_name: String, constant: String },
}

impl AttributeValue {
    /// Creates an enum value
    pub fn enumeration(type_name: impl Into<String>, constant: impl Into<String>) -> Self {
        Self::Enum {
            type_name: type_name.into(),
            constant: constant.into(),
        }
    }

    /// Renders the value as query-language literal text
    ///
    /// Returns `None` for values no literal can express (NaN, infinities).
    pub fn to_literal(&self) -> Option<String> {
        match self {
            Self::Null => Some("null".to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => {
                if i32::try_from(*i).is_ok() {
                    Some(i.to_string())
                } else {
                    Some(format!("{}L", i))
                }
            }
            Self::Float(f) => {
                if f.is_finite() {
                    let text = format!("{:?}", f);
                    if text.contains(['.', 'e', 'E']) {
                        Some(text)
                    } else {
                        Some(format!("{}.0", text))
                    }
                } else {
                    None
                }
            }
            Self::Char(c) => {
                let mut out = String::from("'");
                push_escaped(&mut out, *c, '\'');
                out.push('\'');
                Some(out)
            }
            Self::Str(s) => {
                let mut out = String::from("\"");
                for c in s.chars() {
                    push_escaped(&mut out, c, '"');
                }
                out.push('"');
                Some(out)
            }
            Self::Enum {
                type_name,
                constant,
            } => Some(format!("{}.{}", type_name, constant)),
        }
    }
}

fn push_escaped(out: &mut String, c: char, quote: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{8}' => out.push_str("\\b"),
        '\u{c}' => out.push_str("\\f"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c if c.is_control() && (c as u32) <= 0xFFFF => {
            out.push_str(&format!("\\u{:04x}", c as u32));
        }
        c => out.push(c),
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (
                Self::Enum {
                    type_name: ta,
                    constant: ca,
                },
                Self::Enum {
                    type_name: tb,
                    constant: cb,
                },
            ) => ca == cb && simple_name(ta) == simple_name(tb),
            _ => false,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Char(c) => write!(f, "{}", c),
            Self::Str(s) => write!(f, "{}", s),
            Self::Enum {
                type_name,
                constant,
            } => write!(f, "{}.{}", type_name, constant),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<char> for AttributeValue {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<CredentialScope> for AttributeValue {
    fn from(scope: CredentialScope) -> Self {
        Self::enumeration(CredentialScope::TYPE_NAME, scope.as_str())
    }
}

/// Read-only view of a stored credential
///
/// Implementors export what they have: an identifier, a username, a
/// description, plus any extra named properties through [`Credential::property`].
/// Absent capabilities return `None`; the matching engine treats that as
/// "not a match", never as an error.
pub trait Credential: Send + Sync + fmt::Debug {
    /// Type tag of this credential
    fn kind(&self) -> &CredentialKind;

    /// Visibility scope tag, if the credential carries one
    fn scope(&self) -> Option<CredentialScope> {
        None
    }

    /// Identifier, for credentials with the id capability
    fn id(&self) -> Option<&str> {
        None
    }

    /// Username, for credentials with the username capability
    fn username(&self) -> Option<&str> {
        None
    }

    /// Free-text description
    fn description(&self) -> Option<&str> {
        None
    }

    /// Type-specific exported property
    ///
    /// Only properties a credential type explicitly exports are matchable.
    fn property(&self, _name: &str) -> Option<AttributeValue> {
        None
    }

    /// Named attribute lookup used by property matchers
    ///
    /// `id`, `username`, `description` and `scope` map onto the capability
    /// accessors; every other name goes to [`Credential::property`].
    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "id" => self.id().map(AttributeValue::from),
            "username" => self.username().map(AttributeValue::from),
            "description" => self.description().map(AttributeValue::from),
            "scope" => self.scope().map(AttributeValue::from),
            _ => self.property(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_scope_constants_round_trip() {
        for scope in CredentialScope::all() {
            assert_eq!(CredentialScope::from_constant(scope.as_str()), Some(scope));
        }
        assert_eq!(CredentialScope::from_constant("global"), None);
    }

    #[test]
    fn test_scope_serde_names() {
        let json = serde_json::to_string(&CredentialScope::Global).unwrap();
        assert_eq!(json, "\"GLOBAL\"");
        let scope: CredentialScope = serde_json::from_str("\"SYSTEM\"").unwrap();
        assert_eq!(scope, CredentialScope::System);
    }

    #[test]
    fn test_enum_values_compare_by_simple_type_name() {
        let short = AttributeValue::enumeration("CredentialsScope", "GLOBAL");
        let long = AttributeValue::enumeration("credscope.CredentialsScope", "GLOBAL");
        assert_eq!(short, long);
        assert_eq!(AttributeValue::from(CredentialScope::Global), long);
        assert_ne!(short, AttributeValue::enumeration("CredentialsScope", "USER"));
        assert_ne!(short, AttributeValue::enumeration("OtherScope", "GLOBAL"));
    }

    #[test]
    fn test_strict_variant_equality() {
        assert_ne!(AttributeValue::Int(1), AttributeValue::Float(1.0));
        assert_ne!(AttributeValue::Char('a'), AttributeValue::from("a"));
        assert_ne!(AttributeValue::Null, AttributeValue::from(""));
        assert_eq!(AttributeValue::from(7i32), AttributeValue::Int(7));
    }

    #[test_case(AttributeValue::Null, "null")]
    #[test_case(AttributeValue::Bool(true), "true")]
    #[test_case(AttributeValue::Int(42), "42")]
    #[test_case(AttributeValue::Int(-3), "-3")]
    #[test_case(AttributeValue::Int(5_000_000_000), "5000000000L")]
    #[test_case(AttributeValue::Float(1.5), "1.5")]
    #[test_case(AttributeValue::Float(2.0), "2.0")]
    #[test_case(AttributeValue::Char('\''), "'\\''")]
    #[test_case(AttributeValue::Str("a \"b\"\n".to_string()), "\"a \\\"b\\\"\\n\"")]
    #[test_case(AttributeValue::Str("\u{1}".to_string()), "\"\\u0001\"")]
    #[test_case(AttributeValue::from(CredentialScope::User), "CredentialsScope.USER")]
    fn test_to_literal(value: AttributeValue, expected: &str) {
        assert_eq!(value.to_literal().as_deref(), Some(expected));
    }

    #[test]
    fn test_non_finite_floats_have_no_literal() {
        assert_eq!(AttributeValue::Float(f64::NAN).to_literal(), None);
        assert_eq!(AttributeValue::Float(f64::INFINITY).to_literal(), None);
    }

    #[derive(Debug)]
    struct Bare;

    impl Credential for Bare {
        fn kind(&self) -> &CredentialKind {
            &builtin::CREDENTIALS
        }
    }

    #[test]
    fn test_default_capabilities_are_absent() {
        let bare = Bare;
        assert_eq!(bare.id(), None);
        assert_eq!(bare.attribute("id"), None);
        assert_eq!(bare.attribute("scope"), None);
        assert_eq!(bare.attribute("anything"), None);
    }
}
