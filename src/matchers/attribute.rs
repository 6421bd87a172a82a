//! Atomic matchers over credential attributes

use std::collections::BTreeSet;
use tracing::trace;

use super::CredentialsMatcher;
use crate::credential::{AttributeValue, Credential, CredentialScope};

/// Matches every credential, or none
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantMatcher(pub bool);

impl CredentialsMatcher for ConstantMatcher {
    fn matches(&self, _credential: &dyn Credential) -> bool {
        self.0
    }

    fn describe(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

/// Exact identifier match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMatcher {
    id: String,
}

impl IdMatcher {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl CredentialsMatcher for IdMatcher {
    fn matches(&self, credential: &dyn Credential) -> bool {
        credential.id() == Some(self.id.as_str())
    }

    fn describe(&self) -> Option<String> {
        describe_equality("id", &AttributeValue::from(self.id.as_str()))
    }
}

/// Exact username match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameMatcher {
    username: String,
}

impl UsernameMatcher {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl CredentialsMatcher for UsernameMatcher {
    fn matches(&self, credential: &dyn Credential) -> bool {
        credential.username() == Some(self.username.as_str())
    }

    fn describe(&self) -> Option<String> {
        describe_equality("username", &AttributeValue::from(self.username.as_str()))
    }
}

/// Scope tag membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeMatcher {
    scopes: BTreeSet<CredentialScope>,
}

impl ScopeMatcher {
    pub fn new(scopes: impl IntoIterator<Item = CredentialScope>) -> Self {
        Self {
            scopes: scopes.into_iter().collect(),
        }
    }
}

impl CredentialsMatcher for ScopeMatcher {
    fn matches(&self, credential: &dyn Credential) -> bool {
        credential
            .scope()
            .map(|scope| self.scopes.contains(&scope))
            .unwrap_or(false)
    }

    fn describe(&self) -> Option<String> {
        let terms: Vec<String> = self
            .scopes
            .iter()
            .map(|scope| describe_equality("scope", &AttributeValue::from(*scope)))
            .collect::<Option<_>>()?;
        match terms.len() {
            0 => Some("false".to_string()),
            1 => terms.into_iter().next(),
            _ => Some(format!("({})", terms.join(" || "))),
        }
    }
}

/// Case-insensitive description match
///
/// Has no query-language form, since property tests are exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionMatcher {
    description: String,
}

impl DescriptionMatcher {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

impl CredentialsMatcher for DescriptionMatcher {
    fn matches(&self, credential: &dyn Credential) -> bool {
        credential
            .description()
            .map(|d| d.to_lowercase() == self.description.to_lowercase())
            .unwrap_or(false)
    }
}

/// Loose type-name match for free-text configuration
///
/// See [`CredentialKind::matches_type_name`](crate::CredentialKind::matches_type_name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNameMatcher {
    type_name: String,
}

impl TypeNameMatcher {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl CredentialsMatcher for TypeNameMatcher {
    fn matches(&self, credential: &dyn Credential) -> bool {
        credential.kind().matches_type_name(&self.type_name)
    }
}

/// Instance-of test against a qualified or simple kind name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceOfMatcher {
    type_name: String,
}

impl InstanceOfMatcher {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl CredentialsMatcher for InstanceOfMatcher {
    fn matches(&self, credential: &dyn Credential) -> bool {
        credential.kind().is_a(&self.type_name)
    }

    fn describe(&self) -> Option<String> {
        Some(format!("instanceof {}", self.type_name))
    }
}

/// Equality test on a named exported attribute
///
/// A credential that does not export the attribute never matches.
#[derive(Debug, Clone, PartialEq)]
pub struct BeanPropertyMatcher {
    name: String,
    expected: AttributeValue,
}

impl BeanPropertyMatcher {
    pub fn new(name: impl Into<String>, expected: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            expected: expected.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected(&self) -> &AttributeValue {
        &self.expected
    }
}

impl CredentialsMatcher for BeanPropertyMatcher {
    fn matches(&self, credential: &dyn Credential) -> bool {
        match credential.attribute(&self.name) {
            Some(actual) => actual == self.expected,
            None => {
                trace!(property = %self.name, kind = %credential.kind(), "property not exported");
                false
            }
        }
    }

    fn describe(&self) -> Option<String> {
        describe_equality(&self.name, &self.expected)
    }
}

fn describe_equality(name: &str, value: &AttributeValue) -> Option<String> {
    if !is_identifier(name) {
        return None;
    }
    value.to_literal().map(|literal| format!("{} == {}", name, literal))
}

/// True for names the query language accepts as a property identifier
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !matches!(name, "true" | "false" | "null" | "instanceof")
}
