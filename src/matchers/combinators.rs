//! Boolean combinators

use super::{CredentialsMatcher, SharedMatcher};
use crate::credential::Credential;

/// Conjunction; an empty list matches everything
#[derive(Debug, Clone, Default)]
pub struct AllOfMatcher {
    matchers: Vec<SharedMatcher>,
}

impl AllOfMatcher {
    pub fn new(matchers: impl IntoIterator<Item = SharedMatcher>) -> Self {
        Self {
            matchers: matchers.into_iter().collect(),
        }
    }

    pub fn matchers(&self) -> &[SharedMatcher] {
        &self.matchers
    }
}

impl CredentialsMatcher for AllOfMatcher {
    fn matches(&self, credential: &dyn Credential) -> bool {
        self.matchers.iter().all(|m| m.matches(credential))
    }

    fn describe(&self) -> Option<String> {
        describe_chain(&self.matchers, " && ", "true")
    }
}

/// Disjunction; an empty list matches nothing
#[derive(Debug, Clone, Default)]
pub struct AnyOfMatcher {
    matchers: Vec<SharedMatcher>,
}

impl AnyOfMatcher {
    pub fn new(matchers: impl IntoIterator<Item = SharedMatcher>) -> Self {
        Self {
            matchers: matchers.into_iter().collect(),
        }
    }

    pub fn matchers(&self) -> &[SharedMatcher] {
        &self.matchers
    }
}

impl CredentialsMatcher for AnyOfMatcher {
    fn matches(&self, credential: &dyn Credential) -> bool {
        self.matchers.iter().any(|m| m.matches(credential))
    }

    fn describe(&self) -> Option<String> {
        describe_chain(&self.matchers, " || ", "false")
    }
}

/// Negation
#[derive(Debug, Clone)]
pub struct NotMatcher {
    matcher: SharedMatcher,
}

impl NotMatcher {
    pub fn new(matcher: SharedMatcher) -> Self {
        Self { matcher }
    }

    pub fn inner(&self) -> &SharedMatcher {
        &self.matcher
    }
}

impl CredentialsMatcher for NotMatcher {
    fn matches(&self, credential: &dyn Credential) -> bool {
        !self.matcher.matches(credential)
    }

    fn describe(&self) -> Option<String> {
        self.matcher.describe().map(|inner| format!("!({})", inner))
    }
}

// Chains always render inside parentheses.
fn describe_chain(matchers: &[SharedMatcher], operator: &str, empty: &str) -> Option<String> {
    if matchers.is_empty() {
        return Some(empty.to_string());
    }
    let parts = matchers
        .iter()
        .map(|m| m.describe())
        .collect::<Option<Vec<_>>>()?;
    Some(format!("({})", parts.join(operator)))
}
