//! Matcher module for composable predicates over credentials.
//!
//! This module provides:
//! - Atomic matchers (identifier, username, scope, description, type name, property, instance-of)
//! - Boolean combinators (all-of, any-of, not, constant)
//! - Rendering of matchers back to query-language text
//!
//! Matchers are immutable and side-effect free. A credential that lacks
//! the capability a matcher inspects is simply not a match.

mod attribute;
mod combinators;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub use attribute::{
    BeanPropertyMatcher, ConstantMatcher, DescriptionMatcher, IdMatcher, InstanceOfMatcher,
    ScopeMatcher, TypeNameMatcher, UsernameMatcher,
};
pub use combinators::{AllOfMatcher, AnyOfMatcher, NotMatcher};

use crate::credential::{AttributeValue, Credential, CredentialScope};
use crate::error::Result;

/// Predicate over a credential
pub trait CredentialsMatcher: Send + Sync + fmt::Debug {
    /// Returns true if the credential satisfies this predicate
    fn matches(&self, credential: &dyn Credential) -> bool;

    /// Renders this predicate as query text, if it has a textual form
    ///
    /// Parsing the rendered text yields a predicate with the same behavior.
    fn describe(&self) -> Option<String> {
        None
    }
}

/// Shared handle to a matcher
pub type SharedMatcher = Arc<dyn CredentialsMatcher>;

/// Constructors and helpers for matchers
///
/// # Examples
///
/// ```
/// use credscope::{CredentialScope, CredentialsMatcher, CredentialsMatchers, UsernamePasswordCredentials};
///
/// let creds = UsernamePasswordCredentials::new(CredentialScope::Global, "db", "bob", "pw");
///
/// let matcher = CredentialsMatchers::both(
///     CredentialsMatchers::with_username("bob"),
///     CredentialsMatchers::not(CredentialsMatchers::instance_of("CertificateCredentials")),
/// );
///
/// assert!(matcher.matches(&creds));
/// assert_eq!(
///     matcher.describe().as_deref(),
///     Some("(username == \"bob\" && !(instanceof CertificateCredentials))")
/// );
/// ```
pub struct CredentialsMatchers;

impl CredentialsMatchers {
    pub fn always() -> SharedMatcher {
        Arc::new(ConstantMatcher(true))
    }

    pub fn never() -> SharedMatcher {
        Arc::new(ConstantMatcher(false))
    }

    pub fn with_id(id: impl Into<String>) -> SharedMatcher {
        Arc::new(IdMatcher::new(id))
    }

    pub fn with_username(username: impl Into<String>) -> SharedMatcher {
        Arc::new(UsernameMatcher::new(username))
    }

    pub fn with_scope(scope: CredentialScope) -> SharedMatcher {
        Arc::new(ScopeMatcher::new([scope]))
    }

    pub fn with_scopes(scopes: impl IntoIterator<Item = CredentialScope>) -> SharedMatcher {
        Arc::new(ScopeMatcher::new(scopes))
    }

    pub fn with_description(description: impl Into<String>) -> SharedMatcher {
        Arc::new(DescriptionMatcher::new(description))
    }

    pub fn with_type_name(type_name: impl Into<String>) -> SharedMatcher {
        Arc::new(TypeNameMatcher::new(type_name))
    }

    pub fn instance_of(type_name: impl Into<String>) -> SharedMatcher {
        Arc::new(InstanceOfMatcher::new(type_name))
    }

    pub fn with_property(name: impl Into<String>, expected: impl Into<AttributeValue>) -> SharedMatcher {
        Arc::new(BeanPropertyMatcher::new(name, expected))
    }

    pub fn all_of(matchers: impl IntoIterator<Item = SharedMatcher>) -> SharedMatcher {
        Arc::new(AllOfMatcher::new(matchers))
    }

    pub fn any_of(matchers: impl IntoIterator<Item = SharedMatcher>) -> SharedMatcher {
        Arc::new(AnyOfMatcher::new(matchers))
    }

    pub fn not(matcher: SharedMatcher) -> SharedMatcher {
        Arc::new(NotMatcher::new(matcher))
    }

    pub fn both(a: SharedMatcher, b: SharedMatcher) -> SharedMatcher {
        Self::all_of([a, b])
    }

    pub fn either(a: SharedMatcher, b: SharedMatcher) -> SharedMatcher {
        Self::any_of([a, b])
    }

    /// Keeps the credentials the matcher accepts, in order
    pub fn filter<C, I>(credentials: I, matcher: &dyn CredentialsMatcher) -> Vec<C>
    where
        I: IntoIterator<Item = C>,
        C: Deref<Target = dyn Credential>,
    {
        credentials
            .into_iter()
            .filter(|c| matcher.matches(&**c))
            .collect()
    }

    /// First accepted credential, if any
    pub fn first_or_none<C, I>(credentials: I, matcher: &dyn CredentialsMatcher) -> Option<C>
    where
        I: IntoIterator<Item = C>,
        C: Deref<Target = dyn Credential>,
    {
        credentials.into_iter().find(|c| matcher.matches(&**c))
    }

    /// First accepted credential, or `default`
    pub fn first_or_default<C, I>(credentials: I, matcher: &dyn CredentialsMatcher, default: C) -> C
    where
        I: IntoIterator<Item = C>,
        C: Deref<Target = dyn Credential>,
    {
        Self::first_or_none(credentials, matcher).unwrap_or(default)
    }

    /// Query text for a matcher, if it has one
    pub fn describe(matcher: &dyn CredentialsMatcher) -> Option<String> {
        matcher.describe()
    }

    /// Compiles query text into a matcher
    pub fn parse(query: &str) -> Result<SharedMatcher> {
        crate::query::parse(query)
    }
}
