//! Specifications and the tri-state classification algebra

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use super::pattern::{split_patterns, IncludeExclude};
use super::requirement::Requirement;
use crate::error::{CredentialsError, Result};

/// Outcome of classifying one requirement against one specification
///
/// | value      | definitive | match |
/// |------------|------------|-------|
/// | `Unknown`  | no         | no    |
/// | `Negative` | yes        | no    |
/// | `Partial`  | no         | yes   |
/// | `Positive` | yes        | yes   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Not understood; keep checking
    Unknown,
    /// Vetoed; the requirement set fails
    Negative,
    /// Matched, but later specifications may still veto
    Partial,
    /// Matched; no further specifications are consulted for this requirement
    Positive,
}

impl Classification {
    pub fn is_definitive(self) -> bool {
        matches!(self, Self::Negative | Self::Positive)
    }

    pub fn is_match(self) -> bool {
        matches!(self, Self::Partial | Self::Positive)
    }
}

/// Rule classifying a single requirement
///
/// Implementations must return [`Classification::Unknown`] for requirement
/// kinds they do not understand.
pub trait Specification: Send + Sync + fmt::Debug {
    fn test(&self, requirement: &Requirement) -> Classification;
}

/// Tests every requirement against an ordered specification list
///
/// For each requirement, specifications are consulted in order until one
/// is definitive: `POSITIVE` moves on to the next requirement, `NEGATIVE`
/// fails the whole set. A requirement no specification is definitive
/// about passes. Absent (`None`) requirements are skipped.
pub fn test_requirements<'a, S, I, R>(specifications: &[S], requirements: I) -> bool
where
    S: Specification,
    I: IntoIterator<Item = R>,
    R: Into<Option<&'a Requirement>>,
{
    for requirement in requirements {
        let Some(requirement) = requirement.into() else {
            continue;
        };
        for specification in specifications {
            let result = specification.test(requirement);
            trace!(requirement = %requirement, ?result, "specification verdict");
            if result.is_definitive() {
                if result.is_match() {
                    break;
                }
                return false;
            }
        }
    }
    true
}

/// Specification stored in a domain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainSpecification {
    Scheme(SchemeSpecification),
    Hostname(HostnameSpecification),
    HostnamePort(HostnamePortSpecification),
    Path(PathSpecification),
    #[serde(rename = "oauthScope")]
    OAuthScope(OAuthScopeSpecification),
    /// Specification implemented outside this crate; not serializable
    #[serde(skip)]
    Custom(Arc<dyn Specification>),
}

impl DomainSpecification {
    pub fn custom(specification: impl Specification + 'static) -> Self {
        Self::Custom(Arc::new(specification))
    }

    /// Checks configuration input for values that can never be satisfied
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Scheme(spec) => spec.validate(),
            Self::Hostname(spec) => spec.validate(),
            Self::HostnamePort(spec) => spec.validate(),
            Self::Path(_) | Self::Custom(_) => Ok(()),
            Self::OAuthScope(spec) => spec.validate(),
        }
    }
}

impl Specification for DomainSpecification {
    fn test(&self, requirement: &Requirement) -> Classification {
        match self {
            Self::Scheme(spec) => spec.test(requirement),
            Self::Hostname(spec) => spec.test(requirement),
            Self::HostnamePort(spec) => spec.test(requirement),
            Self::Path(spec) => spec.test(requirement),
            Self::OAuthScope(spec) => spec.test(requirement),
            Self::Custom(spec) => spec.test(requirement),
        }
    }
}

impl From<SchemeSpecification> for DomainSpecification {
    fn from(spec: SchemeSpecification) -> Self {
        Self::Scheme(spec)
    }
}

impl From<HostnameSpecification> for DomainSpecification {
    fn from(spec: HostnameSpecification) -> Self {
        Self::Hostname(spec)
    }
}

impl From<HostnamePortSpecification> for DomainSpecification {
    fn from(spec: HostnamePortSpecification) -> Self {
        Self::HostnamePort(spec)
    }
}

impl From<PathSpecification> for DomainSpecification {
    fn from(spec: PathSpecification) -> Self {
        Self::Path(spec)
    }
}

impl From<OAuthScopeSpecification> for DomainSpecification {
    fn from(spec: OAuthScopeSpecification) -> Self {
        Self::OAuthScope(spec)
    }
}

/// Restricts the URI schemes a domain serves
///
/// `PARTIAL` for a listed scheme, `NEGATIVE` for any other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeSpecification {
    #[serde(deserialize_with = "normalized_schemes")]
    schemes: BTreeSet<String>,
}

/// Configuration input gets the same trimming and lower-casing as [`SchemeSpecification::new`]
fn normalized_schemes<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let schemes = Vec::<String>::deserialize(deserializer)?;
    Ok(schemes
        .iter()
        .map(|scheme| scheme.trim().to_lowercase())
        .filter(|scheme| !scheme.is_empty())
        .collect())
}

impl SchemeSpecification {
    /// Creates a specification from a comma, space or newline separated list
    pub fn new(schemes: &str) -> Self {
        Self {
            schemes: split_patterns(schemes).map(str::to_lowercase).collect(),
        }
    }

    pub fn schemes(&self) -> &BTreeSet<String> {
        &self.schemes
    }

    fn validate(&self) -> Result<()> {
        if self.schemes.is_empty() {
            return Err(CredentialsError::InvalidSpecification {
                reason: "scheme specification lists no schemes".to_string(),
            });
        }
        Ok(())
    }
}

impl Specification for SchemeSpecification {
    fn test(&self, requirement: &Requirement) -> Classification {
        match requirement {
            Requirement::Scheme { scheme } => {
                if self.schemes.contains(&scheme.to_lowercase()) {
                    Classification::Partial
                } else {
                    Classification::Negative
                }
            }
            _ => Classification::Unknown,
        }
    }
}

/// Include/exclude globs over the target host
///
/// Applies to both hostname and hostname-with-port requirements; the port
/// is ignored. IPv6 literals are written in brackets (`[fd00::*]`); any
/// other `:` in a pattern is a port and fails validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostnameSpecification {
    #[serde(flatten)]
    filter: IncludeExclude,
}

impl HostnameSpecification {
    pub fn new(includes: Option<&str>, excludes: Option<&str>) -> Self {
        Self {
            filter: IncludeExclude::new(includes, excludes),
        }
    }

    pub fn includes(&self) -> Option<&str> {
        self.filter.includes()
    }

    pub fn excludes(&self) -> Option<&str> {
        self.filter.excludes()
    }

    fn validate(&self) -> Result<()> {
        if let Some(pattern) = self.filter.entries().find(|p| port_of(p).is_some()) {
            return Err(CredentialsError::InvalidSpecification {
                reason: format!("hostname pattern '{}' must not include a port", pattern),
            });
        }
        Ok(())
    }
}

impl Specification for HostnameSpecification {
    fn test(&self, requirement: &Requirement) -> Classification {
        match requirement.host() {
            Some(host) => self.filter.classify(host, false, verbatim),
            None => Classification::Unknown,
        }
    }
}

/// Include/exclude globs over `host:port`
///
/// A pattern without a port is treated as `pattern:*`. Only hostname-with-port
/// requirements are classified. IPv6 hosts are bracketed: `[fd00::1]:22`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostnamePortSpecification {
    #[serde(flatten)]
    filter: IncludeExclude,
}

impl HostnamePortSpecification {
    pub fn new(includes: Option<&str>, excludes: Option<&str>) -> Self {
        Self {
            filter: IncludeExclude::new(includes, excludes),
        }
    }

    pub fn includes(&self) -> Option<&str> {
        self.filter.includes()
    }

    pub fn excludes(&self) -> Option<&str> {
        self.filter.excludes()
    }

    fn validate(&self) -> Result<()> {
        for pattern in self.filter.entries() {
            let Some(port) = port_of(pattern) else {
                continue;
            };
            let valid = port.contains(['*', '?'])
                || port.parse::<u16>().map(|p| p != 0).unwrap_or(false);
            if !valid {
                return Err(CredentialsError::InvalidSpecification {
                    reason: format!("invalid port '{}' in pattern '{}'", port, pattern),
                });
            }
        }
        Ok(())
    }
}

fn verbatim(pattern: &str) -> String {
    pattern.to_string()
}

/// Port part of `host:port`; bracketed IPv6 literals keep their colons in the host
fn port_of(pattern: &str) -> Option<&str> {
    if pattern.starts_with('[') {
        if let Some(close) = pattern.find(']') {
            return pattern[close + 1..].strip_prefix(':');
        }
    }
    pattern.rsplit_once(':').map(|(_, port)| port)
}

fn with_default_port(pattern: &str) -> String {
    if port_of(pattern).is_some() {
        pattern.to_string()
    } else {
        format!("{}:*", pattern)
    }
}

impl Specification for HostnamePortSpecification {
    fn test(&self, requirement: &Requirement) -> Classification {
        match requirement {
            Requirement::HostnamePort { hostname, port } => {
                let candidate = format!("{}:{}", hostname, port);
                self.filter.classify(&candidate, false, with_default_port)
            }
            _ => Classification::Unknown,
        }
    }
}

/// Include/exclude globs over the URI path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSpecification {
    #[serde(flatten)]
    filter: IncludeExclude,
    #[serde(default)]
    case_sensitive: bool,
}

impl PathSpecification {
    pub fn new(includes: Option<&str>, excludes: Option<&str>, case_sensitive: bool) -> Self {
        Self {
            filter: IncludeExclude::new(includes, excludes),
            case_sensitive,
        }
    }

    pub fn includes(&self) -> Option<&str> {
        self.filter.includes()
    }

    pub fn excludes(&self) -> Option<&str> {
        self.filter.excludes()
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

impl Specification for PathSpecification {
    fn test(&self, requirement: &Requirement) -> Classification {
        match requirement {
            Requirement::Path { path } => {
                self.filter.classify(path, self.case_sensitive, verbatim)
            }
            _ => Classification::Unknown,
        }
    }
}

/// Scopes a provider-specific OAuth flow may request
///
/// `POSITIVE` when every required scope is granted, `NEGATIVE` otherwise.
/// Requirements for another provider, or of any other kind, are unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthScopeSpecification {
    provider: String,
    scopes: BTreeSet<String>,
}

impl OAuthScopeSpecification {
    pub fn new<I, S>(provider: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            provider: provider.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    fn validate(&self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(CredentialsError::InvalidSpecification {
                reason: "OAuth scope specification has no provider".to_string(),
            });
        }
        if self.scopes.is_empty() {
            return Err(CredentialsError::InvalidSpecification {
                reason: format!("OAuth scope specification for '{}' grants no scopes", self.provider),
            });
        }
        Ok(())
    }
}

impl Specification for OAuthScopeSpecification {
    fn test(&self, requirement: &Requirement) -> Classification {
        match requirement {
            Requirement::OAuthScope { provider, scopes } if *provider == self.provider => {
                if scopes.is_subset(&self.scopes) {
                    Classification::Positive
                } else {
                    Classification::Negative
                }
            }
            _ => Classification::Unknown,
        }
    }
}
