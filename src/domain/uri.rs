//! Requirement lists derived from URIs

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::requirement::Requirement;
use crate::error::{CredentialsError, Result};

// user@host:path, as accepted by git and scp
static SCP_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<user>[^@/:\s]+)@)?(?P<host>[^@/:\s]+):(?P<path>[^\s]*)$")
        .unwrap_or_else(|e| panic!("invalid scp pattern: {}", e))
});

/// Builder for requirement lists
///
/// # Examples
///
/// ```
/// use credscope::{Requirement, RequirementsBuilder};
///
/// let requirements = RequirementsBuilder::from_uri("https://git.example.com:8443/org/repo.git")
///     .unwrap()
///     .build();
///
/// assert_eq!(requirements, vec![
///     Requirement::scheme("https"),
///     Requirement::hostname_port("git.example.com", 8443),
///     Requirement::path("/org/repo.git"),
/// ]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequirementsBuilder {
    requirements: Vec<Requirement>,
}

impl RequirementsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives scheme, host and path requirements from a URI
    ///
    /// Accepts absolute URIs and scp-style `user@host:path` references,
    /// which are treated as `ssh`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequirement` if the text is neither.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        let parsed = Url::parse(uri);

        if let Ok(url) = &parsed {
            if let Some(host) = url.host_str() {
                let mut builder = Self::new().with_scheme(url.scheme());
                builder = match url.port() {
                    Some(port) => builder.with_hostname_port(host, port),
                    None => builder.with_hostname(host),
                };
                if !url.path().is_empty() {
                    builder = builder.with_path(url.path());
                }
                return Ok(builder);
            }
        }

        if parsed.is_err() || uri.contains('@') {
            if let Some(caps) = SCP_LIKE.captures(uri) {
                let mut builder = Self::new().with_scheme("ssh").with_hostname(&caps["host"]);
                let path = &caps["path"];
                if !path.is_empty() {
                    builder = builder.with_path(path);
                }
                return Ok(builder);
            }
        }

        match parsed {
            Ok(url) => Ok(Self::new().with_scheme(url.scheme())),
            Err(e) => Err(CredentialsError::InvalidRequirement {
                reason: format!("cannot derive requirements from '{}': {}", uri, e),
            }),
        }
    }

    pub fn with_scheme(self, scheme: &str) -> Self {
        self.with_requirement(Requirement::scheme(scheme.to_lowercase()))
    }

    pub fn with_hostname(self, hostname: &str) -> Self {
        self.with_requirement(Requirement::hostname(hostname))
    }

    pub fn with_hostname_port(self, hostname: &str, port: u16) -> Self {
        self.with_requirement(Requirement::hostname_port(hostname, port))
    }

    pub fn with_path(self, path: &str) -> Self {
        self.with_requirement(Requirement::path(path))
    }

    pub fn with_oauth_scopes<I, S>(self, provider: &str, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_requirement(Requirement::oauth_scopes(provider, scopes))
    }

    /// Adds a requirement, replacing any earlier one of the same kind
    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        let kind = requirement.kind_name().to_string();
        let host_kind = requirement.host().is_some();
        self.requirements.retain(|r| {
            r.kind_name() != kind && !(host_kind && r.host().is_some())
        });
        self.requirements.push(requirement);
        self
    }

    pub fn build(self) -> Vec<Requirement> {
        self.requirements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_uri_without_port() {
        let reqs = RequirementsBuilder::from_uri("HTTPS://Example.com/a/b").unwrap().build();
        assert_eq!(
            reqs,
            vec![
                Requirement::scheme("https"),
                Requirement::hostname("example.com"),
                Requirement::path("/a/b"),
            ]
        );
    }

    #[test]
    fn test_default_port_is_not_explicit() {
        let reqs = RequirementsBuilder::from_uri("https://example.com:443/").unwrap().build();
        assert!(reqs.contains(&Requirement::hostname("example.com")));
    }

    #[test]
    fn test_scp_like_reference() {
        let reqs = RequirementsBuilder::from_uri("git@github.com:org/repo.git")
            .unwrap()
            .build();
        assert_eq!(
            reqs,
            vec![
                Requirement::scheme("ssh"),
                Requirement::hostname("github.com"),
                Requirement::path("org/repo.git"),
            ]
        );
    }

    #[test]
    fn test_host_requirement_replaces_previous_host() {
        let reqs = RequirementsBuilder::new()
            .with_hostname("a.com")
            .with_hostname_port("b.com", 22)
            .with_scheme("ssh")
            .build();
        assert_eq!(
            reqs,
            vec![Requirement::hostname_port("b.com", 22), Requirement::scheme("ssh")]
        );
    }

    #[test]
    fn test_unparseable_uri() {
        assert!(matches!(
            RequirementsBuilder::from_uri("not a uri"),
            Err(CredentialsError::InvalidRequirement { .. })
        ));
        assert!(RequirementsBuilder::from_uri("").is_err());
    }
}
