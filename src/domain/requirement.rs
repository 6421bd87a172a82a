//! Contextual requirements presented when looking up a credential

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One contextual fact a credential must be in scope for
///
/// Requirements are plain values. Specifications pattern-match on the
/// variant and classify kinds they do not understand as unknown, so new
/// variants never disturb existing specifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Requirement {
    /// URI scheme, e.g. `https`
    Scheme { scheme: String },

    /// Target host without a port
    Hostname { hostname: String },

    /// Target host with an explicit port
    HostnamePort { hostname: String, port: u16 },

    /// URI path
    Path { path: String },

    /// OAuth scopes required by a provider-specific flow
    #[serde(rename = "oauthScope")]
    OAuthScope {
        provider: String,
        scopes: BTreeSet<String>,
    },

    /// Requirement kind defined outside this crate
    Other {
        #[serde(rename = "otherKind")]
        kind: String,
        #[serde(default)]
        attributes: BTreeMap<String, String>,
    },
}

impl Requirement {
    pub fn scheme(scheme: impl Into<String>) -> Self {
        Self::Scheme {
            scheme: scheme.into(),
        }
    }

    pub fn hostname(hostname: impl Into<String>) -> Self {
        Self::Hostname {
            hostname: hostname.into(),
        }
    }

    pub fn hostname_port(hostname: impl Into<String>, port: u16) -> Self {
        Self::HostnamePort {
            hostname: hostname.into(),
            port,
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self::Path { path: path.into() }
    }

    pub fn oauth_scopes<I, S>(provider: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OAuthScope {
            provider: provider.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn other(kind: impl Into<String>) -> Self {
        Self::Other {
            kind: kind.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Short tag naming the requirement kind
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Scheme { .. } => "scheme",
            Self::Hostname { .. } => "hostname",
            Self::HostnamePort { .. } => "hostnamePort",
            Self::Path { .. } => "path",
            Self::OAuthScope { .. } => "oauthScope",
            Self::Other { kind, .. } => kind,
        }
    }

    /// Host named by either hostname variant
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Hostname { hostname } | Self::HostnamePort { hostname, .. } => Some(hostname),
            _ => None,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheme { scheme } => write!(f, "scheme={}", scheme),
            Self::Hostname { hostname } => write!(f, "hostname={}", hostname),
            Self::HostnamePort { hostname, port } => write!(f, "hostname={}:{}", hostname, port),
            Self::Path { path } => write!(f, "path={}", path),
            Self::OAuthScope { provider, scopes } => {
                let scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();
                write!(f, "oauth[{}]={}", provider, scopes.join(","))
            }
            Self::Other { kind, .. } => write!(f, "{}", kind),
        }
    }
}
