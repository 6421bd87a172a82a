//! Credential kinds and the kind-name registry
//!
//! A kind is a type tag carried by every credential: its qualified name plus
//! the qualified names of every capability and ancestor it implements. The
//! loose, human-readable names used by `TypeNameMatcher` are computed once
//! when the kind is built, so matching never walks a hierarchy.

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock};

const CREDENTIALS_SUFFIX: &str = "credentials";

/// Type tag of a credential
///
/// # Examples
///
/// ```
/// use credscope::CredentialKind;
///
/// let base = CredentialKind::new("acme.Credentials", &[]);
/// let token = CredentialKind::new("acme.TokenCredentials", &[&base]);
///
/// assert!(token.is_a("acme.Credentials"));
/// assert!(token.is_a("Credentials"));
/// assert!(token.matches_type_name("token"));
/// ```
#[derive(Debug, Clone)]
pub struct CredentialKind {
    name: String,
    ancestors: Vec<String>,
    aliases: HashSet<String>,
}

impl CredentialKind {
    /// Creates a kind extending the given parents
    ///
    /// The parents' own ancestors are inherited, so only direct supertypes
    /// need to be listed.
    pub fn new(name: impl Into<String>, parents: &[&CredentialKind]) -> Self {
        let name = name.into();

        let mut ancestors: IndexSet<String> = IndexSet::new();
        for parent in parents {
            ancestors.insert(parent.name.clone());
            for inherited in &parent.ancestors {
                ancestors.insert(inherited.clone());
            }
        }
        ancestors.shift_remove(&name);

        let aliases = std::iter::once(name.as_str())
            .chain(ancestors.iter().map(String::as_str))
            .map(|qualified| normalize_type_name(simple_name(qualified)))
            .collect();

        Self {
            name,
            ancestors: ancestors.into_iter().collect(),
            aliases,
        }
    }

    /// Returns the qualified type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unqualified type name
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    /// Returns the qualified names of all supertypes, nearest first
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// Instance-of test against a qualified or simple type name
    ///
    /// Case-sensitive, like a type check in source code.
    pub fn is_a(&self, type_name: &str) -> bool {
        std::iter::once(&self.name)
            .chain(self.ancestors.iter())
            .any(|qualified| qualified == type_name || simple_name(qualified) == type_name)
    }

    /// Returns true if this kind is `other` or extends it
    pub fn is_subkind_of(&self, other: &CredentialKind) -> bool {
        self.name == other.name || self.ancestors.iter().any(|a| *a == other.name)
    }

    /// Loose type-name test used by free-text configuration
    ///
    /// True for the exact qualified name, or a case-insensitive simple name
    /// of this kind or any supertype, with or without a `Credentials` suffix.
    pub fn matches_type_name(&self, type_name: &str) -> bool {
        if type_name == self.name {
            return true;
        }
        if type_name.is_empty() {
            return false;
        }
        self.aliases.contains(&normalize_type_name(type_name))
    }
}

impl PartialEq for CredentialKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CredentialKind {}

impl std::hash::Hash for CredentialKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Returns the last segment of a dotted type name
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

fn normalize_type_name(name: &str) -> String {
    let lower = name.to_lowercase();
    match lower.strip_suffix(CREDENTIALS_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => lower,
    }
}

/// Registry of known kinds, addressable by any of their names
///
/// Populated when credential types are registered; lookups resolve the
/// qualified name first, then the simple name, in registration order.
#[derive(Debug, Default)]
pub struct KindRegistry {
    kinds: RwLock<IndexMap<String, Arc<CredentialKind>>>,
}

impl KindRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in kinds
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for kind in builtin::all() {
            registry.register(kind);
        }
        registry
    }

    /// Registers a kind, replacing any previous kind of the same name
    pub fn register(&self, kind: Arc<CredentialKind>) {
        let mut kinds = self.kinds.write().unwrap_or_else(|e| e.into_inner());
        kinds.insert(kind.name.clone(), kind);
    }

    /// Resolves a qualified or simple type name to a registered kind
    pub fn resolve(&self, type_name: &str) -> Option<Arc<CredentialKind>> {
        let kinds = self.kinds.read().unwrap_or_else(|e| e.into_inner());
        if let Some(kind) = kinds.get(type_name) {
            return Some(Arc::clone(kind));
        }
        kinds
            .values()
            .find(|kind| kind.simple_name() == type_name)
            .cloned()
    }

    /// Resolves a loose type name (see [`CredentialKind::matches_type_name`])
    pub fn resolve_loose(&self, type_name: &str) -> Option<Arc<CredentialKind>> {
        if let Some(kind) = self.resolve(type_name) {
            return Some(kind);
        }
        let wanted = normalize_type_name(type_name);
        let kinds = self.kinds.read().unwrap_or_else(|e| e.into_inner());
        kinds
            .values()
            .find(|kind| normalize_type_name(kind.simple_name()) == wanted)
            .cloned()
    }

    /// Returns all registered kinds in registration order
    pub fn kinds(&self) -> Vec<Arc<CredentialKind>> {
        let kinds = self.kinds.read().unwrap_or_else(|e| e.into_inner());
        kinds.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Built-in capability and implementation kinds
pub mod builtin {
    use super::*;

    pub static CREDENTIALS: Lazy<Arc<CredentialKind>> =
        Lazy::new(|| Arc::new(CredentialKind::new("credscope.Credentials", &[])));

    pub static ID_CREDENTIALS: Lazy<Arc<CredentialKind>> =
        Lazy::new(|| Arc::new(CredentialKind::new("credscope.IdCredentials", &[&**CREDENTIALS])));

    pub static STANDARD_CREDENTIALS: Lazy<Arc<CredentialKind>> = Lazy::new(|| {
        Arc::new(CredentialKind::new(
            "credscope.StandardCredentials",
            &[&**ID_CREDENTIALS],
        ))
    });

    pub static USERNAME_CREDENTIALS: Lazy<Arc<CredentialKind>> = Lazy::new(|| {
        Arc::new(CredentialKind::new(
            "credscope.UsernameCredentials",
            &[&**CREDENTIALS],
        ))
    });

    pub static PASSWORD_CREDENTIALS: Lazy<Arc<CredentialKind>> = Lazy::new(|| {
        Arc::new(CredentialKind::new(
            "credscope.PasswordCredentials",
            &[&**CREDENTIALS],
        ))
    });

    pub static USERNAME_PASSWORD_CREDENTIALS: Lazy<Arc<CredentialKind>> = Lazy::new(|| {
        Arc::new(CredentialKind::new(
            "credscope.UsernamePasswordCredentials",
            &[&**STANDARD_CREDENTIALS, &**USERNAME_CREDENTIALS, &**PASSWORD_CREDENTIALS],
        ))
    });

    pub static CERTIFICATE_CREDENTIALS: Lazy<Arc<CredentialKind>> = Lazy::new(|| {
        Arc::new(CredentialKind::new(
            "credscope.CertificateCredentials",
            &[&**STANDARD_CREDENTIALS, &**PASSWORD_CREDENTIALS],
        ))
    });

    pub static SECRET_TEXT_CREDENTIALS: Lazy<Arc<CredentialKind>> = Lazy::new(|| {
        Arc::new(CredentialKind::new(
            "credscope.SecretTextCredentials",
            &[&**STANDARD_CREDENTIALS],
        ))
    });

    pub static USERNAME_PASSWORD_IMPL: Lazy<Arc<CredentialKind>> = Lazy::new(|| {
        Arc::new(CredentialKind::new(
            "credscope.impl.UsernamePasswordCredentialsImpl",
            &[&**USERNAME_PASSWORD_CREDENTIALS],
        ))
    });

    pub static CERTIFICATE_IMPL: Lazy<Arc<CredentialKind>> = Lazy::new(|| {
        Arc::new(CredentialKind::new(
            "credscope.impl.CertificateCredentialsImpl",
            &[&**CERTIFICATE_CREDENTIALS],
        ))
    });

    pub static SECRET_TEXT_IMPL: Lazy<Arc<CredentialKind>> = Lazy::new(|| {
        Arc::new(CredentialKind::new(
            "credscope.impl.SecretTextCredentialsImpl",
            &[&**SECRET_TEXT_CREDENTIALS],
        ))
    });

    /// Every built-in kind, capabilities before implementations
    pub fn all() -> Vec<Arc<CredentialKind>> {
        [
            &CREDENTIALS,
            &ID_CREDENTIALS,
            &STANDARD_CREDENTIALS,
            &USERNAME_CREDENTIALS,
            &PASSWORD_CREDENTIALS,
            &USERNAME_PASSWORD_CREDENTIALS,
            &CERTIFICATE_CREDENTIALS,
            &SECRET_TEXT_CREDENTIALS,
            &USERNAME_PASSWORD_IMPL,
            &CERTIFICATE_IMPL,
            &SECRET_TEXT_IMPL,
        ]
        .into_iter()
        .map(|kind| Arc::clone(kind))
        .collect()
    }
}
