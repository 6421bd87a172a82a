//! Error types for credential scoping, matching and lookup

use thiserror::Error;

/// Result type alias for credential operations
pub type Result<T> = std::result::Result<T, CredentialsError>;

/// Errors raised by query compilation, store mutation and provider lookup
///
/// Matching itself never fails: a credential of the wrong shape is simply
/// not a match. Everything that can fail lives at the edges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    /// Malformed query text; `offset` is the character index of the failure
    #[error("syntax error at offset {offset}: {message}")]
    QuerySyntax { offset: usize, message: String },

    /// Query exceeds the configured compiler limits
    #[error("query too complex: {reason}")]
    QueryTooComplex { reason: String },

    /// Invalid domain specification definition
    #[error("invalid specification: {reason}")]
    InvalidSpecification { reason: String },

    /// Invalid requirement input (e.g. an unparseable URI)
    #[error("invalid requirement: {reason}")]
    InvalidRequirement { reason: String },

    /// A domain with the same name already exists in the store
    #[error("domain '{name}' already exists")]
    DuplicateDomain { name: String },

    /// The domain is not known to the store
    #[error("domain '{name}' not found")]
    DomainNotFound { name: String },

    /// No credential with this identifier
    #[error("credential '{id}' not found")]
    CredentialNotFound { id: String },

    /// A credential with this identifier already exists in the domain
    #[error("credential '{id}' already exists")]
    DuplicateCredential { id: String },

    /// A credential attribute cannot produce a value at all
    #[error("value of '{attribute}' unavailable: {reason}")]
    ValueUnavailable { attribute: String, reason: String },

    /// A provider failed while listing or looking up credentials
    #[error("provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    /// Generic internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CredentialsError {
    /// Creates a syntax error at the given character offset
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::QuerySyntax {
            offset,
            message: message.into(),
        }
    }

    /// Creates a provider failure
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns the character offset for syntax errors
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::QuerySyntax { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for CredentialsError {
    fn from(err: anyhow::Error) -> Self {
        CredentialsError::Internal {
            message: err.to_string(),
        }
    }
}
