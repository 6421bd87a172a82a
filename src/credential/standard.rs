//! Standard credential implementations

use std::fmt;
use zeroize::Zeroizing;

use super::kind::{builtin, CredentialKind};
use super::{AttributeValue, Credential, CredentialScope};
use crate::error::{CredentialsError, Result};

/// Secret string, wiped on drop and redacted in debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Returns the plain text. Callers must not log it.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Username and password pair
#[derive(Debug, Clone)]
pub struct UsernamePasswordCredentials {
    scope: CredentialScope,
    id: String,
    description: Option<String>,
    username: String,
    password: Secret,
    username_secret: bool,
}

impl UsernamePasswordCredentials {
    pub fn new(
        scope: CredentialScope,
        id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<Secret>,
    ) -> Self {
        Self {
            scope,
            id: id.into(),
            description: None,
            username: username.into(),
            password: password.into(),
            username_secret: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the username itself as sensitive
    pub fn with_username_secret(mut self, secret: bool) -> Self {
        self.username_secret = secret;
        self
    }

    pub fn password(&self) -> &Secret {
        &self.password
    }

    pub fn is_username_secret(&self) -> bool {
        self.username_secret
    }
}

impl Credential for UsernamePasswordCredentials {
    fn kind(&self) -> &CredentialKind {
        &builtin::USERNAME_PASSWORD_IMPL
    }

    fn scope(&self) -> Option<CredentialScope> {
        Some(self.scope)
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn username(&self) -> Option<&str> {
        Some(&self.username)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn property(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "usernameSecret" => Some(AttributeValue::Bool(self.username_secret)),
            _ => None,
        }
    }
}

/// Opaque secret text such as an API token
#[derive(Debug, Clone)]
pub struct SecretTextCredentials {
    scope: CredentialScope,
    id: String,
    description: Option<String>,
    secret: Secret,
}

impl SecretTextCredentials {
    pub fn new(scope: CredentialScope, id: impl Into<String>, secret: impl Into<Secret>) -> Self {
        Self {
            scope,
            id: id.into(),
            description: None,
            secret: secret.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

impl Credential for SecretTextCredentials {
    fn kind(&self) -> &CredentialKind {
        &builtin::SECRET_TEXT_IMPL
    }

    fn scope(&self) -> Option<CredentialScope> {
        Some(self.scope)
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Client certificate held as an encoded keystore
///
/// The keystore is never decoded here; attributes that would need it are
/// not exported, so matchers see them as absent.
#[derive(Clone)]
pub struct CertificateCredentials {
    scope: CredentialScope,
    id: String,
    description: Option<String>,
    key_store: Zeroizing<Vec<u8>>,
    password: Secret,
}

impl CertificateCredentials {
    pub fn new(
        scope: CredentialScope,
        id: impl Into<String>,
        key_store: Vec<u8>,
        password: impl Into<Secret>,
    ) -> Self {
        Self {
            scope,
            id: id.into(),
            description: None,
            key_store: Zeroizing::new(key_store),
            password: password.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the encoded keystore
    ///
    /// An empty keystore cannot produce a value; that is reported rather
    /// than substituted.
    pub fn key_store_bytes(&self) -> Result<&[u8]> {
        if self.key_store.is_empty() {
            return Err(CredentialsError::ValueUnavailable {
                attribute: "keyStore".to_string(),
                reason: format!("credential '{}' has no keystore content", self.id),
            });
        }
        Ok(self.key_store.as_slice())
    }

    pub fn password(&self) -> &Secret {
        &self.password
    }
}

impl fmt::Debug for CertificateCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateCredentials")
            .field("scope", &self.scope)
            .field("id", &self.id)
            .field("description", &self.description)
            .field("key_store", &format_args!("<{} bytes>", self.key_store.len()))
            .field("password", &self.password)
            .finish()
    }
}

impl Credential for CertificateCredentials {
    fn kind(&self) -> &CredentialKind {
        &builtin::CERTIFICATE_IMPL
    }

    fn scope(&self) -> Option<CredentialScope> {
        Some(self.scope)
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn property(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "keyStoreAvailable" => Some(AttributeValue::Bool(!self.key_store.is_empty())),
            _ => None,
        }
    }
}
