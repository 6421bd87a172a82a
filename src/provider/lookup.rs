//! Provider trait and ordered lookup across providers

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::credential::{Credential, CredentialKind, CredentialScope};
use crate::domain::Requirement;
use crate::error::Result;
use crate::matchers::CredentialsMatcher;

/// Shared handle to a stored credential
pub type SharedCredential = Arc<dyn Credential>;

/// Scopes visible to the caller of a lookup
///
/// The scope tag is opaque here: a context only decides which tags it may
/// see. Credentials without a scope tag are visible to every context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupContext {
    scopes: BTreeSet<CredentialScope>,
}

impl LookupContext {
    pub fn new(scopes: impl IntoIterator<Item = CredentialScope>) -> Self {
        Self {
            scopes: scopes.into_iter().collect(),
        }
    }

    /// Context that sees every scope
    pub fn all() -> Self {
        Self::new(CredentialScope::all())
    }

    /// Context of work running on behalf of the system: `GLOBAL` credentials only
    pub fn global() -> Self {
        Self::new([CredentialScope::Global])
    }

    pub fn scopes(&self) -> &BTreeSet<CredentialScope> {
        &self.scopes
    }

    pub fn can_see(&self, scope: Option<CredentialScope>) -> bool {
        scope.map_or(true, |scope| self.scopes.contains(&scope))
    }
}

impl Default for LookupContext {
    fn default() -> Self {
        Self::all()
    }
}

/// Source of candidate credentials
///
/// Implementations must be deterministic: the same arguments list the same
/// credentials in the same order. Errors are reported to the caller of the
/// search, never swallowed.
pub trait CredentialsProvider: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Lists credentials of `kind` (or a subkind) visible in `context` and in
    /// scope for `requirements`
    fn list_credentials(
        &self,
        kind: &CredentialKind,
        context: &LookupContext,
        requirements: &[Requirement],
    ) -> Result<Vec<SharedCredential>>;

    /// Point lookup by identifier
    ///
    /// The default scans [`list_credentials`](Self::list_credentials);
    /// providers with an index should override it.
    fn credential_by_id(
        &self,
        id: &str,
        kind: &CredentialKind,
        context: &LookupContext,
        requirements: &[Requirement],
    ) -> Result<Option<SharedCredential>> {
        Ok(self
            .list_credentials(kind, context, requirements)?
            .into_iter()
            .find(|credential| credential.id() == Some(id)))
    }
}

/// Providers in configured priority order
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use credscope::credential::builtin;
/// use credscope::provider::{
///     InMemoryCredentialsStore, LookupContext, ProviderChain, StoreCredentialsProvider,
/// };
/// use credscope::{CredentialScope, Domain, UsernamePasswordCredentials};
///
/// let store = InMemoryCredentialsStore::new();
/// store
///     .add_credential(
///         &Domain::global(),
///         Arc::new(UsernamePasswordCredentials::new(CredentialScope::Global, "db", "bob", "pw")),
///     )
///     .unwrap();
///
/// let chain = ProviderChain::new().with_provider(Arc::new(StoreCredentialsProvider::new("system", store)));
/// let found = chain
///     .find_by_id("db", &builtin::USERNAME_PASSWORD_CREDENTIALS, &LookupContext::all(), &[])
///     .unwrap();
/// assert_eq!(found.and_then(|c| c.username().map(str::to_string)).as_deref(), Some("bob"));
/// ```
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn CredentialsProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider; earlier providers win
    pub fn with_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(&self) -> &[Arc<dyn CredentialsProvider>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Finds a credential by identifier
    ///
    /// Providers are consulted in order through their point lookup. The
    /// first hit is returned and no later provider is called. A provider
    /// error ends the search and is returned as is.
    pub fn find_by_id(
        &self,
        id: &str,
        kind: &CredentialKind,
        context: &LookupContext,
        requirements: &[Requirement],
    ) -> Result<Option<SharedCredential>> {
        for (position, provider) in self.providers.iter().enumerate() {
            if let Some(found) = provider.credential_by_id(id, kind, context, requirements)? {
                debug!(
                    provider = provider.name(),
                    id,
                    skipped = self.providers.len() - position - 1,
                    "credential found, skipping remaining providers"
                );
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Lists credentials from every provider, concatenated in provider order
    pub fn list_credentials(
        &self,
        kind: &CredentialKind,
        context: &LookupContext,
        requirements: &[Requirement],
    ) -> Result<Vec<SharedCredential>> {
        let mut all = Vec::new();
        for provider in &self.providers {
            all.extend(provider.list_credentials(kind, context, requirements)?);
        }
        Ok(all)
    }

    /// First listed credential accepted by `matcher`
    ///
    /// Stops listing at the first provider that yields a match.
    pub fn first_match(
        &self,
        kind: &CredentialKind,
        context: &LookupContext,
        requirements: &[Requirement],
        matcher: &dyn CredentialsMatcher,
    ) -> Result<Option<SharedCredential>> {
        for provider in &self.providers {
            let listed = provider.list_credentials(kind, context, requirements)?;
            if let Some(found) = listed.into_iter().find(|c| matcher.matches(&**c)) {
                debug!(provider = provider.name(), "matching credential found");
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}
