//! Domain-scoped in-memory credential store

use indexmap::IndexMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};

use super::lookup::{CredentialsProvider, LookupContext, SharedCredential};
use crate::credential::CredentialKind;
use crate::domain::{Domain, Requirement};
use crate::error::{CredentialsError, Result};
use crate::matchers::{ConstantMatcher, CredentialsMatcher};

/// Snapshot of one domain's credential list
type CredentialList = Arc<Vec<SharedCredential>>;

/// Domains in insertion order with their current lists
type DomainTable = IndexMap<Arc<Domain>, CredentialList>;

/// A domain together with the credentials scoped to it
#[derive(Debug, Clone)]
pub struct DomainCredentials {
    domain: Arc<Domain>,
    credentials: CredentialList,
}

impl DomainCredentials {
    pub fn new(domain: Domain, credentials: Vec<SharedCredential>) -> Self {
        Self {
            domain: Arc::new(domain).resolve(),
            credentials: Arc::new(credentials),
        }
    }

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    pub fn credentials(&self) -> &[SharedCredential] {
        &self.credentials
    }

    /// Credentials of `kind` accepted by `matcher`, taken only from domains
    /// whose specifications accept `requirements`
    ///
    /// Order follows the domain list, then each domain's credential list.
    pub fn select<'a>(
        list: impl IntoIterator<Item = &'a DomainCredentials>,
        kind: &CredentialKind,
        requirements: &[Requirement],
        matcher: &dyn CredentialsMatcher,
    ) -> Vec<SharedCredential> {
        list.into_iter()
            .filter(|entry| entry.domain.test(requirements))
            .flat_map(|entry| entry.credentials.iter())
            .filter(|credential| credential.kind().is_subkind_of(kind))
            .filter(|credential| matcher.matches(&***credential))
            .cloned()
            .collect()
    }
}

/// In-memory store mapping domains to credential lists
///
/// # Thread Safety
///
/// The domain table is copy-on-write: readers take an `Arc` of the current
/// table and keep iterating it while a writer publishes an edited copy.
/// A reader sees every domain either before or after a mutation, never
/// halfway through one. Mutations are serialized so identifier checks see
/// a consistent store.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use credscope::credential::builtin;
/// use credscope::matchers::CredentialsMatchers;
/// use credscope::provider::InMemoryCredentialsStore;
/// use credscope::{
///     CredentialScope, Domain, HostnameSpecification, Requirement, UsernamePasswordCredentials,
/// };
///
/// let store = InMemoryCredentialsStore::new();
/// let corp = Domain::named("corp")
///     .with_specification(HostnameSpecification::new(Some("*.corp.example"), None));
/// store.add_domain(corp.clone()).unwrap();
/// store
///     .add_credential(
///         &corp,
///         Arc::new(UsernamePasswordCredentials::new(CredentialScope::Global, "git", "ci", "pw")),
///     )
///     .unwrap();
///
/// let found = store.lookup(
///     &builtin::CREDENTIALS,
///     &[Requirement::hostname("git.corp.example")],
///     &*CredentialsMatchers::always(),
/// );
/// assert_eq!(found.len(), 1);
///
/// let elsewhere = store.lookup(
///     &builtin::CREDENTIALS,
///     &[Requirement::hostname("github.com")],
///     &*CredentialsMatchers::always(),
/// );
/// assert!(elsewhere.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryCredentialsStore {
    table: Arc<RwLock<Arc<DomainTable>>>,
    mutation: Arc<Mutex<()>>,
}

impl InMemoryCredentialsStore {
    /// Creates a store holding only the empty global domain
    pub fn new() -> Self {
        let mut table = DomainTable::new();
        table.insert(Domain::global(), Arc::new(Vec::new()));
        Self {
            table: Arc::new(RwLock::new(Arc::new(table))),
            mutation: Arc::new(Mutex::new(())),
        }
    }

    /// Creates a store seeded with domains and their credentials
    ///
    /// # Errors
    ///
    /// Returns the first validation, duplicate domain or duplicate
    /// identifier error; nothing is kept in that case.
    pub fn from_domains(entries: impl IntoIterator<Item = DomainCredentials>) -> Result<Self> {
        let store = Self::new();
        for entry in entries {
            if !entry.domain.is_global() {
                store.add_domain(Domain::clone(&entry.domain))?;
            }
            for credential in entry.credentials.iter() {
                store.add_credential(&entry.domain, Arc::clone(credential))?;
            }
        }
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.mutation.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current table; never blocks on a mutation in progress
    fn current(&self) -> Arc<DomainTable> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&table)
    }

    /// Publishes an edited copy of the table; the caller holds the mutation lock
    fn publish<T, F>(&self, edit: F) -> Result<T>
    where
        F: FnOnce(&mut DomainTable) -> Result<T>,
    {
        let mut next = DomainTable::clone(&self.current());
        let outcome = edit(&mut next)?;
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        *table = Arc::new(next);
        Ok(outcome)
    }

    /// Domains, global first, then by name
    pub fn domains(&self) -> Vec<Arc<Domain>> {
        let mut domains: Vec<Arc<Domain>> = self.current().keys().cloned().collect();
        domains.sort_by(|a, b| a.name().cmp(&b.name()));
        domains
    }

    /// Every domain with a snapshot of its credentials, in [`domains`](Self::domains) order
    pub fn snapshot(&self) -> Vec<DomainCredentials> {
        let mut entries: Vec<DomainCredentials> = self
            .current()
            .iter()
            .map(|(domain, credentials)| DomainCredentials {
                domain: Arc::clone(domain),
                credentials: Arc::clone(credentials),
            })
            .collect();
        entries.sort_by(|a, b| a.domain.name().cmp(&b.domain.name()));
        entries
    }

    /// Adds a domain with no credentials
    ///
    /// # Errors
    ///
    /// Returns `DuplicateDomain` if a domain of that name exists (the global
    /// domain always does), or the domain's validation error.
    pub fn add_domain(&self, domain: Domain) -> Result<()> {
        domain.validate()?;
        let domain = Arc::new(domain).resolve();

        let _guard = self.lock();
        self.publish(|table| {
            if table.contains_key(&*domain) {
                return Err(CredentialsError::DuplicateDomain {
                    name: display_name(&domain),
                });
            }
            debug!(domain = %display_name(&domain), "domain added");
            table.insert(Arc::clone(&domain), Arc::new(Vec::new()));
            Ok(())
        })
    }

    /// Removes a domain and every credential scoped to it
    ///
    /// Returns the removed credentials. The global domain cannot be removed.
    ///
    /// # Errors
    ///
    /// Returns `DomainNotFound` for an unknown or global domain.
    pub fn remove_domain(&self, domain: &Domain) -> Result<Vec<SharedCredential>> {
        if domain.is_global() {
            return Err(CredentialsError::DomainNotFound {
                name: display_name(domain),
            });
        }
        let _guard = self.lock();
        let credentials = self.publish(|table| {
            table
                .shift_remove(domain)
                .ok_or_else(|| CredentialsError::DomainNotFound {
                    name: display_name(domain),
                })
        })?;
        debug!(
            domain = %display_name(domain),
            removed = credentials.len(),
            "domain removed with its credentials"
        );
        Ok(Vec::clone(&credentials))
    }

    /// Replaces a domain's definition, keeping its credentials
    ///
    /// Readers see either the old or the new definition, each with the
    /// same credentials.
    ///
    /// # Errors
    ///
    /// Returns `DomainNotFound` if `current` is unknown or global, and
    /// `DuplicateDomain` if `replacement` renames onto another existing domain.
    pub fn update_domain(&self, current: &Domain, replacement: Domain) -> Result<()> {
        if current.is_global() {
            return Err(CredentialsError::DomainNotFound {
                name: display_name(current),
            });
        }
        replacement.validate()?;
        let replacement = Arc::new(replacement).resolve();

        let _guard = self.lock();
        self.publish(|table| {
            if *replacement != *current && table.contains_key(&*replacement) {
                return Err(CredentialsError::DuplicateDomain {
                    name: display_name(&replacement),
                });
            }
            // an equal key would keep the old definition on insert
            let credentials =
                table
                    .shift_remove(current)
                    .ok_or_else(|| CredentialsError::DomainNotFound {
                        name: display_name(current),
                    })?;
            table.insert(Arc::clone(&replacement), credentials);
            Ok(())
        })?;
        debug!(
            from = %display_name(current),
            to = %display_name(&replacement),
            "domain updated"
        );
        Ok(())
    }

    /// Snapshot of a domain's credentials
    ///
    /// The snapshot is unaffected by later mutations.
    pub fn credentials(&self, domain: &Domain) -> Result<CredentialList> {
        self.current()
            .get(domain)
            .map(Arc::clone)
            .ok_or_else(|| CredentialsError::DomainNotFound {
                name: display_name(domain),
            })
    }

    /// Adds a credential to a domain
    ///
    /// # Errors
    ///
    /// Returns `DomainNotFound`, or `DuplicateCredential` if any domain
    /// already holds a credential with the same identifier.
    pub fn add_credential(&self, domain: &Domain, credential: SharedCredential) -> Result<()> {
        let _guard = self.lock();
        if let Some(id) = credential.id() {
            if self.holds_id(id) {
                warn!(id, domain = %display_name(domain), "rejected credential with duplicate id");
                return Err(CredentialsError::DuplicateCredential { id: id.to_string() });
            }
        }

        self.replace_list(domain, |list| {
            list.push(credential);
            Ok(())
        })?;
        debug!(domain = %display_name(domain), "credential added");
        Ok(())
    }

    /// Replaces the credential with identifier `id` in a domain, keeping its position
    ///
    /// # Errors
    ///
    /// Returns `DomainNotFound`, `CredentialNotFound`, or
    /// `DuplicateCredential` if the replacement takes another credential's id.
    pub fn update_credential(
        &self,
        domain: &Domain,
        id: &str,
        replacement: SharedCredential,
    ) -> Result<()> {
        let _guard = self.lock();
        if let Some(new_id) = replacement.id() {
            if new_id != id && self.holds_id(new_id) {
                warn!(id = new_id, domain = %display_name(domain), "rejected credential with duplicate id");
                return Err(CredentialsError::DuplicateCredential {
                    id: new_id.to_string(),
                });
            }
        }

        self.replace_list(domain, |list| {
            let slot = list
                .iter_mut()
                .find(|credential| credential.id() == Some(id))
                .ok_or_else(|| CredentialsError::CredentialNotFound { id: id.to_string() })?;
            *slot = replacement;
            Ok(())
        })?;
        debug!(domain = %display_name(domain), id, "credential updated");
        Ok(())
    }

    /// Removes the credential with identifier `id` from a domain
    ///
    /// # Errors
    ///
    /// Returns `DomainNotFound` or `CredentialNotFound`.
    pub fn remove_credential(&self, domain: &Domain, id: &str) -> Result<SharedCredential> {
        let _guard = self.lock();
        let removed = self.replace_list(domain, |list| {
            let position = list
                .iter()
                .position(|credential| credential.id() == Some(id))
                .ok_or_else(|| CredentialsError::CredentialNotFound { id: id.to_string() })?;
            Ok(list.remove(position))
        })?;
        debug!(domain = %display_name(domain), id, "credential removed");
        Ok(removed)
    }

    /// Credentials of `kind` accepted by `matcher` in every domain that
    /// accepts `requirements`
    pub fn lookup(
        &self,
        kind: &CredentialKind,
        requirements: &[Requirement],
        matcher: &dyn CredentialsMatcher,
    ) -> Vec<SharedCredential> {
        DomainCredentials::select(&self.snapshot(), kind, requirements, matcher)
    }

    /// Total number of credentials across domains
    pub fn len(&self) -> usize {
        self.current().values().map(|list| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn holds_id(&self, id: &str) -> bool {
        self.current()
            .values()
            .any(|list| list.iter().any(|c| c.id() == Some(id)))
    }

    /// Publishes an edited copy of one domain's list
    fn replace_list<T, F>(&self, domain: &Domain, edit: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<SharedCredential>) -> Result<T>,
    {
        self.publish(|table| {
            let slot = table
                .get_mut(domain)
                .ok_or_else(|| CredentialsError::DomainNotFound {
                    name: display_name(domain),
                })?;
            let mut list = Vec::clone(&**slot);
            let outcome = edit(&mut list)?;
            *slot = Arc::new(list);
            Ok(outcome)
        })
    }
}

impl Default for InMemoryCredentialsStore {
    fn default() -> Self {
        Self::new()
    }
}

fn display_name(domain: &Domain) -> String {
    domain.name().unwrap_or("(global)").to_string()
}

/// Provider exposing an in-memory store
///
/// Only credentials whose scope the lookup context can see are returned.
#[derive(Debug, Clone)]
pub struct StoreCredentialsProvider {
    name: String,
    store: InMemoryCredentialsStore,
}

impl StoreCredentialsProvider {
    pub fn new(name: impl Into<String>, store: InMemoryCredentialsStore) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn store(&self) -> &InMemoryCredentialsStore {
        &self.store
    }
}

impl CredentialsProvider for StoreCredentialsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_credentials(
        &self,
        kind: &CredentialKind,
        context: &LookupContext,
        requirements: &[Requirement],
    ) -> Result<Vec<SharedCredential>> {
        let visible = self
            .store
            .lookup(kind, requirements, &ConstantMatcher(true))
            .into_iter()
            .filter(|credential| context.can_see(credential.scope()))
            .collect();
        Ok(visible)
    }

    fn credential_by_id(
        &self,
        id: &str,
        kind: &CredentialKind,
        context: &LookupContext,
        requirements: &[Requirement],
    ) -> Result<Option<SharedCredential>> {
        let found = self
            .store
            .snapshot()
            .iter()
            .filter(|entry| entry.domain().test(requirements))
            .flat_map(|entry| entry.credentials().iter())
            .find(|credential| credential.id() == Some(id))
            .filter(|credential| {
                credential.kind().is_subkind_of(kind) && context.can_see(credential.scope())
            })
            .cloned();
        Ok(found)
    }
}
