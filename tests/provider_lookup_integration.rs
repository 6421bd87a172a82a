//! Integration tests for ordered provider lookup with call-count instrumentation

#[cfg(test)]
mod integration_tests {
    use credscope::credential::builtin;
    use credscope::provider::SharedCredential;
    use credscope::{
        CredentialKind, CredentialScope, CredentialsError, CredentialsMatchers,
        CredentialsProvider, Domain, InMemoryCredentialsStore, LookupContext, ProviderChain,
        Requirement, Result, StoreCredentialsProvider, UsernamePasswordCredentials,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Calls {
        list: AtomicUsize,
        by_id: AtomicUsize,
    }

    impl Calls {
        fn total(&self) -> usize {
            self.list.load(Ordering::SeqCst) + self.by_id.load(Ordering::SeqCst)
        }
    }

    fn visible(
        credentials: &[SharedCredential],
        kind: &CredentialKind,
        context: &LookupContext,
    ) -> Vec<SharedCredential> {
        credentials
            .iter()
            .filter(|c| c.kind().is_subkind_of(kind) && context.can_see(c.scope()))
            .cloned()
            .collect()
    }

    /// Provider without a point lookup
    struct ListingProvider {
        name: &'static str,
        credentials: Vec<SharedCredential>,
        calls: Arc<Calls>,
    }

    impl CredentialsProvider for ListingProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn list_credentials(
            &self,
            kind: &CredentialKind,
            context: &LookupContext,
            _requirements: &[Requirement],
        ) -> Result<Vec<SharedCredential>> {
            self.calls.list.fetch_add(1, Ordering::SeqCst);
            Ok(visible(&self.credentials, kind, context))
        }
    }

    /// Provider with an indexed point lookup
    struct IndexedProvider {
        name: &'static str,
        credentials: Vec<SharedCredential>,
        calls: Arc<Calls>,
        failing: bool,
    }

    impl CredentialsProvider for IndexedProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn list_credentials(
            &self,
            kind: &CredentialKind,
            context: &LookupContext,
            _requirements: &[Requirement],
        ) -> Result<Vec<SharedCredential>> {
            self.calls.list.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(CredentialsError::provider(self.name, "vault unreachable"));
            }
            Ok(visible(&self.credentials, kind, context))
        }

        fn credential_by_id(
            &self,
            id: &str,
            kind: &CredentialKind,
            context: &LookupContext,
            _requirements: &[Requirement],
        ) -> Result<Option<SharedCredential>> {
            self.calls.by_id.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(CredentialsError::provider(self.name, "vault unreachable"));
            }
            Ok(visible(&self.credentials, kind, context)
                .into_iter()
                .find(|c| c.id() == Some(id)))
        }
    }

    fn user(id: &str, username: &str) -> SharedCredential {
        Arc::new(UsernamePasswordCredentials::new(CredentialScope::Global, id, username, "pw"))
    }

    fn listing(name: &'static str, credentials: Vec<SharedCredential>) -> (Arc<ListingProvider>, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let provider = Arc::new(ListingProvider {
            name,
            credentials,
            calls: Arc::clone(&calls),
        });
        (provider, calls)
    }

    fn indexed(
        name: &'static str,
        credentials: Vec<SharedCredential>,
        failing: bool,
    ) -> (Arc<IndexedProvider>, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let provider = Arc::new(IndexedProvider {
            name,
            credentials,
            calls: Arc::clone(&calls),
            failing,
        });
        (provider, calls)
    }

    fn username_of(found: Option<SharedCredential>) -> Option<String> {
        found.and_then(|c| c.username().map(str::to_string))
    }

    #[test]
    fn test_first_hit_stops_the_search() {
        let (p1, p1_calls) = listing("p1", vec![user("other", "olga")]);
        let (p2, p2_calls) = indexed("p2", vec![user("x", "xavier")], false);
        let (p3, p3_calls) = indexed("p3", vec![user("x", "shadowed")], false);

        let chain = ProviderChain::new()
            .with_provider(p1)
            .with_provider(p2)
            .with_provider(p3);

        let found = chain
            .find_by_id("x", &builtin::CREDENTIALS, &LookupContext::all(), &[])
            .unwrap();
        assert_eq!(username_of(found).as_deref(), Some("xavier"));

        // listing fallback for the provider without a point lookup
        assert_eq!(p1_calls.list.load(Ordering::SeqCst), 1);
        assert_eq!(p1_calls.by_id.load(Ordering::SeqCst), 0);

        // point lookup only; no listing
        assert_eq!(p2_calls.by_id.load(Ordering::SeqCst), 1);
        assert_eq!(p2_calls.list.load(Ordering::SeqCst), 0);

        // never consulted
        assert_eq!(p3_calls.total(), 0);
    }

    #[test]
    fn test_earlier_provider_wins_duplicates() {
        let (p1, _) = listing("p1", vec![user("x", "first")]);
        let (p2, p2_calls) = indexed("p2", vec![user("x", "second")], false);
        let chain = ProviderChain::new().with_provider(p1).with_provider(p2);

        for _ in 0..3 {
            let found = chain
                .find_by_id("x", &builtin::CREDENTIALS, &LookupContext::all(), &[])
                .unwrap();
            assert_eq!(username_of(found).as_deref(), Some("first"));
        }
        assert_eq!(p2_calls.total(), 0);
    }

    #[test]
    fn test_miss_consults_every_provider() {
        let (p1, p1_calls) = listing("p1", vec![]);
        let (p2, p2_calls) = indexed("p2", vec![user("a", "alice")], false);
        let chain = ProviderChain::new().with_provider(p1).with_provider(p2);

        let found = chain
            .find_by_id("missing", &builtin::CREDENTIALS, &LookupContext::all(), &[])
            .unwrap();
        assert!(found.is_none());
        assert_eq!(p1_calls.total(), 1);
        assert_eq!(p2_calls.total(), 1);
    }

    #[test]
    fn test_provider_errors_propagate() {
        let (p1, _) = indexed("vault", vec![], true);
        let (p2, p2_calls) = indexed("backup", vec![user("x", "xavier")], false);
        let chain = ProviderChain::new().with_provider(p1).with_provider(p2);

        let err = chain
            .find_by_id("x", &builtin::CREDENTIALS, &LookupContext::all(), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            CredentialsError::Provider { ref provider, .. } if provider == "vault"
        ));
        assert_eq!(p2_calls.total(), 0);
    }

    #[test]
    fn test_failing_provider_after_hit_is_never_called() {
        let (p1, _) = indexed("primary", vec![user("x", "xavier")], false);
        let (p2, p2_calls) = indexed("broken", vec![], true);
        let chain = ProviderChain::new().with_provider(p1).with_provider(p2);

        let found = chain
            .find_by_id("x", &builtin::CREDENTIALS, &LookupContext::all(), &[])
            .unwrap();
        assert!(found.is_some());
        assert_eq!(p2_calls.total(), 0);
    }

    #[test]
    fn test_list_concatenates_in_order() {
        let (p1, _) = listing("p1", vec![user("a", "alice"), user("b", "bob")]);
        let (p2, _) = indexed("p2", vec![user("c", "carol")], false);
        let chain = ProviderChain::new().with_provider(p1).with_provider(p2);

        let ids: Vec<String> = chain
            .list_credentials(&builtin::CREDENTIALS, &LookupContext::all(), &[])
            .unwrap()
            .iter()
            .filter_map(|c| c.id().map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_first_match_is_lazy() {
        let (p1, _) = listing("p1", vec![user("a", "alice")]);
        let (p2, _) = indexed("p2", vec![user("b", "bob")], false);
        let (p3, p3_calls) = indexed("p3", vec![user("c", "bob")], false);
        let chain = ProviderChain::new()
            .with_provider(p1)
            .with_provider(p2)
            .with_provider(p3);

        let bob = CredentialsMatchers::with_username("bob");
        let found = chain
            .first_match(&builtin::CREDENTIALS, &LookupContext::all(), &[], &*bob)
            .unwrap();
        assert_eq!(found.and_then(|c| c.id().map(str::to_string)).as_deref(), Some("b"));
        assert_eq!(p3_calls.total(), 0);
    }

    #[test]
    fn test_chain_over_store_providers() {
        let system = InMemoryCredentialsStore::new();
        let corp = Domain::named("corp").with_specification(
            credscope::HostnameSpecification::new(Some("*.corp.example"), None),
        );
        system.add_domain(corp.clone()).unwrap();
        system.add_credential(&corp, user("deploy", "corp-deployer")).unwrap();

        let user_store = InMemoryCredentialsStore::new();
        user_store
            .add_credential(&Domain::global(), user("deploy", "personal-deployer"))
            .unwrap();

        let chain = ProviderChain::new()
            .with_provider(Arc::new(StoreCredentialsProvider::new("system", system)))
            .with_provider(Arc::new(StoreCredentialsProvider::new("user", user_store)));
        assert_eq!(chain.len(), 2);

        let inside = [Requirement::hostname("git.corp.example")];
        let outside = [Requirement::hostname("github.com")];

        let found = chain
            .find_by_id("deploy", &builtin::CREDENTIALS, &LookupContext::all(), &inside)
            .unwrap();
        assert_eq!(username_of(found).as_deref(), Some("corp-deployer"));

        // the corp domain rejects the requirement, so the next provider answers
        let found = chain
            .find_by_id("deploy", &builtin::CREDENTIALS, &LookupContext::all(), &outside)
            .unwrap();
        assert_eq!(username_of(found).as_deref(), Some("personal-deployer"));
    }
}
