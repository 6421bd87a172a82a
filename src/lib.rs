//! # Credential Scoping Engine (credscope)
//!
//! Decides which stored credential is the right one for a request:
//! - Domains of specifications that scope credentials to schemes, hosts,
//!   paths and OAuth scopes, with a three-valued short-circuiting result
//! - Composable matchers over credential attributes
//! - A small query language compiled to the same matchers
//! - Ordered, short-circuiting lookup across credential providers
//! - A domain-scoped in-memory store with copy-on-write snapshots
//!
//! ## Example
//!
//! ```rust
//! use credscope::{
//!     CredentialScope, CredentialsMatcher, Domain, HostnameSpecification, RequirementsBuilder,
//!     UsernamePasswordCredentials,
//! };
//!
//! # fn example() -> Result<(), credscope::CredentialsError> {
//! let domain = Domain::named("corp")
//!     .with_specification(HostnameSpecification::new(Some("*.corp.example"), None));
//!
//! let requirements = RequirementsBuilder::from_uri("https://git.corp.example/team/repo.git")?.build();
//! assert!(domain.test(&requirements));
//!
//! let matcher = credscope::query::parse(r#"username == "bob" && !(instanceof LegacyCredential)"#)?;
//! let bob = UsernamePasswordCredentials::new(CredentialScope::Global, "git", "bob", "pw");
//! assert!(matcher.matches(&bob));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod credential;
pub mod domain;
pub mod error;
pub mod matchers;
pub mod provider;
pub mod query;

pub use credential::{
    AttributeValue, CertificateCredentials, Credential, CredentialKind, CredentialScope,
    KindRegistry, SecretTextCredentials, UsernamePasswordCredentials,
};
pub use domain::{
    Classification, Domain, DomainSpecification, HostnamePortSpecification,
    HostnameSpecification, OAuthScopeSpecification, PathSpecification, Requirement,
    RequirementsBuilder, SchemeSpecification, Specification,
};
pub use error::{CredentialsError, Result};
pub use matchers::{CredentialsMatcher, CredentialsMatchers, SharedMatcher};
pub use provider::{
    CredentialsProvider, InMemoryCredentialsStore, LookupContext, ProviderChain,
    StoreCredentialsProvider,
};
pub use query::{CacheStats, QueryCompiler, QueryConfig};
