//! Provider module for ordered credential lookup.
//!
//! This module provides:
//! - The provider collaborator trait with an optional point lookup by id
//! - A provider chain consulted in configured order, stopping at the first hit
//! - A domain-scoped in-memory store with copy-on-write credential lists
//! - A provider backed by that store

mod lookup;
mod store;

pub use lookup::{CredentialsProvider, LookupContext, ProviderChain, SharedCredential};
pub use store::{DomainCredentials, InMemoryCredentialsStore, StoreCredentialsProvider};
