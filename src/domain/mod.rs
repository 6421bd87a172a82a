//! Domain module for scoping credentials to administrative contexts.
//!
//! This module provides:
//! - Requirements describing the context of a lookup (scheme, host, port, path, OAuth scopes)
//! - Specifications classifying requirements with a tri-state result
//! - Domains bundling specifications, with a shared global domain
//! - Requirement lists derived from URIs

mod pattern;
mod requirement;
mod specification;
mod types;
mod uri;

pub use pattern::{IncludeExclude, PatternList};
pub use requirement::Requirement;
pub use specification::{
    test_requirements, Classification, DomainSpecification, HostnamePortSpecification,
    HostnameSpecification, OAuthScopeSpecification, PathSpecification, SchemeSpecification,
    Specification,
};
pub use types::Domain;
pub use uri::RequirementsBuilder;
