//! Credential domains

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::requirement::Requirement;
use super::specification::{test_requirements, DomainSpecification};
use crate::error::{CredentialsError, Result};

static GLOBAL: Lazy<Arc<Domain>> = Lazy::new(|| Arc::new(Domain::default()));

/// Named bundle of specifications
///
/// Two domains are equal when their names are equal; the specification
/// list plays no part in equality or hashing. The unnamed domain with no
/// description and no specifications is the global domain, and every
/// structurally empty domain [resolves](Domain::resolve) to one shared
/// instance.
///
/// # Examples
///
/// ```
/// use credscope::{Domain, HostnameSpecification, Requirement};
///
/// let domain = Domain::named("corp")
///     .with_specification(HostnameSpecification::new(Some("*.corp.example"), None));
///
/// assert!(domain.test(&[Requirement::hostname("git.corp.example")]));
/// assert!(!domain.test(&[Requirement::hostname("github.com")]));
/// assert!(Domain::global().test(&[Requirement::hostname("github.com")]));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "DomainDocument")]
pub struct Domain {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    specifications: Vec<DomainSpecification>,
}

#[derive(Deserialize)]
struct DomainDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    specifications: Option<Vec<DomainSpecification>>,
}

impl From<DomainDocument> for Domain {
    fn from(doc: DomainDocument) -> Self {
        Domain::new(
            doc.name.as_deref(),
            doc.description.as_deref(),
            doc.specifications.unwrap_or_default(),
        )
    }
}

impl Domain {
    /// Creates a domain; blank names and descriptions are treated as absent
    pub fn new(
        name: Option<&str>,
        description: Option<&str>,
        specifications: Vec<DomainSpecification>,
    ) -> Self {
        Self {
            name: non_blank(name),
            description: non_blank(description),
            specifications,
        }
    }

    /// Creates a named domain with no specifications
    pub fn named(name: &str) -> Self {
        Self::new(Some(name), None, Vec::new())
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = non_blank(Some(description));
        self
    }

    pub fn with_specification(mut self, specification: impl Into<DomainSpecification>) -> Self {
        self.specifications.push(specification.into());
        self
    }

    /// Returns the shared global domain
    pub fn global() -> Arc<Domain> {
        Arc::clone(&GLOBAL)
    }

    /// Normalizes a structurally empty domain to the global instance
    pub fn resolve(self: Arc<Self>) -> Arc<Self> {
        if self.is_empty_form() {
            Self::global()
        } else {
            self
        }
    }

    /// True for the unnamed domain
    pub fn is_global(&self) -> bool {
        self.name.is_none()
    }

    fn is_empty_form(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.specifications.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn specifications(&self) -> &[DomainSpecification] {
        &self.specifications
    }

    /// Tests whether a set of requirements falls within this domain
    ///
    /// A domain without specifications accepts every requirement set.
    pub fn test<'a, I, R>(&self, requirements: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: Into<Option<&'a Requirement>>,
    {
        test_requirements(&self.specifications, requirements)
    }

    /// Validates every specification of this domain
    pub fn validate(&self) -> Result<()> {
        for specification in &self.specifications {
            specification.validate()?;
        }
        Ok(())
    }

    /// Loads and validates a domain from a JSON configuration document
    ///
    /// ```
    /// use credscope::{Domain, Requirement};
    ///
    /// let domain = Domain::from_json(r#"{
    ///     "name": "github",
    ///     "specifications": [
    ///         { "type": "scheme", "schemes": ["https"] },
    ///         { "type": "hostname", "includes": "github.com, *.github.com" }
    ///     ]
    /// }"#).unwrap();
    ///
    /// assert!(domain.test(&[Requirement::scheme("https"), Requirement::hostname("api.github.com")]));
    /// assert!(!domain.test(&[Requirement::scheme("ssh")]));
    /// ```
    pub fn from_json(text: &str) -> Result<Self> {
        let domain: Domain =
            serde_json::from_str(text).map_err(|e| CredentialsError::InvalidSpecification {
                reason: e.to_string(),
            })?;
        domain.validate()?;
        Ok(domain)
    }

    /// Serializes this domain as a JSON configuration document
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CredentialsError::InvalidSpecification {
            reason: e.to_string(),
        })
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Domain {}

impl Hash for Domain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
