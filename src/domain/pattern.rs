//! Include/exclude glob lists used by hostname, port and path specifications
//!
//! Pattern text is a list of globs separated by commas, spaces or newlines.
//! `*` matches any run of characters and `?` exactly one. Matching is
//! case-insensitive unless a specification asks otherwise.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use wildmatch::WildMatch;

use super::specification::Classification;

/// Compiled glob list
#[derive(Debug, Clone)]
pub struct PatternList {
    patterns: Vec<WildMatch>,
    case_sensitive: bool,
}

impl PatternList {
    /// Parses pattern text, returning `None` for blank input
    ///
    /// `normalize` is applied to every pattern before compilation.
    pub fn parse(
        text: &str,
        case_sensitive: bool,
        normalize: impl Fn(&str) -> String,
    ) -> Option<Self> {
        let patterns: Vec<WildMatch> = split_patterns(text)
            .map(|p| {
                let p = normalize(p);
                if case_sensitive {
                    WildMatch::new(&p)
                } else {
                    WildMatch::new(&p.to_lowercase())
                }
            })
            .collect();

        if patterns.is_empty() {
            None
        } else {
            Some(Self {
                patterns,
                case_sensitive,
            })
        }
    }

    /// Returns true if any pattern matches the candidate
    pub fn matches(&self, candidate: &str) -> bool {
        if self.case_sensitive {
            self.patterns.iter().any(|p| p.matches(candidate))
        } else {
            let candidate = candidate.to_lowercase();
            self.patterns.iter().any(|p| p.matches(&candidate))
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Splits pattern text on commas, spaces and newlines, dropping empty entries
pub fn split_patterns(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

/// Include/exclude pair as stored in configuration
///
/// An unset or blank list places no constraint: includes default to
/// allow-all and excludes to deny-none. Excludes are consulted only after
/// the includes pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeExclude {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    includes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    excludes: Option<String>,
    #[serde(skip)]
    compiled: OnceCell<Compiled>,
}

#[derive(Debug, Clone)]
struct Compiled {
    includes: Option<PatternList>,
    excludes: Option<PatternList>,
}

impl IncludeExclude {
    pub fn new(includes: Option<&str>, excludes: Option<&str>) -> Self {
        Self {
            includes: non_blank(includes),
            excludes: non_blank(excludes),
            compiled: OnceCell::new(),
        }
    }

    pub fn includes(&self) -> Option<&str> {
        self.includes.as_deref()
    }

    pub fn excludes(&self) -> Option<&str> {
        self.excludes.as_deref()
    }

    /// All pattern entries, includes first
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.includes
            .iter()
            .chain(self.excludes.iter())
            .flat_map(|text| split_patterns(text))
    }

    /// Classifies a candidate against the lists
    ///
    /// `NEGATIVE` if includes are set and none match or if any exclude
    /// matches, otherwise `PARTIAL`. Patterns are compiled on first use;
    /// `normalize` and `case_sensitive` must be the same on every call.
    pub fn classify(
        &self,
        candidate: &str,
        case_sensitive: bool,
        normalize: impl Fn(&str) -> String + Copy,
    ) -> Classification {
        let compiled = self.compiled.get_or_init(|| Compiled {
            includes: self
                .includes
                .as_deref()
                .and_then(|text| PatternList::parse(text, case_sensitive, normalize)),
            excludes: self
                .excludes
                .as_deref()
                .and_then(|text| PatternList::parse(text, case_sensitive, normalize)),
        });

        if let Some(includes) = &compiled.includes {
            if !includes.matches(candidate) {
                return Classification::Negative;
            }
        }
        if let Some(excludes) = &compiled.excludes {
            if excludes.matches(candidate) {
                return Classification::Negative;
            }
        }
        Classification::Partial
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(p: &str) -> String {
        p.to_string()
    }

    #[test]
    fn test_split_on_commas_spaces_newlines() {
        let parts: Vec<&str> = split_patterns("a.com, b.com\nc.com  d.com,,").collect();
        assert_eq!(parts, vec!["a.com", "b.com", "c.com", "d.com"]);
    }

    #[test]
    fn test_blank_text_is_no_list() {
        assert!(PatternList::parse("  ,\n", false, identity).is_none());
    }

    #[test]
    fn test_case_insensitive_glob() {
        let list = PatternList::parse("*.Example.com", false, identity).unwrap();
        assert!(list.matches("WWW.example.COM"));
        assert!(!list.matches("example.com"));
    }

    #[test]
    fn test_case_sensitive_glob() {
        let list = PatternList::parse("/Repo/*", true, identity).unwrap();
        assert!(list.matches("/Repo/a"));
        assert!(!list.matches("/repo/a"));
    }

    #[test]
    fn test_question_mark_matches_one_char() {
        let list = PatternList::parse("host?", false, identity).unwrap();
        assert!(list.matches("host1"));
        assert!(!list.matches("host12"));
    }

    #[test]
    fn test_include_exclude_defaults() {
        let open = IncludeExclude::new(None, Some("   "));
        assert_eq!(open.classify("anything", false, identity), Classification::Partial);
        assert_eq!(open.includes(), None);
        assert_eq!(open.excludes(), None);
    }

    #[test]
    fn test_exclude_vetoes_after_include() {
        let filter = IncludeExclude::new(Some("*.example.com"), Some("admin.example.com"));
        assert_eq!(
            filter.classify("www.example.com", false, identity),
            Classification::Partial
        );
        assert_eq!(
            filter.classify("admin.example.com", false, identity),
            Classification::Negative
        );
        assert_eq!(
            filter.classify("www.other.org", false, identity),
            Classification::Negative
        );
    }
}
