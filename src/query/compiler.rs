//! Query compilation with caching

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::parser::parse_query;
use crate::credential::KindRegistry;
use crate::error::{CredentialsError, Result};
use crate::matchers::SharedMatcher;

/// Configuration for the query compiler
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Maximum query length in characters
    pub max_query_length: usize,

    /// Maximum nesting of parentheses and negations
    pub max_nesting_depth: usize,

    /// Time-to-live for cached matchers
    pub cache_ttl: Duration,

    /// Maximum number of entries in the matcher cache
    pub max_cache_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_query_length: 4096,
            max_nesting_depth: 64,
            cache_ttl: Duration::from_secs(300),
            max_cache_size: 1024,
        }
    }
}

/// Cache statistics for monitoring performance
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub size: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    matcher: SharedMatcher,
    expires_at: u64,
}

/// Compiles query text into matchers, caching by query text
///
/// # Thread Safety
///
/// The cache is a `DashMap`; a compiler can be shared across threads.
///
/// # Examples
///
/// ```
/// use credscope::{CredentialScope, QueryCompiler, QueryConfig, UsernamePasswordCredentials};
///
/// let compiler = QueryCompiler::new(QueryConfig::default());
/// let matcher = compiler.compile(r#"username == "bob" && scope == CredentialsScope.GLOBAL"#).unwrap();
///
/// let bob = UsernamePasswordCredentials::new(CredentialScope::Global, "db", "bob", "pw");
/// assert!(matcher.matches(&bob));
///
/// compiler.compile(r#"username == "bob" && scope == CredentialsScope.GLOBAL"#).unwrap();
/// assert_eq!(compiler.get_stats().hit_count, 1);
/// ```
pub struct QueryCompiler {
    config: QueryConfig,
    registry: Option<Arc<KindRegistry>>,
    cache: DashMap<String, CacheEntry>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl QueryCompiler {
    /// Creates a compiler with the given configuration
    pub fn new(config: QueryConfig) -> Self {
        Self {
            config,
            registry: None,
            cache: DashMap::new(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    /// Requires `instanceof` names to be known to the registry
    pub fn with_registry(mut self, registry: Arc<KindRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Compiles query text into a matcher
    ///
    /// # Errors
    ///
    /// Returns `QuerySyntax` with the character offset of the failure, or
    /// `QueryTooComplex` if the query exceeds the configured limits. Failed
    /// compilations are not cached.
    pub fn compile(&self, query: &str) -> Result<SharedMatcher> {
        let now = current_timestamp_ms();
        if let Some(entry) = self.cache.get(query) {
            if entry.expires_at > now {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(&entry.matcher));
            }
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);

        let matcher = compile_uncached(query, &self.config, self.registry.as_deref())?;
        debug!(query_len = query.len(), "compiled credentials query");

        let expires_at = now + self.config.cache_ttl.as_millis() as u64;
        self.cache.insert(
            query.to_string(),
            CacheEntry {
                matcher: Arc::clone(&matcher),
                expires_at,
            },
        );

        if self.cache.len() > self.config.max_cache_size {
            self.evict_entries();
        }

        Ok(matcher)
    }

    /// Clears the matcher cache and resets statistics
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.hit_count.store(0, Ordering::Relaxed);
        self.miss_count.store(0, Ordering::Relaxed);
    }

    /// Returns cache statistics
    pub fn get_stats(&self) -> CacheStats {
        let size = self.cache.len();
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        CacheStats {
            size,
            hit_count: hits,
            miss_count: misses,
            hit_rate,
        }
    }

    /// Evicts expired entries, then arbitrary ones until the cache fits
    fn evict_entries(&self) {
        let now = current_timestamp_ms();
        self.cache.retain(|_, entry| entry.expires_at > now);

        while self.cache.len() > self.config.max_cache_size {
            let victim = self.cache.iter().next().map(|entry| entry.key().clone());
            match victim {
                Some(key) => {
                    self.cache.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

/// Applies the configured limits, then parses
pub(crate) fn compile_uncached(
    query: &str,
    config: &QueryConfig,
    registry: Option<&KindRegistry>,
) -> Result<SharedMatcher> {
    let length = query.chars().count();
    if length > config.max_query_length {
        return Err(CredentialsError::QueryTooComplex {
            reason: format!(
                "query is {} characters long, limit is {}",
                length, config.max_query_length
            ),
        });
    }
    parse_query(query, config.max_nesting_depth, registry)
}

/// Returns current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
