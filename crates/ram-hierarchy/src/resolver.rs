//! # Hierarchy Resolver
//!
//! Maps nearest-first ancestor identifiers to display names, same length,
//! same order. Per ancestor:
//!
//! 1. Unknown kind: `"unknown"`, no lookup.
//! 2. Cache read, retried with linear backoff. A hit is final, even if the
//!    document has an unexpected shape (then `"unknown"`).
//! 3. After the last miss: one live directory lookup. Failure is logged
//!    and yields `"unknown"`.

use std::sync::Arc;
use std::time::Duration;

use ram_core::ancestry::{cache_key, parse_ancestor};
use ram_core::{AncestorKind, UNKNOWN_DISPLAY_NAME};
use serde_json::Value;

use crate::cache::HierarchyCache;
use crate::directory::DirectoryLookup;
use crate::retry::retry_linear;

/// Cache retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Total cache reads per ancestor before falling back.
    pub max_attempts: u32,
    /// Linear backoff step between reads.
    pub backoff_step: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_step: Duration::from_millis(100),
        }
    }
}

/// Resolves ancestor identifiers to display names.
#[derive(Clone)]
pub struct HierarchyResolver {
    cache: Arc<dyn HierarchyCache>,
    directory: Arc<dyn DirectoryLookup>,
    config: ResolverConfig,
}

impl std::fmt::Debug for HierarchyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyResolver")
            .field("cache", &"[dyn HierarchyCache]")
            .field("directory", &"[dyn DirectoryLookup]")
            .field("config", &self.config)
            .finish()
    }
}

impl HierarchyResolver {
    pub fn new(
        cache: Arc<dyn HierarchyCache>,
        directory: Arc<dyn DirectoryLookup>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            cache,
            directory,
            config,
        }
    }

    /// Resolve every ancestor, in input order. Never fails.
    pub async fn resolve_display_names(&self, ancestors: &[String]) -> Vec<String> {
        let mut names = Vec::with_capacity(ancestors.len());
        for ancestor in ancestors {
            names.push(self.resolve_one(ancestor).await);
        }
        names
    }

    async fn resolve_one(&self, ancestor: &str) -> String {
        let Some((kind, id)) = parse_ancestor(ancestor) else {
            tracing::debug!(ancestor, "unrecognized ancestor type, not resolving");
            return UNKNOWN_DISPLAY_NAME.to_string();
        };

        let key = cache_key(ancestor);
        let cached = retry_linear(
            self.config.max_attempts,
            self.config.backoff_step,
            &key,
            || self.cache.lookup(&key),
        )
        .await;

        if let Some(doc) = cached {
            return display_name_from_cached(kind, &doc).unwrap_or_else(|| {
                tracing::warn!(ancestor, "cached hierarchy document has unexpected shape");
                UNKNOWN_DISPLAY_NAME.to_string()
            });
        }

        match self.directory.display_name(kind, id).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(ancestor, "live directory lookup failed: {e}");
                UNKNOWN_DISPLAY_NAME.to_string()
            }
        }
    }
}

/// Read `resource.data.<display field>` from a cached container document.
fn display_name_from_cached(kind: AncestorKind, doc: &Value) -> Option<String> {
    let field = kind.display_field()?;
    doc.get("resource")?
        .get("data")?
        .get(field)?
        .as_str()
        .map(str::to_string)
}
