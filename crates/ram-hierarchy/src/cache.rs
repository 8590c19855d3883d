//! Hierarchy cache capability.
//!
//! The cache is populated by an external inventory job and is eventually
//! consistent, so a miss right after a container is created is expected.
//! From the monitor's point of view it is read-only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

/// Errors reading the hierarchy cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// HTTP transport error.
    #[error("HTTP error reading cache document {key}: {source}")]
    Http { key: String, source: reqwest::Error },
    /// Store returned a non-2xx, non-404 status.
    #[error("cache store returned {status} for {key}: {body}")]
    ApiError {
        key: String,
        status: u16,
        body: String,
    },
    /// Document body was not JSON.
    #[error("failed to decode cache document {key}: {source}")]
    Deserialization { key: String, source: reqwest::Error },
    /// Store base URL cannot carry path segments.
    #[error("cache base URL cannot be a base: {0}")]
    InvalidBaseUrl(String),
    /// Injected failure (tests and local runs).
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Read-by-key access to cached container documents.
///
/// `Ok(None)` is a miss. Errors are retried by the caller like misses.
#[async_trait]
pub trait HierarchyCache: Send + Sync {
    async fn lookup(&self, key: &str) -> Result<Option<Value>, CacheError>;
}

/// In-memory [`HierarchyCache`] with a lookup counter and a failure switch.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    docs: Arc<RwLock<HashMap<String, Value>>>,
    failing: Arc<RwLock<bool>>,
    lookups: Arc<AtomicUsize>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document under an already-normalized key.
    pub fn insert(&self, key: impl Into<String>, doc: Value) {
        self.docs.write().insert(key.into(), doc);
    }

    /// Make every subsequent lookup fail.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }

    /// Number of lookups served so far, including failed ones.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HierarchyCache for MemoryCache {
    async fn lookup(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if *self.failing.read() {
            return Err(CacheError::Unavailable(format!("lookup of {key} rejected")));
        }
        Ok(self.docs.read().get(key).cloned())
    }
}
