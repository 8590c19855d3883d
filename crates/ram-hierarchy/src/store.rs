//! REST client for the document store backing the hierarchy cache.
//!
//! Documents are read with `GET {base_url}/{collection}/{key}`. The key is
//! pushed as a single percent-encoded path segment, since normalized keys
//! contain backslashes. `404` is a miss.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::cache::{CacheError, HierarchyCache};

/// Client for the hierarchy document store.
#[derive(Debug, Clone)]
pub struct DocumentStoreClient {
    http: reqwest::Client,
    base_url: Url,
    collection: String,
}

impl DocumentStoreClient {
    pub fn new(http: reqwest::Client, base_url: Url, collection: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            collection: collection.into(),
        }
    }

    fn document_url(&self, key: &str) -> Result<Url, CacheError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CacheError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&self.collection)
            .push(key);
        Ok(url)
    }
}

#[async_trait]
impl HierarchyCache for DocumentStoreClient {
    async fn lookup(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let url = self.document_url(key)?;

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::Http {
                key: key.to_string(),
                source: e,
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(CacheError::ApiError {
                key: key.to_string(),
                status,
                body,
            });
        }

        resp.json()
            .await
            .map(Some)
            .map_err(|e| CacheError::Deserialization {
                key: key.to_string(),
                source: e,
            })
    }
}
