//! Live directory lookup, used only when the cache has nothing.
//!
//! One endpoint per known container kind:
//! `GET {base_url}/v3/{organizations|folders|projects}/{id}`, reading
//! `displayName` from the response.

use std::collections::HashMap;

use async_trait::async_trait;
use ram_core::AncestorKind;
use serde_json::Value;
use url::Url;

/// Errors from the live directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Ancestor kind has no directory endpoint.
    #[error("no directory endpoint for ancestor kind {0:?}")]
    Unsupported(AncestorKind),
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Directory returned a non-2xx status.
    #[error("directory {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response decoded but carried no display name.
    #[error("directory {endpoint} response has no displayName")]
    MissingDisplayName { endpoint: String },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("{0} not found in directory")]
    NotFound(String),
}

/// Get-by-identifier access to the live organization directory.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn display_name(&self, kind: AncestorKind, id: &str) -> Result<String, DirectoryError>;
}

// -- HTTP client --------------------------------------------------------------

/// Client for the resource manager directory API.
#[derive(Debug, Clone)]
pub struct ResourceManagerClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ResourceManagerClient {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl DirectoryLookup for ResourceManagerClient {
    async fn display_name(&self, kind: AncestorKind, id: &str) -> Result<String, DirectoryError> {
        let collection = kind.collection().ok_or(DirectoryError::Unsupported(kind))?;
        let endpoint = format!("GET /v3/{collection}/{id}");
        let url = format!(
            "{}/v3/{collection}/{id}",
            self.base_url.as_str().trim_end_matches('/')
        );

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DirectoryError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound(format!("{collection}/{id}")));
        }

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DirectoryError::ApiError {
                endpoint,
                status,
                body,
            });
        }

        let doc: Value = resp
            .json()
            .await
            .map_err(|e| DirectoryError::Deserialization {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        doc.get("displayName")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(DirectoryError::MissingDisplayName { endpoint })
    }
}

// -- Static directory ---------------------------------------------------------

/// Fixed-table [`DirectoryLookup`] keyed by full ancestor identifier.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: HashMap<String, String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ancestor: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.names.insert(ancestor.into(), display_name.into());
        self
    }
}

#[async_trait]
impl DirectoryLookup for StaticDirectory {
    async fn display_name(&self, kind: AncestorKind, id: &str) -> Result<String, DirectoryError> {
        let collection = kind.collection().ok_or(DirectoryError::Unsupported(kind))?;
        let ancestor = format!("{collection}/{id}");
        self.names
            .get(&ancestor)
            .cloned()
            .ok_or(DirectoryError::NotFound(ancestor))
    }
}
