//! Durable channel capability.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use ram_core::ErrorClass;

/// Errors publishing evidence.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// HTTP transport error.
    #[error("HTTP error publishing to {topic}: {source}")]
    Http {
        topic: String,
        source: reqwest::Error,
    },
    /// Channel returned a non-2xx status.
    #[error("publish to {topic} returned {status}: {body}")]
    ApiError {
        topic: String,
        status: u16,
        body: String,
    },
    /// Channel answered without an acknowledgment id.
    #[error("publish to {topic} was not acknowledged")]
    NotAcknowledged { topic: String },
    /// Response deserialization failed.
    #[error("failed to deserialize publish response from {topic}: {source}")]
    Deserialization {
        topic: String,
        source: reqwest::Error,
    },
    /// Evidence record could not be serialized. Not retryable.
    #[error("failed to serialize {record}: {source}")]
    Serialization {
        record: &'static str,
        source: serde_json::Error,
    },
    /// Publish task panicked or was cancelled before acknowledging.
    #[error("publish task for {topic} did not complete: {message}")]
    Aborted { topic: String, message: String },
    /// Injected failure (tests and local runs).
    #[error("topic {topic} unavailable")]
    Unavailable { topic: String },
}

impl PublishError {
    /// Unserializable evidence is permanent; every delivery failure is
    /// transient.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Serialization { .. } => ErrorClass::Permanent,
            _ => ErrorClass::Transient,
        }
    }
}

/// One durable, at-least-once channel per topic.
#[async_trait]
pub trait EvidenceSink: Send + Sync {
    /// Publish `payload` to `topic`, returning the acknowledgment id once
    /// the channel has durably accepted it.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<String, PublishError>;
}

/// In-memory [`EvidenceSink`] recording payloads per topic.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    published: Arc<RwLock<HashMap<String, Vec<Vec<u8>>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every publish to `topic` from now on.
    pub fn fail_topic(&self, topic: impl Into<String>) {
        self.failing.write().insert(topic.into());
    }

    /// Payloads acknowledged on `topic`, in acknowledgment order.
    pub fn published(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published.read().get(topic).cloned().unwrap_or_default()
    }

    /// Acknowledged payloads on `topic`, decoded as JSON.
    pub fn published_json(&self, topic: &str) -> Vec<serde_json::Value> {
        self.published(topic)
            .iter()
            .filter_map(|p| serde_json::from_slice(p).ok())
            .collect()
    }
}

#[async_trait]
impl EvidenceSink for MemorySink {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<String, PublishError> {
        if self.failing.read().contains(topic) {
            return Err(PublishError::Unavailable {
                topic: topic.to_string(),
            });
        }
        let mut published = self.published.write();
        let entries = published.entry(topic.to_string()).or_default();
        entries.push(payload);
        Ok(format!("{topic}-{}", entries.len()))
    }
}
