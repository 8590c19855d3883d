//! Pub/Sub REST publisher.
//!
//! `POST {base}/v1/projects/{project}/topics/{topic}:publish` with
//! `{"messages": [{"data": "<base64>"}]}`. The response carries one
//! `messageIds` entry per accepted message; an empty list means the
//! message was not acknowledged.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::sink::{EvidenceSink, PublishError};

#[derive(Serialize)]
struct PublishRequest {
    messages: Vec<OutgoingMessage>,
}

#[derive(Serialize)]
struct OutgoingMessage {
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

/// [`EvidenceSink`] over the Pub/Sub REST API.
#[derive(Debug, Clone)]
pub struct PubSubClient {
    http: reqwest::Client,
    base_url: Url,
    project: String,
}

impl PubSubClient {
    /// `http` should already carry authorization headers.
    pub fn new(http: reqwest::Client, base_url: Url, project: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            project: project.into(),
        }
    }

    fn topic_url(&self, topic: &str) -> String {
        format!(
            "{}/v1/projects/{}/topics/{}:publish",
            self.base_url.as_str().trim_end_matches('/'),
            self.project,
            topic
        )
    }
}

#[async_trait]
impl EvidenceSink for PubSubClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<String, PublishError> {
        let request = PublishRequest {
            messages: vec![OutgoingMessage {
                data: BASE64.encode(payload),
            }],
        };

        let resp = self
            .http
            .post(self.topic_url(topic))
            .json(&request)
            .send()
            .await
            .map_err(|e| PublishError::Http {
                topic: topic.to_string(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(PublishError::ApiError {
                topic: topic.to_string(),
                status,
                body,
            });
        }

        let response: PublishResponse =
            resp.json().await.map_err(|e| PublishError::Deserialization {
                topic: topic.to_string(),
                source: e,
            })?;

        response
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| PublishError::NotAcknowledged {
                topic: topic.to_string(),
            })
    }
}
