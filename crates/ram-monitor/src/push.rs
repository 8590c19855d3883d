//! # Push Delivery
//!
//! The change feed delivers each event as an HTTP push:
//!
//! ```json
//! {"message": {"data": "<base64 event>", "messageId": "...", "publishTime": "..."},
//!  "subscription": "..."}
//! ```
//!
//! `publishTime` is the event timestamp the retry window is measured from.
//! `messageId` names the invocation in logs and nothing else.
//!
//! | Disposition        | Status |
//! |--------------------|--------|
//! | Proceed            | 204    |
//! | PermanentSkip      | 204    |
//! | RetryableFailure   | 500    |

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::gate::{Admission, SkipReason};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct PushEnvelope {
    message: PushMessage,
    #[serde(default)]
    subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushMessage {
    #[serde(default)]
    data: String,
    #[serde(default)]
    message_id: Option<String>,
    publish_time: DateTime<Utc>,
}

/// Envelope decode failures. Always permanent.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("push envelope is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// One decoded push delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushDelivery {
    pub invocation_id: String,
    pub event_timestamp: DateTime<Utc>,
    pub subscription: Option<String>,
    pub payload: Vec<u8>,
}

impl PushDelivery {
    pub fn decode(body: &[u8]) -> Result<Self, EnvelopeError> {
        let envelope: PushEnvelope = serde_json::from_slice(body)?;
        let payload = BASE64.decode(envelope.message.data.as_bytes())?;
        Ok(Self {
            invocation_id: envelope
                .message
                .message_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            event_timestamp: envelope.message.publish_time,
            subscription: envelope.subscription,
            payload,
        })
    }
}

impl IntoResponse for Admission {
    fn into_response(self) -> Response {
        match self {
            Self::Proceed => StatusCode::NO_CONTENT.into_response(),
            Self::PermanentSkip(reason) => {
                tracing::error!(reason = %reason, "event dropped without retry");
                StatusCode::NO_CONTENT.into_response()
            }
            Self::RetryableFailure(e) => {
                tracing::error!(error = %e, "invocation failed, requesting redelivery");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// `POST /` handler.
pub async fn receive(State(state): State<AppState>, body: Bytes) -> Admission {
    let delivery = match PushDelivery::decode(&body) {
        Ok(delivery) => delivery,
        Err(e) => return Admission::PermanentSkip(SkipReason::MalformedEnvelope(e.to_string())),
    };

    let span = tracing::info_span!(
        "invocation",
        invocation_id = %delivery.invocation_id,
        subscription = delivery.subscription.as_deref().unwrap_or(""),
        rule_name = state.rule_name(),
    );
    handle(state, delivery).instrument(span).await
}

async fn handle(state: AppState, delivery: PushDelivery) -> Admission {
    let admission = state
        .gate
        .admit(state.setup_error(), delivery.event_timestamp, Utc::now());
    if !matches!(admission, Admission::Proceed) {
        return admission;
    }
    let Some(pipeline) = state.pipeline() else {
        return admission;
    };

    let result = pipeline.process(&delivery.payload).await;
    if let Ok(outcome) = &result {
        tracing::info!(
            asset_name = %outcome.status.asset_name,
            compliant = outcome.status.compliant,
            deleted = outcome.status.deleted,
            violations = outcome.violations,
            "invocation complete"
        );
    }
    state.gate.settle(result)
}
