//! # Change Events and Enriched Assets
//!
//! [`AssetChangeEvent`] is the inbound inventory feed message, decoded once
//! per invocation. [`EnrichedEvent`] is the same event after the enricher
//! has reconstructed the asset's position in the organizational hierarchy.
//!
//! Resource and IAM policy payloads are opaque JSON: the monitor forwards
//! them to the rule engine untouched and only ever reads the label map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ancestry;
use crate::error::EventError;

/// Where the inventory snapshot came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Streaming change feed.
    #[default]
    #[serde(rename = "real-time")]
    RealTime,
    /// Scheduled inventory export.
    #[serde(rename = "batch")]
    Batch,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RealTime => "real-time",
            Self::Batch => "batch",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a cloud resource or of the IAM policy attached to one.
///
/// Exactly one of `resource` and `iam_policy` is populated, depending on
/// which feed produced the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSnapshot {
    /// Globally unique full resource name.
    pub name: String,
    #[serde(default)]
    pub asset_type: String,
    /// Container identifiers, nearest first.
    #[serde(default)]
    pub ancestors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_policy: Option<Value>,
}

impl AssetSnapshot {
    /// Look up a label value in the resource payload's `data.labels` map.
    ///
    /// Any shape mismatch along the way yields `None`.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.resource
            .as_ref()?
            .get("data")?
            .get("labels")?
            .get(key)?
            .as_str()
    }
}

/// Inventory window the snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedWindow {
    pub start_time: DateTime<Utc>,
}

/// One inbound change-feed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetChangeEvent {
    pub asset: AssetSnapshot,
    pub window: FeedWindow,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

impl AssetChangeEvent {
    /// Decode an event from its raw payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, EventError> {
        let event: Self = serde_json::from_slice(payload)?;
        if event.asset.name.is_empty() {
            return Err(EventError::MissingAssetName);
        }
        Ok(event)
    }

    /// Start of the inventory window, used as the inventory timestamp on evidence.
    pub fn window_start(&self) -> DateTime<Utc> {
        self.window.start_time
    }
}

/// Asset snapshot plus the fields derived for rule evaluation.
///
/// The `*_legacy` fields duplicate three values under the snake_case keys
/// older rule modules still read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedAsset {
    #[serde(flatten)]
    pub snapshot: AssetSnapshot,
    pub ancestry_path: String,
    pub ancestry_path_display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_resolver: Option<String>,
    #[serde(rename = "ancestry_path")]
    pub ancestry_path_legacy: String,
    #[serde(rename = "asset_type")]
    pub asset_type_legacy: String,
    #[serde(rename = "iam_policy", default, skip_serializing_if = "Option::is_none")]
    pub iam_policy_legacy: Option<Value>,
}

impl EnrichedAsset {
    /// Build the enriched document from a snapshot and display names
    /// resolved for its ancestors in nearest-first order.
    pub fn new(
        snapshot: AssetSnapshot,
        display_names: &[String],
        owner: Option<String>,
        violation_resolver: Option<String>,
    ) -> Self {
        let ancestry_path = ancestry::ancestry_path(&snapshot.ancestors);
        Self {
            ancestry_path_display_name: ancestry::display_path(display_names),
            ancestry_path_legacy: ancestry_path.clone(),
            asset_type_legacy: snapshot.asset_type.clone(),
            iam_policy_legacy: snapshot.iam_policy.clone(),
            ancestry_path,
            owner,
            violation_resolver,
            snapshot,
        }
    }

    pub fn name(&self) -> &str {
        &self.snapshot.name
    }
}

/// A change event whose asset has been enriched. This is the `feedMessage`
/// carried on every violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    pub asset: EnrichedAsset,
    pub window: FeedWindow,
    pub origin: Origin,
    pub deleted: bool,
}

impl EnrichedEvent {
    pub fn asset_name(&self) -> &str {
        self.asset.name()
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window.start_time
    }
}
