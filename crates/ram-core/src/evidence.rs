//! # Compliance Evidence
//!
//! Two record types leave the monitor:
//!
//! - [`ComplianceStatus`]: exactly one per invocation, always published.
//! - [`Violation`]: zero or more per invocation, one per non-compliant
//!   result entry returned by the rule engine.
//!
//! Both carry the same [`IdempotencyKey`]. Delivery is at-least-once, so
//! downstream writers dedup on it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decision::Verdict;
use crate::event::{EnrichedEvent, Origin};

/// Per-process identity of the deployed rule, stamped on all evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleContext {
    pub rule_name: String,
    /// Project the monitor runs in.
    pub project_context: String,
    pub environment: String,
    pub deployment_time: DateTime<Utc>,
}

impl RuleContext {
    pub fn function_config(&self) -> FunctionConfig {
        FunctionConfig {
            rule_name: self.rule_name.clone(),
            project_context: self.project_context.clone(),
            environment: self.environment.clone(),
            rule_deployment_time: self.deployment_time,
        }
    }
}

/// Downstream dedup key shared by a status record and its violations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdempotencyKey {
    pub asset_name: String,
    pub asset_inventory_timestamp: DateTime<Utc>,
    pub rule_name: String,
    pub rule_deployment_timestamp: DateTime<Utc>,
}

// -- Compliance status --------------------------------------------------------

/// Per-asset, per-rule pass/fail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceStatus {
    pub asset_name: String,
    pub asset_inventory_timestamp: DateTime<Utc>,
    pub asset_inventory_origin: Origin,
    pub rule_name: String,
    pub rule_deployment_timestamp: DateTime<Utc>,
    pub compliant: bool,
    pub deleted: bool,
}

impl ComplianceStatus {
    pub fn new(event: &EnrichedEvent, rule: &RuleContext, verdict: Verdict) -> Self {
        Self {
            asset_name: event.asset_name().to_string(),
            asset_inventory_timestamp: event.window_start(),
            asset_inventory_origin: event.origin,
            rule_name: rule.rule_name.clone(),
            rule_deployment_timestamp: rule.deployment_time,
            compliant: verdict.compliant,
            deleted: verdict.deleted,
        }
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey {
            asset_name: self.asset_name.clone(),
            asset_inventory_timestamp: self.asset_inventory_timestamp,
            rule_name: self.rule_name.clone(),
            rule_deployment_timestamp: self.rule_deployment_timestamp,
        }
    }
}

// -- Violation ----------------------------------------------------------------

/// Message and free-form details reported by the rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NonCompliance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Deployment identity of the rule that produced a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionConfig {
    pub rule_name: String,
    pub project_context: String,
    pub environment: String,
    pub rule_deployment_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

/// Rule configuration echoed back by the engine. Every field is optional:
/// whatever did not have the expected type is left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConstraintMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<ConstraintSpec>,
}

/// One piece of evidence explaining a single rule failure for an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub non_compliance: NonCompliance,
    pub function_config: FunctionConfig,
    pub constraint_config: ConstraintConfig,
    pub feed_message: EnrichedEvent,
    /// Rule module path to source text, for traceability.
    pub rule_modules_source: BTreeMap<String, String>,
}

impl Violation {
    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey {
            asset_name: self.feed_message.asset_name().to_string(),
            asset_inventory_timestamp: self.feed_message.window_start(),
            rule_name: self.function_config.rule_name.clone(),
            rule_deployment_timestamp: self.function_config.rule_deployment_time,
        }
    }
}
