//! # Violation Extraction
//!
//! The engine returns untyped nested data. Each entry of the first result
//! expression is expected to look like:
//!
//! ```json
//! {
//!   "constraint": "require_owner",
//!   "constraint_config": {"apiVersion": "...", "kind": "...",
//!                         "metadata": {"name": "...", "annotations": {}},
//!                         "spec": {"severity": "...", "match": {}, "parameters": {}}},
//!   "violation": {"msg": "...", "details": {}}
//! }
//! ```
//!
//! Decoding is total. Every field is checked for its expected type and left
//! out on mismatch, so one rule module's malformed output never hides
//! another module's well-formed findings. Entries that are not maps at all
//! carry nothing to report and are skipped.

use std::collections::BTreeMap;

use ram_core::{
    ConstraintConfig, ConstraintMetadata, ConstraintSpec, EnrichedEvent, NonCompliance,
    RuleContext, Violation,
};
use serde_json::{Map, Value};

use crate::engine::RuleEvaluationResult;

/// Shape of the first result expression.
#[derive(Debug)]
enum ResultShape<'a> {
    Entries(&'a [Value]),
    Absent,
    NotAList(&'a Value),
}

impl<'a> ResultShape<'a> {
    fn of(result: &'a RuleEvaluationResult) -> Self {
        match result.first_expression() {
            None => Self::Absent,
            Some(Value::Array(entries)) => Self::Entries(entries),
            Some(other) => Self::NotAList(other),
        }
    }
}

/// Typed view of one result entry.
#[derive(Debug, Default, PartialEq)]
struct DecodedEntry {
    non_compliance: NonCompliance,
    constraint_config: ConstraintConfig,
}

/// Turns engine output into violations stamped with the rule's identity.
#[derive(Debug, Clone)]
pub struct ViolationExtractor {
    rule: RuleContext,
    modules_source: BTreeMap<String, String>,
}

impl ViolationExtractor {
    pub fn new(rule: RuleContext, modules_source: BTreeMap<String, String>) -> Self {
        Self {
            rule,
            modules_source,
        }
    }

    /// One violation per decodable entry. Never fails.
    pub fn extract(&self, result: &RuleEvaluationResult, event: &EnrichedEvent) -> Vec<Violation> {
        let entries = match ResultShape::of(result) {
            ResultShape::Entries(entries) => entries,
            ResultShape::Absent => {
                tracing::debug!(asset_name = event.asset_name(), "engine returned no result expression");
                return Vec::new();
            }
            ResultShape::NotAList(value) => {
                tracing::warn!(
                    asset_name = event.asset_name(),
                    kind = json_kind(value),
                    "first result expression is not a list, treating as no violations"
                );
                return Vec::new();
            }
        };

        entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let decoded = decode_entry(entry);
                if decoded.is_none() {
                    tracing::warn!(
                        asset_name = event.asset_name(),
                        index,
                        kind = json_kind(entry),
                        "skipping result entry that is not a map"
                    );
                }
                decoded
            })
            .map(|decoded| Violation {
                non_compliance: decoded.non_compliance,
                function_config: self.rule.function_config(),
                constraint_config: decoded.constraint_config,
                feed_message: event.clone(),
                rule_modules_source: self.modules_source.clone(),
            })
            .collect()
    }
}

// -- Total decoders ---------------------------------------------------------------

fn decode_entry(entry: &Value) -> Option<DecodedEntry> {
    let entry = entry.as_object()?;
    Some(DecodedEntry {
        non_compliance: decode_non_compliance(entry.get("violation")),
        constraint_config: decode_constraint_config(entry.get("constraint_config")),
    })
}

fn decode_non_compliance(value: Option<&Value>) -> NonCompliance {
    let Some(map) = value.and_then(Value::as_object) else {
        return NonCompliance::default();
    };
    NonCompliance {
        message: string_field(map, "msg"),
        metadata: object_field(map, "details"),
    }
}

fn decode_constraint_config(value: Option<&Value>) -> ConstraintConfig {
    let Some(map) = value.and_then(Value::as_object) else {
        return ConstraintConfig::default();
    };
    ConstraintConfig {
        api_version: string_field(map, "apiVersion"),
        kind: string_field(map, "kind"),
        metadata: map
            .get("metadata")
            .and_then(Value::as_object)
            .map(|metadata| ConstraintMetadata {
                name: string_field(metadata, "name"),
                annotations: object_field(metadata, "annotations"),
            }),
        spec: map
            .get("spec")
            .and_then(Value::as_object)
            .map(|spec| ConstraintSpec {
                severity: string_field(spec, "severity"),
                match_: object_field(spec, "match"),
                parameters: object_field(spec, "parameters"),
            }),
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn object_field(map: &Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    map.get(key).and_then(Value::as_object).cloned()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ram_core::{AssetSnapshot, EnrichedAsset, FeedWindow, Origin};
    use serde_json::json;

    fn rule() -> RuleContext {
        RuleContext {
            rule_name: "require_owner".into(),
            project_context: "ram-prod".into(),
            environment: "prod".into(),
            deployment_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn event() -> EnrichedEvent {
        EnrichedEvent {
            asset: EnrichedAsset::new(
                AssetSnapshot {
                    name: "res1".into(),
                    asset_type: "storage.googleapis.com/Bucket".into(),
                    ancestors: vec!["folders/1".into()],
                    resource: None,
                    iam_policy: None,
                },
                &["Finance".to_string()],
                None,
                None,
            ),
            window: FeedWindow {
                start_time: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            },
            origin: Origin::RealTime,
            deleted: false,
        }
    }

    fn extractor() -> ViolationExtractor {
        let mut modules = BTreeMap::new();
        modules.insert("lib/audit.rego".to_string(), "package validator.gcp.lib".to_string());
        ViolationExtractor::new(rule(), modules)
    }

    fn well_formed(name: &str) -> Value {
        json!({
            "constraint": name,
            "constraint_config": {
                "apiVersion": "constraints.gatekeeper.sh/v1alpha1",
                "kind": "GCPRequireOwnerConstraintV1",
                "metadata": {"name": name, "annotations": {"category": "governance"}},
                "spec": {
                    "severity": "high",
                    "match": {"target": ["organizations/**"]},
                    "parameters": {"label": "owner"}
                }
            },
            "violation": {"msg": format!("{name} violated"), "details": {"missing": "owner"}}
        })
    }

    #[test]
    fn decodes_well_formed_entries() {
        let result = RuleEvaluationResult::new(vec![json!([well_formed("a"), well_formed("b")])]);
        let violations = extractor().extract(&result, &event());
        assert_eq!(violations.len(), 2);

        let first = &violations[0];
        assert_eq!(first.non_compliance.message.as_deref(), Some("a violated"));
        assert_eq!(
            first.non_compliance.metadata.as_ref().unwrap()["missing"],
            "owner"
        );
        assert_eq!(first.constraint_config.kind.as_deref(), Some("GCPRequireOwnerConstraintV1"));
        let metadata = first.constraint_config.metadata.as_ref().unwrap();
        assert_eq!(metadata.name.as_deref(), Some("a"));
        let spec = first.constraint_config.spec.as_ref().unwrap();
        assert_eq!(spec.severity.as_deref(), Some("high"));
        assert_eq!(spec.parameters.as_ref().unwrap()["label"], "owner");
        assert_eq!(first.function_config.rule_name, "require_owner");
        assert_eq!(first.feed_message.asset_name(), "res1");
        assert!(first.rule_modules_source.contains_key("lib/audit.rego"));
    }

    #[test]
    fn absent_expression_yields_nothing() {
        let violations = extractor().extract(&RuleEvaluationResult::default(), &event());
        assert!(violations.is_empty());
    }

    #[test]
    fn non_list_expression_yields_nothing() {
        for value in [json!({"a": 1}), json!("text"), json!(null), json!(3)] {
            let result = RuleEvaluationResult::new(vec![value]);
            assert!(extractor().extract(&result, &event()).is_empty());
        }
    }

    #[test]
    fn only_first_expression_is_consumed() {
        let result = RuleEvaluationResult::new(vec![json!([]), json!([well_formed("ignored")])]);
        assert!(extractor().extract(&result, &event()).is_empty());
    }

    #[test]
    fn malformed_entry_does_not_break_neighbours() {
        let malformed = json!({
            "constraint_config": {
                "apiVersion": 7,
                "kind": ["not", "a", "string"],
                "metadata": "flat",
                "spec": {"severity": 1, "match": [], "parameters": {"ok": true}}
            },
            "violation": {"msg": {"nested": true}, "details": "flat"}
        });
        let result = RuleEvaluationResult::new(vec![json!([
            malformed,
            well_formed("good"),
            "scalar entry",
        ])]);

        let violations = extractor().extract(&result, &event());
        assert_eq!(violations.len(), 2);

        let degraded = &violations[0];
        assert_eq!(degraded.non_compliance, NonCompliance::default());
        assert!(degraded.constraint_config.api_version.is_none());
        assert!(degraded.constraint_config.kind.is_none());
        assert!(degraded.constraint_config.metadata.is_none());
        let spec = degraded.constraint_config.spec.as_ref().unwrap();
        assert!(spec.severity.is_none());
        assert!(spec.match_.is_none());
        assert_eq!(spec.parameters.as_ref().unwrap()["ok"], true);

        assert_eq!(
            violations[1].non_compliance.message.as_deref(),
            Some("good violated")
        );
    }

    #[test]
    fn empty_map_entry_still_counts_as_one_violation() {
        let result = RuleEvaluationResult::new(vec![json!([{}])]);
        let violations = extractor().extract(&result, &event());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint_config, ConstraintConfig::default());
    }

    #[test]
    fn violations_share_idempotency_key_with_event() {
        let result = RuleEvaluationResult::new(vec![json!([well_formed("a"), well_formed("b")])]);
        let violations = extractor().extract(&result, &event());
        assert_eq!(violations[0].idempotency_key(), violations[1].idempotency_key());
        assert_eq!(violations[0].idempotency_key().asset_name, "res1");
    }
}
