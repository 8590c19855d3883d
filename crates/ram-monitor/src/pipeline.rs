//! # Event Pipeline
//!
//! One admitted event, end to end:
//!
//! ```text
//! enrich → evaluate → extract → decide → publish
//! ```
//!
//! Deleted assets skip evaluation: the decision is fixed and no violations
//! are produced. Each evaluation gets its own working directory under the
//! work root, removed when the evaluation finishes, so concurrent
//! deliveries never see each other's documents.

use std::path::{Path, PathBuf};

use ram_core::{decide, ComplianceStatus, EnrichedEvent, RuleContext, Violation};
use ram_publish::{EvidencePublisher, PublishReport};
use ram_rules::{PolicyEvaluationAdapter, ViolationExtractor};
use uuid::Uuid;

use crate::enrich::DocumentEnricher;
use crate::error::PipelineError;

/// What one completed invocation published.
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    pub status: ComplianceStatus,
    pub violations: usize,
    pub report: PublishReport,
}

/// The stateless per-event pipeline, shared by all deliveries.
#[derive(Debug, Clone)]
pub struct Pipeline {
    enricher: DocumentEnricher,
    adapter: PolicyEvaluationAdapter,
    extractor: ViolationExtractor,
    publisher: EvidencePublisher,
    rule: RuleContext,
    work_root: PathBuf,
}

impl Pipeline {
    pub fn new(
        enricher: DocumentEnricher,
        adapter: PolicyEvaluationAdapter,
        extractor: ViolationExtractor,
        publisher: EvidencePublisher,
        rule: RuleContext,
        work_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            enricher,
            adapter,
            extractor,
            publisher,
            rule,
            work_root: work_root.into(),
        }
    }

    pub fn rule(&self) -> &RuleContext {
        &self.rule
    }

    /// Process one raw change-event payload.
    pub async fn process(&self, payload: &[u8]) -> Result<InvocationOutcome, PipelineError> {
        let event = self.enricher.enrich(payload).await?;

        let violations = if event.deleted {
            tracing::info!(asset_name = event.asset_name(), "asset deleted, skipping evaluation");
            Vec::new()
        } else {
            self.evaluate(&event).await?
        };

        let verdict = decide(&violations, event.deleted);
        let status = ComplianceStatus::new(&event, &self.rule, verdict);
        let report = self.publisher.publish(&status, &violations).await?;

        Ok(InvocationOutcome {
            violations: violations.len(),
            status,
            report,
        })
    }

    async fn evaluate(&self, event: &EnrichedEvent) -> Result<Vec<Violation>, PipelineError> {
        let adapter = self.adapter.clone();
        let asset = event.asset.clone();
        let work_dir = self.work_root.join(Uuid::new_v4().to_string());

        let result = tokio::task::spawn_blocking(move || {
            let result = adapter.evaluate(&asset, &work_dir);
            remove_work_dir(&work_dir);
            result
        })
        .await
        .map_err(|e| PipelineError::EvaluationTask(e.to_string()))??;

        Ok(self.extractor.extract(&result, event))
    }
}

fn remove_work_dir(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(dir = %dir.display(), "failed to remove working directory: {e}"),
    }
}
