//! # Policy Evaluation Adapter
//!
//! The engine's contract is collection-shaped, shared with batch evaluation
//! of whole inventories. For a single change event the adapter wraps the
//! asset in a one-element array and writes it to
//! `{work_dir}/inventory/assets.json` before invoking the fixed audit query.
//!
//! The inventory directory is removed and recreated on every call: an
//! execution context may be reused, and the engine must never see a
//! document left behind by a previous invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ram_core::EnrichedAsset;

use crate::engine::{EngineError, EvaluationEngine, RuleEvaluationResult};

/// Rule evaluated by every deployed monitor.
pub const AUDIT_QUERY: &str = "audit";

/// Module namespace the audit rule lives in.
pub const AUDIT_NAMESPACE: &str = "data.validator.gcp.lib";

const INVENTORY_DIR: &str = "inventory";
const INVENTORY_FILE: &str = "assets.json";

/// Adapts one enriched asset onto the engine's input/output contract.
#[derive(Clone)]
pub struct PolicyEvaluationAdapter {
    engine: Arc<dyn EvaluationEngine>,
}

impl std::fmt::Debug for PolicyEvaluationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEvaluationAdapter")
            .field("engine", &"[dyn EvaluationEngine]")
            .finish()
    }
}

impl PolicyEvaluationAdapter {
    pub fn new(engine: Arc<dyn EvaluationEngine>) -> Self {
        Self { engine }
    }

    /// Write the working document under `work_dir` and run the audit query.
    pub fn evaluate(
        &self,
        asset: &EnrichedAsset,
        work_dir: &Path,
    ) -> Result<RuleEvaluationResult, EngineError> {
        let document = write_working_document(asset, work_dir)?;
        let query = format!("{AUDIT_NAMESPACE}.{AUDIT_QUERY}");
        tracing::debug!(asset_name = asset.name(), %query, "evaluating asset");
        self.engine.evaluate(&query, &document)
    }
}

/// Remove-then-recreate the inventory directory and write `[asset]` into it.
pub fn write_working_document(
    asset: &EnrichedAsset,
    work_dir: &Path,
) -> Result<PathBuf, EngineError> {
    let dir = work_dir.join(INVENTORY_DIR);
    let io_err = |source: std::io::Error| EngineError::WorkingDocument {
        path: dir.display().to_string(),
        source,
    };

    match std::fs::remove_dir_all(&dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(e)),
    }
    std::fs::create_dir_all(&dir).map_err(io_err)?;

    let body = serde_json::to_vec(&[asset]).map_err(EngineError::Encode)?;
    let path = dir.join(INVENTORY_FILE);
    std::fs::write(&path, body).map_err(io_err)?;
    Ok(path)
}
