//! # Evaluation Engine
//!
//! The engine is a capability: given a query and the path of the working
//! document, return the raw result expressions. [`RegoEngine`] builds a
//! fresh interpreter for every evaluation, so nothing evaluated for one
//! asset can leak into the next.
//!
//! Data exposed to rule modules:
//!
//! | Path                | Source                                   |
//! |---------------------|------------------------------------------|
//! | `data.inventory`    | the working document (asset collection)  |
//! | `data.constraints`  | catalog constraint documents             |

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::catalog::RuleCatalog;

/// Errors from the evaluation engine. All of them are retryable except a
/// compile failure, which can only happen at startup.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("rule module {module} failed to compile: {message}")]
    Compile { module: String, message: String },

    #[error("working document {path}: {source}")]
    WorkingDocument {
        path: String,
        source: std::io::Error,
    },

    #[error("working document {path} is not valid JSON: {source}")]
    InvalidWorkingDocument {
        path: String,
        source: serde_json::Error,
    },

    #[error("asset could not be encoded as a working document: {0}")]
    Encode(serde_json::Error),

    #[error("engine rejected input data: {0}")]
    Data(String),

    #[error("query {query} failed: {message}")]
    Evaluation { query: String, message: String },
}

/// Raw engine output: the value of each result expression, in order.
///
/// Only the first expression is ever consumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleEvaluationResult {
    pub expressions: Vec<Value>,
}

impl RuleEvaluationResult {
    pub fn new(expressions: Vec<Value>) -> Self {
        Self { expressions }
    }

    pub fn first_expression(&self) -> Option<&Value> {
        self.expressions.first()
    }
}

/// Declarative rule evaluation capability.
pub trait EvaluationEngine: Send + Sync {
    /// Evaluate `query` against the catalog and the document at `working_document`.
    fn evaluate(
        &self,
        query: &str,
        working_document: &Path,
    ) -> Result<RuleEvaluationResult, EngineError>;
}

// -- Rego -----------------------------------------------------------------------

/// [`EvaluationEngine`] backed by an embedded Rego interpreter.
#[derive(Debug, Clone)]
pub struct RegoEngine {
    catalog: Arc<RuleCatalog>,
}

impl RegoEngine {
    /// Create the engine, compiling every module once so syntax errors
    /// surface at startup.
    pub fn new(catalog: Arc<RuleCatalog>) -> Result<Self, EngineError> {
        let engine = Self { catalog };
        engine.interpreter()?;
        Ok(engine)
    }

    fn interpreter(&self) -> Result<regorus::Engine, EngineError> {
        let mut interpreter = regorus::Engine::new();
        for (module, source) in self.catalog.modules_source() {
            interpreter
                .add_policy(module.clone(), source.clone())
                .map_err(|e| EngineError::Compile {
                    module: module.clone(),
                    message: e.to_string(),
                })?;
        }
        Ok(interpreter)
    }
}

impl EvaluationEngine for RegoEngine {
    fn evaluate(
        &self,
        query: &str,
        working_document: &Path,
    ) -> Result<RuleEvaluationResult, EngineError> {
        let raw = std::fs::read_to_string(working_document).map_err(|e| {
            EngineError::WorkingDocument {
                path: working_document.display().to_string(),
                source: e,
            }
        })?;
        let inventory: Value =
            serde_json::from_str(&raw).map_err(|e| EngineError::InvalidWorkingDocument {
                path: working_document.display().to_string(),
                source: e,
            })?;

        let data = json!({
            "inventory": inventory,
            "constraints": self.catalog.constraints(),
        });

        let mut interpreter = self.interpreter()?;
        let data = regorus::Value::from_json_str(&data.to_string())
            .map_err(|e| EngineError::Data(e.to_string()))?;
        interpreter
            .add_data(data)
            .map_err(|e| EngineError::Data(e.to_string()))?;

        let results = interpreter
            .eval_query(query.to_string(), false)
            .map_err(|e| EngineError::Evaluation {
                query: query.to_string(),
                message: e.to_string(),
            })?;

        let mut expressions = Vec::new();
        if let Some(first) = results.result.first() {
            for expression in &first.expressions {
                let value = serde_json::to_value(&expression.value).map_err(|e| {
                    EngineError::Evaluation {
                        query: query.to_string(),
                        message: e.to_string(),
                    }
                })?;
                expressions.push(value);
            }
        }

        tracing::debug!(query, expressions = expressions.len(), "rule evaluation finished");
        Ok(RuleEvaluationResult::new(expressions))
    }
}
