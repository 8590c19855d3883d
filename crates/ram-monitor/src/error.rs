//! # Pipeline Errors
//!
//! Every failure an admitted invocation can hit, each mapped to exactly one
//! [`ErrorClass`]:
//!
//! | Variant            | Class     |
//! |--------------------|-----------|
//! | `Enrich`           | Permanent |
//! | `Engine(Encode)`   | Permanent |
//! | `Engine(_)`        | Transient |
//! | `EvaluationTask`   | Transient |
//! | `Publish(Serialization)` | Permanent |
//! | `Publish(_)`       | Transient |

use ram_core::ErrorClass;
use ram_publish::PublishError;
use ram_rules::EngineError;

use crate::enrich::EnrichError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Enrich(#[from] EnrichError),

    #[error("rule evaluation failed: {0}")]
    Engine(#[from] EngineError),

    /// The blocking evaluation task panicked or was cancelled.
    #[error("rule evaluation task did not complete: {0}")]
    EvaluationTask(String),

    #[error("evidence publishing failed: {0}")]
    Publish(#[from] PublishError),
}

impl PipelineError {
    /// The single place the permanent/transient split is decided.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Enrich(e) => e.class(),
            Self::Engine(EngineError::Encode(_)) => ErrorClass::Permanent,
            Self::Engine(_) | Self::EvaluationTask(_) => ErrorClass::Transient,
            Self::Publish(e) => e.class(),
        }
    }
}
