//! # Application State
//!
//! Shared state for the Axum application. Holds the outcome of one-time
//! setup: either a ready [`Pipeline`] or the reason setup failed. A failed
//! setup keeps the process serving so that every delivery is consumed as a
//! permanent skip instead of being retried against a broken instance.

use std::sync::Arc;

use crate::gate::RetryGate;
use crate::pipeline::Pipeline;

#[derive(Debug)]
enum Setup {
    Ready(Pipeline),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct AppState {
    setup: Arc<Setup>,
    pub gate: RetryGate,
}

impl AppState {
    pub fn ready(pipeline: Pipeline, gate: RetryGate) -> Self {
        Self {
            setup: Arc::new(Setup::Ready(pipeline)),
            gate,
        }
    }

    pub fn failed(reason: impl Into<String>, gate: RetryGate) -> Self {
        Self {
            setup: Arc::new(Setup::Failed(reason.into())),
            gate,
        }
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        match self.setup.as_ref() {
            Setup::Ready(pipeline) => Some(pipeline),
            Setup::Failed(_) => None,
        }
    }

    /// Why setup failed, if it did.
    pub fn setup_error(&self) -> Option<&str> {
        match self.setup.as_ref() {
            Setup::Ready(_) => None,
            Setup::Failed(reason) => Some(reason.as_str()),
        }
    }

    pub fn rule_name(&self) -> &str {
        self.pipeline().map_or("", |p| p.rule().rule_name.as_str())
    }
}
