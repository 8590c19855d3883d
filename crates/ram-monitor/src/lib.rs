//! # ram-monitor — Real-time Asset Monitor Service
//!
//! Evaluates one deployed compliance rule against every asset change event
//! and publishes the evidence. Each event is independent; the only shared
//! resource is the hierarchy cache, read without locking.
//!
//! ## Flow
//!
//! ```text
//! RetryGate → DocumentEnricher → PolicyEvaluationAdapter
//!           → ViolationExtractor → decide → EvidencePublisher
//! ```
//!
//! ## HTTP Surface
//!
//! | Route                  | Module          | Purpose                |
//! |------------------------|-----------------|------------------------|
//! | `POST /`               | [`push`]        | change-event delivery  |
//! | `GET /health/liveness` | this module     | process is up          |
//! | `GET /health/readiness`| this module     | setup succeeded        |

pub mod bootstrap;
pub mod config;
pub mod enrich;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod push;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use config::{ConfigError, MonitorConfig};
pub use enrich::{DocumentEnricher, EnrichError};
pub use error::PipelineError;
pub use gate::{Admission, RetryGate, SkipReason};
pub use pipeline::{InvocationOutcome, Pipeline};

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let push = Router::new()
        .route("/", post(push::receive))
        .layer(TraceLayer::new_for_http());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(health).merge(push).with_state(state)
}

/// Liveness probe: always 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 503 when one-time setup failed.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.setup_error() {
        None => (StatusCode::OK, "ready"),
        Some(_) => (StatusCode::SERVICE_UNAVAILABLE, "setup failed"),
    }
}
