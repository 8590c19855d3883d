//! # Monitor Bootstrap
//!
//! One-time setup, run before the listener starts:
//!
//! 1. **HTTP client**: shared, with the bearer token as a default header.
//! 2. **Rule catalog**: load modules and constraints from the rules directory.
//! 3. **Engine**: compile every module once so syntax errors surface here.
//! 4. **Collaborators**: hierarchy cache, live directory, evidence channels.
//!
//! A failure in any step is recorded on [`AppState`] rather than aborting
//! the process. Deliveries are then consumed as permanent skips: retrying
//! an event cannot repair a broken catalog, only a cold restart can.

use std::sync::Arc;
use std::time::Duration;

use ram_hierarchy::{DocumentStoreClient, HierarchyResolver, ResourceManagerClient};
use ram_publish::{EvidencePublisher, PubSubClient};
use ram_rules::{
    CatalogError, EngineError, PolicyEvaluationAdapter, RegoEngine, RuleCatalog,
    ViolationExtractor,
};

use crate::config::MonitorConfig;
use crate::enrich::DocumentEnricher;
use crate::gate::RetryGate;
use crate::pipeline::Pipeline;
use crate::state::AppState;

/// Errors during one-time setup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("access token is not a valid header value")]
    InvalidToken,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("rule catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("rule engine: {0}")]
    Engine(#[from] EngineError),

    #[error("work directory {path}: {source}")]
    WorkDir {
        path: String,
        source: std::io::Error,
    },
}

/// Run one-time setup and wrap the outcome in [`AppState`].
pub fn initialize(config: &MonitorConfig) -> AppState {
    let gate = RetryGate::new(config.retry_window);
    match build_pipeline(config) {
        Ok(pipeline) => {
            tracing::info!(
                rule_name = %config.rule_name,
                environment = %config.environment,
                rule_deployment_time = %config.rule_deployment_time,
                "monitor ready"
            );
            AppState::ready(pipeline, gate)
        }
        Err(e) => {
            tracing::error!(error = %e, "monitor setup failed, all deliveries will be dropped");
            AppState::failed(e.to_string(), gate)
        }
    }
}

/// Build the pipeline from configuration.
pub fn build_pipeline(config: &MonitorConfig) -> Result<Pipeline, BootstrapError> {
    let http = http_client(config)?;

    let catalog = Arc::new(RuleCatalog::load(&config.rules_dir)?);
    let engine = RegoEngine::new(catalog.clone())?;

    std::fs::create_dir_all(&config.work_dir).map_err(|e| BootstrapError::WorkDir {
        path: config.work_dir.display().to_string(),
        source: e,
    })?;

    let resolver = HierarchyResolver::new(
        Arc::new(DocumentStoreClient::new(
            http.clone(),
            config.cache_url.clone(),
            config.cache_collection.clone(),
        )),
        Arc::new(ResourceManagerClient::new(
            http.clone(),
            config.directory_url.clone(),
        )),
        config.resolver_config(),
    );
    let sink = PubSubClient::new(http, config.pubsub_url.clone(), config.project_id.clone());
    let rule = config.rule_context();

    Ok(Pipeline::new(
        DocumentEnricher::new(
            resolver,
            config.owner_label_key.clone(),
            config.violation_resolver_label_key.clone(),
        ),
        PolicyEvaluationAdapter::new(Arc::new(engine)),
        ViolationExtractor::new(rule.clone(), catalog.modules_source().clone()),
        EvidencePublisher::new(
            Arc::new(sink),
            config.status_topic.clone(),
            config.violation_topic.clone(),
        ),
        rule,
        config.work_dir.clone(),
    ))
}

fn http_client(config: &MonitorConfig) -> Result<reqwest::Client, BootstrapError> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(token) = &config.access_token {
        let mut value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
            .map_err(|_| BootstrapError::InvalidToken)?;
        value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, value);
    }
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .default_headers(headers)
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = "package validator.gcp.lib\n\naudit := []\n";

    fn rules_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib").join("audit.rego"), MODULE).unwrap();
        dir
    }

    #[test]
    fn valid_catalog_yields_ready_state() {
        let rules = rules_dir();
        let work = tempfile::tempdir().unwrap();
        let config =
            MonitorConfig::local("http://127.0.0.1:1", rules.path(), work.path().join("w")).unwrap();
        let state = initialize(&config);
        assert!(state.setup_error().is_none());
        assert_eq!(state.rule_name(), "require_owner");
        assert!(work.path().join("w").is_dir());
    }

    #[test]
    fn missing_catalog_is_recorded_not_fatal() {
        let work = tempfile::tempdir().unwrap();
        let config =
            MonitorConfig::local("http://127.0.0.1:1", "/nonexistent/rules", work.path()).unwrap();
        let state = initialize(&config);
        assert!(state.pipeline().is_none());
        assert!(state.setup_error().unwrap().contains("rule catalog"));
    }

    #[test]
    fn broken_module_is_recorded_not_fatal() {
        let rules = tempfile::tempdir().unwrap();
        std::fs::write(rules.path().join("broken.rego"), "package p\n\nallow {{{").unwrap();
        let work = tempfile::tempdir().unwrap();
        let config = MonitorConfig::local("http://127.0.0.1:1", rules.path(), work.path()).unwrap();
        assert!(initialize(&config).setup_error().is_some());
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let mut config = MonitorConfig::local("http://127.0.0.1:1", "rules", "/tmp").unwrap();
        config.access_token = Some(zeroize::Zeroizing::new("bad\ntoken".to_string()));
        assert!(matches!(http_client(&config), Err(BootstrapError::InvalidToken)));
    }
}
