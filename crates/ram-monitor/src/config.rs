//! Monitor configuration.
//!
//! Read once at process start. Defaults point at production endpoints;
//! override via environment variables or [`MonitorConfig::local`] for tests.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ram_core::RuleContext;
use ram_hierarchy::ResolverConfig;
use url::Url;
use zeroize::Zeroizing;

/// Process-wide configuration for one deployed rule.
///
/// Custom `Debug` implementation redacts the `access_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct MonitorConfig {
    pub rule_name: String,
    /// Project the monitor runs in; also the project owning the topics.
    pub project_id: String,
    pub environment: String,
    pub rule_deployment_time: DateTime<Utc>,
    pub owner_label_key: String,
    pub violation_resolver_label_key: String,
    pub status_topic: String,
    pub violation_topic: String,
    pub retry_window: Duration,
    pub rules_dir: PathBuf,
    /// Root for per-invocation working documents.
    pub work_dir: PathBuf,
    pub pubsub_url: Url,
    pub cache_url: Url,
    pub cache_collection: String,
    pub cache_max_attempts: u32,
    pub cache_backoff: Duration,
    pub directory_url: Url,
    /// Bearer token for outbound calls. Absent means unauthenticated.
    pub access_token: Option<Zeroizing<String>>,
    pub timeout_secs: u64,
    pub port: u16,
}

impl std::fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("rule_name", &self.rule_name)
            .field("project_id", &self.project_id)
            .field("environment", &self.environment)
            .field("rule_deployment_time", &self.rule_deployment_time)
            .field("owner_label_key", &self.owner_label_key)
            .field("violation_resolver_label_key", &self.violation_resolver_label_key)
            .field("status_topic", &self.status_topic)
            .field("violation_topic", &self.violation_topic)
            .field("retry_window", &self.retry_window)
            .field("rules_dir", &self.rules_dir)
            .field("work_dir", &self.work_dir)
            .field("pubsub_url", &self.pubsub_url)
            .field("cache_url", &self.cache_url)
            .field("cache_collection", &self.cache_collection)
            .field("cache_max_attempts", &self.cache_max_attempts)
            .field("cache_backoff", &self.cache_backoff)
            .field("directory_url", &self.directory_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("port", &self.port)
            .finish()
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `RAM_RULE_NAME` (required)
    /// - `RAM_PROJECT_ID` (required)
    /// - `RAM_CACHE_URL` (required)
    /// - `RAM_RULE_DEPLOYMENT_TIME` (required, RFC 3339)
    /// - `RAM_ENVIRONMENT` (default: `dev`)
    /// - `RAM_OWNER_LABEL_KEY` (default: `owner`)
    /// - `RAM_VIOLATION_RESOLVER_LABEL_KEY` (default: `violation_resolver`)
    /// - `RAM_STATUS_TOPIC` (default: `ram-compliance-status`)
    /// - `RAM_VIOLATION_TOPIC` (default: `ram-violations`)
    /// - `RAM_RETRY_WINDOW_SECS` (default: 600)
    /// - `RAM_RULES_DIR` (default: `rules`)
    /// - `RAM_WORK_DIR` (default: `/tmp/ram`)
    /// - `RAM_PUBSUB_URL` (default: `https://pubsub.googleapis.com`)
    /// - `RAM_CACHE_COLLECTION` (default: `assets`)
    /// - `RAM_CACHE_MAX_ATTEMPTS` (default: 5)
    /// - `RAM_CACHE_BACKOFF_MS` (default: 100)
    /// - `RAM_DIRECTORY_URL` (default: `https://cloudresourcemanager.googleapis.com`)
    /// - `RAM_ACCESS_TOKEN` (optional)
    /// - `RAM_TIMEOUT_SECS` (default: 30)
    /// - `PORT` (default: 8080)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup: &lookup };

        Ok(Self {
            rule_name: env.required("RAM_RULE_NAME")?,
            project_id: env.required("RAM_PROJECT_ID")?,
            environment: env.or("RAM_ENVIRONMENT", "dev"),
            rule_deployment_time: env.timestamp("RAM_RULE_DEPLOYMENT_TIME")?,
            owner_label_key: env.or("RAM_OWNER_LABEL_KEY", "owner"),
            violation_resolver_label_key: env
                .or("RAM_VIOLATION_RESOLVER_LABEL_KEY", "violation_resolver"),
            status_topic: env.or("RAM_STATUS_TOPIC", "ram-compliance-status"),
            violation_topic: env.or("RAM_VIOLATION_TOPIC", "ram-violations"),
            retry_window: Duration::from_secs(env.parse("RAM_RETRY_WINDOW_SECS", 600)?),
            rules_dir: PathBuf::from(env.or("RAM_RULES_DIR", "rules")),
            work_dir: PathBuf::from(env.or("RAM_WORK_DIR", "/tmp/ram")),
            pubsub_url: env.url("RAM_PUBSUB_URL", Some("https://pubsub.googleapis.com"))?,
            cache_url: env.url("RAM_CACHE_URL", None)?,
            cache_collection: env.or("RAM_CACHE_COLLECTION", "assets"),
            cache_max_attempts: env.parse("RAM_CACHE_MAX_ATTEMPTS", 5)?,
            cache_backoff: Duration::from_millis(env.parse("RAM_CACHE_BACKOFF_MS", 100)?),
            directory_url: env.url(
                "RAM_DIRECTORY_URL",
                Some("https://cloudresourcemanager.googleapis.com"),
            )?,
            access_token: env
                .get("RAM_ACCESS_TOKEN")
                .filter(|t| !t.is_empty())
                .map(Zeroizing::new),
            timeout_secs: env.parse("RAM_TIMEOUT_SECS", 30)?,
            port: env.parse("PORT", 8080)?,
        })
    }

    /// Configuration pointing every collaborator at `base` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `base` cannot be parsed.
    pub fn local(
        base: &str,
        rules_dir: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let url = Url::parse(base).map_err(|e| ConfigError::InvalidUrl("base", e.to_string()))?;
        Ok(Self {
            rule_name: "require_owner".to_string(),
            project_id: "ram-local".to_string(),
            environment: "test".to_string(),
            rule_deployment_time: DateTime::<Utc>::default(),
            owner_label_key: "owner".to_string(),
            violation_resolver_label_key: "violation_resolver".to_string(),
            status_topic: "ram-compliance-status".to_string(),
            violation_topic: "ram-violations".to_string(),
            retry_window: Duration::from_secs(600),
            rules_dir: rules_dir.into(),
            work_dir: work_dir.into(),
            pubsub_url: url.clone(),
            cache_url: url.clone(),
            cache_collection: "assets".to_string(),
            cache_max_attempts: 2,
            cache_backoff: Duration::ZERO,
            directory_url: url,
            access_token: None,
            timeout_secs: 5,
            port: 0,
        })
    }

    /// Identity stamped on every evidence record.
    pub fn rule_context(&self) -> RuleContext {
        RuleContext {
            rule_name: self.rule_name.clone(),
            project_context: self.project_id.clone(),
            environment: self.environment.clone(),
            deployment_time: self.rule_deployment_time,
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_attempts: self.cache_max_attempts,
            backoff_step: self.cache_backoff,
        }
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
    }

    fn or(&self, var: &str, default: &str) -> String {
        self.get(var).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.get(var)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(var))
    }

    /// Part of every idempotency key, so it must come from the deployment
    /// and never from the clock.
    fn timestamp(&self, var: &'static str) -> Result<DateTime<Utc>, ConfigError> {
        let raw = self.required(var)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| ConfigError::Invalid { var, value: raw })
    }

    fn parse<T: FromStr>(&self, var: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(var) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid { var, value: raw }),
            None => Ok(default),
        }
    }

    fn url(&self, var: &'static str, default: Option<&str>) -> Result<Url, ConfigError> {
        let raw = match (self.get(var), default) {
            (Some(raw), _) => raw,
            (None, Some(default)) => default.to_string(),
            (None, None) => return Err(ConfigError::Missing(var)),
        };
        Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var, e.to_string()))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("RAM_RULE_NAME", "require_owner"),
        ("RAM_PROJECT_ID", "ram-prod"),
        ("RAM_RULE_DEPLOYMENT_TIME", "2026-01-01T00:00:00Z"),
        ("RAM_CACHE_URL", "https://firestore.example.com/v1"),
    ];

    fn required_without(var: &str) -> Vec<(&'static str, &'static str)> {
        REQUIRED.iter().copied().filter(|(k, _)| *k != var).collect()
    }

    #[test]
    fn defaults_apply_when_only_required_vars_set() {
        let cfg = MonitorConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.environment, "dev");
        assert_eq!(cfg.owner_label_key, "owner");
        assert_eq!(cfg.violation_resolver_label_key, "violation_resolver");
        assert_eq!(cfg.status_topic, "ram-compliance-status");
        assert_eq!(cfg.violation_topic, "ram-violations");
        assert_eq!(cfg.retry_window, Duration::from_secs(600));
        assert_eq!(cfg.cache_max_attempts, 5);
        assert_eq!(cfg.cache_backoff, Duration::from_millis(100));
        assert_eq!(cfg.pubsub_url.as_str(), "https://pubsub.googleapis.com/");
        assert!(cfg.access_token.is_none());
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn missing_rule_name_is_an_error() {
        let err = MonitorConfig::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("RAM_RULE_NAME")));
    }

    #[test]
    fn missing_cache_url_is_an_error() {
        let err = MonitorConfig::from_lookup(lookup(&required_without("RAM_CACHE_URL"))).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("RAM_CACHE_URL")));
    }

    #[test]
    fn deployment_time_is_parsed_from_rfc3339() {
        let cfg = MonitorConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.rule_context().deployment_time.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn missing_deployment_time_is_an_error() {
        let vars = required_without("RAM_RULE_DEPLOYMENT_TIME");
        let err = MonitorConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("RAM_RULE_DEPLOYMENT_TIME")));
    }

    #[test]
    fn malformed_deployment_time_is_invalid() {
        let mut vars = required_without("RAM_RULE_DEPLOYMENT_TIME");
        vars.push(("RAM_RULE_DEPLOYMENT_TIME", "yesterday"));
        let err = MonitorConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "RAM_RULE_DEPLOYMENT_TIME", .. }));
    }

    #[test]
    fn identical_environments_yield_identical_rule_identity() {
        let first = MonitorConfig::from_lookup(lookup(&REQUIRED)).unwrap().rule_context();
        std::thread::sleep(Duration::from_millis(5));
        let second = MonitorConfig::from_lookup(lookup(&REQUIRED)).unwrap().rule_context();
        assert_eq!(first, second);
    }

    #[test]
    fn non_numeric_window_is_invalid() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("RAM_RETRY_WINDOW_SECS", "ten minutes"));
        let err = MonitorConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "RAM_RETRY_WINDOW_SECS", .. }));
    }

    #[test]
    fn debug_redacts_access_token() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("RAM_ACCESS_TOKEN", "super-secret"));
        let cfg = MonitorConfig::from_lookup(lookup(&vars)).unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn local_config_points_at_base() {
        let cfg = MonitorConfig::local("http://127.0.0.1:9000", "rules", "/tmp/w").unwrap();
        assert_eq!(cfg.cache_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(cfg.directory_url, cfg.pubsub_url);
        assert_eq!(cfg.resolver_config().backoff_step, Duration::ZERO);
    }
}
