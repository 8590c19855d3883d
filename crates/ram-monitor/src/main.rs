//! # ram-monitor — Binary Entry Point
//!
//! Starts the push-delivery listener for one deployed rule.
//! Binds to configurable port (default 8080).

use anyhow::Context;
use ram_monitor::MonitorConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("RAM_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = MonitorConfig::from_env().context("invalid monitor configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let state = ram_monitor::bootstrap::initialize(&config);
    let app = ram_monitor::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("RAM monitor listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
