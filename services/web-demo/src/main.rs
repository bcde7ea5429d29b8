use std::sync::Arc;

use anyhow::{Context, Result};
use bear_classifier::Classifier;
use tracing::info;

mod config;
mod page;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = config::DemoConfig::from_env();
    info!(?cfg, "config loaded");

    // Fatal before binding: a server with no model has nothing to serve.
    let classifier =
        Classifier::load(&cfg.classifier()).context("loading the model artifact failed")?;

    let state = routes::AppState::new(Arc::new(classifier), cfg.example_image.clone());
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    routes::mark_ready();
    info!(addr = %cfg.bind, "serving");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shutdown");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
