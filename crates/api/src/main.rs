//! Gaze Intent Pipeline - Main Entry Point
//!
//! Usage: `gaze-pipeline [settings.toml]`. Frames are read as JSON lines
//! from stdin; the control API listens on the configured address.

use action_dispatch::ShutdownMode;
use anyhow::Context;
use api::{ingress, init_logging, run_server, AppSettings, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let settings = AppSettings::load(path.as_deref()).context("Failed to load settings")?;

    init_logging(&settings.logging)?;
    settings.validate()?;

    info!("=== Gaze Intent Pipeline v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Strategy {:?}, window {}, cooldown {}s",
        settings.debounce.strategy, settings.debounce.window_capacity, settings.debounce.cooldown_seconds
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    let autostart = settings.autostart;
    let state = Arc::new(RwLock::new(AppState::new(settings)?.with_metrics(metrics)));

    if autostart {
        let id = state.write().await.start_session().await?;
        info!("Autostarted session {}", id);
    }

    let ingress_state = state.clone();
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = ingress::feed_lines(stdin, ingress_state).await {
            error!("Frame ingress failed: {}", e);
        }
    });

    run_server(state.clone()).await?;

    let mut state = state.write().await;
    if state.session().is_some() {
        match state.stop_session(ShutdownMode::Drain).await {
            Ok(report) => info!(
                "Final session {}: {} frames, {} events",
                report.id, report.engine.frames_processed, report.engine.events_emitted
            ),
            Err(e) => warn!("Session did not stop cleanly: {}", e),
        }
    }

    Ok(())
}
