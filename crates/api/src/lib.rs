//! Gaze Pipeline API Server
//!
//! HTTP control surface for the gaze intent pipeline: start and stop
//! tracking sessions, adjust sensitivity live, read the chat history, and
//! scrape metrics. Frames come in separately through [`ingress`].

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use action_dispatch::{
    ChatHistory, DatasetCatalog, DispatchSinks, ScrollSink, ShutdownMode, TracingScrollSink,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use tracking_session::{FrameSender, SessionHandle, SessionReport, SessionSnapshot, TrackingSession};
use uuid::Uuid;

mod error;
pub mod ingress;
mod routes;
pub mod settings;

pub use error::ApiError;
pub use settings::{AppSettings, LoggingSettings};

/// State shared across handlers and the frame ingress
pub type SharedState = Arc<RwLock<AppState>>;

/// The running session and the producer handle held on the estimator's behalf
struct ActiveSession {
    handle: SessionHandle,
    /// Dropped when the frame source ends, which ends the session's stream
    producer: Option<FrameSender>,
}

/// Application state shared across handlers
pub struct AppState {
    pub settings: AppSettings,
    pub history: Arc<ChatHistory>,
    pub catalog: Arc<DatasetCatalog>,
    pub scroll: Arc<dyn ScrollSink>,
    session: Option<ActiveSession>,
    /// Acknowledgement of the most recently stopped session
    pub last_report: Option<SessionReport>,
    pub version: String,
    pub start_time: std::time::Instant,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create application state from validated settings
    pub fn new(settings: AppSettings) -> Result<Self, ApiError> {
        let catalog = settings.catalog()?;
        Ok(Self {
            history: Arc::new(ChatHistory::new(settings.history.max_entries)),
            catalog: Arc::new(catalog),
            scroll: Arc::new(TracingScrollSink),
            settings,
            session: None,
            last_report: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        })
    }

    pub fn with_scroll_sink(mut self, scroll: Arc<dyn ScrollSink>) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Whether a session is running and still consuming frames
    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref().map(|active| &active.handle)
    }

    /// Start a new session with the current settings.
    ///
    /// A session that already ended on its own is collected first so its
    /// report is kept.
    pub async fn start_session(&mut self) -> Result<Uuid, ApiError> {
        if self.is_running() {
            return Err(ApiError::AlreadyRunning);
        }
        if let Some(previous) = self.session.take() {
            match previous.handle.stop(ShutdownMode::Drain).await {
                Ok(report) => self.last_report = Some(report),
                Err(e) => warn!("Could not collect finished session: {}", e),
            }
        }

        let sinks = DispatchSinks {
            scroll: self.scroll.clone(),
            selection: self.history.clone(),
            phrases: self.catalog.clone(),
        };
        let (handle, producer) = TrackingSession::start(
            self.settings.debounce.clone(),
            &self.settings.dispatch,
            &self.settings.session,
            sinks,
        )?;
        let id = handle.id();
        self.session = Some(ActiveSession {
            handle,
            producer: Some(producer),
        });
        Ok(id)
    }

    /// Stop the current session and keep its report
    pub async fn stop_session(&mut self, mode: ShutdownMode) -> Result<SessionReport, ApiError> {
        let ActiveSession { handle, producer } = self.session.take().ok_or(ApiError::NotRunning)?;
        drop(producer);
        let report = handle.stop(mode).await?;
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Producer for the running session, if frames are still accepted
    pub fn producer(&self) -> Option<FrameSender> {
        self.session
            .as_ref()
            .and_then(|active| active.producer.clone())
            .filter(|producer| !producer.is_stopped())
    }

    /// The frame source has gone away: release the session's producer so
    /// the session finishes once in-flight frames are processed
    pub fn end_stream(&mut self) {
        if let Some(active) = self.session.as_mut() {
            if active.producer.take().is_some() {
                info!("Frame source closed for session {}", active.handle.id());
            }
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub session: Option<SessionStatus>,
    pub dataset: String,
    pub history_len: usize,
}

/// Current session as reported by health and control endpoints
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub id: Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub running: bool,
    pub snapshot: SessionSnapshot,
}

impl SessionStatus {
    fn of(handle: &SessionHandle) -> Self {
        Self {
            id: handle.id(),
            started_at: handle.started_at(),
            running: !handle.is_finished(),
            snapshot: handle.snapshot(),
        }
    }
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/session/start", post(routes::session::start))
        .route("/api/v1/session/stop", post(routes::session::stop))
        .route("/api/v1/session/reset", post(routes::session::reset))
        .route("/api/v1/session/sensitivity", put(routes::session::sensitivity))
        .route(
            "/api/v1/history",
            get(routes::history::get_history).delete(routes::history::clear_history),
        )
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        session: state.session().map(SessionStatus::of),
        dataset: state.catalog.current().name.clone(),
        history_len: state.history.len(),
    };

    Json(response)
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), ApiError> {
    let level: Level = settings
        .level
        .parse()
        .map_err(|_| ApiError::Logging(format!("unknown log level '{}'", settings.level)))?;

    let result = if settings.json {
        let subscriber = FmtSubscriber::builder()
            .json()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };
    result.map_err(|e| ApiError::Logging(e.to_string()))
}

/// Run the server until ctrl-c
pub async fn run_server(state: SharedState) -> anyhow::Result<()> {
    let addr = state.read().await.settings.server.bind.clone();
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
