//! Session Control Routes

use action_dispatch::ShutdownMode;
use axum::{
    extract::{Query, State},
    Json,
};
use gaze_debounce::config::validate_sensitivity;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracking_session::{SessionError, SessionReport};

use crate::{ApiError, SessionStatus, SharedState};

/// Response for start and reset
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionStatus,
}

/// Query parameters for stop endpoint
#[derive(Debug, Deserialize)]
pub struct StopQuery {
    #[serde(default)]
    pub mode: ShutdownMode,
}

/// Partial sensitivity update
#[derive(Debug, Deserialize)]
pub struct SensitivityUpdate {
    pub direction: Option<f64>,
    pub blink: Option<f64>,
}

/// Sensitivities now in effect
#[derive(Debug, Serialize)]
pub struct SensitivityResponse {
    pub direction: f64,
    pub blink: f64,
    pub session: Option<SessionStatus>,
}

/// Start a tracking session with the current settings
pub async fn start(State(state): State<SharedState>) -> Result<Json<SessionResponse>, ApiError> {
    let mut state = state.write().await;
    state.start_session().await?;
    let handle = state.session().ok_or(ApiError::NotRunning)?;
    Ok(Json(SessionResponse {
        session: SessionStatus::of(handle),
    }))
}

/// Stop the running session; `?mode=drain` (default) or `?mode=discard`
pub async fn stop(
    State(state): State<SharedState>,
    Query(params): Query<StopQuery>,
) -> Result<Json<SessionReport>, ApiError> {
    let mut state = state.write().await;
    let report = state.stop_session(params.mode).await?;
    Ok(Json(report))
}

/// Recalibrate the running session
pub async fn reset(State(state): State<SharedState>) -> Result<Json<SessionResponse>, ApiError> {
    let state = state.read().await;
    if !state.is_running() {
        return Err(ApiError::NotRunning);
    }
    let handle = state.session().ok_or(ApiError::NotRunning)?;
    handle.reset().await?;
    info!("Session {} recalibrated", handle.id());
    Ok(Json(SessionResponse {
        session: SessionStatus::of(handle),
    }))
}

/// Adjust sensitivities. Values are kept in the settings for later sessions
/// and applied to the running one.
pub async fn sensitivity(
    State(state): State<SharedState>,
    Json(update): Json<SensitivityUpdate>,
) -> Result<Json<SensitivityResponse>, ApiError> {
    // Validate the whole update before applying any of it
    if let Some(value) = update.direction {
        validate_sensitivity("direction", value).map_err(SessionError::from)?;
    }
    if let Some(value) = update.blink {
        validate_sensitivity("blink", value).map_err(SessionError::from)?;
    }

    // The running session goes first so a rejected update is not persisted
    let mut state = state.write().await;
    if state.is_running() {
        if let Some(handle) = state.session() {
            if let Some(value) = update.direction {
                handle.set_direction_sensitivity(value).await?;
            }
            if let Some(value) = update.blink {
                handle.set_blink_sensitivity(value).await?;
            }
        }
    }

    if let Some(value) = update.direction {
        state.settings.debounce.direction_sensitivity = value;
    }
    if let Some(value) = update.blink {
        state.settings.debounce.blink_sensitivity = value;
    }

    Ok(Json(SensitivityResponse {
        direction: state.settings.debounce.direction_sensitivity,
        blink: state.settings.debounce.blink_sensitivity,
        session: state.session().map(SessionStatus::of),
    }))
}
