//! API error types

use action_dispatch::DispatchError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracking_session::SessionError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("A tracking session is already running")]
    AlreadyRunning,

    #[error("No tracking session is running")]
    NotRunning,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AlreadyRunning | ApiError::NotRunning => StatusCode::CONFLICT,
            ApiError::Session(e) => match e {
                SessionError::Config(_)
                | SessionError::InvalidFrameBuffer(_)
                | SessionError::Dispatch(DispatchError::InvalidBacklog(_))
                | SessionError::Dispatch(DispatchError::EmptyCatalog) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                SessionError::Stopped => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Settings(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Logging(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
