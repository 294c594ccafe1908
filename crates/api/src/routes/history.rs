//! Chat History Routes

use action_dispatch::ChatEntry;
use axum::{extract::State, Json};
use serde::Serialize;

use crate::SharedState;

/// Response for history endpoint
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Newest first
    pub entries: Vec<ChatEntry>,
    pub count: usize,
    /// Transcript as shown in the chat pane
    pub transcript: String,
    pub dataset: String,
}

/// Get the chat history
pub async fn get_history(State(state): State<SharedState>) -> Json<HistoryResponse> {
    let state = state.read().await;
    let entries = state.history.entries();

    Json(HistoryResponse {
        count: entries.len(),
        entries,
        transcript: state.history.render(),
        dataset: state.catalog.current().name.clone(),
    })
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

/// Clear the chat history
pub async fn clear_history(State(state): State<SharedState>) -> Json<ClearResponse> {
    let state = state.read().await;
    let cleared = state.history.len();
    state.history.clear();
    Json(ClearResponse { cleared })
}
