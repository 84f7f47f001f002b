//! Party snapshot route — pull current cursors without a websocket.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;

use crate::services;
use crate::state::{AppState, Participant};

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub cursors: Vec<Participant>,
}

/// `GET /parties/{party_id}`. Read-only; an unknown party is empty.
pub async fn snapshot(State(state): State<AppState>, Path(party_id): Path<String>) -> Json<SnapshotResponse> {
    let cursors = services::party::snapshot(&state, &party_id).await;
    Json(SnapshotResponse { cursors })
}

/// Any non-`GET` method on a party resource.
pub async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
