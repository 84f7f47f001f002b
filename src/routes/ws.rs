//! WebSocket handler — one connection bound to one party.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection ID, admits it into the party, and
//! enters a `select!` loop:
//! - Incoming client text → `services::party::handle_message`
//! - Relay messages queued by the party → forward to client
//!
//! The handler never touches party state directly; every transition goes
//! through the party service.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → admit → client receives `cursors_sync`
//! 2. Client text frames → party service
//! 3. Close frame or stream end → `close`; transport error → `fail`

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::message::ServerMessage;
use crate::services;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Path(party_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, party_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, party_id: String) {
    let connection_id = Uuid::new_v4();

    // Per-connection queue for relay messages from the party.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerMessage>(state.config.client_queue_capacity);

    services::party::admit(&state, &party_id, connection_id, client_tx).await;
    info!(%party_id, %connection_id, "ws: client connected");

    let mut failure: Option<axum::Error> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                };
                match msg {
                    Message::Text(text) => {
                        services::party::handle_message(&state, &party_id, connection_id, text.as_str()).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(outbound) = client_rx.recv() => {
                if let Err(e) = send_message(&mut socket, &outbound).await {
                    failure = Some(e);
                    break;
                }
            }
        }
    }

    match failure {
        Some(e) => services::party::fail(&state, &party_id, connection_id, &e).await,
        None => services::party::close(&state, &party_id, connection_id).await,
    }
    info!(%party_id, %connection_id, "ws: client disconnected");
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = match message.to_json() {
        Ok(j) => j,
        Err(e) => {
            warn!(kind = message.kind(), error = %e, "ws: failed to serialize message");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
