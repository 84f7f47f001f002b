//! Party service — the session coordinator for shared cursors.
//!
//! DESIGN
//! ======
//! A party is created on the first admitted connection and torn down when
//! its last connection closes. Every mutation takes the registry write lock
//! for a short, I/O-free critical section; fan-out uses `try_send` on each
//! client's bounded queue, so a slow receiver loses messages instead of
//! stalling its peers.
//!
//! LIFECYCLE
//! =========
//! 1. Admit → reply `cursors_sync`, start the sweep task if none is running
//! 2. `cursor_update` → attach identity, upsert participant, broadcast to peers
//! 3. `cursor_leave` / close / stale sweep → remove participant, broadcast `user_left`
//! 4. Last close → abort the sweep task, drop the party
//!
//! Several connections may claim the same `user_id`. Closing any one of them
//! evicts the shared participant even if the others are still live.

use std::fmt::Display;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::message::{self, ClientMessage, CursorUpdate, ServerMessage};
use crate::state::{
    AppState, ConnectedClient, ConnectionIdentity, CursorSample, DEFAULT_COLOR, DEFAULT_USER_NAME, Participant,
    PartyState, now_ms,
};

// =============================================================================
// ADMIT / CLOSE
// =============================================================================

/// Admit a connection into a party, creating the party if needed.
///
/// The connection immediately receives a `cursors_sync` snapshot on `tx`.
pub async fn admit(state: &AppState, party_id: &str, connection_id: Uuid, tx: mpsc::Sender<ServerMessage>) {
    let mut parties = state.parties.write().await;
    let party = parties.entry(party_id.to_owned()).or_insert_with(PartyState::new);

    let sync = ServerMessage::CursorsSync { cursors: party.snapshot() };
    if tx.try_send(sync).is_err() {
        warn!(%party_id, %connection_id, "party: initial sync not delivered");
    }
    party.clients.insert(connection_id, ConnectedClient::new(tx));

    if party.sweeper.is_none() {
        party.sweeper = Some(spawn_sweeper(state.clone(), party_id.to_owned()));
        debug!(%party_id, "party: sweep task started");
    }

    info!(%party_id, %connection_id, clients = party.clients.len(), "party: connection admitted");
}

/// Remove a connection from its party. Safe to call more than once.
///
/// If the connection had claimed an identity that is still tracked, peers
/// receive `user_left`. The last close tears the party down.
pub async fn close(state: &AppState, party_id: &str, connection_id: Uuid) {
    let mut parties = state.parties.write().await;
    let Some(party) = parties.get_mut(party_id) else {
        return;
    };
    let Some(client) = party.clients.remove(&connection_id) else {
        return;
    };

    if let Some(identity) = client.identity {
        if party.remove_cursor(&identity.user_id) {
            party.broadcast(&ServerMessage::UserLeft { user_id: identity.user_id.clone() }, None);
            info!(%party_id, %connection_id, user_id = %identity.user_id, "party: participant left on close");
        }
    }

    info!(%party_id, %connection_id, remaining = party.clients.len(), "party: connection closed");

    if party.clients.is_empty() {
        party.stop_sweeper();
        parties.remove(party_id);
        info!(%party_id, "party: torn down");
    }
}

/// Transport failure on a connection. Logged, then handled as a close.
pub async fn fail(state: &AppState, party_id: &str, connection_id: Uuid, error: &(dyn Display + Sync)) {
    warn!(%party_id, %connection_id, error = %error, "party: connection error");
    close(state, party_id, connection_id).await;
}

// =============================================================================
// INBOUND MESSAGES
// =============================================================================

/// Decode one inbound text payload and apply it. Malformed payloads are
/// logged and dropped; nothing is sent back to the sender.
pub async fn handle_message(state: &AppState, party_id: &str, connection_id: Uuid, text: &str) {
    let msg = match message::parse_client_message(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(%party_id, %connection_id, error = %e, "party: dropped inbound message");
            return;
        }
    };

    match msg {
        ClientMessage::CursorUpdate(update) => cursor_update(state, party_id, connection_id, update).await,
        ClientMessage::CursorLeave { user_id } => cursor_leave(state, party_id, connection_id, &user_id).await,
        ClientMessage::GetCursors => get_cursors(state, party_id, connection_id).await,
        ClientMessage::Unknown(kind) => {
            debug!(%party_id, %connection_id, %kind, "party: ignored unknown message type");
        }
    }
}

async fn cursor_update(state: &AppState, party_id: &str, connection_id: Uuid, update: CursorUpdate) {
    let mut parties = state.parties.write().await;
    let Some(party) = parties.get_mut(party_id) else {
        return;
    };
    let Some(client) = party.clients.get_mut(&connection_id) else {
        return;
    };

    let identity = ConnectionIdentity {
        user_id: update.user_id,
        user_name: update.user_name.unwrap_or_else(|| DEFAULT_USER_NAME.to_owned()),
        color: update.color.unwrap_or_else(|| DEFAULT_COLOR.to_owned()),
    };
    client.identity = Some(identity.clone());

    party.cursors.insert(
        identity.user_id.clone(),
        Participant {
            user_id: identity.user_id.clone(),
            user_name: identity.user_name.clone(),
            color: identity.color.clone(),
            cursor: Some(CursorSample { x: update.x, y: update.y, pointer: update.pointer }),
            last_seen_ms: now_ms(),
            last_seen: Instant::now(),
        },
    );

    let relay = ServerMessage::CursorUpdate {
        user_id: identity.user_id,
        user_name: identity.user_name,
        color: identity.color,
        x: update.x,
        y: update.y,
        pointer: update.pointer,
    };
    party.broadcast(&relay, Some(connection_id));
}

async fn cursor_leave(state: &AppState, party_id: &str, connection_id: Uuid, user_id: &str) {
    let mut parties = state.parties.write().await;
    let Some(party) = parties.get_mut(party_id) else {
        return;
    };
    if !party.clients.contains_key(&connection_id) {
        return;
    }

    if party.remove_cursor(user_id) {
        party.broadcast(&ServerMessage::UserLeft { user_id: user_id.to_owned() }, Some(connection_id));
        info!(%party_id, %connection_id, %user_id, "party: participant left");
    }
}

async fn get_cursors(state: &AppState, party_id: &str, connection_id: Uuid) {
    let parties = state.parties.read().await;
    let Some(party) = parties.get(party_id) else {
        return;
    };
    let sync = ServerMessage::CursorsSync { cursors: party.snapshot() };
    if !party.send_to(connection_id, sync) {
        debug!(%party_id, %connection_id, "party: sync reply not delivered");
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Current participants of a party. Empty for an unknown party.
pub async fn snapshot(state: &AppState, party_id: &str) -> Vec<Participant> {
    let parties = state.parties.read().await;
    parties.get(party_id).map(PartyState::snapshot).unwrap_or_default()
}

// =============================================================================
// SWEEP
// =============================================================================

/// Evict participants idle beyond the configured window. Each eviction is
/// broadcast as its own `user_left` to every connection. Returns the number
/// of evicted participants.
pub async fn sweep(state: &AppState, party_id: &str) -> usize {
    let now = Instant::now();
    let mut parties = state.parties.write().await;
    let Some(party) = parties.get_mut(party_id) else {
        return 0;
    };

    let evicted = party.evict_stale(now, state.config.stale_after);
    for user_id in evicted.iter().cloned() {
        info!(%party_id, %user_id, "party: evicted stale participant");
        party.broadcast(&ServerMessage::UserLeft { user_id }, None);
    }
    evicted.len()
}

/// Spawn the periodic sweep for one party. The first pass runs one full
/// interval after activation. The task runs until aborted by teardown.
fn spawn_sweeper(state: AppState, party_id: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = state.config.sweep_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            sweep(&state, &party_id).await;
        }
    })
}

#[cfg(test)]
#[path = "party_test.rs"]
mod tests;
