//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the relay config and a map of live parties. Each party owns its
//! participant map, its connected clients, and the handle of its sweep task.
//! Nothing outside `services::party` mutates a `PartyState`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::message::ServerMessage;

/// Display label used when a participant does not send one.
pub const DEFAULT_USER_NAME: &str = "Anonymous";

/// Display color used when a participant does not send one.
pub const DEFAULT_COLOR: &str = "#3b82f6";

// =============================================================================
// PARTICIPANT
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
}

impl PointerKind {
    /// Lenient wire mapping: anything other than `"touch"` is a mouse.
    #[must_use]
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("touch") => Self::Touch,
            _ => Self::Mouse,
        }
    }
}

/// Last reported pointer sample for a participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CursorSample {
    pub x: f64,
    pub y: f64,
    pub pointer: PointerKind,
}

/// A tracked human identity with its last-known cursor, scoped to one party.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub user_name: String,
    pub color: String,
    pub cursor: Option<CursorSample>,
    /// Wall-clock time of the last accepted update, in Unix epoch ms.
    #[serde(rename = "lastSeen")]
    pub last_seen_ms: i64,
    /// Monotonic time of the last accepted update. Drives staleness.
    #[serde(skip)]
    pub last_seen: Instant,
}

impl Participant {
    #[must_use]
    pub fn is_stale(&self, now: Instant, stale_after: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > stale_after
    }
}

/// Current time as milliseconds since Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// CONNECTION
// =============================================================================

/// Identity a connection has claimed through its most recent cursor update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionIdentity {
    pub user_id: String,
    pub user_name: String,
    pub color: String,
}

/// One live transport channel attached to a party.
pub struct ConnectedClient {
    /// Outbound queue drained by the websocket task.
    pub tx: mpsc::Sender<ServerMessage>,
    /// `None` until the first accepted `cursor_update`.
    pub identity: Option<ConnectionIdentity>,
}

impl ConnectedClient {
    #[must_use]
    pub fn new(tx: mpsc::Sender<ServerMessage>) -> Self {
        Self { tx, identity: None }
    }
}

// =============================================================================
// PARTY STATE
// =============================================================================

/// Per-party live state. Exists only while at least one client is connected.
pub struct PartyState {
    /// Tracked participants keyed by `user_id`.
    pub cursors: HashMap<String, Participant>,
    /// Connected clients keyed by connection id.
    pub clients: HashMap<Uuid, ConnectedClient>,
    /// Periodic stale sweep. `Some` while the party has clients.
    pub sweeper: Option<JoinHandle<()>>,
}

impl PartyState {
    #[must_use]
    pub fn new() -> Self {
        Self { cursors: HashMap::new(), clients: HashMap::new(), sweeper: None }
    }

    /// Copy of every tracked participant.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Participant> {
        self.cursors.values().cloned().collect()
    }

    /// Remove a participant. Returns whether one was tracked.
    pub fn remove_cursor(&mut self, user_id: &str) -> bool {
        self.cursors.remove(user_id).is_some()
    }

    /// Remove every participant idle for longer than `stale_after` and
    /// return their ids.
    pub fn evict_stale(&mut self, now: Instant, stale_after: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .cursors
            .values()
            .filter(|p| p.is_stale(now, stale_after))
            .map(|p| p.user_id.clone())
            .collect();
        for user_id in &stale {
            self.cursors.remove(user_id);
        }
        stale
    }

    /// Queue a message for one client. Best-effort.
    pub fn send_to(&self, connection_id: Uuid, message: ServerMessage) -> bool {
        self.clients
            .get(&connection_id)
            .is_some_and(|client| client.tx.try_send(message).is_ok())
    }

    /// Queue a message for every client, optionally excluding one.
    pub fn broadcast(&self, message: &ServerMessage, exclude: Option<Uuid>) {
        for (connection_id, client) in &self.clients {
            if exclude == Some(*connection_id) {
                continue;
            }
            // Best-effort: if a client's queue is full or closed, skip it.
            let _ = client.tx.try_send(message.clone());
        }
    }

    /// Abort the sweep task if one is running. Safe to call repeatedly.
    pub fn stop_sweeper(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

impl Default for PartyState {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PartyState {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    /// Live parties keyed by party id.
    pub parties: Arc<RwLock<HashMap<String, PartyState>>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self { config: Arc::new(config), parties: Arc::new(RwLock::new(HashMap::new())) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Create a test `AppState` with default timings.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(RelayConfig::default())
    }

    /// Create a test `AppState` with custom sweep timings.
    #[must_use]
    pub fn test_app_state_with_timings(sweep_interval: Duration, stale_after: Duration) -> AppState {
        AppState::new(RelayConfig { sweep_interval, stale_after, ..RelayConfig::default() })
    }

    /// Create a participant last seen at `last_seen`.
    #[must_use]
    pub fn dummy_participant(user_id: &str, last_seen: Instant) -> Participant {
        Participant {
            user_id: user_id.to_owned(),
            user_name: "Test User".into(),
            color: "#ff0000".into(),
            cursor: Some(CursorSample { x: 1.0, y: 2.0, pointer: PointerKind::Mouse }),
            last_seen_ms: now_ms(),
            last_seen,
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
