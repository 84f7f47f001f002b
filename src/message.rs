//! Relay wire messages.
//!
//! ARCHITECTURE
//! ============
//! Every message is a UTF-8 JSON object carrying a `type` discriminator.
//! Inbound decoding is deliberately lenient: only the fields an operation
//! needs are validated, everything else is ignored. A payload that fails
//! validation becomes a `MessageError` that the caller logs and drops.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{Participant, PointerKind};

// =============================================================================
// INBOUND
// =============================================================================

/// Validated client → relay message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    CursorUpdate(CursorUpdate),
    CursorLeave { user_id: String },
    GetCursors,
    /// Unrecognized `type`. Carried so callers can log it.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CursorUpdate {
    pub user_id: String,
    pub user_name: Option<String>,
    pub color: Option<String>,
    pub x: f64,
    pub y: f64,
    pub pointer: PointerKind,
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{kind}: missing or invalid field `{field}`")]
    InvalidField { kind: &'static str, field: &'static str },
}

/// Raw envelope. Field types are checked per message kind, not here, so a
/// `get_cursors` carrying junk fields still decodes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    user_id: Option<Value>,
    user_name: Option<Value>,
    color: Option<Value>,
    x: Option<Value>,
    y: Option<Value>,
    pointer: Option<Value>,
}

/// Decode and validate one inbound text payload.
///
/// # Errors
///
/// Returns `MessageError::Json` if the payload is not a JSON object with a
/// string `type`, or `MessageError::InvalidField` if a known message kind is
/// missing a required field.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, MessageError> {
    let env: Envelope = serde_json::from_str(text)?;

    match env.kind.as_str() {
        "cursor_update" => {
            const KIND: &str = "cursor_update";
            let user_id = required_user_id(env.user_id.as_ref(), KIND)?;
            let x = number(env.x.as_ref()).ok_or(MessageError::InvalidField { kind: KIND, field: "x" })?;
            let y = number(env.y.as_ref()).ok_or(MessageError::InvalidField { kind: KIND, field: "y" })?;
            Ok(ClientMessage::CursorUpdate(CursorUpdate {
                user_id,
                user_name: string(env.user_name.as_ref()),
                color: string(env.color.as_ref()),
                x,
                y,
                pointer: PointerKind::from_wire(env.pointer.as_ref().and_then(Value::as_str)),
            }))
        }
        "cursor_leave" => {
            let user_id = required_user_id(env.user_id.as_ref(), "cursor_leave")?;
            Ok(ClientMessage::CursorLeave { user_id })
        }
        "get_cursors" => Ok(ClientMessage::GetCursors),
        _ => Ok(ClientMessage::Unknown(env.kind)),
    }
}

fn required_user_id(raw: Option<&Value>, kind: &'static str) -> Result<String, MessageError> {
    string(raw).ok_or(MessageError::InvalidField { kind, field: "userId" })
}

/// Non-empty string, else `None`.
fn string(raw: Option<&Value>) -> Option<String> {
    raw.and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn number(raw: Option<&Value>) -> Option<f64> {
    raw.and_then(Value::as_f64).filter(|n| n.is_finite())
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Relay → client message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    CursorsSync {
        cursors: Vec<Participant>,
    },
    #[serde(rename_all = "camelCase")]
    CursorUpdate {
        user_id: String,
        user_name: String,
        color: String,
        x: f64,
        y: f64,
        pointer: PointerKind,
    },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        user_id: String,
    },
}

impl ServerMessage {
    /// Wire name of this message, matching its `type` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CursorsSync { .. } => "cursors_sync",
            Self::CursorUpdate { .. } => "cursor_update",
            Self::UserLeft { .. } => "user_left",
        }
    }

    /// Encode as a JSON text payload.
    ///
    /// # Errors
    ///
    /// Returns a serialization error from `serde_json`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
