//! Translates incoming WebSocket messages from the Jellyfin server into
//! [`IncomingEvent`]s for the client manager.

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::api::parse_sessions;
use super::models::SessionInfo;

/// Envelope of every message on the Jellyfin socket
#[derive(Debug, Deserialize, Clone)]
pub struct WebSocketMessage {
    #[serde(rename = "MessageType")]
    pub message_type: String,
    #[serde(rename = "Data", default)]
    pub data: Option<serde_json::Value>,
}

/// Events forwarded from the push channel to the rest of the application.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingEvent {
    /// The socket (re)connected and the sessions subscription was sent
    Connected,
    /// The socket dropped; a reconnect is pending
    Disconnected,
    /// Full snapshot of active sessions
    Sessions(Vec<SessionInfo>),
    LibraryChanged,
    UserDataChanged,
    /// Any other message type, by name
    Other(String),
}

/// What the listen loop should do with a decoded message.
#[derive(Debug, PartialEq)]
pub(super) enum Handled {
    /// Server asked us to keep the connection alive
    KeepAlive,
    Forward(IncomingEvent),
    Ignore,
}

/// Decodes the text frame `text` into a [`Handled`] action.
#[instrument(skip(text), level = "trace")]
pub(super) fn handle_text_message(text: &str) -> Handled {
    let message = match serde_json::from_str::<WebSocketMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("[WS Incoming] Failed to parse WebSocket message: {}", e);
            return Handled::Ignore;
        }
    };

    match message.message_type.as_str() {
        "ForceKeepAlive" | "KeepAlive" => {
            debug!("[WS Incoming] Received {}", message.message_type);
            Handled::KeepAlive
        }
        "Sessions" => match message.data.map(parse_sessions) {
            Some(Ok(sessions)) => Handled::Forward(IncomingEvent::Sessions(sessions)),
            Some(Err(e)) => {
                warn!("[WS Incoming] Ignoring Sessions message: {}", e);
                Handled::Ignore
            }
            None => {
                warn!("[WS Incoming] Sessions message without data");
                Handled::Ignore
            }
        },
        "LibraryChanged" => Handled::Forward(IncomingEvent::LibraryChanged),
        "UserDataChanged" => Handled::Forward(IncomingEvent::UserDataChanged),
        other => {
            debug!("[WS Incoming] Unhandled message type: {}", other);
            Handled::Forward(IncomingEvent::Other(other.to_string()))
        }
    }
}
