//! Change-feed protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire.
//! The feed carries no lobby data; `LobbiesChanged` tells subscribers
//! to re-fetch state through the API, so duplicates are harmless.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Change-feed protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Client asks to receive change signals
    Subscribe {
        client_id: Uuid,
        display_name: String,
    },

    /// Server accepted the subscription
    Subscribed,

    /// Server turned the subscription away
    SubscribeRejected { reason: String },

    /// Lobby state changed somewhere; subscribers re-fetch everything
    LobbiesChanged,

    /// Ping to keep the connection alive
    Ping,

    /// Pong response to ping
    Pong,

    /// Server is shutting down
    ServerShutdown,
}

impl Message {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
