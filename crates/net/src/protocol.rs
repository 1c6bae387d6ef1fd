//! Hub protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Hub protocol messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Client wants every value of a document, starting with the current one
    Subscribe { key: String },

    /// Client no longer wants updates for a document
    Unsubscribe { key: String },

    /// Current value of a document (hub to client)
    Snapshot { key: String, body: Value },

    /// Merge top-level fields into a document
    UpdateFields {
        key: String,
        fields: Map<String, Value>,
    },

    /// Append a record to a log collection
    AppendLog { collection: String, record: Value },

    /// A client request failed (hub to client)
    Error { reason: String },

    /// Ping to keep connection alive
    Ping,

    /// Pong response to ping
    Pong,

    /// Hub is shutting down
    Shutdown,
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
