//! Configuration, wire protocol types, and connection enums.

use botdeck_common::ProjectId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to the realtime event server.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket endpoint URL.
    pub endpoint_url: String,
    /// Upper bound on consecutive reconnection attempts.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay in milliseconds.
    pub reconnect_base_delay_ms: u64,
    /// Maximum reconnect delay in milliseconds.
    pub reconnect_max_delay_ms: u64,
    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 5000,
            connect_timeout_ms: 20_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire Protocol
// ---------------------------------------------------------------------------

/// Wire name of the room-join request.
pub(crate) const JOIN_PROJECT: &str = "joinProject";
/// Wire name of the room-leave request.
pub(crate) const LEAVE_PROJECT: &str = "leaveProject";

/// The message envelope exchanged with the event server (JSON text frames).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WireMessage {
    /// Build a `joinProject` request for a project room.
    pub(crate) fn join_project(id: &ProjectId) -> Self {
        Self {
            event: JOIN_PROJECT.to_string(),
            payload: serde_json::Value::String(id.as_str().to_string()),
        }
    }

    /// Build a `leaveProject` request for a project room.
    pub(crate) fn leave_project(id: &ProjectId) -> Self {
        Self {
            event: LEAVE_PROJECT.to_string(),
            payload: serde_json::Value::String(id.as_str().to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection State & Commands
// ---------------------------------------------------------------------------

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Commands sent from the client handle to the connection task.
#[derive(Debug)]
pub(crate) enum Command {
    JoinRoom(ProjectId),
    LeaveRoom(ProjectId),
    Shutdown,
}
