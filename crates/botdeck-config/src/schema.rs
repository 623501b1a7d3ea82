//! Configuration schema types for Botdeck.
//!
//! All structs use `serde(default)` so partial configs work correctly.

use serde::{Deserialize, Serialize};

/// Root configuration for Botdeck.
///
/// All options have sensible defaults. Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BotdeckConfig {
    pub realtime: RealtimeConfig,
    pub startup: StartupConfig,
    pub logging: LoggingConfig,
}

/// Realtime event stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// WebSocket endpoint of the event distribution server.
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
            endpoint_url: "wss://api.botdeck.io/realtime".to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 5000,
            connect_timeout_ms: 20_000,
        }
    }
}

/// Application startup and lifecycle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Delay before the first connect, so the initial page data fetches
    /// are not competing with the websocket handshake.
    pub connect_delay_ms: u64,
    /// Debounce applied to window-visibility reconnect checks.
    pub visibility_debounce_ms: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            connect_delay_ms: 2000,
            visibility_debounce_ms: 1500,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing directive, overridable via `RUST_LOG` or the CLI.
    pub directive: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directive: "botdeck=info".to_string(),
        }
    }
}
