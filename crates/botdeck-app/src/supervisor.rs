//! Connection lifecycle policy: when to connect, independent of the
//! client's own reconnection handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use botdeck_config::schema::StartupConfig;
use botdeck_realtime::RealtimeClient;

/// Decides when the application connects and disconnects the realtime
/// stream: once after a startup delay, again when the window becomes
/// visible while disconnected, and teardown on shutdown.
pub struct ConnectionSupervisor {
    client: Arc<RealtimeClient>,
    connect_delay: Duration,
    visibility_debounce: Duration,
    started: AtomicBool,
    startup_task: Mutex<Option<JoinHandle<()>>>,
    pending_check: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionSupervisor {
    pub fn new(client: Arc<RealtimeClient>, startup: &StartupConfig) -> Self {
        Self {
            client,
            connect_delay: Duration::from_millis(startup.connect_delay_ms),
            visibility_debounce: Duration::from_millis(startup.visibility_debounce_ms),
            started: AtomicBool::new(false),
            startup_task: Mutex::new(None),
            pending_check: Mutex::new(None),
        }
    }

    /// Schedule the initial connect after the startup delay, so the first
    /// page data fetches are not competing with the handshake. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("supervisor already started, ignoring");
            return;
        }
        let client = Arc::clone(&self.client);
        let delay = self.connect_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            client.connect().await;
        });
        *self.startup_task.lock().unwrap() = Some(handle);
    }

    /// The window became visible again. After the debounce window, connect
    /// if the stream is down. A newer signal replaces a pending check.
    pub fn window_visible(&self) {
        let mut pending = self.pending_check.lock().unwrap();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let client = Arc::clone(&self.client);
        let debounce = self.visibility_debounce;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if !client.is_connected().await {
                info!("window visible and realtime stream down, reconnecting");
                client.connect().await;
            }
        }));
    }

    /// Cancel pending timers and tear the connection down.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.startup_task.lock().unwrap().take() {
            handle.abort();
        }
        if let Some(handle) = self.pending_check.lock().unwrap().take() {
            handle.abort();
        }
        self.client.disconnect().await;
    }
}
