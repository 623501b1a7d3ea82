//! Public handle for the realtime event stream.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use botdeck_common::ProjectId;

use crate::catalog::EventKind;
use crate::connection::{connection_loop, SharedState};
use crate::registry::Handler;
use crate::types::{Command, ConnectionState, RealtimeConfig};

/// Handle for the realtime event stream connection.
///
/// All methods are non-blocking and never surface connection problems to
/// the caller; failures show up through the connection state and logs,
/// so UI code can call these from mount/teardown paths safely.
pub struct RealtimeClient {
    config: RealtimeConfig,
    shared: Arc<SharedState>,
    command_tx: Arc<Mutex<Option<mpsc::Sender<Command>>>>,
}

impl RealtimeClient {
    /// Create a disconnected client. Call `connect()` to open the stream.
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            config,
            shared: Arc::new(SharedState::new()),
            command_tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Open the connection. No-op while a connection task is already alive.
    pub async fn connect(&self) {
        let mut slot = self.command_tx.lock().await;
        if let Some(tx) = slot.as_ref() {
            if !tx.is_closed() {
                debug!("connect() ignored, connection task already running");
                return;
            }
        }

        let (tx, rx) = mpsc::channel(64);
        *slot = Some(tx);
        self.shared.force_reset_attempts();
        let generation = self.shared.next_generation();
        tokio::spawn(connection_loop(
            self.config.clone(),
            Arc::clone(&self.shared),
            rx,
            generation,
        ));
    }

    /// Tear down the connection, drop every subscription, and forget the
    /// active room. Safe to call when already disconnected.
    pub async fn disconnect(&self) {
        if let Some(tx) = self.command_tx.lock().await.take() {
            let _ = tx.send(Command::Shutdown).await;
        }
        self.shared.force_state(ConnectionState::Disconnected).await;
        self.shared.force_clear_session().await;
        self.shared.set_active_room(None).await;
        self.shared.registry.write().await.clear();
    }

    /// Join a project's event room.
    ///
    /// When connected the join request is sent immediately; otherwise it
    /// fires on the next connected transition, and again after every
    /// reconnect, until `leave_project()` or `disconnect()`.
    pub async fn join_project(&self, id: impl Into<ProjectId>) {
        let id = id.into();
        self.shared.set_active_room(Some(id.clone())).await;
        if self.is_connected().await {
            self.send_command(Command::JoinRoom(id)).await;
        } else {
            debug!(project = %id, "not connected, join deferred");
        }
    }

    /// Leave a project's event room. Ignored unless `id` is the active room.
    pub async fn leave_project(&self, id: impl Into<ProjectId>) {
        let id = id.into();
        if !self.shared.clear_room_if(&id).await {
            debug!(project = %id, "leave for a room that is not active, ignoring");
            return;
        }
        if self.is_connected().await {
            self.send_command(Command::LeaveRoom(id)).await;
        }
    }

    /// Register a handler for an event type. Duplicate registration of the
    /// same callback is ignored with a warning.
    pub async fn subscribe(&self, kind: EventKind, handler: Handler) {
        self.shared.registry.write().await.subscribe(kind, handler);
    }

    /// Remove a previously registered handler. No-op when absent.
    pub async fn unsubscribe(&self, kind: EventKind, handler: &Handler) {
        self.shared.registry.write().await.unsubscribe(kind, handler);
    }

    /// Whether the stream is currently connected.
    pub async fn is_connected(&self) -> bool {
        self.shared.state().await == ConnectionState::Connected
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.shared.state().await
    }

    /// Opaque identifier of the current session, present while connected.
    pub async fn session_id(&self) -> Option<String> {
        self.shared.session_id().await
    }

    /// The project room this client is (or will be) subscribed to.
    pub async fn active_project(&self) -> Option<ProjectId> {
        self.shared.active_room().await
    }

    /// Reconnection attempts consumed since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts()
    }

    async fn send_command(&self, command: Command) {
        if let Some(tx) = self.command_tx.lock().await.as_ref() {
            let _ = tx.send(command).await;
        }
    }
}

impl Clone for RealtimeClient {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            shared: Arc::clone(&self.shared),
            command_tx: Arc::clone(&self.command_tx),
        }
    }
}
