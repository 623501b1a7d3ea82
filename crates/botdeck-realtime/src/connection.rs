//! Background WebSocket connection task with bounded auto-reconnect.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use botdeck_common::ProjectId;

use crate::catalog::EventKind;
use crate::registry::HandlerRegistry;
use crate::types::{Command, ConnectionState, RealtimeConfig, WireMessage};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Shared State
// ---------------------------------------------------------------------------

/// State shared between the client handle and the connection task.
pub(crate) struct SharedState {
    state: RwLock<ConnectionState>,
    session_id: RwLock<Option<String>>,
    active_room: RwLock<Option<ProjectId>>,
    pub(crate) registry: RwLock<HandlerRegistry>,
    reconnect_attempts: AtomicU32,
    /// Bumped by every `connect()`; a superseded connection task stops
    /// touching shared state once its generation is stale.
    generation: AtomicU64,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(ConnectionState::Disconnected),
            session_id: RwLock::new(None),
            active_room: RwLock::new(None),
            registry: RwLock::new(HandlerRegistry::new()),
            reconnect_attempts: AtomicU32::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub(crate) async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub(crate) async fn set_state(&self, generation: u64, state: ConnectionState) {
        if self.is_current(generation) {
            *self.state.write().await = state;
        }
    }

    /// Set the state unconditionally (teardown path owned by `disconnect()`).
    pub(crate) async fn force_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    pub(crate) async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    pub(crate) async fn set_session(&self, generation: u64, session: Option<String>) {
        if self.is_current(generation) {
            *self.session_id.write().await = session;
        }
    }

    pub(crate) async fn force_clear_session(&self) {
        *self.session_id.write().await = None;
    }

    pub(crate) async fn active_room(&self) -> Option<ProjectId> {
        self.active_room.read().await.clone()
    }

    pub(crate) async fn set_active_room(&self, room: Option<ProjectId>) {
        *self.active_room.write().await = room;
    }

    /// Clear the active room if it matches `id`. Returns whether it did.
    pub(crate) async fn clear_room_if(&self, id: &ProjectId) -> bool {
        let mut room = self.active_room.write().await;
        if room.as_ref() == Some(id) {
            *room = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    fn record_attempt(&self, generation: u64) {
        if self.is_current(generation) {
            self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn reset_attempts(&self, generation: u64) {
        if self.is_current(generation) {
            self.reconnect_attempts.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn force_reset_attempts(&self) {
        self.reconnect_attempts.store(0, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Why an established session ended.
enum SessionEnd {
    /// `disconnect()` was called; do not retry.
    Shutdown,
    /// The server sent a close frame.
    ServerClosed,
    /// The transport dropped without a close handshake.
    TransportLost,
}

/// Background task owning the WebSocket for one `connect()` call.
///
/// Single source of truth for retry: every failed attempt or lost session
/// consumes one unit of the shared attempt budget, the delay doubles from
/// the reason-specific base up to the configured cap, and the counter
/// resets exactly when a connection is established.
pub(crate) async fn connection_loop(
    config: RealtimeConfig,
    shared: Arc<SharedState>,
    mut command_rx: mpsc::Receiver<Command>,
    generation: u64,
) {
    let mut retry_delay_ms = config.reconnect_base_delay_ms;

    loop {
        shared.set_state(generation, ConnectionState::Connecting).await;
        info!(url = %config.endpoint_url, "connecting to realtime endpoint");

        match tokio::time::timeout(
            Duration::from_millis(config.connect_timeout_ms),
            connect_async(&config.endpoint_url),
        )
        .await
        {
            Ok(Ok((socket, _))) => {
                let session = Uuid::new_v4().to_string();
                shared.reset_attempts(generation);
                shared.set_session(generation, Some(session.clone())).await;
                shared
                    .set_state(generation, ConnectionState::Connected)
                    .await;
                info!(session = %session, "realtime connection established");
                retry_delay_ms = config.reconnect_base_delay_ms;

                let end = drive_session(socket, &shared, &mut command_rx, generation).await;

                shared.set_session(generation, None).await;
                shared
                    .set_state(generation, ConnectionState::Disconnected)
                    .await;

                match end {
                    SessionEnd::Shutdown => return,
                    SessionEnd::ServerClosed => {
                        info!("server closed the realtime connection");
                        retry_delay_ms = config.reconnect_base_delay_ms;
                    }
                    SessionEnd::TransportLost => {
                        warn!("realtime transport lost");
                        retry_delay_ms = (2 * config.reconnect_base_delay_ms)
                            .min(config.reconnect_max_delay_ms);
                    }
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "failed to connect to realtime endpoint");
            }
            Err(_elapsed) => {
                error!(
                    timeout_ms = config.connect_timeout_ms,
                    "realtime connection attempt timed out"
                );
            }
        }

        shared
            .set_state(generation, ConnectionState::Disconnected)
            .await;

        let attempts = shared.attempts();
        if attempts >= config.max_reconnect_attempts {
            warn!(attempts, "reconnect budget exhausted, giving up");
            return;
        }
        shared.record_attempt(generation);

        debug!(
            attempt = attempts + 1,
            delay_ms = retry_delay_ms,
            "scheduling reconnect"
        );
        if !wait_for_retry(Duration::from_millis(retry_delay_ms), &mut command_rx).await {
            return;
        }
        retry_delay_ms = (retry_delay_ms * 2).min(config.reconnect_max_delay_ms);
    }
}

/// Sleep for `delay`, still honoring shutdown. Returns false if the
/// connection was torn down while waiting.
async fn wait_for_retry(delay: Duration, command_rx: &mut mpsc::Receiver<Command>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            cmd = command_rx.recv() => match cmd {
                Some(Command::Shutdown) | None => return false,
                // Room changes only update shared state; membership is
                // announced when the next session starts.
                Some(_) => {}
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Drive one established connection until it ends.
async fn drive_session(
    socket: Socket,
    shared: &Arc<SharedState>,
    command_rx: &mut mpsc::Receiver<Command>,
    generation: u64,
) -> SessionEnd {
    let (mut write, mut read) = socket.split();

    // The room this session has announced membership for; at most one.
    let mut announced: Option<ProjectId> = None;

    // (Re)announce membership for the active project room.
    if let Some(room) = shared.active_room().await {
        if send_wire(&mut write, &WireMessage::join_project(&room))
            .await
            .is_err()
        {
            return SessionEnd::TransportLost;
        }
        info!(project = %room, "joined project room");
        announced = Some(room);
    }

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => handle_frame(&text, shared, generation).await,
                Some(Ok(WsMessage::Close(_))) => return SessionEnd::ServerClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "websocket read error");
                    return SessionEnd::TransportLost;
                }
                None => return SessionEnd::TransportLost,
            },
            cmd = command_rx.recv() => match cmd {
                Some(Command::JoinRoom(id)) => {
                    // The join may already have been sent when the session
                    // started; one membership announcement per session.
                    if announced.as_ref() == Some(&id) {
                        continue;
                    }
                    if send_wire(&mut write, &WireMessage::join_project(&id)).await.is_err() {
                        return SessionEnd::TransportLost;
                    }
                    info!(project = %id, "joined project room");
                    announced = Some(id);
                }
                Some(Command::LeaveRoom(id)) => {
                    if send_wire(&mut write, &WireMessage::leave_project(&id)).await.is_err() {
                        return SessionEnd::TransportLost;
                    }
                    info!(project = %id, "left project room");
                    if announced.as_ref() == Some(&id) {
                        announced = None;
                    }
                }
                Some(Command::Shutdown) | None => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    return SessionEnd::Shutdown;
                }
            },
        }
    }
}

/// Parse one inbound text frame and dispatch it to subscribers.
async fn handle_frame(text: &str, shared: &Arc<SharedState>, generation: u64) {
    let msg: WireMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(_) => {
            debug!(text = %text, "unrecognized frame from server");
            return;
        }
    };

    let Some(kind) = EventKind::from_name(&msg.event) else {
        debug!(event = %msg.event, "event not in catalog, dropping");
        return;
    };

    // A newer connection owns the registry once this one is superseded.
    if !shared.is_current(generation) {
        return;
    }
    debug!(event = %kind, "dispatching event");
    shared.registry.read().await.dispatch(kind, &msg.payload);
}

/// Serialize and send one wire message. Serialization failures are logged
/// and swallowed; only transport failures are reported to the caller.
async fn send_wire<S>(write: &mut S, msg: &WireMessage) -> Result<(), ()>
where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to serialize outbound message");
            return Ok(());
        }
    };
    write
        .send(WsMessage::Text(json.into()))
        .await
        .map_err(|_| ())
}
