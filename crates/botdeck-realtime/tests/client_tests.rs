//! End-to-end tests for the realtime client against a loopback server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use botdeck_realtime::{EventKind, Handler, RealtimeClient, RealtimeConfig};

// ---------------------------------------------------------------------------
// Test Server
// ---------------------------------------------------------------------------

enum ServerPush {
    /// Send a text frame to the current connection.
    Text(String),
    /// Close the current connection with a close frame.
    Close,
    /// Drop the current connection without a close handshake.
    Drop,
}

struct TestServer {
    url: String,
    accepted: Arc<AtomicU32>,
    inbound: mpsc::UnboundedReceiver<String>,
    push: mpsc::UnboundedSender<ServerPush>,
}

impl TestServer {
    fn accepted(&self) -> u32 {
        self.accepted.load(Ordering::SeqCst)
    }

    fn push(&self, cmd: ServerPush) {
        self.push.send(cmd).expect("server task gone");
    }

    /// Receive one inbound text frame, parsed as JSON.
    async fn recv_frame(&mut self) -> serde_json::Value {
        let text = tokio::time::timeout(Duration::from_secs(5), self.inbound.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("server inbound channel closed");
        serde_json::from_str(&text).expect("inbound frame is not JSON")
    }

    /// Assert that no frame arrives within `window`.
    async fn expect_no_frame(&mut self, window: Duration) {
        let got = tokio::time::timeout(window, self.inbound.recv()).await;
        assert!(got.is_err(), "unexpected frame: {:?}", got.unwrap());
    }
}

/// Accept websocket connections one at a time, forwarding inbound text
/// frames and applying pushed commands to the current connection.
async fn spawn_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicU32::new(0));
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<ServerPush>();

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let mut ws = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(_) => continue,
            };
            loop {
                tokio::select! {
                    msg = ws.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            let _ = inbound_tx.send(text.to_string());
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(_)) => break,
                    },
                    cmd = push_rx.recv() => match cmd {
                        Some(ServerPush::Text(text)) => {
                            let _ = ws.send(Message::Text(text.into())).await;
                        }
                        Some(ServerPush::Close) => {
                            let _ = ws.close(None).await;
                            break;
                        }
                        Some(ServerPush::Drop) => break,
                        None => return,
                    },
                }
            }
        }
    });

    TestServer {
        url,
        accepted,
        inbound: inbound_rx,
        push: push_tx,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_config(url: &str) -> RealtimeConfig {
    RealtimeConfig {
        endpoint_url: url.to_string(),
        max_reconnect_attempts: 5,
        reconnect_base_delay_ms: 100,
        reconnect_max_delay_ms: 400,
        connect_timeout_ms: 2000,
    }
}

async fn wait_connected(client: &RealtimeClient) {
    for _ in 0..150 {
        if client.is_connected().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("client did not connect in time");
}

async fn wait_disconnected(client: &RealtimeClient) {
    for _ in 0..150 {
        if !client.is_connected().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("client did not disconnect in time");
}

fn recording_handler(log: &Arc<Mutex<Vec<(String, serde_json::Value)>>>, tag: &str) -> Handler {
    let log = Arc::clone(log);
    let tag = tag.to_string();
    Arc::new(move |payload| {
        log.lock().unwrap().push((tag.clone(), payload.clone()));
    })
}

fn event_frame(kind: EventKind, payload: serde_json::Value) -> String {
    serde_json::json!({"event": kind.as_name(), "payload": payload}).to_string()
}

// ---------------------------------------------------------------------------
// Connection Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_is_idempotent() {
    let server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    client.connect().await;
    client.connect().await;
    wait_connected(&client).await;
    client.connect().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(server.accepted(), 1);
    assert!(client.session_id().await.is_some());
}

#[tokio::test]
async fn disconnect_clears_state() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    client.connect().await;
    wait_connected(&client).await;
    client.join_project("proj-9").await;
    let log = Arc::new(Mutex::new(Vec::new()));
    client
        .subscribe(
            EventKind::ProjectMetricsUpdated,
            recording_handler(&log, "a"),
        )
        .await;
    server.recv_frame().await; // join

    client.disconnect().await;
    wait_disconnected(&client).await;

    assert!(!client.is_connected().await);
    assert!(client.session_id().await.is_none());
    assert!(client.active_project().await.is_none());

    // The torn-down connection must not come back on its own.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.accepted(), 1);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn connect_after_disconnect_uses_a_fresh_session() {
    let server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    client.connect().await;
    wait_connected(&client).await;
    let first = client.session_id().await.unwrap();

    client.disconnect().await;
    wait_disconnected(&client).await;

    client.connect().await;
    wait_connected(&client).await;
    let second = client.session_id().await.unwrap();

    assert_ne!(first, second);
    assert_eq!(server.accepted(), 2);
}

// ---------------------------------------------------------------------------
// Room Membership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_while_disconnected_is_deferred_until_connect() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    client.join_project("proj-42").await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.accepted(), 0);

    client.connect().await;
    wait_connected(&client).await;

    let frame = server.recv_frame().await;
    assert_eq!(frame["event"], "joinProject");
    assert_eq!(frame["payload"], "proj-42");
    server.expect_no_frame(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn join_while_connected_sends_immediately() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    client.connect().await;
    wait_connected(&client).await;
    client.join_project("proj-7").await;

    let frame = server.recv_frame().await;
    assert_eq!(frame["event"], "joinProject");
    assert_eq!(frame["payload"], "proj-7");
    server.expect_no_frame(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn leave_project_sends_leave_and_clears_room() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    client.connect().await;
    wait_connected(&client).await;
    client.join_project("proj-1").await;
    server.recv_frame().await; // join

    client.leave_project("proj-1").await;
    let frame = server.recv_frame().await;
    assert_eq!(frame["event"], "leaveProject");
    assert_eq!(frame["payload"], "proj-1");
    assert!(client.active_project().await.is_none());
}

#[tokio::test]
async fn leave_of_non_active_room_is_ignored() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    client.connect().await;
    wait_connected(&client).await;
    client.join_project("proj-1").await;
    server.recv_frame().await; // join

    client.leave_project("proj-2").await;
    server.expect_no_frame(Duration::from_millis(300)).await;
    assert_eq!(client.active_project().await.unwrap().as_str(), "proj-1");
}

#[tokio::test]
async fn leave_while_disconnected_only_updates_local_state() {
    let server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    client.join_project("proj-3").await;
    client.leave_project("proj-3").await;
    assert!(client.active_project().await.is_none());
    assert_eq!(server.accepted(), 0);
}

// ---------------------------------------------------------------------------
// Reconnection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejoin_after_transport_drop() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    client.connect().await;
    wait_connected(&client).await;
    client.join_project("proj-1").await;
    let frame = server.recv_frame().await;
    assert_eq!(frame["event"], "joinProject");

    server.push(ServerPush::Drop);

    // Exactly one fresh join after the automatic reconnect.
    let frame = server.recv_frame().await;
    assert_eq!(frame["event"], "joinProject");
    assert_eq!(frame["payload"], "proj-1");
    server.expect_no_frame(Duration::from_millis(400)).await;

    wait_connected(&client).await;
    assert_eq!(server.accepted(), 2);
    assert_eq!(client.reconnect_attempts(), 0);
}

#[tokio::test]
async fn rejoin_after_server_close() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    client.connect().await;
    wait_connected(&client).await;
    client.join_project("proj-5").await;
    server.recv_frame().await; // first join

    server.push(ServerPush::Close);

    let frame = server.recv_frame().await;
    assert_eq!(frame["event"], "joinProject");
    assert_eq!(frame["payload"], "proj-5");
    server.expect_no_frame(Duration::from_millis(400)).await;

    wait_connected(&client).await;
    assert_eq!(client.reconnect_attempts(), 0);
}

#[tokio::test]
async fn reconnect_attempts_are_bounded() {
    // Bind then free a port so every connect is refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let config = RealtimeConfig {
        endpoint_url: url,
        max_reconnect_attempts: 3,
        reconnect_base_delay_ms: 50,
        reconnect_max_delay_ms: 100,
        connect_timeout_ms: 1000,
    };
    let client = RealtimeClient::new(config);
    client.connect().await;

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(client.reconnect_attempts(), 3);
    assert!(!client.is_connected().await);

    // The budget stays exhausted; nothing keeps retrying.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.reconnect_attempts(), 3);
}

#[tokio::test]
async fn exhausted_client_can_connect_again() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = RealtimeConfig {
        endpoint_url: format!("ws://{addr}"),
        max_reconnect_attempts: 2,
        reconnect_base_delay_ms: 50,
        reconnect_max_delay_ms: 100,
        connect_timeout_ms: 1000,
    };
    let client = RealtimeClient::new(config);
    client.connect().await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(client.reconnect_attempts(), 2);

    // Revive the endpoint; a manual connect() starts a fresh connection.
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
            while let Some(Ok(_)) = ws.next().await {}
        }
    });

    client.connect().await;
    wait_connected(&client).await;
    assert_eq!(client.reconnect_attempts(), 0);
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_dispatch_in_subscription_order() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    let log = Arc::new(Mutex::new(Vec::new()));
    client
        .subscribe(
            EventKind::ProjectMetricsUpdated,
            recording_handler(&log, "first"),
        )
        .await;
    client
        .subscribe(
            EventKind::ProjectMetricsUpdated,
            recording_handler(&log, "second"),
        )
        .await;

    client.connect().await;
    wait_connected(&client).await;
    client.join_project("proj-42").await;
    let frame = server.recv_frame().await;
    assert_eq!(frame["payload"], "proj-42");

    server.push(ServerPush::Text(event_frame(
        EventKind::ProjectMetricsUpdated,
        serde_json::json!({"value": 123}),
    )));

    for _ in 0..150 {
        if log.lock().unwrap().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let calls = log.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "first");
    assert_eq!(calls[1].0, "second");
    assert_eq!(calls[0].1, serde_json::json!({"value": 123}));
    assert_eq!(calls[1].1, serde_json::json!({"value": 123}));
}

#[tokio::test]
async fn duplicate_subscription_dispatches_once() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    let log = Arc::new(Mutex::new(Vec::new()));
    let handler = recording_handler(&log, "only");
    client
        .subscribe(EventKind::ActivityLogAdded, Arc::clone(&handler))
        .await;
    client
        .subscribe(EventKind::ActivityLogAdded, Arc::clone(&handler))
        .await;

    client.connect().await;
    wait_connected(&client).await;
    client.join_project("proj-2").await;
    server.recv_frame().await; // join

    server.push(ServerPush::Text(event_frame(
        EventKind::ActivityLogAdded,
        serde_json::json!({"message": "bot started"}),
    )));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn events_only_reach_their_own_subscribers() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    let metrics_log = Arc::new(Mutex::new(Vec::new()));
    let activity_log = Arc::new(Mutex::new(Vec::new()));
    client
        .subscribe(
            EventKind::ProjectMetricsUpdated,
            recording_handler(&metrics_log, "m"),
        )
        .await;
    client
        .subscribe(
            EventKind::ActivityLogAdded,
            recording_handler(&activity_log, "a"),
        )
        .await;

    client.connect().await;
    wait_connected(&client).await;
    client.join_project("proj-1").await;
    server.recv_frame().await; // join

    server.push(ServerPush::Text(event_frame(
        EventKind::ActivityLogAdded,
        serde_json::json!({"message": "hello"}),
    )));

    for _ in 0..150 {
        if activity_log.lock().unwrap().len() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(activity_log.lock().unwrap().len(), 1);
    assert!(metrics_log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unrecognized_frames_are_dropped() {
    let mut server = spawn_server().await;
    let client = RealtimeClient::new(test_config(&server.url));

    let log = Arc::new(Mutex::new(Vec::new()));
    client
        .subscribe(EventKind::TimeseriesUpdated, recording_handler(&log, "t"))
        .await;

    client.connect().await;
    wait_connected(&client).await;
    client.join_project("proj-1").await;
    server.recv_frame().await; // join

    // Neither garbage nor off-catalog events crash the session.
    server.push(ServerPush::Text("not even json".to_string()));
    server.push(ServerPush::Text(
        serde_json::json!({"event": "wallet:balance:updated", "payload": 1}).to_string(),
    ));
    server.push(ServerPush::Text(event_frame(
        EventKind::TimeseriesUpdated,
        serde_json::json!([1, 2, 3]),
    )));

    for _ in 0..150 {
        if log.lock().unwrap().len() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let calls = log.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, serde_json::json!([1, 2, 3]));
    assert!(client.is_connected().await);
}
