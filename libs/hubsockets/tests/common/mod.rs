//! Common test utilities for hubsockets integration tests
//!
//! `MockHub` speaks the hub side of the protocol: it challenges every new
//! socket, checks the token, and then hands the session to the test so the
//! test decides what the hub answers and when.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use hubsockets::HubConnection;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;

pub const TOKEN: &str = "test-token";
pub const WAIT: Duration = Duration::from_secs(5);

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

enum Outgoing {
    Text(String),
    Close,
}

/// One authenticated socket, seen from the hub
pub struct HubSession {
    incoming: mpsc::UnboundedReceiver<Value>,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    pub accepted_at: Instant,
}

impl HubSession {
    /// Next frame the client sent
    pub async fn recv(&mut self) -> Value {
        tokio::time::timeout(WAIT, self.incoming.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client socket closed")
    }

    /// Next frame, asserting its `type`
    pub async fn expect_type(&mut self, frame_type: &str) -> Value {
        let frame = self.recv().await;
        assert_eq!(frame["type"], frame_type, "unexpected frame: {}", frame);
        frame
    }

    /// Acknowledge the client's automatic event subscription; returns its id
    pub async fn complete_subscription(&mut self) -> u64 {
        let frame = self.expect_type("subscribe_events").await;
        let id = frame["id"].as_u64().expect("subscription without id");
        self.reply(id, Value::Null);
        id
    }

    pub fn send(&self, frame: Value) {
        let _ = self.outgoing.send(Outgoing::Text(frame.to_string()));
    }

    pub fn send_raw(&self, text: &str) {
        let _ = self.outgoing.send(Outgoing::Text(text.to_string()));
    }

    pub fn reply(&self, id: u64, result: Value) {
        self.send(json!({"id": id, "type": "result", "success": true, "result": result}));
    }

    pub fn reply_error(&self, id: u64, code: &str, message: &str) {
        self.send(json!({
            "id": id,
            "type": "result",
            "success": false,
            "error": {"code": code, "message": message}
        }));
    }

    /// Push a `state_changed` event for `entity_id`
    pub fn state_changed(&self, subscription_id: u64, entity_id: &str, state: &str) {
        self.send(json!({
            "id": subscription_id,
            "type": "event",
            "event": {
                "event_type": "state_changed",
                "data": {
                    "entity_id": entity_id,
                    "old_state": null,
                    "new_state": {"entity_id": entity_id, "state": state, "attributes": {}}
                },
                "origin": "LOCAL",
                "time_fired": "2024-01-01T00:00:00+00:00"
            }
        }));
    }

    /// Close the socket from the hub side
    pub fn close(&self) {
        let _ = self.outgoing.send(Outgoing::Close);
    }
}

/// A mock hub listening on a random local port
pub struct MockHub {
    pub addr: SocketAddr,
    sessions: mpsc::UnboundedReceiver<HubSession>,
    accepted: Arc<AtomicUsize>,
    rejected: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
}

impl MockHub {
    /// Start a hub that accepts `TOKEN`
    pub async fn start() -> Self {
        Self::start_with_token(TOKEN).await
    }

    pub async fn start_with_token(token: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (session_tx, sessions) = mpsc::unbounded_channel();
        let accepted = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(Notify::new());

        {
            let accepted = Arc::clone(&accepted);
            let rejected = Arc::clone(&rejected);
            let shutdown = Arc::clone(&shutdown);
            let token = token.to_string();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        result = listener.accept() => {
                            let Ok((stream, _)) = result else { break };
                            accepted.fetch_add(1, Ordering::SeqCst);
                            tokio::spawn(handle_connection(
                                stream,
                                token.clone(),
                                session_tx.clone(),
                                Arc::clone(&rejected),
                                Arc::clone(&shutdown),
                            ));
                        }
                        _ = shutdown.notified() => break,
                    }
                }
            });
        }

        Self {
            addr,
            sessions,
            accepted,
            rejected,
            shutdown,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/api/websocket", self.addr)
    }

    /// Next authenticated session
    pub async fn next_session(&mut self) -> HubSession {
        tokio::time::timeout(WAIT, self.sessions.recv())
            .await
            .expect("timed out waiting for the client to connect")
            .expect("mock hub stopped")
    }

    /// Whether a session arrives within `within`
    pub async fn session_within(&mut self, within: Duration) -> Option<HubSession> {
        tokio::time::timeout(within, self.sessions.recv())
            .await
            .ok()
            .flatten()
    }

    /// TCP connections accepted so far (authenticated or not)
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Sockets answered with `auth_invalid`
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }
}

impl Drop for MockHub {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

async fn handle_connection(
    stream: TcpStream,
    token: String,
    session_tx: mpsc::UnboundedSender<HubSession>,
    rejected: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) {
    let Ok(ws_stream) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    let challenge = json!({"type": "auth_required", "ha_version": "2024.1.0"});
    if write.send(Message::Text(challenge.to_string())).await.is_err() {
        return;
    }

    let auth = match read.next().await {
        Some(Ok(Message::Text(text))) => serde_json::from_str::<Value>(&text).unwrap_or(Value::Null),
        _ => return,
    };

    if auth["type"] != "auth" || auth["access_token"] != token.as_str() {
        rejected.fetch_add(1, Ordering::SeqCst);
        let reply = json!({"type": "auth_invalid", "message": "Invalid access token or password"});
        let _ = write.send(Message::Text(reply.to_string())).await;
        let _ = write.close().await;
        return;
    }

    let ok = json!({"type": "auth_ok", "ha_version": "2024.1.0"});
    if write.send(Message::Text(ok.to_string())).await.is_err() {
        return;
    }

    let (in_tx, incoming) = mpsc::unbounded_channel();
    let (outgoing, mut out_rx) = mpsc::unbounded_channel();
    let _ = session_tx.send(HubSession {
        incoming,
        outgoing,
        accepted_at: Instant::now(),
    });

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(frame) = serde_json::from_str::<Value>(&text) {
                        let _ = in_tx.send(frame);
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            out = out_rx.recv() => match out {
                Some(Outgoing::Text(text)) => {
                    if write.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(Outgoing::Close) | None => {
                    let _ = write.close().await;
                    break;
                }
            },
            _ = shutdown.notified() => break,
        }
    }
}

/// Connection to `hub` with a short reconnect delay
pub async fn connect(hub: &MockHub, reconnect_delay: Duration) -> HubConnection {
    hubsockets::builder()
        .url(hub.ws_url())
        .token(TOKEN)
        .reconnect_delay(reconnect_delay)
        .build()
        .await
        .expect("valid configuration")
}

/// Wait for `Ready`, failing the test after `WAIT`
pub async fn wait_ready(connection: &HubConnection) {
    tokio::time::timeout(WAIT, connection.wait_ready())
        .await
        .expect("connection never became ready");
}

/// Poll `condition` until it holds, failing the test after `WAIT`
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Address with nothing listening on it
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/api/websocket", addr)
}
