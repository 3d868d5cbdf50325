use crate::codec::{self, EventFrame, InboundFrame, OutboundFrame, ResultFrame};
use crate::config::ConnectionConfig;
use crate::connection_state::{
    AtomicConnectionState, AtomicMetrics, AtomicSubscriptionState, ConnectionState,
};
use crate::fanout::EventFanout;
use crate::pending::PendingCalls;
use crate::traits::*;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsWrite = futures::stream::SplitSink<WsStream, Message>;

/// Connection metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub reconnect_count: u64,
    pub events_dispatched: u64,
    pub pending_calls: usize,
    pub subscribed: bool,
    pub connection_state: ConnectionState,
}

/// State shared between the handle, the supervisor task and callers
struct Shared {
    url: String,
    event_type: String,
    auth: Arc<dyn AuthProvider>,
    state: AtomicConnectionState,
    subscription: AtomicSubscriptionState,
    metrics: AtomicMetrics,
    pending: PendingCalls,
    fanout: EventFanout,
    /// Woken whenever the handshake reaches `Ready`
    ready: Notify,
    /// Wakes the supervisor out of a session or a reconnect delay
    shutdown: Notify,
}

/// Long-lived connection to the hub
///
/// Owns exactly one socket at a time. A supervisor task opens the socket,
/// answers the authentication challenge, subscribes to the tracked event
/// category and then runs the receive loop until the socket is lost; after
/// that every pending call fails with `ConnectionLost` and a new socket is
/// opened once the reconnection strategy's delay has passed.
///
/// Sockets are strictly sequential inside the supervisor, so a replaced
/// socket can never touch the state of its successor.
pub struct HubConnection {
    shared: Arc<Shared>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
    shutdown_flag: Arc<AtomicBool>,
}

impl HubConnection {
    /// Start the connection
    ///
    /// Spawns the supervisor on the current Tokio runtime and returns right
    /// away; use [`wait_ready`](Self::wait_ready) to wait for the handshake.
    pub fn open(config: ConnectionConfig) -> Self {
        let ConnectionConfig {
            url,
            auth,
            reconnect_strategy,
            event_type,
            shutdown_flag,
        } = config;

        let shared = Arc::new(Shared {
            url,
            event_type,
            auth,
            state: AtomicConnectionState::new(ConnectionState::Disconnected),
            subscription: AtomicSubscriptionState::new(),
            metrics: AtomicMetrics::new(),
            pending: PendingCalls::new(),
            fanout: EventFanout::new(),
            ready: Notify::new(),
            shutdown: Notify::new(),
        });

        let task_handle = {
            let shared = Arc::clone(&shared);
            let shutdown_flag = Arc::clone(&shutdown_flag);
            tokio::spawn(async move {
                run_connection(shared, reconnect_strategy, shutdown_flag).await;
            })
        };

        Self {
            shared,
            task_handle: Some(task_handle),
            shutdown_flag,
        }
    }

    /// Send one request and wait for its result frame
    ///
    /// Fails with `NotReady` before the handshake completed and with
    /// `ConnectionLost` if the socket goes away before the result arrives.
    /// There is no timeout here; wrap the call in `tokio::time::timeout` if the
    /// caller needs one.
    pub async fn request(&self, payload: Value) -> Result<ResultFrame> {
        let (id, completion) = self.shared.pending.register(payload)?;
        debug!(id, "Request queued");

        match completion.await {
            Ok(result) => result,
            Err(_) => Err(HubError::ConnectionLost(
                "connection dropped before the result arrived".into(),
            )),
        }
    }

    /// Register a subscriber for the tracked event category
    ///
    /// Subscribers live as long as the connection and survive any number of
    /// reconnects.
    pub fn subscribe(&self, subscriber: impl EventSubscriber) {
        self.shared.fanout.subscribe(subscriber);
    }

    /// Wait until the handshake reaches `Ready`
    ///
    /// Returns immediately if it already has. Never returns if the hub is
    /// never reachable; combine with a timeout where that matters.
    pub async fn wait_ready(&self) {
        loop {
            let notified = self.shared.ready.notified();
            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.shared.state.is_ready()
    }

    /// Whether the hub acknowledged the event subscription of this socket
    #[inline]
    pub fn is_subscribed(&self) -> bool {
        self.shared.subscription.is_subscribed()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    /// Most recently allocated correlation id
    pub fn last_id(&self) -> u64 {
        self.shared.pending.last_id()
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            frames_sent: self.shared.metrics.frames_sent(),
            frames_received: self.shared.metrics.frames_received(),
            reconnect_count: self.shared.metrics.reconnect_count(),
            events_dispatched: self.shared.fanout.dispatched(),
            pending_calls: self.shared.pending.len(),
            subscribed: self.shared.subscription.is_subscribed(),
            connection_state: self.shared.state.get(),
        }
    }

    /// Get a reference to the shutdown flag
    ///
    /// Storing `false` stops the connection once the supervisor next looks at
    /// it (between frames or reconnect attempts). Unlike `shutdown()` it does
    /// not wake an idle socket, and the event dispatcher thread is left to
    /// exit on its own.
    pub fn shutdown_flag(&self) -> &Arc<AtomicBool> {
        &self.shutdown_flag
    }

    /// Close the socket, fail pending calls and stop reconnecting
    ///
    /// Events already queued are still delivered before this returns.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down hub connection");

        self.shutdown_flag.store(false, Ordering::Release);
        self.shared.state.set(ConnectionState::ShuttingDown);
        self.shared.shutdown.notify_one();

        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }

        self.shared.fanout.close();
        info!("Hub connection shut down");
        Ok(())
    }
}

impl Drop for HubConnection {
    fn drop(&mut self) {
        if self.task_handle.is_some() {
            self.shutdown_flag.store(false, Ordering::Release);
            self.shared.shutdown.notify_one();
        }
    }
}

#[async_trait]
impl HubRequester for HubConnection {
    async fn request(&self, payload: Value) -> Result<ResultFrame> {
        HubConnection::request(self, payload).await
    }
}

/// Supervisor loop: one socket at a time, forever (or until the strategy
/// gives up / shutdown is requested)
async fn run_connection(
    shared: Arc<Shared>,
    reconnect_strategy: Box<dyn ReconnectionStrategy>,
    shutdown_flag: Arc<AtomicBool>,
) {
    let mut reconnect_attempt = 0;

    loop {
        if !shutdown_flag.load(Ordering::Acquire) {
            debug!("Shutdown flag is false, exiting supervisor loop");
            break;
        }

        shared.state.set(ConnectionState::Disconnected);

        let reason = match connect_async(shared.url.as_str()).await {
            Ok((ws_stream, _)) => {
                info!(url = %shared.url, "Connected to hub");
                shared.state.set(ConnectionState::Unauthenticated);
                reconnect_attempt = 0;

                run_session(ws_stream, &shared, &shutdown_flag).await
            }
            Err(e) => {
                error!(url = %shared.url, "Failed to connect: {}", e);
                format!("connect failed: {}", e)
            }
        };

        teardown(&shared, &reason);

        if !shutdown_flag.load(Ordering::Acquire) {
            debug!("Shutdown flag set during session, stopping reconnection");
            break;
        }

        match reconnect_strategy.next_delay(reconnect_attempt) {
            Some(delay) => {
                info!(
                    "Hub disconnected ({}), reconnecting in {:?} (attempt {})",
                    reason,
                    delay,
                    reconnect_attempt + 1
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shared.shutdown.notified() => {
                        debug!("Shutdown requested during reconnection delay");
                        break;
                    }
                }

                reconnect_attempt += 1;
                shared.metrics.increment_reconnects();
            }
            None => {
                warn!("Reconnection strategy exhausted, stopping");
                break;
            }
        }
    }

    teardown(&shared, "connection shut down");
    shared.state.set(if shutdown_flag.load(Ordering::Acquire) {
        ConnectionState::Disconnected
    } else {
        ConnectionState::ShuttingDown
    });
    info!("Hub connection task exiting");
}

/// Fail everything that belonged to the socket that just went away
fn teardown(shared: &Shared, reason: &str) {
    shared.subscription.set_subscribed(false);
    if shared.state.get() != ConnectionState::ShuttingDown {
        shared.state.set(ConnectionState::Disconnected);
    }

    let failed = shared.pending.fail_all(reason);
    if failed > 0 {
        warn!(failed, reason, "Failed pending calls after losing the hub socket");
    }
}

/// Run one socket until it is lost; returns why it ended
async fn run_session(ws_stream: WsStream, shared: &Shared, shutdown_flag: &AtomicBool) -> String {
    let (mut write, mut read) = ws_stream.split();

    // Per-socket writer: it dies with this session, so frames queued for a
    // lost socket can never reach its replacement.
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let mut subscription_id: Option<u64> = None;

    loop {
        if !shutdown_flag.load(Ordering::Acquire) {
            let _ = write.close().await;
            return "shutdown requested".into();
        }

        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        shared.metrics.increment_received();

                        let frame = match codec::decode(&text) {
                            Ok(frame) => frame,
                            Err(e) => {
                                warn!("Ignoring malformed frame: {}", e);
                                continue;
                            }
                        };

                        if let Err(e) = handle_frame(
                            frame,
                            shared,
                            &mut write,
                            &frame_tx,
                            &mut subscription_id,
                        )
                        .await
                        {
                            error!("Session error: {}", e);
                            let _ = write.close().await;
                            return e.to_string();
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        shared.metrics.increment_received();
                        debug!("Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Hub closed the socket: {:?}", frame);
                        return "closed by hub".into();
                    }
                    Some(Ok(_)) => {
                        // Ping/pong handled by tungstenite
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        return format!("read error: {}", e);
                    }
                    None => {
                        warn!("WebSocket stream closed");
                        return "stream ended".into();
                    }
                }
            }

            Some(frame) = frame_rx.recv() => {
                if let Err(e) = send_frame(&mut write, &frame, shared).await {
                    error!("Failed to send frame: {}", e);
                    return e.to_string();
                }
            }

            _ = shared.shutdown.notified() => {
                debug!("Shutdown requested, closing socket");
                let _ = write.close().await;
                return "shutdown requested".into();
            }
        }
    }
}

/// Handshake state machine and dispatch by frame kind
async fn handle_frame(
    frame: InboundFrame,
    shared: &Shared,
    write: &mut WsWrite,
    frame_tx: &mpsc::UnboundedSender<OutboundFrame>,
    subscription_id: &mut Option<u64>,
) -> Result<()> {
    match frame {
        InboundFrame::AuthRequired { ha_version } => {
            debug!(?ha_version, "Hub requested authentication");
            let token = shared.auth.access_token().await?;
            send_frame(write, &OutboundFrame::auth(token), shared).await?;
            shared.state.set(ConnectionState::AuthSent);
        }

        InboundFrame::AuthOk { ha_version } => {
            // Subscription goes out before any caller can register a request,
            // so it always carries the lowest id of this socket.
            let id = shared.pending.next_id();
            let subscribe = OutboundFrame::request(
                id,
                codec::subscribe_events_payload(&shared.event_type),
            )?;
            send_frame(write, &subscribe, shared).await?;
            *subscription_id = Some(id);

            shared.pending.open(frame_tx.clone());
            shared.state.set(ConnectionState::Ready);
            shared.ready.notify_waiters();
            info!(?ha_version, event_type = %shared.event_type, "Hub connection ready");
        }

        InboundFrame::AuthInvalid { message } => {
            let message = message.unwrap_or_else(|| "no reason given".into());
            error!("Hub rejected credentials: {}", message);
            return Err(HubError::Authentication(message));
        }

        InboundFrame::Result(result) if Some(result.id) == *subscription_id => {
            if result.success {
                shared.subscription.set_subscribed(true);
                info!(id = result.id, event_type = %shared.event_type, "Subscribed to hub events");
            } else {
                warn!(id = result.id, error = ?result.error, "Hub refused event subscription");
            }
        }

        InboundFrame::Result(result) => {
            let id = result.id;
            if !shared.pending.resolve(result) {
                debug!(id, "Result for unknown or abandoned call");
            }
        }

        InboundFrame::Pong { id } => {
            if !shared.pending.resolve(ResultFrame::pong(id)) {
                debug!(id, "Pong for unknown call");
            }
        }

        InboundFrame::Event(event) => dispatch_event(event, shared),

        InboundFrame::Unknown => {
            debug!("Ignoring frame of unknown type");
        }
    }

    Ok(())
}

fn dispatch_event(frame: EventFrame, shared: &Shared) {
    if frame.event.event_type == shared.event_type {
        shared.fanout.publish(frame);
    } else {
        debug!(event_type = %frame.event.event_type, "Ignoring untracked event");
    }
}

async fn send_frame(write: &mut WsWrite, frame: &OutboundFrame, shared: &Shared) -> Result<()> {
    let text = frame.encode()?;
    write
        .send(Message::Text(text))
        .await
        .map_err(|e| HubError::WebSocket(format!("Failed to send frame: {}", e)))?;
    shared.metrics.increment_sent();
    Ok(())
}
