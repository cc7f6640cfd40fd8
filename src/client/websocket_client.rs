//! WebSocket client for the hub's stateful control protocol
//!
//! A single `ConnectionActor` task exclusively owns the session: the write
//! half of the socket, the request broker, the subscription table, and the
//! status record. Every external trigger — manual connect/disconnect, a
//! service call, a detected drop, the reconnect timer — arrives as a message
//! on the actor's inbox, so no connection state is shared between tasks.
//!
//! Each live connection gets its own listener task that reads frames
//! strictly sequentially and forwards them into the actor inbox; `result`
//! frames resolve broker waiters, `event` frames land in bounded
//! per-subscription mailboxes (a full mailbox drops the event rather than
//! stalling frame processing). Reconnection backs off exponentially to a
//! cap, then cools down before resuming. Service calls transparently fall
//! back to the REST API when the session is down or the transport fails
//! mid-call.

use crate::client::broker::RequestBroker;
use crate::client::frames::{ClientFrame, EventFrame, ResultFrame, ServerFrame};
use crate::client::http_client::HubRestClient;
use crate::client::{
    ConnectionStatus, RegistryKind, RegistrySource, ServiceCallResult, ServiceData, ServiceTarget,
};
use crate::config::HubConfig;
use crate::error::{HubError, Result};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{timeout, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Commands accepted by the connection actor
enum Command {
    Connect {
        reply: oneshot::Sender<bool>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    CallService {
        domain: String,
        service: String,
        target: Option<ServiceTarget>,
        service_data: Option<ServiceData>,
        reply: oneshot::Sender<Result<(u64, oneshot::Receiver<ResultFrame>)>>,
    },
    CancelRequest {
        id: u64,
    },
    Subscribe {
        event_type: Option<String>,
        reply: oneshot::Sender<Result<SubscribeHandles>>,
    },
    Unsubscribe {
        id: u64,
    },
}

/// Per-connection listener output, tagged with the connection generation so
/// the actor can discard signals from a superseded session.
struct Link {
    generation: u64,
    event: LinkEvent,
}

enum LinkEvent {
    Frame(ServerFrame),
    Closed(Option<String>),
}

struct SubscribeHandles {
    id: u64,
    ack: oneshot::Receiver<ResultFrame>,
    events: mpsc::Receiver<Value>,
}

/// Handle to the hub session; cheap to clone, all clones share one actor
#[derive(Clone)]
pub struct HubClient {
    cmd_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<ConnectionStatus>,
    rest: HubRestClient,
    request_timeout: Duration,
}

impl HubClient {
    /// Create the client and spawn its connection actor.
    ///
    /// The session starts disconnected; call [`connect`](Self::connect) or
    /// let the reconnect loop establish it. Must run inside a tokio runtime.
    pub fn new(config: HubConfig) -> Result<Self> {
        let rest = HubRestClient::new(&config)?;
        let request_timeout = config.request_timeout;

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus {
            max_reconnect_attempts: config.max_reconnect_attempts,
            ..ConnectionStatus::default()
        });

        let actor = ConnectionActor::new(config, cmd_rx, status_tx);
        tokio::spawn(actor.run());

        Ok(Self {
            cmd_tx,
            status_rx,
            rest,
            request_timeout,
        })
    }

    /// Open and authenticate the session.
    ///
    /// Returns true on success; failures are recorded in the status snapshot
    /// rather than raised. A no-op returning true when already connected.
    pub async fn connect(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Connect { reply: tx }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Close the session, clearing pending waiters and subscriptions
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Disconnect { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    /// Read-only snapshot of the session state
    pub fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    /// Whether the session is authenticated and live
    pub fn is_connected(&self) -> bool {
        self.status_rx.borrow().connected
    }

    /// Call a hub service.
    ///
    /// Over the live session each call gets its own message id and waiter;
    /// no response within the request timeout yields
    /// `{success: false, error: "timeout"}`. When the session is down, or
    /// the transport fails while sending or waiting, the call transparently
    /// retries over REST — callers never see the distinction and never get
    /// an `Err`.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        target: Option<ServiceTarget>,
        service_data: Option<ServiceData>,
    ) -> ServiceCallResult {
        if !self.is_connected() {
            warn!(domain, service, "WebSocket not connected, falling back to REST");
            return self
                .rest
                .call_service(domain, service, target.as_ref(), service_data.as_ref())
                .await;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let command = Command::CallService {
            domain: domain.to_string(),
            service: service.to_string(),
            target: target.clone(),
            service_data: service_data.clone(),
            reply: reply_tx,
        };

        let registered = match self.cmd_tx.send(command).await {
            Ok(()) => match reply_rx.await {
                Ok(Ok(pair)) => Some(pair),
                Ok(Err(e)) => {
                    warn!(domain, service, error = %e, "WebSocket send failed, falling back to REST");
                    None
                }
                Err(_) => None,
            },
            Err(_) => None,
        };

        let (id, result_rx) = match registered {
            Some(pair) => pair,
            None => {
                return self
                    .rest
                    .call_service(domain, service, target.as_ref(), service_data.as_ref())
                    .await
            }
        };

        match timeout(self.request_timeout, result_rx).await {
            Ok(Ok(frame)) => {
                if frame.success {
                    debug!(domain, service, "Service call succeeded");
                } else {
                    error!(domain, service, error = ?frame.error, "Service call failed");
                }
                ServiceCallResult {
                    success: frame.success,
                    error: frame.error_text(),
                    result: frame.result,
                }
            }
            Ok(Err(_)) => {
                // Broker teardown closed the waiter: the connection died
                // while this call was in flight.
                warn!(domain, service, "Connection lost awaiting response, falling back to REST");
                self.rest
                    .call_service(domain, service, target.as_ref(), service_data.as_ref())
                    .await
            }
            Err(_) => {
                error!(domain, service, "Service call timeout");
                let _ = self.cmd_tx.try_send(Command::CancelRequest { id });
                ServiceCallResult::timed_out()
            }
        }
    }

    /// Subscribe to hub events, optionally filtered by event type.
    ///
    /// Events arrive on a bounded mailbox; if the consumer falls behind the
    /// oldest unread events are dropped with a warning rather than stalling
    /// the listener.
    pub async fn subscribe_events(&self, event_type: Option<&str>) -> Result<EventSubscription> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Subscribe {
                event_type: event_type.map(str::to_string),
                reply: tx,
            })
            .await
            .map_err(|_| HubError::connection("Client is shut down"))?;
        let handles = rx
            .await
            .map_err(|_| HubError::connection("Client is shut down"))??;

        match timeout(self.request_timeout, handles.ack).await {
            Ok(Ok(frame)) if frame.success => Ok(EventSubscription {
                id: handles.id,
                events: handles.events,
                cmd_tx: self.cmd_tx.clone(),
            }),
            Ok(Ok(frame)) => {
                let _ = self.cmd_tx.try_send(Command::Unsubscribe { id: handles.id });
                Err(HubError::protocol(
                    frame
                        .error_text()
                        .unwrap_or_else(|| "Subscription rejected".to_string()),
                ))
            }
            Ok(Err(_)) => Err(HubError::connection("Connection lost during subscribe")),
            Err(_) => {
                let _ = self.cmd_tx.try_send(Command::CancelRequest { id: handles.id });
                let _ = self.cmd_tx.try_send(Command::Unsubscribe { id: handles.id });
                Err(HubError::timeout("No subscription acknowledgement"))
            }
        }
    }

    /// Fetch one of the hub's registries.
    ///
    /// Always routed over REST, independent of session state: bulk reads are
    /// more reliable there than over the socket.
    pub async fn fetch_registry(&self, kind: RegistryKind) -> Result<Vec<Value>> {
        self.rest.fetch_registry(kind).await
    }

    /// Fetch the flattened state list over REST
    pub async fn fetch_states(&self) -> Result<Vec<Value>> {
        self.rest.fetch_states().await
    }

    /// The underlying REST client
    pub fn rest(&self) -> &HubRestClient {
        &self.rest
    }
}

#[async_trait]
impl RegistrySource for HubClient {
    fn is_connected(&self) -> bool {
        HubClient::is_connected(self)
    }

    async fn fetch_registry(&self, kind: RegistryKind) -> Result<Vec<Value>> {
        HubClient::fetch_registry(self, kind).await
    }

    async fn fetch_states(&self) -> Result<Vec<Value>> {
        HubClient::fetch_states(self).await
    }
}

/// Live event subscription; dropping it unregisters the mailbox
pub struct EventSubscription {
    id: u64,
    events: mpsc::Receiver<Value>,
    cmd_tx: mpsc::Sender<Command>,
}

impl EventSubscription {
    /// Subscription id on the wire
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receive the next event; `None` once the connection is torn down
    pub async fn recv(&mut self) -> Option<Value> {
        self.events.recv().await
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(Command::Unsubscribe { id: self.id });
    }
}

/// The task that owns the connection
struct ConnectionActor {
    config: HubConfig,
    cmd_rx: mpsc::Receiver<Command>,
    link_tx: mpsc::Sender<Link>,
    link_rx: mpsc::Receiver<Link>,
    sink: Option<WsSink>,
    listener: Option<tokio::task::JoinHandle<()>>,
    generation: u64,
    broker: RequestBroker,
    subscriptions: HashMap<u64, mpsc::Sender<Value>>,
    status: ConnectionStatus,
    status_tx: watch::Sender<ConnectionStatus>,
    backoff: Duration,
    next_reconnect: Option<Instant>,
}

impl ConnectionActor {
    fn new(
        config: HubConfig,
        cmd_rx: mpsc::Receiver<Command>,
        status_tx: watch::Sender<ConnectionStatus>,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::channel(256);
        let status = status_tx.borrow().clone();
        let mut actor = Self {
            config,
            cmd_rx,
            link_tx,
            link_rx,
            sink: None,
            listener: None,
            generation: 0,
            broker: RequestBroker::new(),
            subscriptions: HashMap::new(),
            status,
            status_tx,
            backoff: INITIAL_BACKOFF,
            next_reconnect: None,
        };
        actor.schedule_reconnect();
        actor
    }

    async fn run(mut self) {
        let mut keepalive = tokio::time::interval(self.config.keepalive_interval);
        keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let reconnect_at = self.next_reconnect;
            tokio::select! {
                maybe_cmd = self.cmd_rx.recv() => {
                    match maybe_cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        // Every handle dropped: the process is shutting down.
                        None => break,
                    }
                }
                Some(link) = self.link_rx.recv() => {
                    self.handle_link(link).await;
                }
                _ = sleep_until_opt(reconnect_at) => {
                    self.next_reconnect = None;
                    if !self.status.connected {
                        self.reconnect_tick().await;
                    }
                }
                _ = keepalive.tick(), if self.status.connected => {
                    self.keepalive().await;
                }
            }
        }

        self.drop_connection(None).await;
        debug!("Connection actor stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { reply } => {
                let ok = if self.status.connected {
                    true
                } else {
                    let ok = self.establish().await;
                    if ok {
                        self.next_reconnect = None;
                    } else {
                        self.schedule_reconnect();
                    }
                    ok
                };
                let _ = reply.send(ok);
            }
            Command::Disconnect { reply } => {
                info!("Disconnecting from hub WebSocket");
                self.drop_connection(None).await;
                self.schedule_reconnect();
                let _ = reply.send(());
            }
            Command::CallService {
                domain,
                service,
                target,
                service_data,
                reply,
            } => {
                let registered = self.send_call(domain, service, target, service_data).await;
                let _ = reply.send(registered);
            }
            Command::CancelRequest { id } => self.broker.cancel(id),
            Command::Subscribe { event_type, reply } => {
                let handles = self.send_subscribe(event_type).await;
                let _ = reply.send(handles);
            }
            Command::Unsubscribe { id } => {
                self.subscriptions.remove(&id);
            }
        }
    }

    async fn handle_link(&mut self, link: Link) {
        if link.generation != self.generation {
            debug!(generation = link.generation, "Ignoring signal from stale connection");
            return;
        }

        match link.event {
            LinkEvent::Frame(ServerFrame::Result(result)) => {
                if !self.broker.complete(result) {
                    debug!("Result frame without a registered waiter");
                }
            }
            LinkEvent::Frame(ServerFrame::Event(event)) => self.dispatch_event(event),
            LinkEvent::Frame(other) => {
                debug!(frame = ?std::mem::discriminant(&other), "Ignoring out-of-band frame");
            }
            LinkEvent::Closed(reason) => {
                warn!(?reason, "Hub WebSocket connection closed");
                let error = reason.unwrap_or_else(|| "Connection closed".to_string());
                self.drop_connection(Some(error)).await;
                self.schedule_reconnect();
            }
        }
    }

    fn dispatch_event(&mut self, event: EventFrame) {
        match self.subscriptions.get(&event.id) {
            Some(tx) => match tx.try_send(event.event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(id = event.id, "Event mailbox full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(id = event.id, "Subscriber gone, removing subscription");
                    self.subscriptions.remove(&event.id);
                }
            },
            None => debug!(id = event.id, "Event for unknown subscription"),
        }
    }

    async fn send_call(
        &mut self,
        domain: String,
        service: String,
        target: Option<ServiceTarget>,
        service_data: Option<ServiceData>,
    ) -> Result<(u64, oneshot::Receiver<ResultFrame>)> {
        if self.sink.is_none() {
            return Err(HubError::connection("WebSocket not connected"));
        }

        let (id, rx) = self.broker.register();
        let frame = ClientFrame::CallService {
            id,
            domain,
            service,
            target,
            service_data: service_data.filter(|d| !d.is_empty()),
        };

        if let Err(e) = self.send_frame(frame.to_json()).await {
            self.broker.cancel(id);
            self.drop_connection(Some(e.to_string())).await;
            self.schedule_reconnect();
            return Err(e);
        }

        Ok((id, rx))
    }

    async fn send_subscribe(&mut self, event_type: Option<String>) -> Result<SubscribeHandles> {
        if self.sink.is_none() {
            return Err(HubError::connection("WebSocket not connected"));
        }

        let (id, ack) = self.broker.register();
        let (tx, events) = mpsc::channel(self.config.event_buffer);
        self.subscriptions.insert(id, tx);

        let frame = ClientFrame::SubscribeEvents { id, event_type };
        if let Err(e) = self.send_frame(frame.to_json()).await {
            self.broker.cancel(id);
            self.subscriptions.remove(&id);
            self.drop_connection(Some(e.to_string())).await;
            self.schedule_reconnect();
            return Err(e);
        }

        Ok(SubscribeHandles { id, ack, events })
    }

    async fn send_frame(&mut self, text: String) -> Result<()> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| HubError::connection("WebSocket not connected"))?;
        sink.send(Message::Text(text)).await.map_err(HubError::from)
    }

    async fn keepalive(&mut self) {
        let result = match self.sink.as_mut() {
            Some(sink) => sink.send(Message::Ping(Vec::new())).await,
            None => return,
        };
        if let Err(e) = result {
            warn!(error = %e, "Keepalive ping failed, dropping connection");
            self.drop_connection(Some(e.to_string())).await;
            self.schedule_reconnect();
        }
    }

    /// One pass of the reconnect loop: attempt, then back off or cool down
    async fn reconnect_tick(&mut self) {
        info!(
            attempt = self.status.reconnect_attempts + 1,
            ceiling = self.config.max_reconnect_attempts,
            "Reconnect attempt"
        );
        if self.establish().await {
            info!("Hub WebSocket reconnected");
            return;
        }

        self.status.reconnect_attempts += 1;
        let delay = if self.status.reconnect_attempts >= self.config.max_reconnect_attempts {
            warn!(
                cooldown = ?self.config.reconnect_cooldown,
                "Reconnect attempt ceiling reached, cooling down"
            );
            self.config.reconnect_cooldown
        } else {
            self.backoff = Duration::from_secs(
                2u64.saturating_pow(self.status.reconnect_attempts),
            )
            .min(self.config.reconnect_max_delay);
            self.backoff
        };
        self.publish_status();
        self.next_reconnect = Some(Instant::now() + delay);
    }

    /// Arm the reconnect timer if the loop should be running
    fn schedule_reconnect(&mut self) {
        if !self.config.auto_reconnect || self.status.connected || self.next_reconnect.is_some() {
            return;
        }
        let delay = if self.status.reconnect_attempts >= self.config.max_reconnect_attempts {
            self.config.reconnect_cooldown
        } else {
            self.backoff
        };
        self.next_reconnect = Some(Instant::now() + delay);
    }

    /// Open the transport and run the auth handshake within the connect window
    async fn establish(&mut self) -> bool {
        match timeout(self.config.connect_timeout, self.handshake()).await {
            Ok(Ok(ws)) => {
                let (sink, source) = ws.split();
                self.generation += 1;
                let handle = tokio::spawn(listen(source, self.link_tx.clone(), self.generation));

                self.sink = Some(sink);
                self.listener = Some(handle);
                self.status.connected = true;
                self.status.reconnect_attempts = 0;
                self.status.last_error = None;
                self.status.last_connection_time = Some(chrono::Utc::now());
                self.backoff = INITIAL_BACKOFF;
                self.publish_status();
                info!("Hub WebSocket connected and authenticated");
                true
            }
            Ok(Err(e)) => {
                error!(error = %e, "Hub WebSocket connection error");
                self.record_failure(e.to_string());
                false
            }
            Err(_) => {
                error!("Hub WebSocket connection timeout");
                self.record_failure("Connection timeout");
                false
            }
        }
    }

    async fn handshake(&self) -> Result<WsStream> {
        let ws_url = websocket_url(&self.config.url)?;
        debug!(url = %ws_url, "Connecting to hub WebSocket");

        let (mut ws, _) = connect_async(ws_url.as_str())
            .await
            .map_err(|e| HubError::connection(format!("WebSocket connection failed: {e}")))?;

        match read_frame(&mut ws).await? {
            ServerFrame::AuthRequired => {}
            _ => return Err(HubError::protocol("Expected auth_required frame")),
        }

        let auth = ClientFrame::Auth {
            access_token: self.config.token.clone(),
        };
        ws.send(Message::Text(auth.to_json())).await?;

        match read_frame(&mut ws).await? {
            ServerFrame::AuthOk => Ok(ws),
            ServerFrame::AuthInvalid { message } => Err(HubError::authentication(
                message.unwrap_or_else(|| "Unknown auth error".to_string()),
            )),
            _ => Err(HubError::protocol("Unexpected frame during auth handshake")),
        }
    }

    fn record_failure(&mut self, error: impl Into<String>) {
        self.status.last_error = Some(error.into());
        self.publish_status();
    }

    /// Tear the session down: close the transport, stop the listener, and
    /// clear the broker and subscription table. Waiters observe closed
    /// channels, which callers treat as a transport failure.
    async fn drop_connection(&mut self, error: Option<String>) {
        if let Some(mut sink) = self.sink.take() {
            let _ = sink.close().await;
        }
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.generation += 1;
        self.broker.clear();
        self.subscriptions.clear();

        self.status.connected = false;
        if let Some(e) = error {
            self.status.last_error = Some(e);
        }
        self.publish_status();
    }

    fn publish_status(&self) {
        let _ = self.status_tx.send(self.status.clone());
    }
}

/// Per-connection listener: reads frames strictly sequentially and forwards
/// them into the actor inbox. Malformed frames are logged and skipped; the
/// loop exits on transport closure after signalling the drop.
async fn listen(mut source: WsSource, link_tx: mpsc::Sender<Link>, generation: u64) {
    let send = |event: LinkEvent| {
        let link_tx = link_tx.clone();
        async move { link_tx.send(Link { generation, event }).await.is_ok() }
    };

    while let Some(message) = source.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => {
                    if !send(LinkEvent::Frame(frame)).await {
                        return;
                    }
                }
                Err(e) => error!(error = %e, "Invalid frame received, skipping"),
            },
            Ok(Message::Close(frame)) => {
                let reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                let _ = send(LinkEvent::Closed(reason)).await;
                return;
            }
            Ok(_) => {} // ping/pong/binary are not part of the control protocol
            Err(e) => {
                let _ = send(LinkEvent::Closed(Some(e.to_string()))).await;
                return;
            }
        }
    }

    let _ = send(LinkEvent::Closed(None)).await;
}

/// Read the next parseable frame during the auth handshake
async fn read_frame(ws: &mut WsStream) -> Result<ServerFrame> {
    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => return Ok(frame),
                Err(e) => error!(error = %e, "Invalid frame received, skipping"),
            },
            Message::Close(_) => {
                return Err(HubError::connection("Connection closed during handshake"))
            }
            _ => {}
        }
    }
    Err(HubError::connection("Connection closed during handshake"))
}

/// Derive the WebSocket endpoint from the hub base URL
fn websocket_url(base: &Url) -> Result<Url> {
    let mut ws_url = base.clone();
    match ws_url.scheme() {
        "http" => ws_url
            .set_scheme("ws")
            .map_err(|_| HubError::connection("Failed to derive WebSocket URL"))?,
        "https" => ws_url
            .set_scheme("wss")
            .map_err(|_| HubError::connection("Failed to derive WebSocket URL"))?,
        "ws" | "wss" => {}
        other => {
            return Err(HubError::connection(format!(
                "Unsupported URL scheme for WebSocket: {other}"
            )))
        }
    }

    if !ws_url.path().ends_with("/api/websocket") {
        let path = format!("{}/api/websocket", ws_url.path().trim_end_matches('/'));
        ws_url.set_path(&path);
    }
    Ok(ws_url)
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_ws_url_from_http_base() {
        let url = websocket_url(&"http://hub.local:8123".parse().unwrap()).unwrap();
        assert_eq!(url.as_str(), "ws://hub.local:8123/api/websocket");

        let url = websocket_url(&"https://hub.example.com/".parse().unwrap()).unwrap();
        assert_eq!(url.as_str(), "wss://hub.example.com/api/websocket");
    }

    #[test]
    fn keeps_existing_websocket_path() {
        let url = websocket_url(&"http://hub.local/api/websocket".parse().unwrap()).unwrap();
        assert_eq!(url.as_str(), "ws://hub.local/api/websocket");
    }
}
