//! Main WebSocket client implementation.
//!
//! Multiplexes any number of local pair and table streams over one scanner
//! connection, with automatic reconnect and subscription replay.

use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rand::Rng;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::network::DEFAULT_WS_URL;
use crate::shared::types::{PairIdentity, ScannerFilter};
use crate::websocket::error::{WebSocketError, WsResult};
use crate::websocket::handlers::MessageHandler;
use crate::websocket::registry::{BroadcastRegistry, ListenerId};
use crate::websocket::subscriptions::SubscriptionManager;
use crate::websocket::types::{OutboundMessage, PairUpdate, TableSnapshot, WsEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Connection timeout duration for WebSocket connections
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Number of reconnect attempts before giving up
    pub reconnect_attempts: u32,
    /// Base delay for exponential backoff (ms)
    pub base_delay_ms: u64,
    /// Maximum delay for exponential backoff (ms)
    pub max_delay_ms: u64,
    /// Whether to automatically reconnect on disconnect
    pub auto_reconnect: bool,
    /// Whether to automatically re-subscribe after reconnect
    pub auto_resubscribe: bool,
    /// Capacity of the event channel. Default: 1000
    pub event_channel_capacity: usize,
    /// Capacity of the command channel. Default: 100
    pub command_channel_capacity: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: 10,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            auto_reconnect: true,
            auto_resubscribe: true,
            event_channel_capacity: 1000,
            command_channel_capacity: 100,
        }
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

const STATE_CONNECTING: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Internal command for the connection task
enum ConnectionCommand {
    Send(String),
    Disconnect,
}

/// State shared between the client, its subscription guards, and the connection task.
struct ClientShared {
    subscriptions: SubscriptionManager,
    pair_registry: Arc<BroadcastRegistry<PairUpdate>>,
    table_registry: Arc<BroadcastRegistry<TableSnapshot>>,
    state: AtomicU8,
    cmd_tx: mpsc::Sender<ConnectionCommand>,
}

impl ClientShared {
    fn state(&self) -> ConnectionState {
        match self.state.load(Ordering::Acquire) {
            STATE_OPEN => ConnectionState::Open,
            STATE_CLOSED => ConnectionState::Closed,
            _ => ConnectionState::Connecting,
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let value = match state {
            ConnectionState::Connecting => STATE_CONNECTING,
            ConnectionState::Open => STATE_OPEN,
            ConnectionState::Closed => STATE_CLOSED,
        };
        self.state.store(value, Ordering::Release);
    }

    /// Queue a control frame when the connection is open. Anything else is a silent
    /// no-op; the replay set picks the frame up on the next (re)connect.
    fn send_if_open(&self, msg: &OutboundMessage) -> bool {
        if self.state() != ConnectionState::Open {
            return false;
        }
        match msg.encode() {
            Some(text) => self.cmd_tx.try_send(ConnectionCommand::Send(text)).is_ok(),
            None => false,
        }
    }
}

pin_project! {
    /// Main WebSocket client for the Pairstream scanner
    ///
    /// # Example
    ///
    /// ```ignore
    /// use pairstream::websocket::*;
    /// use pairstream::shared::PairIdentity;
    /// use futures_util::StreamExt;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), WebSocketError> {
    ///     let mut client = PairstreamWebSocketClient::connect_default().await?;
    ///
    ///     let identity = PairIdentity::new("0xPAIR", "0xTOKEN", "ETH");
    ///     let _sub = client.subscribe_pair(&identity, |update| {
    ///         println!("update: {:?}", update);
    ///     });
    ///
    ///     while let Some(event) = client.next().await {
    ///         if let WsEvent::PairUpdated { key } = event {
    ///             println!("pair updated: {}", key);
    ///         }
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub struct PairstreamWebSocketClient {
        url: String,
        config: WebSocketConfig,
        shared: Arc<ClientShared>,
        #[pin]
        event_rx: mpsc::Receiver<WsEvent>,
        connection_task_handle: Option<tokio::task::JoinHandle<()>>,
    }
}

impl PairstreamWebSocketClient {
    /// Connect to the default Pairstream WebSocket server.
    pub async fn connect_default() -> WsResult<Self> {
        Self::connect_with_config(DEFAULT_WS_URL, WebSocketConfig::default()).await
    }

    /// Connect to a WebSocket server with default configuration
    pub async fn connect(url: &str) -> WsResult<Self> {
        Self::connect_with_config(url, WebSocketConfig::default()).await
    }

    /// Connect to a WebSocket server with custom configuration
    pub async fn connect_with_config(url: &str, config: WebSocketConfig) -> WsResult<Self> {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_capacity);

        let pair_registry = Arc::new(BroadcastRegistry::new());
        let table_registry = Arc::new(BroadcastRegistry::new());
        let handler = Arc::new(MessageHandler::new(
            pair_registry.clone(),
            table_registry.clone(),
        ));

        let shared = Arc::new(ClientShared {
            subscriptions: SubscriptionManager::new(),
            pair_registry,
            table_registry,
            state: AtomicU8::new(STATE_CONNECTING),
            cmd_tx,
        });

        let ws_stream = open_connection(url).await?;
        let (sink, source) = ws_stream.split();

        shared.set_state(ConnectionState::Open);

        let ctx = ConnectionContext {
            handler,
            event_tx: event_tx.clone(),
            config: config.clone(),
            shared: shared.clone(),
            url: url.to_string(),
        };
        let handle = tokio::spawn(connection_task(sink, source, cmd_rx, ctx));

        let _ = event_tx.send(WsEvent::Connected).await;

        Ok(Self {
            url: url.to_string(),
            config,
            shared,
            event_rx,
            connection_task_handle: Some(handle),
        })
    }

    /// Subscribe to one pair's tick and stats stream.
    ///
    /// Subscriptions are reference counted: only the first listener for a pair puts a
    /// subscribe frame on the wire, later listeners share the stream. The returned
    /// guard detaches the listener when dropped and sends the unsubscribe frame once
    /// the last listener leaves.
    pub fn subscribe_pair(
        &self,
        identity: &PairIdentity,
        listener: impl Fn(&PairUpdate) + Send + Sync + 'static,
    ) -> PairSubscription {
        let key = identity.subscription_key();
        let listener_id = self
            .shared
            .pair_registry
            .add_listener(&key, Arc::new(listener));

        if self.shared.subscriptions.pairs.add(&key, identity.clone()) {
            let sent = self
                .shared
                .send_if_open(&OutboundMessage::subscribe_pair(identity));
            self.shared.subscriptions.pairs.set_wire_active(&key, sent);
        }

        PairSubscription {
            shared: self.shared.clone(),
            key,
            listener_id,
            active: true,
        }
    }

    /// Subscribe to a table view's snapshots for a scanner filter.
    ///
    /// Two filters differing only in volatile fields share one stream; the guard works
    /// like [`Self::subscribe_pair`]'s.
    pub fn subscribe_filter(
        &self,
        filter: &ScannerFilter,
        listener: impl Fn(&TableSnapshot) + Send + Sync + 'static,
    ) -> FilterSubscription {
        let key = filter.subscription_key();
        let listener_id = self
            .shared
            .table_registry
            .add_listener(&key, Arc::new(listener));

        if self.shared.subscriptions.filters.add(&key, filter.clone()) {
            let sent = self
                .shared
                .send_if_open(&OutboundMessage::scanner_filter(filter));
            self.shared
                .subscriptions
                .filters
                .set_wire_active(&key, sent);
        }

        FilterSubscription {
            shared: self.shared.clone(),
            key,
            listener_id,
            active: true,
        }
    }

    /// Disconnect from the server
    pub async fn disconnect(&mut self) -> WsResult<()> {
        self.shared.set_state(ConnectionState::Closed);

        let _ = self
            .shared
            .cmd_tx
            .send(ConnectionCommand::Disconnect)
            .await;

        // Wait for the connection task to finish
        if let Some(handle) = self.connection_task_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }

    /// Check if the connection task is still running
    pub fn is_task_running(&self) -> bool {
        self.connection_task_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Get the current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Open
    }

    /// Number of listeners sharing the pair stream under `key`
    pub fn pair_listener_count(&self, key: &str) -> usize {
        self.shared.subscriptions.pairs.listener_count(key)
    }

    /// Number of listeners sharing the table stream under `key`
    pub fn filter_listener_count(&self, key: &str) -> usize {
        self.shared.subscriptions.filters.listener_count(key)
    }

    /// Get the WebSocket URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the configuration
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

impl Stream for PairstreamWebSocketClient {
    type Item = WsEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        this.event_rx.poll_recv(cx)
    }
}

/// Guard for one pair-stream listener registration.
#[must_use = "dropping the guard unsubscribes the listener"]
pub struct PairSubscription {
    shared: Arc<ClientShared>,
    key: String,
    listener_id: ListenerId,
    active: bool,
}

impl PairSubscription {
    /// Subscription key this listener is registered under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Detach explicitly instead of through `Drop`.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.shared
            .pair_registry
            .remove_listener(&self.key, self.listener_id);
        if let Some(identity) = self.shared.subscriptions.pairs.remove(&self.key) {
            self.shared
                .send_if_open(&OutboundMessage::unsubscribe_pair(&identity));
        }
    }
}

impl Drop for PairSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Guard for one table-stream listener registration.
#[must_use = "dropping the guard unsubscribes the listener"]
pub struct FilterSubscription {
    shared: Arc<ClientShared>,
    key: String,
    listener_id: ListenerId,
    active: bool,
}

impl FilterSubscription {
    /// Subscription key this listener is registered under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Detach explicitly instead of through `Drop`.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.shared
            .table_registry
            .remove_listener(&self.key, self.listener_id);
        if let Some(filter) = self.shared.subscriptions.filters.remove(&self.key) {
            self.shared
                .send_if_open(&OutboundMessage::unsubscribe_scanner_filter(&filter));
        }
    }
}

impl Drop for FilterSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Shared context for the connection task
struct ConnectionContext {
    handler: Arc<MessageHandler>,
    event_tx: mpsc::Sender<WsEvent>,
    config: WebSocketConfig,
    shared: Arc<ClientShared>,
    url: String,
}

/// Connection task that handles the WebSocket connection
async fn connection_task(
    mut sink: WsSink,
    mut source: WsSource,
    mut cmd_rx: mpsc::Receiver<ConnectionCommand>,
    ctx: ConnectionContext,
) {
    loop {
        tokio::select! {
            // Handle incoming WebSocket messages
            msg = source.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let events = ctx.handler.handle_message(&text);
                        for event in events {
                            // Use try_send to avoid blocking the connection task if
                            // the consumer is slow
                            match ctx.event_tx.try_send(event) {
                                Ok(_) => {}
                                Err(mpsc::error::TrySendError::Full(dropped_event)) => {
                                    tracing::warn!(
                                        "Event channel full, dropping event: {:?}",
                                        std::mem::discriminant(&dropped_event)
                                    );
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => {
                                    tracing::debug!("Event receiver dropped");
                                    return;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            tracing::warn!("Failed to send pong: {}", e);
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .as_ref()
                            .map(|f| format!("code: {}, reason: {}", f.code, f.reason))
                            .unwrap_or_else(|| "no reason".to_string());

                        tracing::info!("WebSocket closed: {}", reason);
                        let _ = ctx.event_tx.send(WsEvent::Disconnected { reason }).await;

                        match run_reconnect(&ctx).await {
                            Some((new_sink, new_source)) => {
                                sink = new_sink;
                                source = new_source;
                            }
                            None => return,
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        // Ignore binary messages
                    }
                    Some(Ok(Message::Frame(_))) => {
                        // Ignore raw frames
                    }
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        let _ = ctx.event_tx.send(WsEvent::Error {
                            error: WebSocketError::from(e),
                        }).await;
                    }
                    None => {
                        tracing::info!("WebSocket stream ended");
                        let _ = ctx.event_tx.send(WsEvent::Disconnected {
                            reason: "Stream ended".to_string(),
                        }).await;

                        match run_reconnect(&ctx).await {
                            Some((new_sink, new_source)) => {
                                sink = new_sink;
                                source = new_source;
                            }
                            None => return,
                        }
                    }
                }
            }

            // Handle commands from the client
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnectionCommand::Send(text)) => {
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            tracing::warn!("Failed to send message: {}", e);
                        }
                    }
                    Some(ConnectionCommand::Disconnect) => {
                        let _ = sink.send(Message::Close(Some(CloseFrame {
                            code: tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode::Normal,
                            reason: "Client disconnect".into(),
                        }))).await;
                        return;
                    }
                    None => {
                        // Command channel closed
                        return;
                    }
                }
            }
        }
    }
}

/// Run the backoff/reconnect loop after a non-intentional close.
///
/// Returns the new halves on success, `None` when the client asked to close or the
/// attempt budget ran out.
async fn run_reconnect(ctx: &ConnectionContext) -> Option<(WsSink, WsSource)> {
    if ctx.shared.state() == ConnectionState::Closed || !ctx.config.auto_reconnect {
        ctx.shared.set_state(ConnectionState::Closed);
        return None;
    }

    ctx.shared.set_state(ConnectionState::Connecting);
    ctx.shared.subscriptions.mark_all_inactive();

    let mut attempt = 0u32;
    while attempt < ctx.config.reconnect_attempts {
        attempt += 1;
        let _ = ctx.event_tx.send(WsEvent::Reconnecting { attempt }).await;

        // Full jitter: randomize between 0 and the exponential delay to prevent
        // thundering herd
        let max_delay = ctx.config.base_delay_ms * 2u64.pow(attempt.saturating_sub(1));
        let jittered_delay = rand::thread_rng().gen_range(0..=max_delay);
        let delay = jittered_delay.min(ctx.config.max_delay_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if ctx.shared.state() == ConnectionState::Closed {
            return None;
        }

        match open_connection(&ctx.url).await {
            Ok(ws_stream) => {
                let (mut sink, source) = ws_stream.split();
                // Flip to Open before replaying: a subscribe arriving from here on
                // either reaches the command channel itself or is still pending when
                // the replay loop reads the set.
                ctx.shared.set_state(ConnectionState::Open);
                if ctx.config.auto_resubscribe {
                    replay_pending(&mut sink, &ctx.shared).await;
                }
                let _ = ctx.event_tx.send(WsEvent::Connected).await;
                return Some((sink, source));
            }
            Err(e) => {
                tracing::error!("Reconnect failed: {:?}", e);
                let _ = ctx.event_tx.send(WsEvent::Error { error: e }).await;
            }
        }
    }

    ctx.shared.set_state(ConnectionState::Closed);
    None
}

/// Replay every topic that has listeners but no live wire subscription.
///
/// Loops until the pending set drains so a subscribe landing while a replay pass is
/// in flight still reaches the wire. A send failure stops the replay; the connection
/// is dead and the next reconnect picks the set up again.
async fn replay_pending(sink: &mut WsSink, shared: &ClientShared) {
    loop {
        let pairs = shared.subscriptions.pairs.pending_payloads();
        let filters = shared.subscriptions.filters.pending_payloads();
        if pairs.is_empty() && filters.is_empty() {
            return;
        }
        for (key, identity) in pairs {
            if !send_frame(sink, &OutboundMessage::subscribe_pair(&identity)).await {
                return;
            }
            shared.subscriptions.pairs.set_wire_active(&key, true);
        }
        for (key, filter) in filters {
            if !send_frame(sink, &OutboundMessage::scanner_filter(&filter)).await {
                return;
            }
            shared.subscriptions.filters.set_wire_active(&key, true);
        }
    }
}

async fn open_connection(url: &str) -> WsResult<WsStream> {
    let (stream, _) = tokio::time::timeout(CONNECTION_TIMEOUT, connect_async(url))
        .await
        .map_err(|_| WebSocketError::Timeout)?
        .map_err(WebSocketError::from)?;
    Ok(stream)
}

async fn send_frame(sink: &mut WsSink, msg: &OutboundMessage) -> bool {
    let Some(text) = msg.encode() else {
        return false;
    };
    match sink.send(Message::Text(text.into())).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to re-subscribe after reconnect: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = WebSocketConfig::default();
        assert_eq!(config.reconnect_attempts, 10);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 30000);
        assert!(config.auto_reconnect);
        assert!(config.auto_resubscribe);
        assert_eq!(config.event_channel_capacity, 1000);
        assert_eq!(config.command_channel_capacity, 100);
    }

    #[test]
    fn test_backoff_calculation() {
        let config = WebSocketConfig::default();

        // First attempt
        let delay = config.base_delay_ms * 2u64.pow(0);
        assert_eq!(delay, 1000);

        // Second attempt
        let delay = config.base_delay_ms * 2u64.pow(1);
        assert_eq!(delay, 2000);

        // Should cap at max
        let delay = config.base_delay_ms * 2u64.pow(10);
        let capped = delay.min(config.max_delay_ms);
        assert_eq!(capped, 30000);
    }

    #[test]
    fn test_guard_bookkeeping_without_connection() {
        let (cmd_tx, _cmd_rx) = mpsc::channel(8);
        let shared = Arc::new(ClientShared {
            subscriptions: SubscriptionManager::new(),
            pair_registry: Arc::new(BroadcastRegistry::new()),
            table_registry: Arc::new(BroadcastRegistry::new()),
            state: AtomicU8::new(STATE_CONNECTING),
            cmd_tx,
        });

        let identity = PairIdentity::new("0xP", "0xT", "ETH");
        let key = identity.subscription_key();

        // Not open: no frame goes out, but the topic is queued for replay.
        assert!(!shared.send_if_open(&OutboundMessage::subscribe_pair(&identity)));

        let mut guard = PairSubscription {
            shared: shared.clone(),
            key: key.clone(),
            listener_id: shared
                .pair_registry
                .add_listener(&key, Arc::new(|_: &PairUpdate| {})),
            active: true,
        };
        shared.subscriptions.pairs.add(&key, identity.clone());
        shared
            .pair_registry
            .add_listener(&key, Arc::new(|_: &PairUpdate| {}));
        shared.subscriptions.pairs.add(&key, identity);
        assert_eq!(shared.subscriptions.pairs.listener_count(&key), 2);
        assert_eq!(shared.subscriptions.pairs.pending_payloads().len(), 1);

        guard.release();
        assert_eq!(shared.subscriptions.pairs.listener_count(&key), 1);
        // Releasing twice is a no-op.
        guard.release();
        assert_eq!(shared.subscriptions.pairs.listener_count(&key), 1);
    }
}
