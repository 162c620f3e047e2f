//! DXLink Client
//!
//! Owns one websocket connection to a DXLink gateway and exposes the
//! protocol as typed operations: connect and authenticate, open feed
//! channels, manage subscriptions, and consume demultiplexed events.
//!
//! # Lifecycle
//!
//! ```text
//! open()      websocket handshake + SETUP, returns immediately
//! connect()   open() + wait for AUTH_STATE AUTHORIZED (bounded)
//! subscribe*  lazily opens the event type's feed channel, then adds symbols
//! close()     cancels the receive loop and sends a websocket close frame
//! ```
//!
//! The connection is single-shot: any transport or protocol failure is
//! recorded as a terminal fault, the receive loop stops, and every consumer
//! queue yields the fault after draining.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::channels::{ChannelMap, ChannelPhase};
use super::codec::{CodecError, JsonCodec};
use super::heartbeat::Heartbeat;
use super::messages::{
    AuthRequest, ChannelCancel, ChannelRequest, DxLinkMessage, FeedSubscription, SetupRequest,
    SubscriptionEntry,
};
use super::queues::{EventSenders, FeedQueue, FeedQueues, feed_channels};
use super::state::{SessionState, StreamState, TerminalFault};
use crate::domain::events::{
    CandleEvent, EventType, QuoteEvent, SummaryEvent, TimeAndSaleEvent, TradeEvent,
};
use crate::domain::symbols;

// ============================================================================
// Error Type
// ============================================================================

/// Errors surfaced by the DXLink client.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The websocket transport failed.
    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The server violated the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The AUTH handshake did not complete in time.
    #[error("authentication timed out after {0:?}")]
    AuthTimeout(Duration),

    /// A requested feed channel was not acknowledged in time.
    #[error("feed channel for {event_type} did not open within {waited:?}")]
    ChannelOpenTimeout {
        /// Event type whose channel was requested.
        event_type: EventType,
        /// How long the client waited.
        waited: Duration,
    },

    /// The operation requires a completed AUTH handshake.
    #[error("operation requires an authenticated session")]
    NotAuthenticated,

    /// The connection has ended.
    #[error("stream terminated: {0}")]
    Terminated(#[from] TerminalFault),
}

/// Fold a receive-loop error into the fault consumers will observe.
fn terminal_fault(err: StreamError) -> TerminalFault {
    match err {
        StreamError::Terminated(fault) => fault,
        StreamError::Transport(e) => TerminalFault::Transport(e.to_string()),
        StreamError::Codec(e) => TerminalFault::Protocol(e.to_string()),
        StreamError::Protocol(reason) => TerminalFault::Protocol(reason),
        other => TerminalFault::Protocol(other.to_string()),
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for one DXLink connection.
#[derive(Clone)]
pub struct DxLinkConfig {
    /// Websocket URL of the DXLink gateway.
    pub url: String,
    /// API quote streamer token presented in the AUTH message.
    pub token: String,
    /// Assignment of event types to feed channels.
    pub channel_map: ChannelMap,
    /// Cadence of outbound KEEPALIVE frames.
    pub keepalive_interval: Duration,
    /// Keepalive timeout advertised in the SETUP handshake.
    pub keepalive_timeout: Duration,
    /// How long `connect` waits for `AUTH_STATE: AUTHORIZED`.
    pub auth_timeout: Duration,
    /// How long subscribe operations wait for `CHANNEL_OPENED`.
    pub channel_open_timeout: Duration,
}

impl DxLinkConfig {
    /// Default cadence of outbound KEEPALIVE frames.
    pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

    /// Default keepalive timeout advertised in SETUP.
    pub const DEFAULT_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Default bound on the AUTH handshake.
    pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default bound on feed channel opening.
    pub const DEFAULT_CHANNEL_OPEN_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a configuration with the default channel map and timings.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            channel_map: ChannelMap::DEFAULT,
            keepalive_interval: Self::DEFAULT_KEEPALIVE_INTERVAL,
            keepalive_timeout: Self::DEFAULT_KEEPALIVE_TIMEOUT,
            auth_timeout: Self::DEFAULT_AUTH_TIMEOUT,
            channel_open_timeout: Self::DEFAULT_CHANNEL_OPEN_TIMEOUT,
        }
    }
}

impl fmt::Debug for DxLinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DxLinkConfig")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .field("channel_map", &self.channel_map)
            .field("keepalive_interval", &self.keepalive_interval)
            .field("keepalive_timeout", &self.keepalive_timeout)
            .field("auth_timeout", &self.auth_timeout)
            .field("channel_open_timeout", &self.channel_open_timeout)
            .finish()
    }
}

// ============================================================================
// Message Writer
// ============================================================================

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Shared handle to the websocket write half.
///
/// The sink sits behind an async mutex so the client facade, the receive
/// loop, and the heartbeat task can interleave whole frames.
#[derive(Clone)]
pub(super) struct MessageWriter {
    sink: Arc<Mutex<WsSink>>,
    codec: JsonCodec,
}

impl MessageWriter {
    fn new(sink: WsSink) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            codec: JsonCodec::new(),
        }
    }

    /// Serialize a message and send it as one text frame.
    pub(super) async fn send_json<T: serde::Serialize>(
        &self,
        message: &T,
    ) -> Result<(), StreamError> {
        let json = self.codec.encode(message)?;
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Best-effort websocket close frame.
    async fn close(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(err) = sink.send(Message::Close(None)).await {
            tracing::debug!(error = %err, "close frame not delivered");
        }
    }
}

// ============================================================================
// DXLink Client
// ============================================================================

/// Outcome of waiting on the shared state cell.
enum WaitOutcome {
    Satisfied,
    Fault(TerminalFault),
    TimedOut,
}

/// Client facade for one DXLink websocket connection.
pub struct DxLinkClient {
    config: DxLinkConfig,
    state: Arc<StreamState>,
    writer: MessageWriter,
    queues: FeedQueues,
    cancel: CancellationToken,
    _shutdown: DropGuard,
}

impl fmt::Debug for DxLinkClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DxLinkClient")
            .field("config", &self.config)
            .field("session", &self.state.session())
            .finish_non_exhaustive()
    }
}

impl DxLinkClient {
    /// Establish the websocket connection and start the handshake.
    ///
    /// Returns as soon as SETUP has been sent; authentication completes in
    /// the background. Use [`Self::wait_authenticated`] (or [`Self::connect`],
    /// which combines both) before subscribing.
    ///
    /// # Errors
    ///
    /// Returns an error if the websocket connection or the SETUP send fails.
    pub async fn open(config: DxLinkConfig) -> Result<Self, StreamError> {
        let state = Arc::new(StreamState::new());
        state.set_session(SessionState::Connecting);

        tracing::info!(url = %config.url, "connecting to DXLink gateway");
        let (ws_stream, _response) = connect_async(&config.url).await?;
        let (write, read) = ws_stream.split();

        let writer = MessageWriter::new(write);
        let (senders, queues) = feed_channels(&state);
        let cancel = CancellationToken::new();

        // Handshake starts before the receive loop runs; the server's reply
        // waits in the socket buffer until the loop polls it.
        writer
            .send_json(&SetupRequest::new(config.keepalive_timeout.as_secs()))
            .await?;
        state.set_session(SessionState::SetupSent);

        let receive_loop = ReceiveLoop {
            read,
            codec: JsonCodec::new(),
            writer: writer.clone(),
            state: Arc::clone(&state),
            senders,
            channel_map: config.channel_map,
            token: config.token.clone(),
            keepalive_interval: config.keepalive_interval,
            cancel: cancel.clone(),
            heartbeat_started: false,
        };
        tokio::spawn(receive_loop.run());

        Ok(Self {
            config,
            state,
            writer,
            queues,
            _shutdown: cancel.clone().drop_guard(),
            cancel,
        })
    }

    /// Connect, then wait for the AUTH handshake to complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails, the server rejects the
    /// handshake, or authentication does not complete within the configured
    /// auth timeout. The connection is torn down on failure.
    pub async fn connect(config: DxLinkConfig) -> Result<Self, StreamError> {
        let client = Self::open(config).await?;
        match client.wait_authenticated().await {
            Ok(()) => Ok(client),
            Err(err) => {
                client.close().await;
                Err(err)
            }
        }
    }

    /// Wait for `AUTH_STATE: AUTHORIZED`, bounded by the auth timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::AuthTimeout`] if the handshake does not
    /// complete in time, or [`StreamError::Terminated`] if the connection
    /// fails first.
    pub async fn wait_authenticated(&self) -> Result<(), StreamError> {
        match self
            .await_state(self.config.auth_timeout, |state| {
                state.session().is_authenticated()
            })
            .await
        {
            WaitOutcome::Satisfied => Ok(()),
            WaitOutcome::Fault(fault) => Err(StreamError::Terminated(fault)),
            WaitOutcome::TimedOut => Err(StreamError::AuthTimeout(self.config.auth_timeout)),
        }
    }

    /// Current session state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.state.session()
    }

    /// Current phase of the feed channel for an event type.
    #[must_use]
    pub fn channel_phase(&self, event_type: EventType) -> ChannelPhase {
        self.state.phase(event_type)
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Subscribe to symbols for an event type.
    ///
    /// Opens the event type's feed channel first if this is the first
    /// subscription for it, waiting up to the channel-open timeout for the
    /// server's acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel does not open in time or the
    /// connection fails.
    pub async fn subscribe(
        &self,
        event_type: EventType,
        symbols: &[String],
    ) -> Result<(), StreamError> {
        self.ensure_channel_open(event_type).await?;

        let entries = symbols
            .iter()
            .map(|symbol| SubscriptionEntry::new(symbol.clone(), event_type))
            .collect();
        let channel = self.config.channel_map.channel(event_type);
        tracing::debug!(%event_type, channel, count = symbols.len(), "adding subscriptions");
        self.writer
            .send_json(&FeedSubscription::add(channel, entries))
            .await
    }

    /// Remove symbol subscriptions for an event type.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::NotAuthenticated`] when called before the
    /// AUTH handshake has completed.
    pub async fn unsubscribe(
        &self,
        event_type: EventType,
        symbols: &[String],
    ) -> Result<(), StreamError> {
        if !self.state.session().is_authenticated() {
            return Err(StreamError::NotAuthenticated);
        }

        let entries = symbols
            .iter()
            .map(|symbol| SubscriptionEntry::new(symbol.clone(), event_type))
            .collect();
        let channel = self.config.channel_map.channel(event_type);
        tracing::debug!(%event_type, channel, count = symbols.len(), "removing subscriptions");
        self.writer
            .send_json(&FeedSubscription::remove(channel, entries))
            .await
    }

    /// Subscribe to quotes for the given symbols.
    ///
    /// # Errors
    ///
    /// See [`Self::subscribe`].
    pub async fn subscribe_quotes(&self, symbols: &[String]) -> Result<(), StreamError> {
        self.subscribe(EventType::Quote, symbols).await
    }

    /// Remove quote subscriptions for the given symbols.
    ///
    /// # Errors
    ///
    /// See [`Self::unsubscribe`].
    pub async fn unsubscribe_quotes(&self, symbols: &[String]) -> Result<(), StreamError> {
        self.unsubscribe(EventType::Quote, symbols).await
    }

    /// Subscribe to candles for one symbol.
    ///
    /// The symbol is encoded with the aggregation period (and the extended
    /// trading hours marker when requested), and the subscription replays
    /// history from `start_time`.
    ///
    /// # Errors
    ///
    /// See [`Self::subscribe`].
    pub async fn subscribe_candles(
        &self,
        symbol: &str,
        interval: &str,
        extended_trading_hours: bool,
        start_time: DateTime<Utc>,
    ) -> Result<(), StreamError> {
        self.ensure_channel_open(EventType::Candle).await?;

        let entry = SubscriptionEntry::candle(
            symbols::candle_symbol(symbol, interval, extended_trading_hours),
            start_time.timestamp_millis(),
        );
        let channel = self.config.channel_map.channel(EventType::Candle);
        tracing::debug!(symbol = %entry.symbol, from_time = ?entry.from_time, channel, "adding candle subscription");
        self.writer
            .send_json(&FeedSubscription::add(channel, vec![entry]))
            .await
    }

    /// Remove a candle subscription for one symbol.
    ///
    /// # Errors
    ///
    /// See [`Self::unsubscribe`].
    pub async fn unsubscribe_candles(
        &self,
        symbol: &str,
        interval: &str,
        extended_trading_hours: bool,
    ) -> Result<(), StreamError> {
        if !self.state.session().is_authenticated() {
            return Err(StreamError::NotAuthenticated);
        }

        let entry = SubscriptionEntry::new(
            symbols::candle_symbol(symbol, interval, extended_trading_hours),
            EventType::Candle,
        );
        let channel = self.config.channel_map.channel(EventType::Candle);
        tracing::debug!(symbol = %entry.symbol, channel, "removing candle subscription");
        self.writer
            .send_json(&FeedSubscription::remove(channel, vec![entry]))
            .await
    }

    /// Close the feed channel for an event type.
    ///
    /// The phase is reset optimistically; the server's CHANNEL_CLOSED
    /// confirmation is handled like any other close.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::NotAuthenticated`] when called before the
    /// AUTH handshake has completed.
    pub async fn cancel_channel(&self, event_type: EventType) -> Result<(), StreamError> {
        if !self.state.session().is_authenticated() {
            return Err(StreamError::NotAuthenticated);
        }

        let channel = self.config.channel_map.channel(event_type);
        tracing::debug!(%event_type, channel, "cancelling feed channel");
        self.state.set_phase(event_type, ChannelPhase::Closed);
        self.writer.send_json(&ChannelCancel::new(channel)).await
    }

    /// Open the feed channel for `event_type` if it is not open yet, then
    /// wait for the server's acknowledgement.
    async fn ensure_channel_open(&self, event_type: EventType) -> Result<(), StreamError> {
        if self.state.phase(event_type).is_opened() {
            return Ok(());
        }

        if self.state.try_begin_request(event_type) {
            let channel = self.config.channel_map.channel(event_type);
            tracing::debug!(%event_type, channel, "requesting feed channel");
            if let Err(err) = self.writer.send_json(&ChannelRequest::feed(channel)).await {
                self.state.set_phase(event_type, ChannelPhase::Closed);
                return Err(err);
            }
        }

        match self
            .await_state(self.config.channel_open_timeout, |state| {
                state.phase(event_type).is_opened()
            })
            .await
        {
            WaitOutcome::Satisfied => Ok(()),
            WaitOutcome::Fault(fault) => Err(StreamError::Terminated(fault)),
            WaitOutcome::TimedOut => Err(StreamError::ChannelOpenTimeout {
                event_type,
                waited: self.config.channel_open_timeout,
            }),
        }
    }

    /// Wait until `predicate` holds, the connection terminates, or `limit`
    /// elapses.
    async fn await_state<F>(&self, limit: Duration, predicate: F) -> WaitOutcome
    where
        F: Fn(&StreamState) -> bool,
    {
        let mut watcher = self.state.watch();
        let wait = async {
            loop {
                if predicate(&self.state) {
                    return WaitOutcome::Satisfied;
                }
                if let Some(fault) = self.state.fault() {
                    return WaitOutcome::Fault(fault);
                }
                if self.state.session().is_closed() {
                    return WaitOutcome::Fault(TerminalFault::Closed);
                }
                if watcher.changed().await.is_err() {
                    return WaitOutcome::Fault(TerminalFault::Closed);
                }
            }
        };

        match tokio::time::timeout(limit, wait).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => WaitOutcome::TimedOut,
        }
    }

    // ------------------------------------------------------------------
    // Consumers
    // ------------------------------------------------------------------

    /// Queue handle for candle events.
    #[must_use]
    pub fn candles(&self) -> FeedQueue<CandleEvent> {
        self.queues.candles.clone()
    }

    /// Queue handle for quote events.
    #[must_use]
    pub fn quotes(&self) -> FeedQueue<QuoteEvent> {
        self.queues.quotes.clone()
    }

    /// Queue handle for summary events.
    #[must_use]
    pub fn summaries(&self) -> FeedQueue<SummaryEvent> {
        self.queues.summaries.clone()
    }

    /// Queue handle for time and sale events.
    #[must_use]
    pub fn time_and_sales(&self) -> FeedQueue<TimeAndSaleEvent> {
        self.queues.time_and_sales.clone()
    }

    /// Queue handle for trade events.
    #[must_use]
    pub fn trades(&self) -> FeedQueue<TradeEvent> {
        self.queues.trades.clone()
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    /// Close the connection.
    ///
    /// Stops the receive loop and heartbeat, sends a best-effort websocket
    /// close frame, and unblocks every consumer with the terminal state.
    pub async fn close(&self) {
        tracing::info!("closing DXLink connection");
        self.cancel.cancel();
        self.writer.close().await;
    }
}

// ============================================================================
// Receive Loop
// ============================================================================

/// Background task that drives one connection.
///
/// Owns the websocket read half and the queue senders. On exit it records
/// the terminal fault (if any), marks the session closed, cancels the
/// heartbeat, and drops the senders so consumers drain and terminate.
struct ReceiveLoop {
    read: WsSource,
    codec: JsonCodec,
    writer: MessageWriter,
    state: Arc<StreamState>,
    senders: EventSenders,
    channel_map: ChannelMap,
    token: String,
    keepalive_interval: Duration,
    cancel: CancellationToken,
    heartbeat_started: bool,
}

impl ReceiveLoop {
    async fn run(mut self) {
        match self.run_inner().await {
            Ok(()) => tracing::info!("DXLink stream closed"),
            Err(err) => {
                let fault = terminal_fault(err);
                tracing::warn!(%fault, "DXLink stream failed");
                self.state.record_fault(fault);
            }
        }
        self.state.set_session(SessionState::Closed);
        self.cancel.cancel();
        // Dropping self.senders here closes every consumer queue.
    }

    async fn run_inner(&mut self) -> Result<(), StreamError> {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("receive loop cancelled");
                    return Ok(());
                }
                frame = self.read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_frame(&text).await?,
                        Some(Ok(Message::Ping(payload))) => {
                            let mut sink = self.writer.sink.lock().await;
                            sink.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "server sent close frame");
                            return Err(StreamError::Terminated(TerminalFault::Closed));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(err.into()),
                        None => {
                            tracing::info!("websocket stream ended");
                            return Err(StreamError::Terminated(TerminalFault::Closed));
                        }
                    }
                }
            }
        }
    }

    async fn handle_frame(&mut self, text: &str) -> Result<(), StreamError> {
        match self.codec.decode(text)? {
            DxLinkMessage::Setup(setup) => {
                tracing::debug!(version = ?setup.version, "SETUP acknowledged");
                if self.state.session() == SessionState::SetupSent {
                    self.writer
                        .send_json(&AuthRequest::new(self.token.clone()))
                        .await?;
                    self.state.set_session(SessionState::Authenticating);
                }
            }
            DxLinkMessage::AuthState(auth) => {
                if auth.is_authorized() {
                    tracing::info!(user_id = ?auth.user_id, "DXLink session authenticated");
                    self.state.set_session(SessionState::Authenticated);
                    self.start_heartbeat();
                } else if self.state.session().is_authenticated() {
                    return Err(StreamError::Protocol(
                        "server revoked authorization".to_string(),
                    ));
                }
                // UNAUTHORIZED before our AUTH lands is normal handshake noise.
            }
            DxLinkMessage::ChannelOpened(opened) => {
                let Some(event_type) = self.channel_map.event_type(opened.channel) else {
                    return Err(StreamError::Protocol(format!(
                        "CHANNEL_OPENED for unmapped channel {}",
                        opened.channel
                    )));
                };
                tracing::info!(channel = opened.channel, %event_type, "feed channel opened");
                self.state.set_phase(event_type, ChannelPhase::Opened);
            }
            DxLinkMessage::ChannelClosed(closed) => {
                if let Some(event_type) = self.channel_map.event_type(closed.channel) {
                    tracing::info!(channel = closed.channel, %event_type, "feed channel closed");
                    self.state.set_phase(event_type, ChannelPhase::Closed);
                } else {
                    tracing::debug!(channel = closed.channel, "CHANNEL_CLOSED for unmapped channel");
                }
            }
            DxLinkMessage::FeedConfig(config) => {
                tracing::debug!(
                    channel = config.channel,
                    data_format = ?config.data_format,
                    aggregation_period = ?config.aggregation_period,
                    "feed channel configured"
                );
            }
            DxLinkMessage::FeedData(batch) => {
                for event in self.codec.decode_feed_items(batch.data)? {
                    if !self.senders.dispatch(event) {
                        tracing::trace!("discarding event for dropped consumer queue");
                    }
                }
            }
            DxLinkMessage::Keepalive(_) => {
                tracing::trace!("server keepalive");
            }
            DxLinkMessage::Error(err) => {
                return Err(StreamError::Protocol(format!(
                    "server error {}: {}",
                    err.error, err.message
                )));
            }
        }
        Ok(())
    }

    /// Start the keepalive heartbeat exactly once, after authentication.
    fn start_heartbeat(&mut self) {
        if self.heartbeat_started {
            return;
        }
        self.heartbeat_started = true;
        tracing::debug!(interval = ?self.keepalive_interval, "starting keepalive heartbeat");
        let heartbeat = Heartbeat::new(
            self.writer.clone(),
            self.keepalive_interval,
            Arc::clone(&self.state),
            self.cancel.clone(),
        );
        tokio::spawn(heartbeat.run());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = DxLinkConfig::new("wss://example.invalid/dxlink", "tok");
        assert_eq!(config.channel_map, ChannelMap::DEFAULT);
        assert_eq!(config.keepalive_interval, Duration::from_secs(30));
        assert_eq!(config.keepalive_timeout, Duration::from_secs(60));
        assert_eq!(config.auth_timeout, Duration::from_secs(10));
        assert_eq!(config.channel_open_timeout, Duration::from_secs(10));
    }

    #[test]
    fn config_debug_redacts_token() {
        let config = DxLinkConfig::new("wss://example.invalid/dxlink", "super-secret-token");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("example.invalid"));
    }

    #[test]
    fn receive_errors_fold_into_faults() {
        assert_eq!(
            terminal_fault(StreamError::Protocol("bad".to_string())),
            TerminalFault::Protocol("bad".to_string())
        );
        assert_eq!(
            terminal_fault(StreamError::Terminated(TerminalFault::Closed)),
            TerminalFault::Closed
        );

        let codec_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        match terminal_fault(StreamError::Codec(CodecError::Json(codec_err))) {
            TerminalFault::Protocol(reason) => assert!(reason.contains("JSON")),
            other => panic!("expected protocol fault, got {other:?}"),
        }
    }
}
