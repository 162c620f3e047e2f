//! DXLink Wire Message Types
//!
//! Wire format types for the DXLink websocket protocol. Every frame is a
//! single JSON object with a `type` discriminator and a `channel` number.
//! Channel 0 carries the control conversation; feed channels carry
//! subscription management and market data.
//!
//! # Message Types
//!
//! ## Control (channel 0)
//! - `SETUP`: Protocol handshake, exchanged in both directions
//! - `AUTH`: Token authentication (client -> server)
//! - `AUTH_STATE`: Authentication status (server -> client)
//! - `KEEPALIVE`: Liveness heartbeat, exchanged in both directions
//! - `ERROR`: Server-reported protocol error
//!
//! ## Feed channels
//! - `CHANNEL_REQUEST` / `CHANNEL_OPENED` / `CHANNEL_CANCEL` / `CHANNEL_CLOSED`
//! - `FEED_SUBSCRIPTION`: Add or remove symbol subscriptions
//! - `FEED_CONFIG`: Server-chosen data format and aggregation period
//! - `FEED_DATA`: Batched market events
//!
//! # References
//!
//! - [DXLink protocol](https://demo.dxfeed.com/dxlink-ws/debug/)

use serde::{Deserialize, Serialize};

use crate::domain::events::EventType;

// ============================================================================
// Constants
// ============================================================================

/// Control messages always travel on channel 0.
pub const CONTROL_CHANNEL: u32 = 0;

/// Protocol version advertised in the SETUP handshake.
pub const DXLINK_VERSION: &str = "0.1-js/1.0.0";

/// Service name requested when opening a feed channel.
pub const FEED_SERVICE: &str = "FEED";

/// Contract type requested when opening a feed channel.
pub const FEED_CONTRACT_AUTO: &str = "AUTO";

// ============================================================================
// Outbound Messages (Client -> Server)
// ============================================================================

/// Protocol handshake sent immediately after the websocket opens.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "SETUP",
///   "channel": 0,
///   "keepaliveTimeout": 60,
///   "acceptKeepaliveTimeout": 60,
///   "version": "0.1-js/1.0.0"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    /// Message type (always "SETUP")
    #[serde(rename = "type")]
    pub msg_type: &'static str,

    /// Control channel (always 0)
    pub channel: u32,

    /// Seconds of silence after which the client considers the server dead
    pub keepalive_timeout: u64,

    /// Seconds of silence the client asks the server to tolerate
    pub accept_keepalive_timeout: u64,

    /// Protocol version string
    pub version: &'static str,
}

impl SetupRequest {
    /// Create a handshake advertising the given keepalive timeout.
    #[must_use]
    pub const fn new(keepalive_timeout_secs: u64) -> Self {
        Self {
            msg_type: "SETUP",
            channel: CONTROL_CHANNEL,
            keepalive_timeout: keepalive_timeout_secs,
            accept_keepalive_timeout: keepalive_timeout_secs,
            version: DXLINK_VERSION,
        }
    }
}

/// Token authentication request.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "AUTH", "channel": 0, "token": "<streamer token>"}
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    /// Message type (always "AUTH")
    #[serde(rename = "type")]
    pub msg_type: &'static str,

    /// Control channel (always 0)
    pub channel: u32,

    /// API quote streamer token
    pub token: String,
}

impl AuthRequest {
    /// Create an authentication request.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self {
            msg_type: "AUTH",
            channel: CONTROL_CHANNEL,
            token,
        }
    }
}

/// Request to open a feed channel.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "CHANNEL_REQUEST",
///   "channel": 7,
///   "service": "FEED",
///   "parameters": {"contract": "AUTO"}
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChannelRequest {
    /// Message type (always "CHANNEL_REQUEST")
    #[serde(rename = "type")]
    pub msg_type: &'static str,

    /// Feed channel to open
    pub channel: u32,

    /// Service name (always "FEED")
    pub service: &'static str,

    /// Feed contract parameters
    pub parameters: FeedParameters,
}

/// Feed channel parameters.
#[derive(Debug, Clone, Serialize)]
pub struct FeedParameters {
    /// Contract type: "AUTO" lets the server pick TICKER/STREAM/HISTORY
    pub contract: &'static str,
}

impl ChannelRequest {
    /// Create a FEED channel request with the AUTO contract.
    #[must_use]
    pub const fn feed(channel: u32) -> Self {
        Self {
            msg_type: "CHANNEL_REQUEST",
            channel,
            service: FEED_SERVICE,
            parameters: FeedParameters {
                contract: FEED_CONTRACT_AUTO,
            },
        }
    }
}

/// Request to close a feed channel.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "CHANNEL_CANCEL", "channel": 7}
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChannelCancel {
    /// Message type (always "CHANNEL_CANCEL")
    #[serde(rename = "type")]
    pub msg_type: &'static str,

    /// Feed channel to close
    pub channel: u32,
}

impl ChannelCancel {
    /// Create a channel cancel request.
    #[must_use]
    pub const fn new(channel: u32) -> Self {
        Self {
            msg_type: "CHANNEL_CANCEL",
            channel,
        }
    }
}

/// One symbol in a subscription change.
///
/// Candle subscriptions carry a `fromTime` so the server replays history
/// from that point; other event types subscribe from now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionEntry {
    /// Streamer symbol, e.g. `AAPL` or `AAPL{=5m}`
    pub symbol: String,

    /// Event type name, e.g. "Quote"
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Replay start for candle subscriptions, epoch milliseconds
    #[serde(rename = "fromTime", skip_serializing_if = "Option::is_none")]
    pub from_time: Option<i64>,
}

impl SubscriptionEntry {
    /// Entry without a replay start.
    #[must_use]
    pub const fn new(symbol: String, event_type: EventType) -> Self {
        Self {
            symbol,
            event_type,
            from_time: None,
        }
    }

    /// Candle entry replaying from the given epoch-millisecond timestamp.
    #[must_use]
    pub const fn candle(symbol: String, from_time: i64) -> Self {
        Self {
            symbol,
            event_type: EventType::Candle,
            from_time: Some(from_time),
        }
    }
}

/// Subscription change on an open feed channel.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "FEED_SUBSCRIPTION",
///   "channel": 7,
///   "add": [{"symbol": "AAPL", "type": "Quote"}]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct FeedSubscription {
    /// Message type (always "FEED_SUBSCRIPTION")
    #[serde(rename = "type")]
    pub msg_type: &'static str,

    /// Open feed channel
    pub channel: u32,

    /// Symbols to add
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add: Option<Vec<SubscriptionEntry>>,

    /// Symbols to remove
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<SubscriptionEntry>>,
}

impl FeedSubscription {
    /// Subscription additions.
    #[must_use]
    pub const fn add(channel: u32, entries: Vec<SubscriptionEntry>) -> Self {
        Self {
            msg_type: "FEED_SUBSCRIPTION",
            channel,
            add: Some(entries),
            remove: None,
        }
    }

    /// Subscription removals.
    #[must_use]
    pub const fn remove(channel: u32, entries: Vec<SubscriptionEntry>) -> Self {
        Self {
            msg_type: "FEED_SUBSCRIPTION",
            channel,
            add: None,
            remove: Some(entries),
        }
    }
}

/// Liveness heartbeat.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "KEEPALIVE", "channel": 0}
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct KeepaliveRequest {
    /// Message type (always "KEEPALIVE")
    #[serde(rename = "type")]
    pub msg_type: &'static str,

    /// Control channel (always 0)
    pub channel: u32,
}

impl KeepaliveRequest {
    /// Create a keepalive frame.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            msg_type: "KEEPALIVE",
            channel: CONTROL_CHANNEL,
        }
    }
}

impl Default for KeepaliveRequest {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Inbound Messages (Server -> Client)
// ============================================================================

/// Server half of the SETUP handshake.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "SETUP",
///   "channel": 0,
///   "keepaliveTimeout": 60,
///   "acceptKeepaliveTimeout": 60,
///   "version": "1.0-1.2.1"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResponse {
    /// Control channel
    pub channel: u32,

    /// Server's keepalive timeout in seconds
    #[serde(default)]
    pub keepalive_timeout: Option<u64>,

    /// Keepalive timeout the server accepted from us
    #[serde(default)]
    pub accept_keepalive_timeout: Option<u64>,

    /// Server protocol version
    #[serde(default)]
    pub version: Option<String>,
}

/// Authentication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthState {
    /// Token accepted; feed channels may be opened
    Authorized,
    /// No valid token presented yet
    Unauthorized,
}

/// Authentication status update.
///
/// The server sends `UNAUTHORIZED` right after SETUP, then `AUTHORIZED`
/// once a valid token arrives.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "AUTH_STATE", "channel": 0, "state": "AUTHORIZED", "userId": "UID"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStateMessage {
    /// Control channel
    pub channel: u32,

    /// Current authentication state
    pub state: AuthState,

    /// Server-assigned user id, present once authorized
    #[serde(default)]
    pub user_id: Option<String>,
}

impl AuthStateMessage {
    /// Check whether this update reports a successful login.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.state == AuthState::Authorized
    }
}

/// Server acknowledgement that a feed channel is open.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "CHANNEL_OPENED",
///   "channel": 7,
///   "service": "FEED",
///   "parameters": {"contract": "AUTO", "subFormat": "LIST"}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelOpened {
    /// Feed channel that opened
    pub channel: u32,

    /// Service bound to the channel
    #[serde(default)]
    pub service: Option<String>,
}

/// Server notification that a feed channel closed.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "CHANNEL_CLOSED", "channel": 7}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelClosed {
    /// Feed channel that closed
    pub channel: u32,
}

/// Feed configuration chosen by the server for an open channel.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "FEED_CONFIG",
///   "channel": 7,
///   "dataFormat": "FULL",
///   "aggregationPeriod": 10
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedConfig {
    /// Feed channel being configured
    pub channel: u32,

    /// Event encoding: "FULL" objects or "COMPACT" arrays
    #[serde(default)]
    pub data_format: Option<String>,

    /// Server-side conflation window in seconds
    #[serde(default)]
    pub aggregation_period: Option<f64>,
}

/// Batch of market events on a feed channel.
///
/// Items are kept as raw JSON here; [`super::codec::JsonCodec`] decodes
/// them into typed events using each item's `eventType` discriminator.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "FEED_DATA",
///   "channel": 7,
///   "data": [{"eventType": "Quote", "eventSymbol": "AAPL", ...}]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FeedData {
    /// Feed channel the batch arrived on
    pub channel: u32,

    /// Raw event objects
    pub data: Vec<serde_json::Value>,
}

/// Inbound keepalive from the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeepaliveMessage {
    /// Channel the keepalive arrived on
    #[serde(default)]
    pub channel: u32,
}

/// Server-reported error.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "ERROR", "channel": 0, "error": "UNKNOWN", "message": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorMessage {
    /// Channel the error relates to, 0 for connection-level errors
    #[serde(default)]
    pub channel: u32,

    /// Machine-readable error kind
    pub error: String,

    /// Human-readable description
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Unified Incoming Message Enum
// ============================================================================

/// Unified enum for all recognised incoming DXLink frames.
///
/// Produced by [`super::codec::JsonCodec::decode`] so the receive loop can
/// handle every frame in a single match statement.
#[derive(Debug, Clone)]
pub enum DxLinkMessage {
    /// SETUP acknowledgement
    Setup(SetupResponse),
    /// AUTH_STATE update
    AuthState(AuthStateMessage),
    /// CHANNEL_OPENED acknowledgement
    ChannelOpened(ChannelOpened),
    /// CHANNEL_CLOSED notification
    ChannelClosed(ChannelClosed),
    /// FEED_CONFIG for an open channel
    FeedConfig(FeedConfig),
    /// FEED_DATA batch
    FeedData(FeedData),
    /// Inbound KEEPALIVE
    Keepalive(KeepaliveMessage),
    /// Server-reported ERROR
    Error(ErrorMessage),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialize_setup_request() {
        let value = serde_json::to_value(SetupRequest::new(60)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "SETUP",
                "channel": 0,
                "keepaliveTimeout": 60,
                "acceptKeepaliveTimeout": 60,
                "version": "0.1-js/1.0.0",
            })
        );
    }

    #[test]
    fn test_serialize_auth_request() {
        let value = serde_json::to_value(AuthRequest::new("tok123".to_string())).unwrap();
        assert_eq!(
            value,
            json!({"type": "AUTH", "channel": 0, "token": "tok123"})
        );
    }

    #[test]
    fn test_serialize_channel_request() {
        let value = serde_json::to_value(ChannelRequest::feed(7)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "CHANNEL_REQUEST",
                "channel": 7,
                "service": "FEED",
                "parameters": {"contract": "AUTO"},
            })
        );
    }

    #[test]
    fn test_serialize_channel_cancel() {
        let value = serde_json::to_value(ChannelCancel::new(13)).unwrap();
        assert_eq!(value, json!({"type": "CHANNEL_CANCEL", "channel": 13}));
    }

    #[test]
    fn test_serialize_subscription_add_without_from_time() {
        let sub = FeedSubscription::add(
            7,
            vec![SubscriptionEntry::new("AAPL".to_string(), EventType::Quote)],
        );
        let value = serde_json::to_value(sub).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "FEED_SUBSCRIPTION",
                "channel": 7,
                "add": [{"symbol": "AAPL", "type": "Quote"}],
            })
        );
    }

    #[test]
    fn test_serialize_candle_subscription_carries_from_time() {
        let sub = FeedSubscription::add(
            1,
            vec![SubscriptionEntry::candle(
                "SPY{=5m}".to_string(),
                1_680_480_000_000,
            )],
        );
        let value = serde_json::to_value(sub).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "FEED_SUBSCRIPTION",
                "channel": 1,
                "add": [{
                    "symbol": "SPY{=5m}",
                    "type": "Candle",
                    "fromTime": 1_680_480_000_000_i64,
                }],
            })
        );
    }

    #[test]
    fn test_serialize_subscription_remove_omits_from_time() {
        let sub = FeedSubscription::remove(
            1,
            vec![SubscriptionEntry::new(
                "SPY{=5m}".to_string(),
                EventType::Candle,
            )],
        );
        let value = serde_json::to_value(sub).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "FEED_SUBSCRIPTION",
                "channel": 1,
                "remove": [{"symbol": "SPY{=5m}", "type": "Candle"}],
            })
        );
    }

    #[test]
    fn test_serialize_keepalive() {
        let value = serde_json::to_value(KeepaliveRequest::new()).unwrap();
        assert_eq!(value, json!({"type": "KEEPALIVE", "channel": 0}));
    }

    #[test]
    fn test_deserialize_setup_response() {
        let json = r#"{"type":"SETUP","channel":0,"keepaliveTimeout":60,"acceptKeepaliveTimeout":60,"version":"1.0-1.2.1"}"#;
        let msg: SetupResponse = serde_json::from_str(json).unwrap();
        assert_eq!(msg.channel, 0);
        assert_eq!(msg.keepalive_timeout, Some(60));
        assert_eq!(msg.version.as_deref(), Some("1.0-1.2.1"));
    }

    #[test]
    fn test_deserialize_auth_state() {
        let json = r#"{"type":"AUTH_STATE","channel":0,"state":"UNAUTHORIZED"}"#;
        let msg: AuthStateMessage = serde_json::from_str(json).unwrap();
        assert!(!msg.is_authorized());
        assert_eq!(msg.user_id, None);

        let json = r#"{"type":"AUTH_STATE","channel":0,"state":"AUTHORIZED","userId":"U123"}"#;
        let msg: AuthStateMessage = serde_json::from_str(json).unwrap();
        assert!(msg.is_authorized());
        assert_eq!(msg.user_id.as_deref(), Some("U123"));
    }

    #[test]
    fn test_deserialize_channel_opened() {
        let json = r#"{"type":"CHANNEL_OPENED","channel":7,"service":"FEED","parameters":{"contract":"AUTO"}}"#;
        let msg: ChannelOpened = serde_json::from_str(json).unwrap();
        assert_eq!(msg.channel, 7);
        assert_eq!(msg.service.as_deref(), Some("FEED"));
    }

    #[test]
    fn test_deserialize_feed_config() {
        let json = r#"{"type":"FEED_CONFIG","channel":7,"dataFormat":"FULL","aggregationPeriod":0.1}"#;
        let msg: FeedConfig = serde_json::from_str(json).unwrap();
        assert_eq!(msg.data_format.as_deref(), Some("FULL"));
        assert_eq!(msg.aggregation_period, Some(0.1));
    }

    #[test]
    fn test_deserialize_feed_data_keeps_raw_items() {
        let json = r#"{"type":"FEED_DATA","channel":7,"data":[{"eventType":"Quote","eventSymbol":"AAPL"}]}"#;
        let msg: FeedData = serde_json::from_str(json).unwrap();
        assert_eq!(msg.channel, 7);
        assert_eq!(msg.data.len(), 1);
        assert_eq!(msg.data[0]["eventType"], "Quote");
    }

    #[test]
    fn test_deserialize_error() {
        let json = r#"{"type":"ERROR","channel":0,"error":"UNKNOWN","message":"bad frame"}"#;
        let msg: ErrorMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.error, "UNKNOWN");
        assert_eq!(msg.message, "bad frame");
    }
}
