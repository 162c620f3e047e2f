//! Stream Codec Module
//!
//! Decodes DXLink websocket frames. Every frame is a JSON object carrying a
//! `type` discriminator; feed data items carry their own `eventType`
//! discriminator and are decoded in a second pass so one malformed batch
//! fails loudly instead of being silently skipped.

use crate::domain::events::{
    CandleEvent, Event, QuoteEvent, SummaryEvent, TimeAndSaleEvent, TradeEvent,
};
use crate::infrastructure::dxlink::messages::{
    AuthStateMessage, ChannelClosed, ChannelOpened, DxLinkMessage, ErrorMessage, FeedConfig,
    FeedData, KeepaliveMessage, SetupResponse,
};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame carried a `type` this client does not recognise.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Feed item carried an `eventType` this client does not recognise.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// Frame or feed item was not shaped like a DXLink message.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for DXLink frames.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a single text frame into a [`DxLinkMessage`].
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object, lacks a string
    /// `type` field, carries an unrecognised `type`, or fails typed
    /// deserialization.
    pub fn decode(&self, text: &str) -> Result<DxLinkMessage, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let Some(msg_type) = value.get("type").and_then(|v| v.as_str()) else {
            return Err(CodecError::InvalidFormat(format!(
                "frame without a type field: {}...",
                &text[..text.len().min(80)]
            )));
        };

        let message = match msg_type {
            "SETUP" => {
                let m: SetupResponse = serde_json::from_value(value)?;
                DxLinkMessage::Setup(m)
            }
            "AUTH_STATE" => {
                let m: AuthStateMessage = serde_json::from_value(value)?;
                DxLinkMessage::AuthState(m)
            }
            "CHANNEL_OPENED" => {
                let m: ChannelOpened = serde_json::from_value(value)?;
                DxLinkMessage::ChannelOpened(m)
            }
            "CHANNEL_CLOSED" => {
                let m: ChannelClosed = serde_json::from_value(value)?;
                DxLinkMessage::ChannelClosed(m)
            }
            "FEED_CONFIG" => {
                let m: FeedConfig = serde_json::from_value(value)?;
                DxLinkMessage::FeedConfig(m)
            }
            "FEED_DATA" => {
                let m: FeedData = serde_json::from_value(value)?;
                DxLinkMessage::FeedData(m)
            }
            "KEEPALIVE" => {
                let m: KeepaliveMessage = serde_json::from_value(value)?;
                DxLinkMessage::Keepalive(m)
            }
            "ERROR" => {
                let m: ErrorMessage = serde_json::from_value(value)?;
                DxLinkMessage::Error(m)
            }
            other => {
                return Err(CodecError::UnknownMessageType(other.to_string()));
            }
        };

        Ok(message)
    }

    /// Decode the raw items of a `FEED_DATA` batch into typed events.
    ///
    /// # Errors
    ///
    /// Returns an error if an item lacks a string `eventType`, carries an
    /// unrecognised `eventType`, or fails typed deserialization.
    pub fn decode_feed_items(
        &self,
        items: Vec<serde_json::Value>,
    ) -> Result<Vec<Event>, CodecError> {
        let mut events = Vec::with_capacity(items.len());

        for item in items {
            let Some(event_type) = item.get("eventType").and_then(|v| v.as_str()) else {
                return Err(CodecError::InvalidFormat(
                    "feed item without an eventType field".to_string(),
                ));
            };

            let event = match event_type {
                "Candle" => Event::Candle(serde_json::from_value::<CandleEvent>(item)?),
                "Quote" => Event::Quote(serde_json::from_value::<QuoteEvent>(item)?),
                "Summary" => Event::Summary(serde_json::from_value::<SummaryEvent>(item)?),
                "TimeAndSale" => {
                    Event::TimeAndSale(serde_json::from_value::<TimeAndSaleEvent>(item)?)
                }
                "Trade" => Event::Trade(serde_json::from_value::<TradeEvent>(item)?),
                other => {
                    return Err(CodecError::UnknownEventType(other.to_string()));
                }
            };

            events.push(event);
        }

        Ok(events)
    }

    /// Encode a message to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}
