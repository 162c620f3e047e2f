//! Market Data Event Types
//!
//! Typed representations of the dxfeed events delivered over a DXLink
//! FEED_DATA message. Each inbound feed item carries an `eventType`
//! discriminator selecting one of the five variants; the remaining fields
//! follow the dxfeed schema for that event kind.
//!
//! # Wire Format Example
//!
//! ```json
//! {
//!   "eventType": "Quote",
//!   "eventSymbol": "SPY",
//!   "eventTime": 0,
//!   "sequence": 0,
//!   "timeNanoPart": 0,
//!   "bidTime": 1699999999000,
//!   "bidExchangeCode": "Q",
//!   "askTime": 1699999999000,
//!   "askExchangeCode": "Q",
//!   "bidPrice": 450.02,
//!   "askPrice": 450.04,
//!   "bidSize": 200,
//!   "askSize": 100
//! }
//! ```
//!
//! Price fields decode into `rust_decimal::Decimal`; dxfeed publishes
//! `"NaN"` / `"Infinity"` placeholder strings for absent values, which
//! decode as `None`.

use std::fmt;

use serde::{Deserialize, Serialize};

use rust_decimal::Decimal;

// =============================================================================
// Event Type Enumeration
// =============================================================================

/// The five dxfeed event kinds this client subscribes to.
///
/// Each event type is bound to one reserved DXLink channel id for the
/// lifetime of a connection (see `ChannelMap`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    /// OHLC candles for a symbol and aggregation period.
    Candle,
    /// Best bid and offer quotes.
    Quote,
    /// Daily summary information.
    Summary,
    /// Individual trade prints (time and sales).
    TimeAndSale,
    /// Last trade and daily volume information.
    Trade,
}

/// Number of event types (and thus per-type queues/channels).
pub const EVENT_TYPE_COUNT: usize = 5;

impl EventType {
    /// All event types in a fixed order.
    pub const ALL: [Self; EVENT_TYPE_COUNT] = [
        Self::Candle,
        Self::Quote,
        Self::Summary,
        Self::TimeAndSale,
        Self::Trade,
    ];

    /// The wire name used as the `eventType` discriminator and in
    /// FEED_SUBSCRIPTION entries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Candle => "Candle",
            Self::Quote => "Quote",
            Self::Summary => "Summary",
            Self::TimeAndSale => "TimeAndSale",
            Self::Trade => "Trade",
        }
    }

    /// Stable index into per-event-type tables (queues, channel ids).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Candle => 0,
            Self::Quote => 1,
            Self::Summary => 2,
            Self::TimeAndSale => 3,
            Self::Trade => 4,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Event Payloads
// =============================================================================

/// A candle event with open, high, low, close prices for one aggregation
/// period of a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleEvent {
    /// Symbol of this event, including the aggregation suffix
    /// (e.g. `"SPY{=5m}"`).
    pub event_symbol: String,
    /// Time of this event.
    pub event_time: i64,
    /// Transactional event flags.
    pub event_flags: i64,
    /// Unique per-symbol index of this candle.
    pub index: i64,
    /// Timestamp of the candle start in epoch milliseconds.
    pub time: i64,
    /// Sequence number of this event.
    pub sequence: i64,
    /// Total number of events aggregated into the candle.
    pub count: i64,
    /// The first (open) price of the candle.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub open: Option<Decimal>,
    /// The maximal (high) price of the candle.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub high: Option<Decimal>,
    /// The minimal (low) price of the candle.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub low: Option<Decimal>,
    /// The last (close) price of the candle.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub close: Option<Decimal>,
    /// Total volume of the candle.
    #[serde(default, deserialize_with = "nullable::int")]
    pub volume: Option<i64>,
    /// Volume-weighted average price.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub vwap: Option<Decimal>,
    /// Bid volume in the candle.
    #[serde(default, deserialize_with = "nullable::int")]
    pub bid_volume: Option<i64>,
    /// Ask volume in the candle.
    #[serde(default, deserialize_with = "nullable::int")]
    pub ask_volume: Option<i64>,
    /// Implied volatility in the candle.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub imp_volatility: Option<Decimal>,
    /// Open interest in the candle.
    #[serde(default, deserialize_with = "nullable::int")]
    pub open_interest: Option<i64>,
}

/// A best bid and offer quote event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteEvent {
    /// Symbol of this event.
    pub event_symbol: String,
    /// Time of this event.
    pub event_time: i64,
    /// Sequence number of this event.
    pub sequence: i64,
    /// Microseconds and nanoseconds part of the event time.
    pub time_nano_part: i64,
    /// Time of the last bid change in epoch milliseconds.
    pub bid_time: i64,
    /// Bid exchange code.
    pub bid_exchange_code: String,
    /// Time of the last ask change in epoch milliseconds.
    pub ask_time: i64,
    /// Ask exchange code.
    pub ask_exchange_code: String,
    /// Bid price.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub bid_price: Option<Decimal>,
    /// Ask price.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub ask_price: Option<Decimal>,
    /// Bid size.
    #[serde(default, deserialize_with = "nullable::int")]
    pub bid_size: Option<i64>,
    /// Ask size.
    #[serde(default, deserialize_with = "nullable::int")]
    pub ask_size: Option<i64>,
}

impl QuoteEvent {
    /// Midpoint of bid and ask, when both sides are present.
    #[must_use]
    pub fn midpoint(&self) -> Option<Decimal> {
        match (self.bid_price, self.ask_price) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }
}

/// A daily summary event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEvent {
    /// Symbol of this event.
    pub event_symbol: String,
    /// Time of this event.
    pub event_time: i64,
    /// Identifier of the day that this summary represents.
    pub day_id: i64,
    /// The first (open) price for the day.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub day_open_price: Option<Decimal>,
    /// The maximal (high) price for the day.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub day_high_price: Option<Decimal>,
    /// The minimal (low) price for the day.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub day_low_price: Option<Decimal>,
    /// The last (close) price for the day.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub day_close_price: Option<Decimal>,
    /// Price type of the day close price.
    #[serde(default)]
    pub day_close_price_type: Option<String>,
    /// Identifier of the previous day.
    pub prev_day_id: i64,
    /// The last (close) price of the previous day.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub prev_day_close_price: Option<Decimal>,
    /// Price type of the previous day close price.
    #[serde(default)]
    pub prev_day_close_price_type: Option<String>,
    /// Total volume traded on the previous day.
    #[serde(default, deserialize_with = "nullable::int")]
    pub prev_day_volume: Option<i64>,
    /// Open interest of the symbol.
    #[serde(default, deserialize_with = "nullable::int")]
    pub open_interest: Option<i64>,
}

/// A time and sale event (an individual trade print).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAndSaleEvent {
    /// Symbol of this event.
    pub event_symbol: String,
    /// Time of this event.
    pub event_time: i64,
    /// Transactional event flags.
    pub event_flags: i64,
    /// Unique per-symbol index of this event.
    pub index: i64,
    /// Timestamp of the trade in epoch milliseconds.
    pub time: i64,
    /// Microseconds and nanoseconds part of the trade time.
    pub time_nano_part: i64,
    /// Sequence number of this event.
    pub sequence: i64,
    /// Exchange code of this trade.
    pub exchange_code: String,
    /// Trade price.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub price: Option<Decimal>,
    /// Trade size.
    #[serde(default, deserialize_with = "nullable::int")]
    pub size: Option<i64>,
    /// Bid price at the time of the trade.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub bid_price: Option<Decimal>,
    /// Ask price at the time of the trade.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub ask_price: Option<Decimal>,
    /// Sale conditions provided by the exchange.
    #[serde(default)]
    pub exchange_sale_conditions: Option<String>,
    /// Aggressor side of the trade.
    #[serde(default)]
    pub aggressor_side: Option<String>,
    /// Whether the trade was exempt from trade-through rules.
    #[serde(default)]
    pub trade_through_exempt: bool,
    /// Whether the trade was part of a multi-leg order.
    #[serde(default)]
    pub spread_leg: bool,
    /// Whether the trade occurred in extended trading hours.
    #[serde(default)]
    pub extended_trading_hours: bool,
    /// Whether the trade represents a valid intraday tick.
    #[serde(default)]
    pub valid_tick: bool,
}

/// A trade event with the last trade and daily volume information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    /// Symbol of this event.
    pub event_symbol: String,
    /// Time of this event.
    pub event_time: i64,
    /// Timestamp of the last trade in epoch milliseconds.
    pub time: i64,
    /// Microseconds and nanoseconds part of the trade time.
    pub time_nano_part: i64,
    /// Sequence number of this event.
    pub sequence: i64,
    /// Exchange code of the last trade.
    pub exchange_code: String,
    /// Identifier of the current trading day.
    pub day_id: i64,
    /// Price of the last trade.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub price: Option<Decimal>,
    /// Change of the last trade.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub change: Option<Decimal>,
    /// Size of the last trade.
    #[serde(default, deserialize_with = "nullable::int")]
    pub size: Option<i64>,
    /// Total volume traded for the day.
    #[serde(default, deserialize_with = "nullable::int")]
    pub day_volume: Option<i64>,
    /// Total turnover traded for the day.
    #[serde(default, deserialize_with = "nullable::decimal")]
    pub day_turnover: Option<Decimal>,
    /// Tendency of the trade price movement.
    #[serde(default)]
    pub tick_direction: Option<String>,
    /// Whether the last trade occurred in extended trading hours.
    #[serde(default)]
    pub extended_trading_hours: bool,
}

// =============================================================================
// Event Union
// =============================================================================

/// A decoded market-data event, discriminated by the `eventType` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum Event {
    /// A candle event.
    Candle(CandleEvent),
    /// A quote event.
    Quote(QuoteEvent),
    /// A summary event.
    Summary(SummaryEvent),
    /// A time and sale event.
    TimeAndSale(TimeAndSaleEvent),
    /// A trade event.
    Trade(TradeEvent),
}

impl Event {
    /// The event type of this payload.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Candle(_) => EventType::Candle,
            Self::Quote(_) => EventType::Quote,
            Self::Summary(_) => EventType::Summary,
            Self::TimeAndSale(_) => EventType::TimeAndSale,
            Self::Trade(_) => EventType::Trade,
        }
    }

    /// The event symbol of this payload.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Candle(e) => &e.event_symbol,
            Self::Quote(e) => &e.event_symbol,
            Self::Summary(e) => &e.event_symbol,
            Self::TimeAndSale(e) => &e.event_symbol,
            Self::Trade(e) => &e.event_symbol,
        }
    }
}

// =============================================================================
// Nullable Numeric Deserializers
// =============================================================================

mod nullable {
    //! dxfeed publishes `"NaN"` and `"Infinity"` strings for absent numeric
    //! values; these deserializers fold them into `None`.

    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    use rust_decimal::Decimal;

    fn is_placeholder(s: &str) -> bool {
        matches!(s, "NaN" | "Infinity" | "-Infinity")
    }

    pub(super) fn decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if is_placeholder(&s) => Ok(None),
            Some(Value::String(s)) => s
                .parse::<Decimal>()
                .map(Some)
                .map_err(|e| Error::custom(format!("invalid decimal {s:?}: {e}"))),
            Some(Value::Number(n)) => {
                let f = n
                    .as_f64()
                    .ok_or_else(|| Error::custom(format!("unrepresentable number {n}")))?;
                Decimal::try_from(f)
                    .map(Some)
                    .map_err(|e| Error::custom(format!("invalid decimal {n}: {e}")))
            }
            Some(other) => Err(Error::custom(format!("expected decimal, got {other}"))),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if is_placeholder(&s) => Ok(None),
            Some(Value::String(s)) => s
                .parse::<i64>()
                .map(Some)
                .map_err(|e| Error::custom(format!("invalid integer {s:?}: {e}"))),
            Some(Value::Number(n)) => n.as_i64().map_or_else(
                || {
                    // dxfeed occasionally delivers integral volumes as doubles
                    n.as_f64()
                        .map(|f| Some(f as i64))
                        .ok_or_else(|| Error::custom(format!("unrepresentable integer {n}")))
                },
                |i| Ok(Some(i)),
            ),
            Some(other) => Err(Error::custom(format!("expected integer, got {other}"))),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(EventType::Candle.as_str(), "Candle");
        assert_eq!(EventType::TimeAndSale.as_str(), "TimeAndSale");
        let json = serde_json::to_string(&EventType::TimeAndSale).unwrap();
        assert_eq!(json, r#""TimeAndSale""#);
    }

    #[test]
    fn test_event_type_indexes_are_distinct() {
        let mut seen = [false; EVENT_TYPE_COUNT];
        for event_type in EventType::ALL {
            assert!(!seen[event_type.index()]);
            seen[event_type.index()] = true;
        }
    }

    #[test]
    fn test_quote_deserialization() {
        let json = r#"{
            "eventSymbol": "SPY",
            "eventTime": 0,
            "sequence": 0,
            "timeNanoPart": 0,
            "bidTime": 1699999999000,
            "bidExchangeCode": "Q",
            "askTime": 1699999999000,
            "askExchangeCode": "Q",
            "bidPrice": 450.02,
            "askPrice": 450.04,
            "bidSize": 200,
            "askSize": 100
        }"#;

        let quote: QuoteEvent = serde_json::from_str(json).unwrap();
        assert_eq!(quote.event_symbol, "SPY");
        assert_eq!(quote.bid_exchange_code, "Q");
        assert_eq!(quote.bid_price, Some(Decimal::new(45_002, 2)));
        assert_eq!(quote.ask_size, Some(100));
        assert_eq!(quote.midpoint(), Some(Decimal::new(45_003, 2)));
    }

    #[test]
    fn test_quote_nan_prices_decode_as_none() {
        let json = r#"{
            "eventSymbol": "/GCZ25:XCEC",
            "eventTime": 0,
            "sequence": 0,
            "timeNanoPart": 0,
            "bidTime": 0,
            "bidExchangeCode": "",
            "askTime": 0,
            "askExchangeCode": "",
            "bidPrice": "NaN",
            "askPrice": "NaN",
            "bidSize": "NaN",
            "askSize": null
        }"#;

        let quote: QuoteEvent = serde_json::from_str(json).unwrap();
        assert_eq!(quote.bid_price, None);
        assert_eq!(quote.ask_price, None);
        assert_eq!(quote.bid_size, None);
        assert_eq!(quote.ask_size, None);
        assert_eq!(quote.midpoint(), None);
    }

    #[test]
    fn test_candle_deserialization_with_missing_optionals() {
        let json = r#"{
            "eventSymbol": "SPY{=5m}",
            "eventTime": 0,
            "eventFlags": 0,
            "index": 7218616937293021184,
            "time": 1680787200000,
            "sequence": 0,
            "count": 1178,
            "open": 409.61,
            "high": 410.09,
            "low": 409.27,
            "close": 409.9,
            "volume": 2696912.0
        }"#;

        let candle: CandleEvent = serde_json::from_str(json).unwrap();
        assert_eq!(candle.event_symbol, "SPY{=5m}");
        assert_eq!(candle.time, 1_680_787_200_000);
        assert_eq!(candle.close, Some(Decimal::new(4099, 1)));
        // integral double folds into an integer volume
        assert_eq!(candle.volume, Some(2_696_912));
        assert_eq!(candle.vwap, None);
        assert_eq!(candle.open_interest, None);
    }

    #[test]
    fn test_trade_deserialization() {
        let json = r#"{
            "eventSymbol": "AAPL",
            "eventTime": 0,
            "time": 1700000001000,
            "timeNanoPart": 0,
            "sequence": 12,
            "exchangeCode": "Q",
            "dayId": 19600,
            "price": 191.45,
            "size": 50,
            "dayVolume": 51234567,
            "tickDirection": "ZERO_UP",
            "extendedTradingHours": false
        }"#;

        let trade: TradeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(trade.day_id, 19600);
        assert_eq!(trade.price, Some(Decimal::new(19_145, 2)));
        assert_eq!(trade.tick_direction.as_deref(), Some("ZERO_UP"));
        assert!(!trade.extended_trading_hours);
    }

    #[test]
    fn test_event_union_decodes_by_tag() {
        let json = r#"{
            "eventType": "Summary",
            "eventSymbol": "SPX",
            "eventTime": 0,
            "dayId": 19600,
            "dayOpenPrice": 4505.1,
            "dayHighPrice": 4521.0,
            "dayLowPrice": 4499.5,
            "dayClosePrice": 4510.7,
            "prevDayId": 19599,
            "prevDayClosePrice": 4502.3,
            "openInterest": 0
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type(), EventType::Summary);
        assert_eq!(event.symbol(), "SPX");
        match event {
            Event::Summary(summary) => {
                assert_eq!(summary.day_id, 19600);
                assert_eq!(summary.prev_day_close_price, Some(Decimal::new(45_023, 1)));
            }
            other => panic!("expected summary, got {other:?}"),
        }
    }

    #[test]
    fn test_time_and_sale_defaults() {
        let json = r#"{
            "eventSymbol": "MSFT",
            "eventTime": 0,
            "eventFlags": 0,
            "index": 1,
            "time": 1700000002000,
            "timeNanoPart": 0,
            "sequence": 3,
            "exchangeCode": "D",
            "price": 370.11,
            "size": 10
        }"#;

        let tas: TimeAndSaleEvent = serde_json::from_str(json).unwrap();
        assert_eq!(tas.exchange_sale_conditions, None);
        assert!(!tas.spread_leg);
        assert!(!tas.valid_tick);
    }
}
