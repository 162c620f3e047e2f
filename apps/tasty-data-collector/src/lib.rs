#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Tasty Data Collector - DXLink Market Data Client
//!
//! A tastytrade client that logs in over REST, opens a DXLink websocket
//! session, subscribes to market-data feeds, and collects quotes and candle
//! history into plain CSV tables.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Pure market-data types and symbology
//!   - `events`: Typed feed events (candles, quotes, summaries, ...)
//!   - `symbols`: Candle symbol encoding and CME futures contract codes
//!   - `timeline`: Trading-day bucket timestamps for history collection
//!
//! - **Application**: Collection flows over the streaming client
//!   - `collector`: Deadline-driven quote and candle collectors
//!   - `export`: CSV writers for snapshots, series, and forward curves
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `dxlink`: DXLink websocket streaming client
//!   - `tastytrade`: REST session (login, tokens, instruments)
//!   - `config`: Environment configuration and credentials
//!   - `telemetry`: Tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//! REST login --> quote-streamer token --> DXLink websocket
//!                                              |
//!                                        receive loop
//!                                              |
//!              Candle / Quote / Summary / TimeAndSale / Trade
//!                          typed FIFO queues
//!                                              |
//!                              collectors --> CSV export
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Market data types and pure symbology logic.
pub mod domain;

/// Application layer - Collection flows and CSV export.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain event types
pub use domain::events::{
    CandleEvent, Event, EventType, QuoteEvent, SummaryEvent, TimeAndSaleEvent, TradeEvent,
};

// Infrastructure config
pub use infrastructure::config::{
    CollectMode, CollectSettings, Config, ConfigError, Credentials, StreamSettings,
};

// Streaming client (for integration tests)
pub use infrastructure::dxlink::{
    ChannelMap, ChannelMapError, ChannelPhase, DxLinkClient, DxLinkConfig, FeedQueue,
    SessionState, StreamError, TerminalFault,
};

// REST session
pub use infrastructure::tastytrade::{ApiError, RestSession, StreamerTokens};

// Collectors and exporters
pub use application::collector::{
    CandleHistory, CandleSeries, CollectError, collect_candles, collect_quotes,
};
pub use application::export::ExportError;
