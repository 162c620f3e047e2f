//! Domain Layer - Market data types and pure symbology logic.
//!
//! This layer contains the core domain types for the DXLink market data
//! feed with no I/O dependencies. All types here are pure Rust with
//! serialization support.

/// Market data event types (candles, quotes, summaries, time and sales, trades).
pub mod events;

/// Symbol encoding for candle subscriptions and futures contracts.
pub mod symbols;

/// Trading-timeline bucket generation for historical candle collection.
pub mod timeline;
