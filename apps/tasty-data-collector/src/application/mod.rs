//! Application Layer - Collection flows and export.
//!
//! This layer drives the streaming client through the two collection flows
//! (quote snapshots and candle history) and writes the gathered data out
//! as CSV files.

/// Deadline-driven collectors over the typed feed queues.
pub mod collector;

/// CSV exporters for collected quotes, candles, and forward curves.
pub mod export;
