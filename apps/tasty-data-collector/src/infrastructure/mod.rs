//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete adapters the application layer drives:
//! the DXLink websocket client, the tastytrade REST API, configuration
//! loading, and tracing setup.

/// DXLink websocket streaming client.
pub mod dxlink;

/// tastytrade REST API session and instrument lookups.
pub mod tastytrade;

/// Configuration loading and credential files.
pub mod config;

/// Tracing subscriber setup.
pub mod telemetry;
