//! DXLink websocket streaming client.
//!
//! Implements the DXLink wire protocol over a single websocket connection:
//! SETUP/AUTH handshake on channel 0, one feed channel per market event
//! type, keepalive heartbeats, and demultiplexing of `FEED_DATA` frames
//! into typed per-event-type queues.
//!
//! The client is deliberately single-shot: when the connection fails or the
//! server closes it, the stream terminates and every blocked consumer
//! observes the terminal fault. Callers that want to resume create a fresh
//! client with a fresh token.

// ============================================================================
// Modules
// ============================================================================

/// Feed channel assignment and lifecycle phases.
pub mod channels;

/// Client facade, receive loop, and connection errors.
pub mod client;

/// JSON codec for DXLink frames and feed items.
pub mod codec;

mod heartbeat;

/// Wire message types.
pub mod messages;

/// Typed consumer queues.
pub mod queues;

/// Shared session state and terminal faults.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use channels::{ChannelMap, ChannelMapError, ChannelPhase};
pub use client::{DxLinkClient, DxLinkConfig, StreamError};
pub use codec::CodecError;
pub use queues::FeedQueue;
pub use state::{SessionState, TerminalFault};
