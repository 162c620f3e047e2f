//! Feed channel assignment.
//!
//! DXLink multiplexes independent feed channels over one websocket. Channel 0
//! carries the control conversation (SETUP, AUTH, KEEPALIVE); each market
//! event type gets its own dedicated feed channel. The assignment is fixed at
//! client construction and never changes for the life of the connection.

use std::fmt;

use crate::domain::events::{EVENT_TYPE_COUNT, EventType};

// ============================================================================
// Errors
// ============================================================================

/// Errors constructing a [`ChannelMap`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelMapError {
    /// The same event type was assigned more than once.
    #[error("event type {0} assigned more than once")]
    DuplicateEventType(EventType),

    /// Two event types were assigned the same channel number.
    #[error("channel {0} assigned to more than one event type")]
    DuplicateChannel(u32),

    /// Channel 0 is reserved for the control conversation.
    #[error("channel 0 is reserved for control messages")]
    ReservedChannel,
}

// ============================================================================
// Channel Phase
// ============================================================================

/// Lifecycle phase of a single feed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelPhase {
    /// No channel has been requested for this event type.
    #[default]
    Closed,
    /// CHANNEL_REQUEST sent, waiting for the server's CHANNEL_OPENED.
    Requested,
    /// Server acknowledged the channel; subscriptions may flow.
    Opened,
}

impl ChannelPhase {
    /// Returns `true` when the channel is fully open.
    #[must_use]
    pub const fn is_opened(self) -> bool {
        matches!(self, Self::Opened)
    }

    /// Returns `true` when no request is in flight.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Phase name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Requested => "requested",
            Self::Opened => "opened",
        }
    }
}

impl fmt::Display for ChannelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Channel Map
// ============================================================================

/// Injective assignment of event types to feed channel numbers.
///
/// The mapping is validated at construction: every event type appears
/// exactly once, no two event types share a channel, and channel 0 stays
/// reserved for control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    ids: [u32; EVENT_TYPE_COUNT],
}

impl ChannelMap {
    /// The conventional assignment used by the hosted DXLink gateway.
    pub const DEFAULT: Self = Self {
        ids: [1, 7, 9, 13, 15],
    };

    /// Builds a map from explicit `(event type, channel)` assignments.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelMapError`] when an event type repeats, a channel
    /// number repeats, or channel 0 is assigned.
    pub fn new(
        assignments: [(EventType, u32); EVENT_TYPE_COUNT],
    ) -> Result<Self, ChannelMapError> {
        // Channel 0 is rejected below, so 0 doubles as the unassigned marker.
        let mut ids = [0u32; EVENT_TYPE_COUNT];

        for (event_type, channel) in assignments {
            if channel == 0 {
                return Err(ChannelMapError::ReservedChannel);
            }
            if ids[event_type.index()] != 0 {
                return Err(ChannelMapError::DuplicateEventType(event_type));
            }
            if ids.contains(&channel) {
                return Err(ChannelMapError::DuplicateChannel(channel));
            }
            ids[event_type.index()] = channel;
        }

        Ok(Self { ids })
    }

    /// Channel number carrying the given event type.
    #[must_use]
    pub const fn channel(&self, event_type: EventType) -> u32 {
        self.ids[event_type.index()]
    }

    /// Event type carried by the given channel, if any.
    #[must_use]
    pub fn event_type(&self, channel: u32) -> Option<EventType> {
        EventType::ALL
            .into_iter()
            .find(|event_type| self.ids[event_type.index()] == channel)
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// Tests
// ============================================================================
