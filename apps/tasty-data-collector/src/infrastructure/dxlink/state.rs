//! Shared connection state.
//!
//! One [`StreamState`] cell is shared by the client facade, the receive
//! loop, the heartbeat task, and every consumer queue. Writers update the
//! cell and bump an epoch counter; waiters watch the counter and re-check
//! their predicate on every change.

use parking_lot::RwLock;
use tokio::sync::watch;

use super::channels::ChannelPhase;
use crate::domain::events::{EVENT_TYPE_COUNT, EventType};

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle of the control conversation on channel 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection attempt yet.
    Disconnected,
    /// TCP/TLS and websocket handshake in progress.
    Connecting,
    /// SETUP sent, waiting for the server's SETUP acknowledgement.
    SetupSent,
    /// AUTH sent, waiting for `AUTH_STATE: AUTHORIZED`.
    Authenticating,
    /// Handshake complete; feed channels and subscriptions may flow.
    Authenticated,
    /// Connection terminated. Terminal state.
    Closed,
}

impl SessionState {
    /// Returns `true` once the AUTH handshake has completed.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Returns `true` when the connection has terminated.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// State name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::SetupSent => "setup_sent",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Terminal Fault
// ============================================================================

/// Reason the stream ended.
///
/// Recorded exactly once, before consumer queues drain, so a blocked
/// consumer that observes end-of-stream can always report why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TerminalFault {
    /// The server violated the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The websocket transport failed.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The connection closed without a recorded cause.
    #[error("stream closed")]
    Closed,
}

// ============================================================================
// Stream State Cell
// ============================================================================

/// Shared mutable state for one websocket connection.
pub(super) struct StreamState {
    session: RwLock<SessionState>,
    phases: RwLock<[ChannelPhase; EVENT_TYPE_COUNT]>,
    fault: RwLock<Option<TerminalFault>>,
    epoch: watch::Sender<u64>,
}

impl StreamState {
    pub(super) fn new() -> Self {
        let (epoch, _) = watch::channel(0);
        Self {
            session: RwLock::new(SessionState::Disconnected),
            phases: RwLock::new([ChannelPhase::Closed; EVENT_TYPE_COUNT]),
            fault: RwLock::new(None),
            epoch,
        }
    }

    /// Wakes every waiter so it re-checks its predicate.
    fn bump(&self) {
        self.epoch.send_modify(|epoch| *epoch = epoch.wrapping_add(1));
    }

    /// Subscribes to state-change notifications.
    pub(super) fn watch(&self) -> watch::Receiver<u64> {
        self.epoch.subscribe()
    }

    pub(super) fn session(&self) -> SessionState {
        *self.session.read()
    }

    pub(super) fn set_session(&self, next: SessionState) {
        {
            let mut session = self.session.write();
            tracing::debug!(from = %*session, to = %next, "session state");
            *session = next;
        }
        self.bump();
    }

    pub(super) fn phase(&self, event_type: EventType) -> ChannelPhase {
        self.phases.read()[event_type.index()]
    }

    pub(super) fn set_phase(&self, event_type: EventType, phase: ChannelPhase) {
        {
            let mut phases = self.phases.write();
            phases[event_type.index()] = phase;
        }
        self.bump();
    }

    /// Moves a closed channel to `Requested`. Returns `false` when another
    /// caller already requested or opened it, so only one CHANNEL_REQUEST
    /// goes out.
    pub(super) fn try_begin_request(&self, event_type: EventType) -> bool {
        let moved = {
            let mut phases = self.phases.write();
            if phases[event_type.index()].is_closed() {
                phases[event_type.index()] = ChannelPhase::Requested;
                true
            } else {
                false
            }
        };
        if moved {
            self.bump();
        }
        moved
    }

    pub(super) fn fault(&self) -> Option<TerminalFault> {
        self.fault.read().clone()
    }

    /// Records the first terminal fault; later faults are dropped.
    pub(super) fn record_fault(&self, fault: TerminalFault) {
        {
            let mut slot = self.fault.write();
            if slot.is_none() {
                *slot = Some(fault);
            }
        }
        self.bump();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = StreamState::new();
        assert_eq!(state.session(), SessionState::Disconnected);
        assert_eq!(state.phase(EventType::Quote), ChannelPhase::Closed);
        assert_eq!(state.fault(), None);
    }

    #[test]
    fn test_session_transitions() {
        let state = StreamState::new();
        state.set_session(SessionState::Connecting);
        state.set_session(SessionState::Authenticated);
        assert!(state.session().is_authenticated());
        state.set_session(SessionState::Closed);
        assert!(state.session().is_closed());
    }

    #[test]
    fn test_phase_is_per_event_type() {
        let state = StreamState::new();
        state.set_phase(EventType::Candle, ChannelPhase::Opened);
        assert!(state.phase(EventType::Candle).is_opened());
        assert!(state.phase(EventType::Trade).is_closed());
    }

    #[test]
    fn test_begin_request_is_single_shot() {
        let state = StreamState::new();
        assert!(state.try_begin_request(EventType::Quote));
        assert!(!state.try_begin_request(EventType::Quote));
        assert_eq!(state.phase(EventType::Quote), ChannelPhase::Requested);

        state.set_phase(EventType::Quote, ChannelPhase::Opened);
        assert!(!state.try_begin_request(EventType::Quote));
    }

    #[test]
    fn test_first_fault_wins() {
        let state = StreamState::new();
        state.record_fault(TerminalFault::Protocol("bad frame".into()));
        state.record_fault(TerminalFault::Closed);
        assert_eq!(
            state.fault(),
            Some(TerminalFault::Protocol("bad frame".into()))
        );
    }

    #[tokio::test]
    async fn test_watch_wakes_on_change() {
        let state = StreamState::new();
        let mut watcher = state.watch();
        watcher.mark_unchanged();
        state.set_session(SessionState::Connecting);
        watcher.changed().await.unwrap();
    }
}
