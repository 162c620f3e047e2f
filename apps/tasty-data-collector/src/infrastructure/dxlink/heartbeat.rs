//! Keepalive Heartbeat
//!
//! Sends KEEPALIVE frames on a fixed cadence so the server keeps the
//! connection alive. The task starts once authentication completes, beats
//! immediately, and stops when the connection's cancellation token fires.
//! A failed send is treated as a dead transport: the fault is recorded and
//! the whole connection is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::client::MessageWriter;
use super::messages::KeepaliveRequest;
use super::state::{StreamState, TerminalFault};

/// Periodic keepalive sender for one connection.
pub(super) struct Heartbeat {
    writer: MessageWriter,
    interval: Duration,
    state: Arc<StreamState>,
    cancel: CancellationToken,
}

impl Heartbeat {
    pub(super) const fn new(
        writer: MessageWriter,
        interval: Duration,
        state: Arc<StreamState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            writer,
            interval,
            state,
            cancel,
        }
    }

    /// Run until cancelled or the transport fails.
    pub(super) async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("heartbeat stopped");
                    return;
                }
                _ = ticker.tick() => {
                    tracing::trace!("sending keepalive");
                    if let Err(err) = self.writer.send_json(&KeepaliveRequest::new()).await {
                        tracing::warn!(error = %err, "keepalive send failed");
                        self.state
                            .record_fault(TerminalFault::Transport(err.to_string()));
                        self.cancel.cancel();
                        return;
                    }
                }
            }
        }
    }
}
