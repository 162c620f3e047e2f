//! Typed Consumer Queues
//!
//! `FEED_DATA` batches are demultiplexed into one FIFO queue per event
//! type. Queue handles are cheap to clone; clones compete for items, so two
//! consumers of the same queue each see a disjoint subset of the stream.
//! When the connection terminates the queues drain and then yield the
//! recorded terminal fault instead of blocking forever.

use std::sync::Arc;

use futures_util::Stream;
use tokio::sync::{Mutex, mpsc};

use super::client::StreamError;
use super::state::{StreamState, TerminalFault};
use crate::domain::events::{
    CandleEvent, Event, QuoteEvent, SummaryEvent, TimeAndSaleEvent, TradeEvent,
};

// ============================================================================
// Feed Queue
// ============================================================================

/// Consumer handle for one event type's FIFO queue.
///
/// Cloning produces another handle onto the same queue; each delivered
/// event is observed by exactly one handle.
pub struct FeedQueue<T> {
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
    state: Arc<StreamState>,
}

impl<T> Clone for FeedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            receiver: Arc::clone(&self.receiver),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> std::fmt::Debug for FeedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedQueue").finish_non_exhaustive()
    }
}

impl<T> FeedQueue<T> {
    fn new(receiver: mpsc::UnboundedReceiver<T>, state: Arc<StreamState>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            state,
        }
    }

    /// Wait for the next event of this type.
    ///
    /// Already-queued events are drained before the terminal fault is
    /// reported, so a consumer always sees everything delivered before the
    /// connection ended.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Terminated`] once the queue is empty and the
    /// connection has ended.
    pub async fn next(&self) -> Result<T, StreamError> {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Some(item) => Ok(item),
            None => {
                let fault = self.state.fault().unwrap_or(TerminalFault::Closed);
                Err(StreamError::Terminated(fault))
            }
        }
    }

    /// Infinite stream of events of this type.
    ///
    /// Yields `Ok` items until the connection terminates, then yields the
    /// terminal error once and ends.
    pub fn stream(&self) -> impl Stream<Item = Result<T, StreamError>> {
        futures_util::stream::unfold((self.clone(), false), |(queue, done)| async move {
            if done {
                return None;
            }
            match queue.next().await {
                Ok(item) => Some((Ok(item), (queue, false))),
                Err(err) => Some((Err(err), (queue, true))),
            }
        })
    }
}

// ============================================================================
// Queue Bundle
// ============================================================================

/// Consumer-side queue handles, one per event type.
#[derive(Debug, Clone)]
pub(super) struct FeedQueues {
    pub(super) candles: FeedQueue<CandleEvent>,
    pub(super) quotes: FeedQueue<QuoteEvent>,
    pub(super) summaries: FeedQueue<SummaryEvent>,
    pub(super) time_and_sales: FeedQueue<TimeAndSaleEvent>,
    pub(super) trades: FeedQueue<TradeEvent>,
}

/// Producer-side senders, owned by the receive loop.
///
/// Dropping this bundle closes every queue, which is how consumers learn
/// the stream ended.
pub(super) struct EventSenders {
    candles: mpsc::UnboundedSender<CandleEvent>,
    quotes: mpsc::UnboundedSender<QuoteEvent>,
    summaries: mpsc::UnboundedSender<SummaryEvent>,
    time_and_sales: mpsc::UnboundedSender<TimeAndSaleEvent>,
    trades: mpsc::UnboundedSender<TradeEvent>,
}

impl EventSenders {
    /// Route one decoded event to its typed queue.
    ///
    /// Returns `false` when every handle for that queue has been dropped;
    /// the event is discarded in that case.
    pub(super) fn dispatch(&self, event: Event) -> bool {
        match event {
            Event::Candle(e) => self.candles.send(e).is_ok(),
            Event::Quote(e) => self.quotes.send(e).is_ok(),
            Event::Summary(e) => self.summaries.send(e).is_ok(),
            Event::TimeAndSale(e) => self.time_and_sales.send(e).is_ok(),
            Event::Trade(e) => self.trades.send(e).is_ok(),
        }
    }
}

/// Create the sender/queue pair for one connection.
pub(super) fn feed_channels(state: &Arc<StreamState>) -> (EventSenders, FeedQueues) {
    let (candle_tx, candle_rx) = mpsc::unbounded_channel();
    let (quote_tx, quote_rx) = mpsc::unbounded_channel();
    let (summary_tx, summary_rx) = mpsc::unbounded_channel();
    let (tas_tx, tas_rx) = mpsc::unbounded_channel();
    let (trade_tx, trade_rx) = mpsc::unbounded_channel();

    let senders = EventSenders {
        candles: candle_tx,
        quotes: quote_tx,
        summaries: summary_tx,
        time_and_sales: tas_tx,
        trades: trade_tx,
    };

    let queues = FeedQueues {
        candles: FeedQueue::new(candle_rx, Arc::clone(state)),
        quotes: FeedQueue::new(quote_rx, Arc::clone(state)),
        summaries: FeedQueue::new(summary_rx, Arc::clone(state)),
        time_and_sales: FeedQueue::new(tas_rx, Arc::clone(state)),
        trades: FeedQueue::new(trade_rx, Arc::clone(state)),
    };

    (senders, queues)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    fn quote(symbol: &str, sequence: i64) -> QuoteEvent {
        QuoteEvent {
            event_symbol: symbol.to_string(),
            event_time: 0,
            sequence,
            time_nano_part: 0,
            bid_time: 0,
            bid_exchange_code: "Q".to_string(),
            ask_time: 0,
            ask_exchange_code: "Q".to_string(),
            bid_price: None,
            ask_price: None,
            bid_size: None,
            ask_size: None,
        }
    }

    fn trade(symbol: &str) -> TradeEvent {
        TradeEvent {
            event_symbol: symbol.to_string(),
            event_time: 0,
            time: 0,
            time_nano_part: 0,
            sequence: 0,
            exchange_code: "Q".to_string(),
            day_id: 0,
            price: None,
            change: None,
            size: None,
            day_volume: None,
            day_turnover: None,
            tick_direction: None,
            extended_trading_hours: false,
        }
    }

    #[tokio::test]
    async fn dispatch_routes_by_event_type() {
        let state = Arc::new(StreamState::new());
        let (senders, queues) = feed_channels(&state);

        assert!(senders.dispatch(Event::Quote(quote("AAPL", 1))));
        assert!(senders.dispatch(Event::Trade(trade("MSFT"))));

        assert_eq!(queues.quotes.next().await.unwrap().event_symbol, "AAPL");
        assert_eq!(queues.trades.next().await.unwrap().event_symbol, "MSFT");
    }

    #[tokio::test]
    async fn queue_preserves_fifo_order() {
        let state = Arc::new(StreamState::new());
        let (senders, queues) = feed_channels(&state);

        for sequence in 1..=3 {
            senders.dispatch(Event::Quote(quote("SPY", sequence)));
        }

        assert_eq!(queues.quotes.next().await.unwrap().sequence, 1);
        assert_eq!(queues.quotes.next().await.unwrap().sequence, 2);
        assert_eq!(queues.quotes.next().await.unwrap().sequence, 3);
    }

    #[tokio::test]
    async fn cloned_handles_compete_for_items() {
        let state = Arc::new(StreamState::new());
        let (senders, queues) = feed_channels(&state);

        senders.dispatch(Event::Quote(quote("SPY", 1)));
        senders.dispatch(Event::Quote(quote("SPY", 2)));

        let first = queues.quotes.clone();
        let second = queues.quotes.clone();

        let a = first.next().await.unwrap();
        let b = second.next().await.unwrap();
        assert_eq!((a.sequence, b.sequence), (1, 2));
    }

    #[tokio::test]
    async fn dispatch_reports_dropped_consumers() {
        let state = Arc::new(StreamState::new());
        let (senders, queues) = feed_channels(&state);

        drop(queues);
        assert!(!senders.dispatch(Event::Quote(quote("AAPL", 1))));
    }

    #[tokio::test]
    async fn closed_queue_yields_recorded_fault() {
        let state = Arc::new(StreamState::new());
        let (senders, queues) = feed_channels(&state);

        state.record_fault(TerminalFault::Protocol("bad frame".to_string()));
        drop(senders);

        let err = queues.quotes.next().await.unwrap_err();
        match err {
            StreamError::Terminated(TerminalFault::Protocol(reason)) => {
                assert_eq!(reason, "bad frame");
            }
            other => panic!("expected protocol fault, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_queue_without_fault_reports_closed() {
        let state = Arc::new(StreamState::new());
        let (senders, queues) = feed_channels(&state);
        drop(senders);

        let err = queues.trades.next().await.unwrap_err();
        assert!(matches!(
            err,
            StreamError::Terminated(TerminalFault::Closed)
        ));
    }

    #[tokio::test]
    async fn queued_items_drain_before_fault() {
        let state = Arc::new(StreamState::new());
        let (senders, queues) = feed_channels(&state);

        senders.dispatch(Event::Quote(quote("SPY", 1)));
        state.record_fault(TerminalFault::Transport("connection reset".to_string()));
        drop(senders);

        assert_eq!(queues.quotes.next().await.unwrap().sequence, 1);
        assert!(queues.quotes.next().await.is_err());
    }

    #[tokio::test]
    async fn stream_ends_after_terminal_error() {
        let state = Arc::new(StreamState::new());
        let (senders, queues) = feed_channels(&state);

        senders.dispatch(Event::Quote(quote("SPY", 1)));
        senders.dispatch(Event::Quote(quote("SPY", 2)));
        drop(senders);

        let stream = queues.quotes.stream();
        tokio::pin!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap().sequence, 1);
        assert_eq!(stream.next().await.unwrap().unwrap().sequence, 2);
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }
}
