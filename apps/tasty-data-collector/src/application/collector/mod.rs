//! Feed Collectors
//!
//! Consumers over the typed feed queues with an idle deadline: each
//! collector subscribes, drains events until the requested picture is
//! complete or the feed goes quiet, then unsubscribes and returns what
//! arrived. A stream fault mid-collection ends the run early with the
//! partial result; the fault itself is logged, not returned, so a dying
//! feed still yields whatever it delivered first.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::domain::events::{CandleEvent, QuoteEvent};
use crate::domain::symbols;
use crate::domain::timeline::{self, TimelineError};
use crate::infrastructure::dxlink::{DxLinkClient, StreamError};

/// Candle history for one ticker, keyed by bucket timestamp (epoch ms).
pub type CandleSeries = BTreeMap<i64, CandleEvent>;

/// Collected candle history, keyed by ticker.
pub type CandleHistory = BTreeMap<String, CandleSeries>;

/// Errors that prevent a collection run from starting.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The subscription could not be established.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
    /// The configured interval does not parse.
    #[error("timeline error: {0}")]
    Timeline(#[from] TimelineError),
}

/// Gather the latest quote per symbol.
///
/// Subscribes the symbols on the quote channel, then drains the quote
/// queue keeping the most recent quote per event symbol. Collection stops
/// once every requested symbol has a quote, or when no event arrives
/// within `idle_timeout`; symbols the feed never quoted are simply absent
/// from the result.
///
/// # Errors
///
/// Returns an error when the quote subscription cannot be established.
pub async fn collect_quotes(
    client: &DxLinkClient,
    symbols: &[String],
    idle_timeout: Duration,
) -> Result<HashMap<String, QuoteEvent>, StreamError> {
    let queue = client.quotes();
    client.subscribe_quotes(symbols).await?;

    let mut pending: HashSet<&str> = symbols.iter().map(String::as_str).collect();
    let mut latest: HashMap<String, QuoteEvent> = HashMap::new();

    while !pending.is_empty() {
        match tokio::time::timeout(idle_timeout, queue.next()).await {
            Ok(Ok(quote)) => {
                pending.remove(quote.event_symbol.as_str());
                latest.insert(quote.event_symbol.clone(), quote);
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, "quote stream ended during collection");
                break;
            }
            Err(_) => {
                tracing::info!(
                    collected = latest.len(),
                    missing = pending.len(),
                    "quote feed idle, stopping collection"
                );
                break;
            }
        }
    }

    if let Err(err) = client.unsubscribe_quotes(symbols).await {
        tracing::debug!(%err, "quote unsubscribe after collection failed");
    }
    Ok(latest)
}

/// Gather candle history per symbol over a trading date range.
///
/// Each symbol is subscribed on the candle channel with history replayed
/// from `start_date` midnight UTC. Incoming candles are kept only when
/// their `time` lands on a trading bucket of the range (non-Saturday days
/// at `interval` spacing), grouped under the symbol's ticker and
/// deduplicated by bucket, last write wins. Collection stops when no
/// candle arrives within `idle_timeout`; how much of the range the server
/// actually backfills is up to the server.
///
/// # Errors
///
/// Returns an error when the interval does not parse or a subscription
/// cannot be established.
pub async fn collect_candles(
    client: &DxLinkClient,
    symbols: &[String],
    interval: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    extended_trading_hours: bool,
    idle_timeout: Duration,
) -> Result<CandleHistory, CollectError> {
    let expected: HashSet<i64> = timeline::bucket_timestamps(start_date, end_date, interval)?
        .into_iter()
        .collect();
    let start_time = start_date.and_time(NaiveTime::MIN).and_utc();

    let queue = client.candles();
    let mut history: CandleHistory = symbols
        .iter()
        .map(|symbol| (symbols::ticker_of(symbol).to_string(), CandleSeries::new()))
        .collect();
    for symbol in symbols {
        client
            .subscribe_candles(symbol, interval, extended_trading_hours, start_time)
            .await?;
    }

    loop {
        match tokio::time::timeout(idle_timeout, queue.next()).await {
            Ok(Ok(candle)) => {
                if !expected.contains(&candle.time) {
                    continue;
                }
                let ticker = symbols::ticker_of(&candle.event_symbol);
                let Some(series) = history.get_mut(ticker) else {
                    continue;
                };
                series.insert(candle.time, candle);
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, "candle stream ended during collection");
                break;
            }
            Err(_) => {
                let collected: usize = history.values().map(BTreeMap::len).sum();
                tracing::info!(collected, "candle feed idle, stopping collection");
                break;
            }
        }
    }

    for symbol in symbols {
        if let Err(err) = client
            .unsubscribe_candles(symbol, interval, extended_trading_hours)
            .await
        {
            tracing::debug!(%symbol, %err, "candle unsubscribe after collection failed");
        }
    }
    Ok(history)
}
