//! CSV Export
//!
//! Plain CSV writers for the collected data: a quote snapshot table, one
//! candle series file per ticker, and a forward-curve matrix of close
//! prices. Cells hold bare values with no styling or number formatting.

use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::application::collector::{CandleHistory, CandleSeries};
use crate::domain::events::QuoteEvent;
use crate::domain::symbols;

/// Errors from writing collected data to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization failed.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    /// Creating or writing an output file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Writers
// =============================================================================

/// Write a quote snapshot as `symbol,bid,ask,mid`, one row per symbol in
/// ascending symbol order. The mid column is blank unless both sides of
/// the quote are present.
///
/// # Errors
///
/// Returns an error when the underlying writer fails.
pub fn write_quote_snapshot<W: Write>(
    writer: W,
    quotes: &HashMap<String, QuoteEvent>,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["symbol", "bid", "ask", "mid"])?;

    let mut rows: Vec<(&String, &QuoteEvent)> = quotes.iter().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));
    for (symbol, quote) in rows {
        csv_writer.write_record(&[
            symbol.clone(),
            cell(quote.bid_price),
            cell(quote.ask_price),
            cell(quote.midpoint()),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write one candle series as `time,open,high,low,close,volume`, ascending
/// by bucket time, with times rendered as RFC 3339 UTC.
///
/// # Errors
///
/// Returns an error when the underlying writer fails.
pub fn write_candle_series<W: Write>(writer: W, series: &CandleSeries) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["time", "open", "high", "low", "close", "volume"])?;

    for (time, candle) in series {
        csv_writer.write_record(&[
            rfc3339_utc(*time),
            cell(candle.open),
            cell(candle.high),
            cell(candle.low),
            cell(candle.close),
            cell(candle.volume),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a forward-curve matrix of close prices.
///
/// Rows are observation times ascending; columns are the tickers with data,
/// ordered by contract delivery month. A cell missing its close price takes
/// the value of the nearest filled column to its left in the same row;
/// leading cells with no predecessor stay blank.
///
/// # Errors
///
/// Returns an error when the underlying writer fails.
pub fn write_forward_curve<W: Write>(writer: W, history: &CandleHistory) -> Result<(), ExportError> {
    let mut contracts: Vec<String> = history
        .iter()
        .filter(|(_, series)| !series.is_empty())
        .map(|(ticker, _)| ticker.clone())
        .collect();
    symbols::sort_by_contract_date(&mut contracts);

    let mut times: BTreeSet<i64> = BTreeSet::new();
    for series in history.values() {
        times.extend(series.keys().copied());
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut header = vec!["date".to_string()];
    header.extend(contracts.iter().cloned());
    csv_writer.write_record(&header)?;

    for time in times {
        let mut row = vec![rfc3339_utc(time)];
        let mut last: Option<Decimal> = None;
        for contract in &contracts {
            let close = history
                .get(contract)
                .and_then(|series| series.get(&time))
                .and_then(|candle| candle.close);
            if let Some(value) = close {
                last = Some(value);
            }
            row.push(cell(last));
        }
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

// =============================================================================
// File Helpers
// =============================================================================

/// Write the quote snapshot to `<dir>/quotes.csv`, creating the directory
/// when needed.
///
/// # Errors
///
/// Returns an error when the directory or file cannot be written.
pub fn export_quote_snapshot(
    dir: &Path,
    quotes: &HashMap<String, QuoteEvent>,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join("quotes.csv");
    write_quote_snapshot(File::create(&path)?, quotes)?;
    Ok(path)
}

/// Write one `<dir>/<ticker>.csv` per ticker with data, creating the
/// directory when needed. Tickers without any collected candles are
/// skipped. Returns the written paths.
///
/// # Errors
///
/// Returns an error when the directory or a file cannot be written.
pub fn export_candle_history(
    dir: &Path,
    history: &CandleHistory,
) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (ticker, series) in history {
        if series.is_empty() {
            continue;
        }
        let path = dir.join(format!("{}.csv", file_stem(ticker)));
        write_candle_series(File::create(&path)?, series)?;
        written.push(path);
    }
    Ok(written)
}

/// Write the forward-curve matrix to `<dir>/forward_curve.csv`, creating
/// the directory when needed.
///
/// # Errors
///
/// Returns an error when the directory or file cannot be written.
pub fn export_forward_curve(dir: &Path, history: &CandleHistory) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join("forward_curve.csv");
    write_forward_curve(File::create(&path)?, history)?;
    Ok(path)
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn rfc3339_utc(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms).map_or_else(
        || epoch_ms.to_string(),
        |time| time.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

/// Filename stem for a ticker: the leading slash of futures symbols is
/// dropped and any remaining slash becomes a dash.
fn file_stem(ticker: &str) -> String {
    ticker.trim_start_matches('/').replace('/', "-")
}

// =============================================================================
// Tests
// =============================================================================
