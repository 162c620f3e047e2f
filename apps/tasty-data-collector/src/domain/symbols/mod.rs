//! Subscription Symbol Encoding
//!
//! dxfeed encodes candle aggregation parameters into the subscription
//! symbol itself: `SYMBOL{=INTERVAL}` for regular sessions and
//! `SYMBOL{=INTERVAL,tho=true}` when extended trading hours are included.
//!
//! Futures streamer symbols follow the `/{root}{month}{yy}:{exchange}`
//! convention, with the CME month letter sequence `FGHJKMNQUVXZ`.

use chrono::{Datelike, NaiveDate};

// =============================================================================
// Candle Symbols
// =============================================================================

/// Encode a candle subscription symbol for the given aggregation interval.
///
/// `interval` uses dxfeed period syntax (`"5m"`, `"1h"`, `"1d"`). With
/// `extended_trading_hours` the `tho=true` attribute is appended so the
/// server includes pre/post-market candles.
#[must_use]
pub fn candle_symbol(symbol: &str, interval: &str, extended_trading_hours: bool) -> String {
    if extended_trading_hours {
        format!("{symbol}{{={interval},tho=true}}")
    } else {
        format!("{symbol}{{={interval}}}")
    }
}

/// The plain ticker portion of a streamer symbol, with any `:EXCHANGE`
/// suffix and any `{...}` candle attributes removed.
///
/// Works on both subscription symbols (`"/CLK24:XNYM"`) and the event
/// symbols the feed echoes back (`"SPY{=5m}"`, `"/CLK24:XNYM{=5m}"`), so
/// the two sides group under the same key.
#[must_use]
pub fn ticker_of(streamer_symbol: &str) -> &str {
    let end = streamer_symbol
        .find([':', '{'])
        .unwrap_or(streamer_symbol.len());
    &streamer_symbol[..end]
}

// =============================================================================
// Futures Contract Codes
// =============================================================================

/// CME month codes in calendar order (January through December).
pub const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];

/// Calendar month (1-12) for a CME month code.
#[must_use]
pub fn month_number(code: char) -> Option<u32> {
    MONTH_CODES
        .iter()
        .position(|&c| c == code)
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// First day of the delivery month encoded in a futures contract code.
///
/// Accepts full streamer symbols (`"/GCM25:XCEC"`) as well as bare codes
/// (`"GCM25"`). Year digits count from 2000, so `"M5"` resolves to June
/// 2005 and `"M25"` to June 2025. Returns `None` when no month code and
/// year digits can be found.
#[must_use]
pub fn contract_date(contract_code: &str) -> Option<NaiveDate> {
    let code = ticker_of(contract_code.trim_start_matches('/'));
    let month_index = code.rfind(|c: char| !c.is_ascii_digit())?;
    let month_code = code[month_index..].chars().next()?;
    if !month_code.is_ascii_uppercase() {
        return None;
    }
    let year_digits = &code[month_index + 1..];
    if year_digits.is_empty() {
        return None;
    }
    let year: i32 = year_digits.parse().ok()?;
    NaiveDate::from_ymd_opt(2000 + year, month_number(month_code)?, 1)
}

/// Sort contract codes ascending by their delivery month.
///
/// Codes without a parseable delivery month sort last, alphabetically.
pub fn sort_by_contract_date(codes: &mut [String]) {
    codes.sort_by(|a, b| match (contract_date(a), contract_date(b)) {
        (Some(da), Some(db)) => da.cmp(&db).then_with(|| a.cmp(b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });
}

/// Generate futures streamer symbols `/{root}{month}{yy}:{exchange}` for
/// every listed month in the given two-digit year range.
///
/// With `active_from` set, contracts whose delivery month falls before
/// that date's month are skipped, leaving only contracts still trading.
#[must_use]
pub fn streamer_symbols(
    contract_root: &str,
    exchange_code: &str,
    listed_months: &[char],
    year_start: i32,
    year_end: i32,
    active_from: Option<NaiveDate>,
) -> Vec<String> {
    let cutoff = active_from
        .and_then(|date| NaiveDate::from_ymd_opt(date.year(), date.month(), 1));

    let mut symbols = Vec::new();
    for year in year_start..=year_end {
        for &month_code in listed_months {
            let Some(month) = month_number(month_code) else {
                continue;
            };
            let Some(delivery) = NaiveDate::from_ymd_opt(2000 + year, month, 1) else {
                continue;
            };
            if let Some(cutoff) = cutoff {
                if delivery < cutoff {
                    continue;
                }
            }
            symbols.push(format!("/{contract_root}{month_code}{year:02}:{exchange_code}"));
        }
    }
    symbols
}

// =============================================================================
// Tests
// =============================================================================
