//! Instrument Lookups
//!
//! Futures and cryptocurrency metadata, used to resolve product codes into
//! subscribable streamer symbols.

use std::collections::HashMap;

use super::models::{Cryptocurrency, Future, Items};
use super::session::{ApiError, RestSession};

impl RestSession {
    /// Fetch one future with `GET /instruments/futures/{symbol}`.
    ///
    /// A leading `/` is stripped from the path segment, so `/CLK4` and
    /// `CLK4` address the same contract.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the contract is unknown.
    pub async fn get_future(&self, symbol: &str) -> Result<Future, ApiError> {
        let symbol = symbol.trim_start_matches('/');
        self.get_data(&format!("/instruments/futures/{symbol}"), &[])
            .await
    }

    /// List futures with `GET /instruments/futures`, filtered by contract
    /// symbols and/or product codes.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    pub async fn list_futures(
        &self,
        symbols: &[String],
        product_codes: &[String],
    ) -> Result<Vec<Future>, ApiError> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        for symbol in symbols {
            query.push(("symbol[]", symbol.as_str()));
        }
        for code in product_codes {
            query.push(("product-code[]", code.as_str()));
        }
        let items: Items<Future> = self.get_data("/instruments/futures", &query).await?;
        Ok(items.items)
    }

    /// List cryptocurrencies with `GET /instruments/cryptocurrencies`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    pub async fn list_cryptocurrencies(
        &self,
        symbols: &[String],
    ) -> Result<Vec<Cryptocurrency>, ApiError> {
        let query: Vec<(&str, &str)> = symbols
            .iter()
            .map(|symbol| ("symbol[]", symbol.as_str()))
            .collect();
        let items: Items<Cryptocurrency> = self
            .get_data("/instruments/cryptocurrencies", &query)
            .await?;
        Ok(items.items)
    }

    /// Map contract symbols to streamer symbols for one product code.
    ///
    /// Contracts without a streamer symbol are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error when the listing request fails.
    pub async fn streamer_symbol_map(
        &self,
        product_code: &str,
    ) -> Result<HashMap<String, String>, ApiError> {
        let futures = self
            .list_futures(&[], &[product_code.to_string()])
            .await?;
        Ok(futures
            .into_iter()
            .filter_map(|future| {
                future
                    .streamer_symbol
                    .map(|streamer| (future.symbol, streamer))
            })
            .collect())
    }
}
