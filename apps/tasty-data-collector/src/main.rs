//! Tasty Data Collector Binary
//!
//! Logs in to tastytrade, opens the DXLink market-data stream, runs the
//! configured collector, and writes the gathered data as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p tasty-data-collector
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `TASTY_LOGIN` + `TASTY_PASSWORD` (or `TASTY_REMEMBER_TOKEN`), or
//!   `TASTY_CREDENTIALS_FILE`: CSV credential file with
//!   `email,username,password` headers
//! - `COLLECT_SYMBOLS`: Comma-separated symbols to collect
//!
//! ## Optional
//! - `TASTY_BASE_URL`: REST base URL (default: <https://api.tastyworks.com>)
//! - `COLLECT_MODE`: quotes | candles (default: quotes)
//! - `CANDLE_INTERVAL`: Candle aggregation period (default: 5m)
//! - `COLLECT_START_DATE` / `COLLECT_END_DATE`: YYYY-MM-DD (default: today)
//! - `COLLECT_EXTENDED_HOURS`: Include pre/post-market candles (default: false)
//! - `COLLECT_TIMEOUT_SECS`: Idle deadline that ends collection (default: 10)
//! - `OUTPUT_DIR`: CSV output directory (default: ./out)
//! - `STREAM_AUTH_TIMEOUT_SECS`: AUTH handshake deadline (default: 10)
//! - `STREAM_CHANNEL_TIMEOUT_SECS`: Channel-open deadline (default: 10)
//! - `STREAM_KEEPALIVE_INTERVAL_SECS`: Keepalive cadence (default: 30)
//! - `STREAM_KEEPALIVE_TIMEOUT_SECS`: Advertised timeout (default: 60)
//! - `RUST_LOG`: Log level (default: info,tasty_data_collector=debug)

use anyhow::Context;
use tasty_data_collector::application::export;
use tasty_data_collector::infrastructure::telemetry;
use tasty_data_collector::{
    CollectMode, Config, DxLinkClient, DxLinkConfig, RestSession, collect_candles, collect_quotes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();
    telemetry::init();

    tracing::info!("Starting Tasty Data Collector");

    let config = Config::from_env().context("loading configuration")?;
    log_config(&config);

    let session = RestSession::login(config.base_url.as_str(), &config.credentials)
        .await
        .context("tastytrade login")?;
    let tokens = session
        .quote_streamer_tokens()
        .await
        .context("fetching quote streamer tokens")?;
    let symbols = resolve_symbols(&session, &config.collect.symbols).await;

    let mut dx_config = DxLinkConfig::new(tokens.dxlink_url, tokens.token);
    dx_config.keepalive_interval = config.stream.keepalive_interval;
    dx_config.keepalive_timeout = config.stream.keepalive_timeout;
    dx_config.auth_timeout = config.stream.auth_timeout;
    dx_config.channel_open_timeout = config.stream.channel_open_timeout;

    tracing::info!(url = %dx_config.url, "connecting to DXLink");
    let client = DxLinkClient::connect(dx_config)
        .await
        .context("connecting to DXLink")?;

    // Ctrl+C closes the stream, which unblocks the collector with whatever
    // it gathered so far; partial results still get exported.
    let collection = run_collection(&client, &config, &symbols);
    tokio::pin!(collection);
    let result = tokio::select! {
        result = &mut collection => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, stopping collection");
            client.close().await;
            collection.await
        }
    };

    client.close().await;
    if let Err(err) = session.destroy().await {
        tracing::warn!(%err, "REST session destroy failed");
    }

    result
}

/// Run the configured collector and export its output.
async fn run_collection(
    client: &DxLinkClient,
    config: &Config,
    symbols: &[String],
) -> anyhow::Result<()> {
    let collect = &config.collect;
    match collect.mode {
        CollectMode::Quotes => {
            let quotes = collect_quotes(client, symbols, collect.idle_timeout)
                .await
                .context("collecting quotes")?;
            tracing::info!(count = quotes.len(), "collected quotes");
            let path = export::export_quote_snapshot(&collect.output_dir, &quotes)
                .context("writing quote snapshot")?;
            tracing::info!(path = %path.display(), "wrote quote snapshot");
        }
        CollectMode::Candles => {
            let history = collect_candles(
                client,
                symbols,
                &collect.candle_interval,
                collect.start_date,
                collect.end_date,
                collect.extended_hours,
                collect.idle_timeout,
            )
            .await
            .context("collecting candles")?;

            let written = export::export_candle_history(&collect.output_dir, &history)
                .context("writing candle series")?;
            for path in &written {
                tracing::info!(path = %path.display(), "wrote candle series");
            }
            if written.len() > 1 {
                let path = export::export_forward_curve(&collect.output_dir, &history)
                    .context("writing forward curve")?;
                tracing::info!(path = %path.display(), "wrote forward curve");
            }
        }
    }
    Ok(())
}

/// Resolve plain future symbols (`/CLK4` style, no exchange suffix) to
/// their DXLink streamer symbols via the instruments API. Anything else
/// passes through unchanged, as do futures the lookup cannot resolve.
async fn resolve_symbols(session: &RestSession, symbols: &[String]) -> Vec<String> {
    let mut resolved = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        if symbol.starts_with('/') && !symbol.contains(':') {
            match session.get_future(symbol).await {
                Ok(future) => {
                    if let Some(streamer) = future.streamer_symbol {
                        tracing::debug!(%symbol, %streamer, "resolved future streamer symbol");
                        resolved.push(streamer);
                        continue;
                    }
                    tracing::warn!(%symbol, "future has no streamer symbol, using it as-is");
                }
                Err(err) => {
                    tracing::warn!(%symbol, %err, "future lookup failed, using symbol as-is");
                }
            }
        }
        resolved.push(symbol.clone());
    }
    resolved
}

/// Log the parsed configuration.
fn log_config(config: &Config) {
    tracing::info!(
        mode = config.collect.mode.as_str(),
        symbols = ?config.collect.symbols,
        interval = %config.collect.candle_interval,
        start = %config.collect.start_date,
        end = %config.collect.end_date,
        extended_hours = config.collect.extended_hours,
        output_dir = %config.collect.output_dir.display(),
        "Configuration loaded"
    );
}

/// Load a `.env` file from the current directory or any ancestor.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
