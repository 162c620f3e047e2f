//! Tracing Setup
//!
//! Structured logging via tracing-subscriber. An `EnvFilter` honours
//! `RUST_LOG`; when unset the collector logs at info with its own crate at
//! debug.
//!
//! # Usage
//!
//! ```ignore
//! use tasty_data_collector::infrastructure::telemetry;
//!
//! telemetry::init();
//! tracing::info!("collector starting");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,tasty_data_collector=debug";

/// Initialize the tracing subscriber.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_safe() {
        init();
        init();
    }
}
