//! Configuration Module
//!
//! Configuration loading and credential resolution for the collector.

mod credentials;
mod settings;

pub use credentials::Credentials;
pub use settings::{CollectMode, CollectSettings, Config, ConfigError, StreamSettings};
