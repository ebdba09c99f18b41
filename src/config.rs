//! Service configuration.
//!
//! Every setting is a CLI flag with an environment fallback, so a `.env` file
//! loaded at startup works the same as explicit flags.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{ensure, Result};
use clap::Parser;

use crate::window::{EngineConfig, Scale, DEFAULT_QUEUE_CAPACITY, MAX_SCALE};

/// Longest window accepted; keeps expiry deadlines well inside clock range.
pub const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Parser, Debug, Clone)]
#[command(name = "window-stats")]
#[command(about = "Real-time statistics over a trailing window of transactions")]
pub struct Config {
    /// How long a transaction counts towards the statistics, in milliseconds
    #[arg(long, env = "TRANSACTION_LIFE_MILLIS")]
    pub transaction_life_millis: u64,

    /// Fractional digits amounts are rounded to (half-to-even)
    #[arg(long, env = "DECIMAL_SCALE", default_value_t = 3)]
    pub decimal_scale: u32,

    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Pending inserts the writer will buffer before producers wait
    #[arg(long, env = "ENGINE_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
}

impl Config {
    /// Config for a given window with every other setting at its default.
    pub fn with_window(window: Duration) -> Self {
        Self {
            transaction_life_millis: window.as_millis().min(u128::from(u64::MAX)) as u64,
            decimal_scale: Scale::DEFAULT.digits(),
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.window() <= MAX_WINDOW,
            "transaction life of {}ms exceeds the maximum of {}ms",
            self.transaction_life_millis,
            MAX_WINDOW.as_millis()
        );
        ensure!(
            self.decimal_scale <= MAX_SCALE,
            "decimal scale {} exceeds the maximum of {}",
            self.decimal_scale,
            MAX_SCALE
        );
        ensure!(self.queue_capacity > 0, "engine queue capacity must be positive");
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.transaction_life_millis)
    }

    pub fn scale(&self) -> Result<Scale> {
        Scale::new(self.decimal_scale)
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig {
            scale: self.scale()?,
            queue_capacity: self.queue_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config =
            Config::try_parse_from(["window-stats", "--transaction-life-millis", "60000"]).unwrap();
        assert_eq!(config.window(), Duration::from_secs(60));
        assert_eq!(config.decimal_scale, 3);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.bind.port(), 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_overrides() {
        let config = Config::try_parse_from([
            "window-stats",
            "--transaction-life-millis",
            "100",
            "--decimal-scale",
            "5",
            "--bind",
            "127.0.0.1:8080",
            "--queue-capacity",
            "16",
        ])
        .unwrap();
        assert_eq!(config.scale().unwrap().digits(), 5);
        assert_eq!(config.engine_config().unwrap().queue_capacity, 16);
        assert_eq!(config.bind, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_negative_window_rejected_by_parser() {
        let parsed = Config::try_parse_from(["window-stats", "--transaction-life-millis", "-5"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_limits() {
        let mut config = Config::with_window(Duration::from_secs(1));
        config.decimal_scale = MAX_SCALE + 1;
        assert!(config.validate().is_err());

        let mut config = Config::with_window(Duration::from_secs(1));
        config.queue_capacity = 0;
        assert!(config.validate().is_err());

        let config = Config::with_window(MAX_WINDOW + Duration::from_millis(1));
        assert!(config.validate().is_err());
    }
}
