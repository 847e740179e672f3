//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::common::channels::DEFAULT_QUEUE_CAPACITY;
use crate::common::errors::{Result, TradingError};
use crate::scheduler::clock::{MarketClock, MinuteOfDay, TradingWindow};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Brokerage API configuration
    pub broker: BrokerConfig,
    /// Decision oracle endpoint
    pub oracle: OracleConfig,
    /// Instrument and trading-day schedule
    #[serde(default)]
    pub trading: TradingConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl AppConfig {
    /// Reject values the trading loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.broker.token.trim().is_empty() {
            return Err(TradingError::Configuration("broker.token is empty".to_string()));
        }
        if self.oracle.server_port == 0 {
            return Err(TradingError::Configuration("oracle.server_port is 0".to_string()));
        }
        if self.trading.queue_capacity == 0 {
            return Err(TradingError::Configuration("trading.queue_capacity is 0".to_string()));
        }
        if self.trading.tick_interval_seconds == 0 {
            return Err(TradingError::Configuration(
                "trading.tick_interval_seconds is 0".to_string(),
            ));
        }
        self.trading.window()?;
        self.oracle.endpoint()?;
        Url::parse(&self.broker.rest_url())
            .map_err(|e| TradingError::Configuration(format!("broker.rest_url: {}", e)))?;
        Ok(())
    }
}

/// Which brokerage environment to trade against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerEnvironment {
    #[default]
    Sandbox,
    Production,
}

/// Brokerage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// API token
    pub token: String,
    /// Sandbox or production endpoint
    #[serde(default, alias = "target_api")]
    pub environment: BrokerEnvironment,
    /// Explicit REST gateway URL, overrides the environment default
    #[serde(default)]
    pub rest_url: Option<String>,
    /// Account to trade on; resolved at startup when absent
    #[serde(default)]
    pub account_id: Option<String>,
    /// Application name sent with every request
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Retries for transient network failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl BrokerConfig {
    /// REST gateway URL for the configured environment
    pub fn rest_url(&self) -> String {
        match (&self.rest_url, self.environment) {
            (Some(url), _) => url.clone(),
            (None, BrokerEnvironment::Sandbox) => default_sandbox_rest_url(),
            (None, BrokerEnvironment::Production) => default_production_rest_url(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn default_sandbox_rest_url() -> String {
    "https://sandbox-invest-public-api.tinkoff.ru/rest".to_string()
}

fn default_production_rest_url() -> String {
    "https://invest-public-api.tinkoff.ru/rest".to_string()
}

fn default_app_name() -> String {
    "oracle-trader".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    30
}

/// Decision oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Host the oracle listens on
    #[serde(default = "default_oracle_host")]
    pub host: String,
    /// Port the oracle listens on
    pub server_port: u16,
    /// Request path
    #[serde(default = "default_oracle_path")]
    pub path: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl OracleConfig {
    /// Full URL of the prediction endpoint
    pub fn endpoint(&self) -> Result<Url> {
        let raw = format!(
            "http://{}:{}/{}",
            self.host,
            self.server_port,
            self.path.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|e| TradingError::Configuration(format!("oracle endpoint {}: {}", raw, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn default_oracle_host() -> String {
    "localhost".to_string()
}

fn default_oracle_path() -> String {
    "/data".to_string()
}

/// Instrument and schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Ticker of the traded instrument
    #[serde(default = "default_ticker")]
    pub ticker: String,
    /// IANA name of the exchange time zone
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Session open, exchange-local "HH:MM"
    #[serde(default = "default_open")]
    pub open: MinuteOfDay,
    /// Session close, exchange-local "HH:MM"
    #[serde(default = "default_close")]
    pub close: MinuteOfDay,
    /// Scheduler tick interval in seconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// Action queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How far back to look for the latest candle, in seconds
    #[serde(default = "default_candle_window")]
    pub candle_window_seconds: u64,
}

impl TradingConfig {
    pub fn window(&self) -> Result<TradingWindow> {
        TradingWindow::new(self.open, self.close)
    }

    /// Clock for the configured zone and window
    pub fn market_clock(&self) -> Result<MarketClock> {
        Ok(MarketClock::from_zone_name(&self.timezone, self.window()?))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }

    pub fn candle_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.candle_window_seconds as i64)
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            timezone: default_timezone(),
            open: default_open(),
            close: default_close(),
            tick_interval_seconds: default_tick_interval(),
            queue_capacity: default_queue_capacity(),
            candle_window_seconds: default_candle_window(),
        }
    }
}

fn default_ticker() -> String {
    "TCSG".to_string()
}

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

fn default_open() -> MinuteOfDay {
    MinuteOfDay::from_minutes(10 * 60)
}

fn default_close() -> MinuteOfDay {
    MinuteOfDay::from_minutes(17 * 60 + 30)
}

fn default_tick_interval() -> u64 {
    60
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_candle_window() -> u64 {
    60
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> AppConfig {
        AppConfig {
            broker: BrokerConfig {
                token: "t.secret".to_string(),
                environment: BrokerEnvironment::Sandbox,
                rest_url: None,
                account_id: None,
                app_name: default_app_name(),
                max_retries: 3,
                request_timeout_seconds: 30,
            },
            oracle: OracleConfig {
                host: "localhost".to_string(),
                server_port: 8000,
                path: "/data".to_string(),
                request_timeout_seconds: 30,
            },
            trading: TradingConfig::default(),
            settings: AppSettings::default(),
        }
    }

    #[test]
    fn test_sample_config_is_valid() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_oracle_endpoint() {
        let config = sample_config();
        assert_eq!(
            config.oracle.endpoint().unwrap().as_str(),
            "http://localhost:8000/data"
        );
    }

    #[test]
    fn test_rest_url_by_environment() {
        let mut config = sample_config();
        assert!(config.broker.rest_url().contains("sandbox"));

        config.broker.environment = BrokerEnvironment::Production;
        assert_eq!(config.broker.rest_url(), "https://invest-public-api.tinkoff.ru/rest");

        config.broker.rest_url = Some("http://127.0.0.1:9000".to_string());
        assert_eq!(config.broker.rest_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = sample_config();
        config.broker.token = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.trading.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.trading.open = MinuteOfDay::from_minutes(18 * 60);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_schedule() {
        let trading = TradingConfig::default();
        assert_eq!(trading.open.to_string(), "10:00");
        assert_eq!(trading.close.to_string(), "17:30");
        assert_eq!(trading.queue_capacity, 10);
        assert_eq!(trading.tick_interval(), Duration::from_secs(60));
    }
}
