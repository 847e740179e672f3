//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::{
    AppConfig, AppSettings, BrokerConfig, BrokerEnvironment, OracleConfig, TradingConfig,
};
use crate::common::errors::{Result, TradingError};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (e.g. `APP_BROKER__TOKEN`)
/// 2. Configuration file (YAML, or any format `config` recognizes by extension)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if !Path::new(path).exists() {
            return Err(TradingError::Configuration(format!(
                "config file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::with_name(path));
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| TradingError::Configuration(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| TradingError::Configuration(e.to_string()))?;

    app_config.validate()?;
    Ok(app_config)
}

/// Load configuration from environment variables only
pub fn load_from_env() -> Result<AppConfig> {
    // Try to load from .env file
    dotenvy::dotenv().ok();

    let token = std::env::var("BROKER_TOKEN")
        .map_err(|_| TradingError::Configuration("BROKER_TOKEN is not set".to_string()))?;

    let environment = match std::env::var("BROKER_ENVIRONMENT").as_deref() {
        Ok("production") => BrokerEnvironment::Production,
        _ => BrokerEnvironment::Sandbox,
    };

    let broker = BrokerConfig {
        token,
        environment,
        rest_url: std::env::var("BROKER_REST_URL").ok(),
        account_id: std::env::var("BROKER_ACCOUNT_ID").ok(),
        app_name: "oracle-trader".to_string(),
        max_retries: parse_var("BROKER_MAX_RETRIES")?.unwrap_or(3),
        request_timeout_seconds: 30,
    };

    let oracle = OracleConfig {
        host: std::env::var("ORACLE_HOST").unwrap_or_else(|_| "localhost".to_string()),
        server_port: parse_var("ORACLE_PORT")?.unwrap_or(8000),
        path: "/data".to_string(),
        request_timeout_seconds: 30,
    };

    let mut trading = TradingConfig::default();
    if let Ok(ticker) = std::env::var("TRADING_TICKER") {
        trading.ticker = ticker;
    }

    let app_config = AppConfig {
        broker,
        oracle,
        trading,
        settings: AppSettings::default(),
    };
    app_config.validate()?;
    Ok(app_config)
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| TradingError::Configuration(format!("{}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::LogFormat;
    use std::io::Write;

    fn write_temp_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "oracle_trader_{}_{}.yaml",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_yaml_file() {
        let path = write_temp_config(
            "full",
            r#"
broker:
  token: "t.sandbox"
  target_api: sandbox
  account_id: "acc-1"
oracle:
  server_port: 8081
trading:
  ticker: SBER
  open: "09:50"
  close: "18:40"
  tick_interval_seconds: 30
settings:
  log_level: debug
  log_format: json
"#,
        );

        let config = load_config(path.to_str()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.broker.token, "t.sandbox");
        assert_eq!(config.broker.environment, BrokerEnvironment::Sandbox);
        assert_eq!(config.broker.account_id.as_deref(), Some("acc-1"));
        assert_eq!(config.broker.max_retries, 3);
        assert_eq!(config.oracle.server_port, 8081);
        assert_eq!(config.oracle.host, "localhost");
        assert_eq!(config.trading.ticker, "SBER");
        assert_eq!(config.trading.open.minutes(), 9 * 60 + 50);
        assert_eq!(config.trading.close.minutes(), 18 * 60 + 40);
        assert_eq!(config.trading.tick_interval_seconds, 30);
        assert_eq!(config.trading.queue_capacity, 10);
        assert_eq!(config.settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        let path = write_temp_config(
            "bad_window",
            r#"
broker:
  token: "t.sandbox"
oracle:
  server_port: 8081
trading:
  open: "18:00"
  close: "10:00"
"#,
        );

        let result = load_config(path.to_str());
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(TradingError::Configuration(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config(Some("/definitely/not/here.yaml"));
        assert!(matches!(result, Err(TradingError::Configuration(_))));
    }
}
