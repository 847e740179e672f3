//! OracleTrader - Main Entry Point
//!
//! Resolves the brokerage account and the traded instrument, then runs the
//! scheduler until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use oracle_trader::common::traits::Brokerage;
use oracle_trader::config::types::{BrokerEnvironment, LogFormat};
use oracle_trader::config::{load_config, load_from_env, AppConfig};
use oracle_trader::{BrokerRestClient, HttpOracleClient, Scheduler};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file; without one, configuration is read from the environment
    #[arg(short, long, env = "ORACLE_TRADER_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Pay this many RUB into the sandbox account before trading
    #[arg(long)]
    deposit: Option<Decimal>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = match args.config.as_deref() {
        Some(path) => load_config(Some(path)),
        None => load_from_env(),
    }
    .context("failed to load configuration")?;

    init_logging(&args, &config)?;

    info!("Starting OracleTrader");
    if let Some(path) = &args.config {
        info!("Configuration file: {}", path);
    }

    run(args, config).await
}

fn init_logging(args: &Args, config: &AppConfig) -> Result<()> {
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.settings.log_level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let result = if args.json_logs || config.settings.log_format == LogFormat::Json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    let broker = Arc::new(
        BrokerRestClient::from_config(&config.broker).context("failed to build brokerage client")?,
    );
    let oracle = Arc::new(
        HttpOracleClient::from_config(&config.oracle).context("failed to build oracle client")?,
    );
    info!(
        environment = ?config.broker.environment,
        rest_url = %config.broker.rest_url(),
        oracle = %oracle.endpoint(),
        "Clients initialized"
    );

    let account_id = broker
        .resolve_account_id(config.broker.account_id.as_deref(), config.broker.environment)
        .await
        .context("failed to resolve brokerage account")?;
    info!("Trading on account {}", account_id);

    if let Some(amount) = args.deposit {
        if config.broker.environment == BrokerEnvironment::Sandbox {
            broker
                .sandbox_pay_in(&account_id, amount)
                .await
                .context("sandbox pay-in failed")?;
        } else {
            warn!("Ignoring --deposit outside the sandbox");
        }
    }

    let instrument_id = broker
        .find_instrument(&config.trading.ticker)
        .await
        .with_context(|| format!("failed to find instrument {}", config.trading.ticker))?;
    info!("Instrument {} has id {}", config.trading.ticker, instrument_id);

    let clock = config.trading.market_clock()?;
    let scheduler = Scheduler::new(clock, broker, oracle, account_id, instrument_id)
        .with_tick_interval(config.trading.tick_interval())
        .with_queue_capacity(config.trading.queue_capacity)
        .with_candle_window(config.trading.candle_window());

    match scheduler.run(shutdown_signal()).await {
        Some(summary) => info!(
            total_money = %summary.total_money,
            transactions = summary.transaction_count,
            "Last trading day finished"
        ),
        None => info!("No trading day completed"),
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
