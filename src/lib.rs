//! OracleTrader Library
//!
//! An intraday trading bot for a single exchange-listed instrument. A
//! scheduler polls the latest candle while the exchange is open, asks an
//! external decision oracle for BUY/SELL/HOLD, and a per-day strategy worker
//! executes the verdicts as market orders through the brokerage.

pub mod broker;
pub mod common;
pub mod config;
pub mod oracle;
pub mod scheduler;
pub mod strategy;

// Re-export commonly used types
pub use broker::BrokerRestClient;
pub use common::channels::{create_action_queue, ActionReceiver, ActionSender, Dequeued};
pub use common::errors::{Result, TradingError};
pub use common::traits::{Brokerage, DecisionOracle, SharedBrokerage, SharedOracle};
pub use common::types::{
    Action, Candle, MarketSnapshot, OrderFill, Portfolio, Position, Side,
};
pub use config::types::AppConfig;
pub use oracle::HttpOracleClient;
pub use scheduler::{MarketClock, Scheduler, TickOutcome, TradingWindow};

// Strategy types
pub use strategy::{
    DayOpening, DaySummary, RoundTrip, StrategyWorker, TradingState, TradingStatistics,
    WorkerContext, WorkerReport,
};
