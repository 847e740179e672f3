//! Trait definitions for the external collaborators

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::errors::Result;
use super::types::{Action, Candle, MarketSnapshot, OrderFill, Portfolio};

/// Trait for brokerage clients
///
/// This is everything the scheduler and the strategy worker need from the
/// exchange side. Implementations own their retry policy; callers treat any
/// `Err` as a failed request and never retry on their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// Resolve a ticker to the brokerage's instrument id
    async fn find_instrument(&self, ticker: &str) -> Result<String>;

    /// Current positions and free cash of an account
    async fn list_positions(&self, account_id: &str) -> Result<Portfolio>;

    /// Last traded price of one lot
    async fn last_price(&self, instrument_id: &str) -> Result<Decimal>;

    /// Latest candle within `window` of now, `None` if the exchange has none
    async fn latest_candle(&self, instrument_id: &str, window: Duration) -> Result<Option<Candle>>;

    /// Place a market buy order
    ///
    /// # Arguments
    /// * `instrument_id` - Instrument to buy
    /// * `account_id` - Account to trade on
    /// * `lots` - Number of lots, always positive
    async fn market_buy(&self, instrument_id: &str, account_id: &str, lots: i64) -> Result<OrderFill>;

    /// Place a market sell order
    async fn market_sell(&self, instrument_id: &str, account_id: &str, lots: i64) -> Result<OrderFill>;
}

/// Trait for the external decision service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// Ask for a verdict on a market snapshot
    async fn decide(&self, snapshot: &MarketSnapshot) -> Result<Action>;
}

/// Shared brokerage handle for dynamic dispatch
pub type SharedBrokerage = Arc<dyn Brokerage>;

/// Shared oracle handle for dynamic dispatch
pub type SharedOracle = Arc<dyn DecisionOracle>;
