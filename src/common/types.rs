//! Domain types shared by the scheduler, the strategy worker and the clients

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Verdict carried through the action queue
///
/// `Hold`, `Buy` and `Sell` come from the decision oracle. `MarketClosed`
/// is produced only by the scheduler to end a trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Hold,
    Buy,
    Sell,
    MarketClosed,
    /// Any code the worker does not know how to act on
    Unrecognized(i64),
}

impl Action {
    pub const HOLD_CODE: i64 = 0;
    pub const BUY_CODE: i64 = 1;
    pub const SELL_CODE: i64 = 2;
    pub const MARKET_CLOSED_CODE: i64 = 4;

    /// Decode an action code as it appears on the queue
    pub fn from_code(code: i64) -> Self {
        match code {
            Self::HOLD_CODE => Action::Hold,
            Self::BUY_CODE => Action::Buy,
            Self::SELL_CODE => Action::Sell,
            Self::MARKET_CLOSED_CODE => Action::MarketClosed,
            other => Action::Unrecognized(other),
        }
    }

    /// Decode a code returned by the oracle
    ///
    /// The day-end sentinel is reserved for the scheduler, so the oracle
    /// answering 4 is treated like any other unknown code.
    pub fn from_oracle_code(code: i64) -> Self {
        match Self::from_code(code) {
            Action::MarketClosed => Action::Unrecognized(code),
            action => action,
        }
    }

    /// Numeric wire code
    pub fn code(&self) -> i64 {
        match self {
            Action::Hold => Self::HOLD_CODE,
            Action::Buy => Self::BUY_CODE,
            Action::Sell => Self::SELL_CODE,
            Action::MarketClosed => Self::MARKET_CLOSED_CODE,
            Action::Unrecognized(code) => *code,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Hold => write!(f, "HOLD"),
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::MarketClosed => write!(f, "MARKET_CLOSED"),
            Action::Unrecognized(code) => write!(f, "UNRECOGNIZED({})", code),
        }
    }
}

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// One OHLCV candle as reported by the brokerage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Traded volume in lots
    pub volume: i64,
}

impl Candle {
    /// A candle carries no information when nothing traded or no close was printed
    pub fn is_empty(&self) -> bool {
        self.volume == 0 || self.close.is_zero()
    }
}

/// Candle plus the monotonic request id it was fetched under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Monotonic request counter value
    pub request_id: u64,
    /// Candle open time
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl MarketSnapshot {
    /// Build a snapshot from a candle
    pub fn from_candle(request_id: u64, candle: &Candle) -> Self {
        Self {
            request_id,
            timestamp: candle.time,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
        }
    }
}

/// Holding of one instrument, in lots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub instrument_id: String,
    pub balance: i64,
}

impl Position {
    pub fn new(instrument_id: impl Into<String>, balance: i64) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            balance,
        }
    }

    /// Whether anything is held
    pub fn is_open(&self) -> bool {
        self.balance != 0
    }
}

/// Positions and free cash of an account
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub positions: Vec<Position>,
    pub cash: Decimal,
}

impl Portfolio {
    /// Positions with a nonzero balance
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    /// Lots held in a given instrument, if any
    pub fn balance_of(&self, instrument_id: &str) -> Option<i64> {
        self.open_positions()
            .find(|p| p.instrument_id == instrument_id)
            .map(|p| p.balance)
    }
}

/// Result of an executed market order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFill {
    pub lots_executed: i64,
    pub lots_requested: i64,
    /// Notional of the whole executed order, not a per-lot price
    pub executed_price: Decimal,
}

impl OrderFill {
    /// Average price of one executed lot
    pub fn price_per_lot(&self) -> Option<Decimal> {
        if self.lots_executed <= 0 {
            return None;
        }
        self.executed_price
            .checked_div(Decimal::from(self.lots_executed))
    }

    /// Whether fewer lots were executed than requested
    pub fn is_partial(&self) -> bool {
        self.lots_executed < self.lots_requested
    }
}
