//! Buy/sell alternation state machine

use rust_decimal::Decimal;

use super::statistics::{RoundTrip, TradingStatistics};
use crate::common::types::{Action, OrderFill, Portfolio};

/// Whether the strategy may open or must close a position next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingState {
    /// No position held
    MayBuy,
    /// `lots` held in the traded instrument
    MaySell { lots: i64 },
}

/// What the worker should do with a dequeued action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Illegal in the current state or unknown; nothing changes
    Ignore,
    /// Keep waiting, count the tick
    Hold,
    /// Open a position
    Buy,
    /// Close the held position
    Sell { lots: i64 },
    /// Stop consuming and liquidate
    EndOfDay,
}

impl TradingState {
    /// Initial state from the account at worker start
    ///
    /// Lots of the traded instrument left over from an earlier run are sold
    /// before anything new is bought. Other holdings only matter to liquidation.
    pub fn from_portfolio(portfolio: &Portfolio, instrument_id: &str) -> Self {
        match portfolio.balance_of(instrument_id) {
            Some(lots) if lots > 0 => TradingState::MaySell { lots },
            _ => TradingState::MayBuy,
        }
    }

    /// Guarded transition: map an action to the step allowed in this state
    pub fn plan(&self, action: Action) -> Step {
        match (self, action) {
            (_, Action::MarketClosed) => Step::EndOfDay,
            (_, Action::Hold) => Step::Hold,
            (TradingState::MayBuy, Action::Buy) => Step::Buy,
            (TradingState::MaySell { lots }, Action::Sell) => Step::Sell { lots: *lots },
            (TradingState::MaySell { .. }, Action::Buy)
            | (TradingState::MayBuy, Action::Sell)
            | (_, Action::Unrecognized(_)) => Step::Ignore,
        }
    }

    /// State after a buy order was filled
    pub fn on_buy_filled(self, fill: &OrderFill, stats: &mut TradingStatistics) -> Self {
        match (self, stats.record_buy(fill)) {
            (TradingState::MayBuy, Some(_)) => TradingState::MaySell {
                lots: fill.lots_executed,
            },
            (state, _) => state,
        }
    }

    /// State after a sell order was filled, with the round trip it closed
    pub fn on_sell_filled(
        self,
        fill: &OrderFill,
        stats: &mut TradingStatistics,
    ) -> (Self, Option<RoundTrip>) {
        match self {
            TradingState::MaySell { .. } => match stats.record_sell(fill) {
                Some(trip) => (TradingState::MayBuy, Some(trip)),
                None => (self, None),
            },
            TradingState::MayBuy => (self, None),
        }
    }
}

/// Lots to request for a buy: everything the cash covers at `last_price`,
/// minus one lot of headroom for price drift before the fill
pub fn target_buy_lots(cash: Decimal, last_price: Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;

    if last_price <= Decimal::ZERO {
        return 0;
    }
    cash.checked_div(last_price)
        .and_then(|lots| lots.floor().to_i64())
        .map(|lots| lots - 1)
        .unwrap_or(0)
}
