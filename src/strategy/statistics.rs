//! Per-day trading statistics
//!
//! One instance per trading day, owned by the strategy worker of that day.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use crate::common::types::OrderFill;

/// Running P&L bookkeeping of a trading day
#[derive(Debug, Clone, PartialEq)]
pub struct TradingStatistics {
    /// Cash available to the strategy
    pub money: Decimal,
    /// Per-lot price of the last buy
    pub buy_point: Decimal,
    /// Per-lot price of the last sell
    pub sell_point: Decimal,
    pub success_transaction_count: u64,
    pub failed_transaction_count: u64,
    /// Ticks since the current position was entered
    pub transaction_length: u64,
    pub total_transaction_length: u64,
    /// Completed round trips
    pub transaction_count: u64,
    pub maximum_gain: Decimal,
    pub maximum_profit_percent: Decimal,
    pub maximum_loss: Decimal,
    pub maximum_loss_percent: Decimal,
    pub maximum_money: Decimal,
    pub minimum_money: Decimal,
    /// Sum of per-trip gain ratios (not multiplied by 100)
    pub total_percent_profit: Decimal,
    pub total_gain: Decimal,
}

/// Figures of one completed round trip
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub buy_point: Decimal,
    pub sell_point: Decimal,
    /// Per-lot gain, negative for a loss
    pub gain: Decimal,
    /// Gain as a percent of the buy point, zero when the buy point is unknown
    pub gain_percent: Decimal,
    /// Ticks the position was held
    pub duration: u64,
    /// Cash after the sell
    pub money: Decimal,
}

impl RoundTrip {
    pub fn is_profitable(&self) -> bool {
        self.gain > Decimal::ZERO
    }
}

impl TradingStatistics {
    /// Fresh statistics for a day starting with `start_capital` in cash
    pub fn new(start_capital: Decimal) -> Self {
        Self {
            money: start_capital,
            buy_point: Decimal::ZERO,
            sell_point: Decimal::ZERO,
            success_transaction_count: 0,
            failed_transaction_count: 0,
            transaction_length: 0,
            total_transaction_length: 0,
            transaction_count: 0,
            maximum_gain: Decimal::ZERO,
            maximum_profit_percent: Decimal::ZERO,
            maximum_loss: Decimal::ZERO,
            maximum_loss_percent: Decimal::ZERO,
            maximum_money: start_capital,
            minimum_money: start_capital,
            total_percent_profit: Decimal::ZERO,
            total_gain: Decimal::ZERO,
        }
    }

    /// One more scheduler tick spent in the current position
    pub fn tick(&mut self) {
        self.transaction_length += 1;
    }

    /// Restart the duration counter for a new position
    pub fn start_transaction(&mut self) {
        self.transaction_length = 0;
    }

    /// Debit a buy and remember its per-lot price
    ///
    /// Returns the new buy point, or `None` when nothing was executed.
    pub fn record_buy(&mut self, fill: &OrderFill) -> Option<Decimal> {
        self.money -= fill.executed_price;
        let buy_point = fill.price_per_lot()?;
        self.buy_point = buy_point;
        Some(buy_point)
    }

    /// Credit a sell and close the round trip it belongs to
    ///
    /// Fills with no executed lots change nothing and return `None`.
    pub fn record_sell(&mut self, fill: &OrderFill) -> Option<RoundTrip> {
        let sell_point = fill.price_per_lot()?;

        self.money += fill.executed_price;
        self.sell_point = sell_point;

        let gain = sell_point - self.buy_point;
        let ratio = gain.checked_div(self.buy_point).unwrap_or(Decimal::ZERO);
        let gain_percent = ratio * dec!(100);

        if gain > Decimal::ZERO {
            self.success_transaction_count += 1;
        } else {
            self.failed_transaction_count += 1;
        }
        if gain >= self.maximum_gain {
            self.maximum_gain = gain;
            self.maximum_profit_percent = gain_percent;
        }
        if gain <= self.maximum_loss {
            self.maximum_loss = gain;
            self.maximum_loss_percent = gain_percent;
        }
        if self.money > self.maximum_money {
            self.maximum_money = self.money;
        }
        if self.money < self.minimum_money {
            self.minimum_money = self.money;
        }

        self.transaction_count += 1;
        self.total_percent_profit += ratio;
        self.total_transaction_length += self.transaction_length;
        self.total_gain += gain;

        Some(RoundTrip {
            buy_point: self.buy_point,
            sell_point,
            gain,
            gain_percent,
            duration: self.transaction_length,
            money: self.money,
        })
    }

    /// End-of-day figures
    pub fn summary(&self) -> DaySummary {
        let count = Decimal::from(self.transaction_count);
        let per_trip = |value: Decimal| value.checked_div(count).unwrap_or(Decimal::ZERO);

        DaySummary {
            total_money: self.money.floor(),
            transaction_count: self.transaction_count,
            success_rate_percent: per_trip(Decimal::from(self.success_transaction_count)) * dec!(100),
            average_percent_profit: per_trip(self.total_percent_profit) * dec!(100),
            average_transaction_length: per_trip(Decimal::from(self.total_transaction_length)),
            maximum_profit_percent: self.maximum_profit_percent,
            maximum_loss_percent: self.maximum_loss_percent,
            maximum_money: self.maximum_money,
            minimum_money: self.minimum_money,
            total_gain: self.total_gain,
        }
    }
}

/// Observability-only summary reported when a trading day ends
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub total_money: Decimal,
    pub transaction_count: u64,
    pub success_rate_percent: Decimal,
    pub average_percent_profit: Decimal,
    pub average_transaction_length: Decimal,
    pub maximum_profit_percent: Decimal,
    pub maximum_loss_percent: Decimal,
    pub maximum_money: Decimal,
    pub minimum_money: Decimal,
    pub total_gain: Decimal,
}

impl DaySummary {
    pub fn log(&self) {
        info!(
            total_money = %self.total_money,
            transactions = self.transaction_count,
            success_rate_percent = %self.success_rate_percent.round_dp(2),
            average_percent_profit = %self.average_percent_profit.round_dp(4),
            average_transaction_length = %self.average_transaction_length.round_dp(2),
            maximum_profit_percent = %self.maximum_profit_percent.round_dp(4),
            maximum_loss_percent = %self.maximum_loss_percent.round_dp(4),
            maximum_money = %self.maximum_money,
            minimum_money = %self.minimum_money,
            total_gain = %self.total_gain,
            "Trading day summary"
        );
    }
}
