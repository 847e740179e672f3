//! Strategy worker: one per trading day
//!
//! Consumes the action queue, places market orders through the brokerage and
//! keeps the day's statistics. When the day ends (sentinel or queue closure)
//! every open position is liquidated and the queue reader is handed back.

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use super::state::{target_buy_lots, Step, TradingState};
use super::statistics::{DaySummary, TradingStatistics};
use crate::common::channels::{ActionReceiver, Dequeued};
use crate::common::errors::Result;
use crate::common::traits::SharedBrokerage;
use crate::common::types::{Action, Portfolio};

/// Brokerage handle plus the identifiers a worker trades with
#[derive(Clone)]
pub struct WorkerContext {
    pub broker: SharedBrokerage,
    pub account_id: String,
    pub instrument_id: String,
}

impl WorkerContext {
    pub fn new(
        broker: SharedBrokerage,
        account_id: impl Into<String>,
        instrument_id: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            account_id: account_id.into(),
            instrument_id: instrument_id.into(),
        }
    }
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("account_id", &self.account_id)
            .field("instrument_id", &self.instrument_id)
            .finish()
    }
}

/// Account state observed when a trading day starts
#[derive(Debug, Clone, PartialEq)]
pub struct DayOpening {
    pub portfolio: Portfolio,
}

impl DayOpening {
    /// Query positions and cash for the day's starting point
    #[instrument(skip(ctx), fields(account_id = %ctx.account_id))]
    pub async fn fetch(ctx: &WorkerContext) -> Result<Self> {
        let portfolio = ctx.broker.list_positions(&ctx.account_id).await?;
        info!(
            cash = %portfolio.cash,
            open_positions = portfolio.open_positions().count(),
            "Fetched day opening"
        );
        Ok(Self { portfolio })
    }
}

/// What a finished worker hands back to the scheduler
#[derive(Debug)]
pub struct WorkerReport {
    /// Queue reader for the next day's worker
    pub receiver: ActionReceiver,
    pub summary: DaySummary,
    pub final_state: TradingState,
    pub statistics: TradingStatistics,
}

/// Per-day consumer of the action queue
#[derive(Debug)]
pub struct StrategyWorker {
    ctx: WorkerContext,
    state: TradingState,
    stats: TradingStatistics,
    receiver: ActionReceiver,
}

impl StrategyWorker {
    /// Create a worker from the day's opening account state
    pub fn new(ctx: WorkerContext, opening: DayOpening, receiver: ActionReceiver) -> Self {
        let state = TradingState::from_portfolio(&opening.portfolio, &ctx.instrument_id);
        let stats = TradingStatistics::new(opening.portfolio.cash);
        info!(
            ?state,
            start_capital = %stats.money,
            "Strategy worker ready"
        );

        Self {
            ctx,
            state,
            stats,
            receiver,
        }
    }

    pub fn state(&self) -> TradingState {
        self.state
    }

    pub fn statistics(&self) -> &TradingStatistics {
        &self.stats
    }

    /// Run the worker on its own task, spans tagged with the trading date
    pub fn spawn(self, date: NaiveDate) -> JoinHandle<WorkerReport> {
        let span = info_span!("trading_day", %date);
        tokio::spawn(self.run().instrument(span))
    }

    /// Consume actions until the day ends, then liquidate and report
    pub async fn run(mut self) -> WorkerReport {
        loop {
            let action = match self.receiver.recv().await {
                Dequeued::Action(action) => action,
                Dequeued::Closed => {
                    info!("Action queue closed, ending trading day");
                    break;
                }
            };

            if !self.apply(action).await {
                info!("Market closed, ending trading day");
                break;
            }
        }

        self.liquidate().await;

        let summary = self.stats.summary();
        summary.log();

        WorkerReport {
            receiver: self.receiver,
            summary,
            final_state: self.state,
            statistics: self.stats,
        }
    }

    /// Apply one action; returns false when the day is over
    async fn apply(&mut self, action: Action) -> bool {
        match self.state.plan(action) {
            Step::EndOfDay => return false,
            Step::Hold => {
                self.stats.tick();
                debug!(duration = self.stats.transaction_length, "Hold");
            }
            Step::Buy => self.buy().await,
            Step::Sell { lots } => self.sell(lots).await,
            Step::Ignore => {
                debug!(%action, state = ?self.state, "Action not applicable, ignoring");
            }
        }
        true
    }

    async fn buy(&mut self) {
        self.stats.start_transaction();

        let price = match self.ctx.broker.last_price(&self.ctx.instrument_id).await {
            Ok(price) => price,
            Err(e) => {
                warn!("Could not get last price, skipping buy: {}", e);
                return;
            }
        };

        let lots = target_buy_lots(self.stats.money, price);
        if lots <= 0 {
            info!(money = %self.stats.money, %price, "Not enough money to buy");
            return;
        }

        let fill = match self
            .ctx
            .broker
            .market_buy(&self.ctx.instrument_id, &self.ctx.account_id, lots)
            .await
        {
            Ok(fill) => fill,
            Err(e) => {
                error!(lots, "Buy order failed: {}", e);
                return;
            }
        };

        self.state = self.state.on_buy_filled(&fill, &mut self.stats);
        info!(
            lots = fill.lots_executed,
            notional = %fill.executed_price,
            buy_point = %self.stats.buy_point,
            money = %self.stats.money,
            "Bought"
        );
    }

    async fn sell(&mut self, lots: i64) {
        let fill = match self
            .ctx
            .broker
            .market_sell(&self.ctx.instrument_id, &self.ctx.account_id, lots)
            .await
        {
            Ok(fill) => fill,
            Err(e) => {
                // Dropped, not retried; liquidation picks the lots up at day end
                error!(lots, "Sell order failed: {}", e);
                return;
            }
        };

        if fill.is_partial() {
            warn!(
                executed = fill.lots_executed,
                requested = fill.lots_requested,
                "Sell only partially filled"
            );
        }

        let (state, trip) = self.state.on_sell_filled(&fill, &mut self.stats);
        self.state = state;
        match trip {
            Some(trip) => info!(
                gain = %trip.gain,
                gain_percent = %trip.gain_percent.round_dp(4),
                duration = trip.duration,
                money = %trip.money,
                "Sold"
            ),
            None => warn!("Sell order executed no lots"),
        }
    }

    /// Sell every open position at market
    async fn liquidate(&mut self) {
        let portfolio = match self.ctx.broker.list_positions(&self.ctx.account_id).await {
            Ok(portfolio) => portfolio,
            Err(e) => {
                error!("Could not list positions for liquidation: {}", e);
                return;
            }
        };

        for position in portfolio.open_positions().filter(|p| p.balance > 0) {
            let fill = match self
                .ctx
                .broker
                .market_sell(&position.instrument_id, &self.ctx.account_id, position.balance)
                .await
            {
                Ok(fill) => fill,
                Err(e) => {
                    error!(
                        instrument_id = %position.instrument_id,
                        lots = position.balance,
                        "Liquidation sell failed: {}", e
                    );
                    continue;
                }
            };

            if let Some(trip) = self.stats.record_sell(&fill) {
                info!(
                    instrument_id = %position.instrument_id,
                    lots = fill.lots_executed,
                    gain = %trip.gain,
                    "Liquidated position"
                );
                if position.instrument_id == self.ctx.instrument_id {
                    self.state = TradingState::MayBuy;
                }
            }
        }
    }
}
