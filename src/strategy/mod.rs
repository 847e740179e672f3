//! Strategy module: the per-day worker that turns oracle verdicts into orders
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Scheduler (one per process)                                │
//! │    - every tick: snapshot → oracle → enqueue action         │
//! │    - at close: enqueue MARKET_CLOSED                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ ActionQueue
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  StrategyWorker (one per trading day)                       │
//! │    - MayBuy ──BUY──▶ MaySell ──SELL──▶ MayBuy               │
//! │    - TradingStatistics updated on every fill                │
//! │    - end of day: liquidate, log DaySummary                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TradingState`]: the two-state machine and its guarded transitions
//! - [`TradingStatistics`]: running P&L bookkeeping of one day
//! - [`StrategyWorker`]: consumes the queue and places orders

mod state;
mod statistics;
mod worker;

pub use state::{target_buy_lots, Step, TradingState};
pub use statistics::{DaySummary, RoundTrip, TradingStatistics};
pub use worker::{DayOpening, StrategyWorker, WorkerContext, WorkerReport};
