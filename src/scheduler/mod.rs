//! Market clock, snapshot source and the scheduler loop

pub mod clock;
pub mod runner;
pub mod snapshot;

pub use clock::{MarketClock, MinuteOfDay, TradingWindow};
pub use runner::{Scheduler, TickOutcome};
pub use snapshot::SnapshotSource;
