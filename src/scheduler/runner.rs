//! Scheduler loop
//!
//! Ticks at a fixed interval. While the exchange is open each tick asks the
//! oracle for a verdict on the latest candle and enqueues it for the day's
//! strategy worker; the open and close transitions start a worker and send it
//! the end-of-day sentinel.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::clock::MarketClock;
use super::snapshot::SnapshotSource;
use crate::common::channels::{
    create_action_queue_with_capacity, ActionReceiver, ActionSender, DEFAULT_QUEUE_CAPACITY,
};
use crate::common::traits::{SharedBrokerage, SharedOracle};
use crate::common::types::Action;
use crate::strategy::{DayOpening, DaySummary, StrategyWorker, WorkerContext, WorkerReport};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Exchange closed, nothing to do
    Idle,
    /// Exchange just closed, sentinel sent to the worker
    DayEnded,
    /// Exchange open but the day's worker could not start
    WorkerStartFailed,
    /// No snapshot or no verdict this tick
    Skipped,
    /// Verdict enqueued for the worker
    Enqueued(Action),
}

/// Drives the trading days of one instrument
pub struct Scheduler {
    clock: MarketClock,
    oracle: SharedOracle,
    snapshots: SnapshotSource,
    ctx: WorkerContext,
    tick_interval: Duration,
    queue_capacity: usize,
    sender: ActionSender,
    /// Queue reader while no worker owns it
    idle_receiver: Option<ActionReceiver>,
    /// Current (or finished, not yet joined) worker
    worker: Option<JoinHandle<WorkerReport>>,
    exchange_open: bool,
    last_summary: Option<DaySummary>,
}

impl Scheduler {
    pub fn new(
        clock: MarketClock,
        broker: SharedBrokerage,
        oracle: SharedOracle,
        account_id: impl Into<String>,
        instrument_id: impl Into<String>,
    ) -> Self {
        let ctx = WorkerContext::new(broker.clone(), account_id, instrument_id);
        let snapshots =
            SnapshotSource::new(broker, ctx.instrument_id.clone(), chrono::Duration::seconds(60));
        let (sender, receiver) = create_action_queue_with_capacity(DEFAULT_QUEUE_CAPACITY);

        Self {
            clock,
            oracle,
            snapshots,
            ctx,
            tick_interval: DEFAULT_TICK_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            sender,
            idle_receiver: Some(receiver),
            worker: None,
            exchange_open: false,
            last_summary: None,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Replace the action queue with one of the given capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        let (sender, receiver) = create_action_queue_with_capacity(capacity);
        self.queue_capacity = capacity;
        self.sender = sender;
        self.idle_receiver = Some(receiver);
        self
    }

    /// How far back the snapshot source looks for a candle
    pub fn with_candle_window(mut self, window: chrono::Duration) -> Self {
        self.snapshots = SnapshotSource::new(
            self.ctx.broker.clone(),
            self.ctx.instrument_id.clone(),
            window,
        );
        self
    }

    pub fn is_exchange_open(&self) -> bool {
        self.exchange_open
    }

    /// Snapshot requests issued so far
    pub fn request_count(&self) -> u64 {
        self.snapshots.request_count()
    }

    /// Tick on a fixed interval until `shutdown` resolves, then shut down
    ///
    /// Returns the summary of the last trading day that ended, if any.
    pub async fn run<F>(mut self, shutdown: F) -> Option<DaySummary>
    where
        F: Future<Output = ()>,
    {
        info!(
            instrument_id = %self.ctx.instrument_id,
            interval = ?self.tick_interval,
            window = %format!("{}-{}", self.clock.window().open, self.clock.window().close),
            timezone = %self.clock.timezone(),
            "Scheduler started"
        );

        let mut ticker = interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    // A tick blocked on a full queue is abandoned on shutdown
                    tokio::select! {
                        _ = &mut shutdown => break,
                        outcome = self.tick(Utc::now()) => debug!(?outcome, "Tick done"),
                    }
                }
            }
        }

        info!("Shutdown requested");
        self.shutdown().await
    }

    /// One scheduler step at instant `now`
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let open = self.clock.is_open(now);

        if !open {
            if !self.exchange_open {
                return TickOutcome::Idle;
            }
            self.exchange_open = false;
            info!("Exchange closed, ending trading day");
            if let Err(e) = self.sender.send(Action::MarketClosed).await {
                warn!("Could not send market closed: {}", e);
            }
            return TickOutcome::DayEnded;
        }

        if !self.exchange_open {
            if !self.start_day(now).await {
                return TickOutcome::WorkerStartFailed;
            }
            self.exchange_open = true;
        }

        let snapshot = match self.snapshots.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("No market snapshot this tick: {}", e);
                return TickOutcome::Skipped;
            }
        };

        let action = match self.oracle.decide(&snapshot).await {
            Ok(action) => action,
            Err(e) => {
                warn!(req_id = snapshot.request_id, "No verdict this tick: {}", e);
                return TickOutcome::Skipped;
            }
        };

        match self.sender.send(action).await {
            Ok(()) => TickOutcome::Enqueued(action),
            Err(e) => {
                warn!(%action, "Could not enqueue action: {}", e);
                TickOutcome::Skipped
            }
        }
    }

    /// Close the queue and wait for the active worker to liquidate
    pub async fn shutdown(&mut self) -> Option<DaySummary> {
        self.sender.close();
        self.exchange_open = false;
        if let Some(receiver) = self.join_worker().await {
            self.idle_receiver = Some(receiver);
        }
        self.last_summary.clone()
    }

    /// Reclaim the queue reader and start the day's worker on it
    async fn start_day(&mut self, now: DateTime<Utc>) -> bool {
        let receiver = match self.join_worker().await {
            Some(receiver) => receiver,
            None => match self.idle_receiver.take() {
                Some(receiver) => receiver,
                None => self.recreate_queue(),
            },
        };

        let opening = match DayOpening::fetch(&self.ctx).await {
            Ok(opening) => opening,
            Err(e) => {
                error!("Could not start strategy worker: {}", e);
                self.idle_receiver = Some(receiver);
                return false;
            }
        };

        let date = now.with_timezone(&self.clock.timezone()).date_naive();
        info!(%date, "Exchange open, starting trading day");
        let worker = StrategyWorker::new(self.ctx.clone(), opening, receiver);
        self.worker = Some(worker.spawn(date));
        true
    }

    /// Wait for the previous worker and take its reader back
    ///
    /// The handle stays in place until the worker has finished, so a
    /// cancelled join leaves it for `shutdown` to await.
    async fn join_worker(&mut self) -> Option<ActionReceiver> {
        let joined = self.worker.as_mut()?.await;
        self.worker = None;
        match joined {
            Ok(report) => {
                self.last_summary = Some(report.summary);
                Some(report.receiver)
            }
            Err(e) => {
                error!("Strategy worker failed: {}", e);
                Some(self.recreate_queue())
            }
        }
    }

    /// Fresh queue after the reader was lost with a crashed worker
    fn recreate_queue(&mut self) -> ActionReceiver {
        let was_closed = self.sender.is_closed();
        let (sender, receiver) = create_action_queue_with_capacity(self.queue_capacity);
        self.sender = sender;
        if was_closed {
            self.sender.close();
        }
        receiver
    }
}
