//! Action queue between the scheduler and the strategy worker
//!
//! A bounded FIFO with one writer (the scheduler) and one reader at a time.
//! The reader is moved into the active worker and handed back when that
//! worker finishes, so two workers can never consume concurrently.

use tokio::sync::mpsc;
use tracing::debug;

use super::errors::{Result, TradingError};
use super::types::Action;

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Create an action queue with the default capacity
pub fn create_action_queue() -> (ActionSender, ActionReceiver) {
    create_action_queue_with_capacity(DEFAULT_QUEUE_CAPACITY)
}

/// Create an action queue with a custom capacity
pub fn create_action_queue_with_capacity(capacity: usize) -> (ActionSender, ActionReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ActionSender { tx: Some(tx) }, ActionReceiver { rx })
}

/// Outcome of a dequeue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dequeued {
    /// Next action in production order
    Action(Action),
    /// The writer closed the queue and everything queued before has been consumed
    Closed,
}

/// Writing half, owned by the scheduler
#[derive(Debug)]
pub struct ActionSender {
    tx: Option<mpsc::Sender<Action>>,
}

impl ActionSender {
    /// Enqueue an action, waiting while the queue is full
    pub async fn send(&self, action: Action) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(TradingError::QueueClosed)?;
        tx.send(action).await.map_err(|_| TradingError::QueueClosed)
    }

    /// Close the queue; later calls are no-ops
    pub fn close(&mut self) {
        if self.tx.take().is_some() {
            debug!("Action queue closed");
        }
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    /// Free slots left before `send` starts waiting
    pub fn available_capacity(&self) -> usize {
        self.tx.as_ref().map(|tx| tx.capacity()).unwrap_or(0)
    }
}

/// Reading half, owned by the active worker
#[derive(Debug)]
pub struct ActionReceiver {
    rx: mpsc::Receiver<Action>,
}

impl ActionReceiver {
    /// Wait for the next action or for closure
    pub async fn recv(&mut self) -> Dequeued {
        match self.rx.recv().await {
            Some(action) => Dequeued::Action(action),
            None => Dequeued::Closed,
        }
    }
}
