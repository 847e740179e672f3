//! Latest-candle snapshots for the decision oracle

use chrono::Duration;
use tracing::{debug, instrument};

use crate::common::errors::{Result, TradingError};
use crate::common::traits::SharedBrokerage;
use crate::common::types::MarketSnapshot;

/// Pulls the latest candle of one instrument and stamps it with a request id
pub struct SnapshotSource {
    broker: SharedBrokerage,
    instrument_id: String,
    window: Duration,
    request_counter: u64,
}

impl SnapshotSource {
    pub fn new(broker: SharedBrokerage, instrument_id: impl Into<String>, window: Duration) -> Self {
        Self {
            broker,
            instrument_id: instrument_id.into(),
            window,
            request_counter: 0,
        }
    }

    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    /// Requests issued so far, including failed ones
    pub fn request_count(&self) -> u64 {
        self.request_counter
    }

    /// Fetch the latest candle as a snapshot
    ///
    /// The request id advances on every attempt, so ids stay unique even when
    /// a fetch fails. A missing candle or one with zero volume or zero close
    /// is reported as `NoMarketData`.
    #[instrument(skip(self), fields(instrument_id = %self.instrument_id))]
    pub async fn fetch(&mut self) -> Result<MarketSnapshot> {
        self.request_counter += 1;
        let request_id = self.request_counter;

        let candle = self
            .broker
            .latest_candle(&self.instrument_id, self.window)
            .await?
            .ok_or_else(|| {
                TradingError::NoMarketData(format!("no candle for request {}", request_id))
            })?;

        if candle.is_empty() {
            return Err(TradingError::NoMarketData(format!(
                "empty candle at {} for request {} (volume {}, close {})",
                candle.time, request_id, candle.volume, candle.close
            )));
        }

        debug!(request_id, close = %candle.close, volume = candle.volume, "Got snapshot");
        Ok(MarketSnapshot::from_candle(request_id, &candle))
    }
}
