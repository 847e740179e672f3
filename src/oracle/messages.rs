//! Oracle wire messages

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::MarketSnapshot;

/// Prediction request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "ReqId")]
    pub req_id: u64,
    #[serde(rename = "Datetime")]
    pub datetime: DateTime<Utc>,
    #[serde(rename = "Open", with = "rust_decimal::serde::float")]
    pub open: Decimal,
    #[serde(rename = "High", with = "rust_decimal::serde::float")]
    pub high: Decimal,
    #[serde(rename = "Low", with = "rust_decimal::serde::float")]
    pub low: Decimal,
    #[serde(rename = "Close", with = "rust_decimal::serde::float")]
    pub close: Decimal,
    /// Same as close; the model was trained on adjusted daily data
    #[serde(rename = "Adj Close", with = "rust_decimal::serde::float")]
    pub adj_close: Decimal,
    #[serde(rename = "Volume")]
    pub volume: i64,
}

impl From<&MarketSnapshot> for PredictRequest {
    fn from(snapshot: &MarketSnapshot) -> Self {
        Self {
            req_id: snapshot.request_id,
            datetime: snapshot.timestamp,
            open: snapshot.open,
            high: snapshot.high,
            low: snapshot.low,
            close: snapshot.close,
            adj_close: snapshot.close,
            volume: snapshot.volume,
        }
    }
}

/// Prediction response body
///
/// Action codes: 0 = HOLD, 1 = BUY, 2 = SELL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(rename = "RespId", default)]
    pub resp_id: i64,
    #[serde(rename = "Action")]
    pub action: i64,
    #[serde(rename = "Error", default)]
    pub error: String,
}

impl PredictResponse {
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}
