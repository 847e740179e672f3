//! Brokerage REST gateway message types
//!
//! The gateway speaks protobuf-JSON: camelCase field names, enums as
//! strings, and 64-bit integers encoded as JSON strings.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{Candle, Position, Side};

/// Serde helpers for protobuf int64 fields
pub mod int64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s.parse().map_err(de::Error::custom),
            StringOrNumber::Number(n) => Ok(n),
        }
    }
}

/// Fixed-point price: integer units plus billionths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Quotation {
    #[serde(with = "int64_string", default)]
    pub units: i64,
    #[serde(default)]
    pub nano: i32,
}

impl From<Quotation> for Decimal {
    fn from(q: Quotation) -> Self {
        (Decimal::from(q.units) + Decimal::new(q.nano as i64, 9)).normalize()
    }
}

impl From<Decimal> for Quotation {
    fn from(value: Decimal) -> Self {
        let units = value.trunc();
        let nano = ((value - units) * Decimal::from(1_000_000_000)).trunc();
        Self {
            units: units.to_i64().unwrap_or_default(),
            nano: nano.to_i32().unwrap_or_default(),
        }
    }
}

/// Amount of money in a currency
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoneyValue {
    #[serde(default)]
    pub currency: String,
    #[serde(with = "int64_string", default)]
    pub units: i64,
    #[serde(default)]
    pub nano: i32,
}

impl MoneyValue {
    pub fn new(currency: impl Into<String>, amount: Decimal) -> Self {
        let q = Quotation::from(amount);
        Self {
            currency: currency.into(),
            units: q.units,
            nano: q.nano,
        }
    }

    pub fn amount(&self) -> Decimal {
        Quotation {
            units: self.units,
            nano: self.nano,
        }
        .into()
    }
}

/// Error body returned with non-success statuses
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: String,
}

// ============================================================================
// Instruments
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindInstrumentRequest {
    pub query: String,
    pub instrument_kind: String,
    pub api_trade_available_flag: bool,
}

impl FindInstrumentRequest {
    pub fn shares(ticker: &str) -> Self {
        Self {
            query: ticker.to_string(),
            instrument_kind: "INSTRUMENT_TYPE_SHARE".to_string(),
            api_trade_available_flag: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FindInstrumentResponse {
    #[serde(default)]
    pub instruments: Vec<InstrumentShort>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentShort {
    pub ticker: String,
    pub uid: String,
    #[serde(default)]
    pub figi: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class_code: String,
}

// ============================================================================
// Operations
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsRequest {
    pub account_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionsResponse {
    #[serde(default)]
    pub money: Vec<MoneyValue>,
    #[serde(default)]
    pub securities: Vec<PositionsSecurities>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsSecurities {
    #[serde(default)]
    pub figi: String,
    #[serde(with = "int64_string", default)]
    pub blocked: i64,
    #[serde(with = "int64_string", default)]
    pub balance: i64,
    #[serde(default)]
    pub instrument_uid: String,
    #[serde(default)]
    pub instrument_type: String,
}

impl From<&PositionsSecurities> for Position {
    fn from(s: &PositionsSecurities) -> Self {
        Position::new(s.instrument_uid.clone(), s.balance)
    }
}

// ============================================================================
// Market data
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastPricesRequest {
    pub instrument_id: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastPricesResponse {
    #[serde(default)]
    pub last_prices: Vec<LastPrice>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastPrice {
    #[serde(default)]
    pub figi: String,
    pub price: Option<Quotation>,
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub instrument_uid: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlesRequest {
    pub instrument_id: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub interval: String,
}

impl CandlesRequest {
    pub fn one_minute(instrument_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            instrument_id: instrument_id.to_string(),
            from,
            to,
            interval: "CANDLE_INTERVAL_1_MIN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandlesResponse {
    #[serde(default)]
    pub candles: Vec<HistoricCandle>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricCandle {
    #[serde(default)]
    pub open: Quotation,
    #[serde(default)]
    pub high: Quotation,
    #[serde(default)]
    pub low: Quotation,
    #[serde(default)]
    pub close: Quotation,
    #[serde(with = "int64_string", default)]
    pub volume: i64,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub is_complete: bool,
}

impl From<&HistoricCandle> for Candle {
    fn from(c: &HistoricCandle) -> Self {
        Candle {
            time: c.time,
            open: c.open.into(),
            high: c.high.into(),
            low: c.low.into(),
            close: c.close.into(),
            volume: c.volume,
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostOrderRequest {
    pub instrument_id: String,
    #[serde(with = "int64_string")]
    pub quantity: i64,
    pub direction: String,
    pub account_id: String,
    pub order_type: String,
    pub order_id: String,
}

impl PostOrderRequest {
    /// Market order with a fresh client order id
    pub fn market(instrument_id: &str, account_id: &str, lots: i64, side: Side) -> Self {
        let direction = match side {
            Side::Buy => "ORDER_DIRECTION_BUY",
            Side::Sell => "ORDER_DIRECTION_SELL",
        };
        Self {
            instrument_id: instrument_id.to_string(),
            quantity: lots,
            direction: direction.to_string(),
            account_id: account_id.to_string(),
            order_type: "ORDER_TYPE_MARKET".to_string(),
            order_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostOrderResponse {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub execution_report_status: String,
    #[serde(with = "int64_string", default)]
    pub lots_requested: i64,
    #[serde(with = "int64_string", default)]
    pub lots_executed: i64,
    #[serde(default)]
    pub executed_order_price: MoneyValue,
    #[serde(default)]
    pub message: String,
}

impl PostOrderResponse {
    pub fn is_rejected(&self) -> bool {
        self.execution_report_status == "EXECUTION_REPORT_STATUS_REJECTED"
    }
}

// ============================================================================
// Accounts
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct EmptyRequest {}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsResponse {
    #[serde(default)]
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSandboxAccountResponse {
    #[serde(default)]
    pub account_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxPayInRequest {
    pub account_id: String,
    pub amount: MoneyValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SandboxPayInResponse {
    #[serde(default)]
    pub balance: MoneyValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quotation_to_decimal() {
        let q: Quotation = serde_json::from_str(r#"{"units": "3005", "nano": 500000000}"#).unwrap();
        assert_eq!(Decimal::from(q), dec!(3005.5));

        let q: Quotation = serde_json::from_str(r#"{"units": 12, "nano": 10000000}"#).unwrap();
        assert_eq!(Decimal::from(q), dec!(12.01));
    }

    #[test]
    fn test_decimal_to_quotation() {
        let q = Quotation::from(dec!(114.25));
        assert_eq!(q.units, 114);
        assert_eq!(q.nano, 250_000_000);
    }

    #[test]
    fn test_post_order_serialization() {
        let request = PostOrderRequest::market("uid-1", "acc-1", 7, Side::Sell);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["instrumentId"], "uid-1");
        assert_eq!(json["quantity"], "7");
        assert_eq!(json["direction"], "ORDER_DIRECTION_SELL");
        assert_eq!(json["orderType"], "ORDER_TYPE_MARKET");
        assert_eq!(json["accountId"], "acc-1");
        assert!(!request.order_id.is_empty());
    }

    #[test]
    fn test_positions_response_parsing() {
        let response: PositionsResponse = serde_json::from_str(
            r#"{
                "money": [{"currency": "rub", "units": "100000", "nano": 0}],
                "securities": [
                    {"figi": "BBG00QPYJ5H0", "blocked": "0", "balance": "15",
                     "instrumentUid": "uid-tcsg", "instrumentType": "share"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(response.money[0].amount(), dec!(100000));
        let position = Position::from(&response.securities[0]);
        assert_eq!(position, Position::new("uid-tcsg", 15));
    }
}
