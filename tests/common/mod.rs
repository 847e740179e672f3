//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use oracle_trader::common::errors::{Result, TradingError};
use oracle_trader::common::traits::{Brokerage, DecisionOracle};
use oracle_trader::common::types::{
    Action, Candle, MarketSnapshot, OrderFill, Portfolio, Position, Side,
};
use oracle_trader::scheduler::{MarketClock, MinuteOfDay, TradingWindow};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

pub const INSTRUMENT_ID: &str = "e6123145-9665-43e0-8413-cd61b8aa9b13";
pub const ACCOUNT_ID: &str = "sandbox-account-1";

/// Instant of a Moscow wall-clock time in January 2024
///
/// The 8th is a Monday, the 13th a Saturday.
pub fn msk(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap() - Duration::hours(3)
}

/// Clock for a 10:00-17:30 Moscow session
pub fn moscow_clock() -> MarketClock {
    let window = TradingWindow::new(
        MinuteOfDay::new(10, 0).unwrap(),
        MinuteOfDay::new(17, 30).unwrap(),
    )
    .unwrap();
    MarketClock::from_zone_name("Europe/Moscow", window)
}

/// Create a sample candle for testing
pub fn sample_candle() -> Candle {
    Candle {
        time: msk(8, 10, 0),
        open: dec!(3000),
        high: dec!(3012.5),
        low: dec!(2998),
        close: dec!(3005.5),
        volume: 1520,
    }
}

/// An order the fake brokerage executed
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedOrder {
    pub side: Side,
    pub instrument_id: String,
    pub lots: i64,
    pub price: Decimal,
}

#[derive(Debug, Default)]
struct FakeBrokerState {
    cash: Decimal,
    positions: BTreeMap<String, i64>,
    /// Price of each upcoming fill, consumed one per order
    fill_prices: VecDeque<Decimal>,
    last_fill_price: Decimal,
    candle: Option<Candle>,
    orders: Vec<ExecutedOrder>,
    rejected_sells: u32,
}

/// In-memory brokerage that executes every market order in full
///
/// Fill prices follow a scripted path, so results do not depend on how the
/// worker task interleaves with the test.
#[derive(Debug)]
pub struct FakeBroker {
    state: Mutex<FakeBrokerState>,
}

impl FakeBroker {
    pub fn new(cash: Decimal) -> Self {
        Self {
            state: Mutex::new(FakeBrokerState {
                cash,
                last_fill_price: dec!(100),
                candle: Some(sample_candle()),
                ..Default::default()
            }),
        }
    }

    pub fn with_position(self, instrument_id: &str, lots: i64) -> Self {
        self.state
            .lock()
            .unwrap()
            .positions
            .insert(instrument_id.to_string(), lots);
        self
    }

    pub fn with_fill_prices(self, prices: &[Decimal]) -> Self {
        self.state.lock().unwrap().fill_prices = prices.iter().copied().collect();
        self
    }

    pub fn with_candle(self, candle: Option<Candle>) -> Self {
        self.state.lock().unwrap().candle = candle;
        self
    }

    /// Reject the next `count` sell orders
    pub fn rejecting_sells(self, count: u32) -> Self {
        self.state.lock().unwrap().rejected_sells = count;
        self
    }

    pub fn cash(&self) -> Decimal {
        self.state.lock().unwrap().cash
    }

    pub fn balance(&self, instrument_id: &str) -> i64 {
        self.state
            .lock()
            .unwrap()
            .positions
            .get(instrument_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn orders(&self) -> Vec<ExecutedOrder> {
        self.state.lock().unwrap().orders.clone()
    }
}

impl FakeBrokerState {
    fn next_price(&mut self) -> Decimal {
        if let Some(price) = self.fill_prices.pop_front() {
            self.last_fill_price = price;
        }
        self.last_fill_price
    }

    fn upcoming_price(&self) -> Decimal {
        self.fill_prices
            .front()
            .copied()
            .unwrap_or(self.last_fill_price)
    }
}

#[async_trait]
impl Brokerage for FakeBroker {
    async fn find_instrument(&self, ticker: &str) -> Result<String> {
        match ticker {
            "TCSG" => Ok(INSTRUMENT_ID.to_string()),
            other => Err(TradingError::InstrumentNotFound(other.to_string())),
        }
    }

    async fn list_positions(&self, _account_id: &str) -> Result<Portfolio> {
        let state = self.state.lock().unwrap();
        Ok(Portfolio {
            positions: state
                .positions
                .iter()
                .map(|(id, lots)| Position::new(id.clone(), *lots))
                .collect(),
            cash: state.cash,
        })
    }

    async fn last_price(&self, _instrument_id: &str) -> Result<Decimal> {
        Ok(self.state.lock().unwrap().upcoming_price())
    }

    async fn latest_candle(&self, _instrument_id: &str, _window: Duration) -> Result<Option<Candle>> {
        Ok(self.state.lock().unwrap().candle.clone())
    }

    async fn market_buy(&self, instrument_id: &str, _account_id: &str, lots: i64) -> Result<OrderFill> {
        let mut state = self.state.lock().unwrap();
        let price = state.next_price();
        let notional = price * Decimal::from(lots);
        if notional > state.cash {
            return Err(TradingError::OrderRejected("not enough money".to_string()));
        }

        state.cash -= notional;
        *state.positions.entry(instrument_id.to_string()).or_insert(0) += lots;
        state.orders.push(ExecutedOrder {
            side: Side::Buy,
            instrument_id: instrument_id.to_string(),
            lots,
            price,
        });

        Ok(OrderFill {
            lots_executed: lots,
            lots_requested: lots,
            executed_price: notional,
        })
    }

    async fn market_sell(&self, instrument_id: &str, _account_id: &str, lots: i64) -> Result<OrderFill> {
        let mut state = self.state.lock().unwrap();
        if state.rejected_sells > 0 {
            state.rejected_sells -= 1;
            return Err(TradingError::OrderRejected("trading halted".to_string()));
        }

        let held = state.positions.get(instrument_id).copied().unwrap_or(0);
        let executed = lots.min(held);
        let price = state.next_price();
        let notional = price * Decimal::from(executed);

        state.cash += notional;
        state.positions.insert(instrument_id.to_string(), held - executed);
        state.orders.push(ExecutedOrder {
            side: Side::Sell,
            instrument_id: instrument_id.to_string(),
            lots: executed,
            price,
        });

        Ok(OrderFill {
            lots_executed: executed,
            lots_requested: lots,
            executed_price: notional,
        })
    }
}

/// Oracle that answers from a script, then holds
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    actions: Mutex<VecDeque<Action>>,
    seen: Mutex<Vec<u64>>,
}

impl ScriptedOracle {
    pub fn new(actions: &[Action]) -> Self {
        Self {
            actions: Mutex::new(actions.iter().copied().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Request ids of every snapshot received
    pub fn request_ids(&self) -> Vec<u64> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(&self, snapshot: &MarketSnapshot) -> Result<Action> {
        self.seen.lock().unwrap().push(snapshot.request_id);
        Ok(self
            .actions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Action::Hold))
    }
}

/// Sample gateway responses for testing
pub mod api_responses {
    pub const FIND_INSTRUMENT: &str = r#"{
        "instruments": [
            {"isin": "US87238U2033", "figi": "BBG00QPYJ5H0", "ticker": "TCSG2",
             "classCode": "SPBXM", "instrumentType": "share", "name": "TCS Group (old)",
             "uid": "old-uid"},
            {"isin": "RU000A107UL4", "figi": "TCS80A107UL4", "ticker": "TCSG",
             "classCode": "TQBR", "instrumentType": "share", "name": "TCS Group",
             "uid": "e6123145-9665-43e0-8413-cd61b8aa9b13"}
        ]
    }"#;

    pub const POSITIONS: &str = r#"{
        "money": [{"currency": "rub", "units": "98765", "nano": 430000000}],
        "blocked": [],
        "securities": [
            {"figi": "TCS80A107UL4", "blocked": "0", "balance": "12",
             "positionUid": "p-1", "instrumentUid": "e6123145-9665-43e0-8413-cd61b8aa9b13",
             "exchangeBlocked": false, "instrumentType": "share"}
        ],
        "limitsLoadingInProgress": false,
        "futures": [],
        "options": []
    }"#;

    pub const LAST_PRICES: &str = r#"{
        "lastPrices": [
            {"figi": "TCS80A107UL4", "price": {"units": "3005", "nano": 500000000},
             "time": "2024-01-08T09:15:00Z",
             "instrumentUid": "e6123145-9665-43e0-8413-cd61b8aa9b13"}
        ]
    }"#;

    pub const CANDLES: &str = r#"{
        "candles": [
            {"open": {"units": "3000", "nano": 0}, "high": {"units": "3012", "nano": 500000000},
             "low": {"units": "2998", "nano": 0}, "close": {"units": "3004", "nano": 0},
             "volume": "800", "time": "2024-01-08T09:13:00Z", "isComplete": true},
            {"open": {"units": "3004", "nano": 0}, "high": {"units": "3010", "nano": 0},
             "low": {"units": "3001", "nano": 0}, "close": {"units": "3005", "nano": 500000000},
             "volume": "1520", "time": "2024-01-08T09:14:00Z", "isComplete": false}
        ]
    }"#;

    pub const ORDER_FILLED: &str = r#"{
        "orderId": "e3e0a1d4-0000-4c5e-9a4a-4a0c1f7d6a10",
        "executionReportStatus": "EXECUTION_REPORT_STATUS_FILL",
        "lotsRequested": "10",
        "lotsExecuted": "10",
        "initialOrderPrice": {"currency": "rub", "units": "30055", "nano": 0},
        "executedOrderPrice": {"currency": "rub", "units": "30060", "nano": 0},
        "totalOrderAmount": {"currency": "rub", "units": "30060", "nano": 0},
        "figi": "TCS80A107UL4",
        "direction": "ORDER_DIRECTION_BUY",
        "orderType": "ORDER_TYPE_MARKET",
        "message": "",
        "instrumentUid": "e6123145-9665-43e0-8413-cd61b8aa9b13"
    }"#;

    pub const ORDER_REJECTED: &str = r#"{
        "orderId": "e3e0a1d4-0000-4c5e-9a4a-4a0c1f7d6a11",
        "executionReportStatus": "EXECUTION_REPORT_STATUS_REJECTED",
        "lotsRequested": "10",
        "lotsExecuted": "0",
        "executedOrderPrice": {"currency": "rub", "units": "0", "nano": 0},
        "message": "Not enough assets for a margin trade"
    }"#;

    pub const GATEWAY_ERROR: &str = r#"{
        "code": 3,
        "message": "instrument not available for trading",
        "description": "30079"
    }"#;

    pub const NO_ACCOUNTS: &str = r#"{"accounts": []}"#;

    pub const SANDBOX_ACCOUNTS: &str = r#"{
        "accounts": [
            {"id": "sandbox-account-1", "type": "ACCOUNT_TYPE_TINKOFF",
             "name": "", "status": "ACCOUNT_STATUS_OPEN", "accessLevel": "ACCOUNT_ACCESS_LEVEL_FULL_ACCESS"}
        ]
    }"#;

    pub const OPEN_SANDBOX_ACCOUNT: &str = r#"{"accountId": "sandbox-account-new"}"#;

    pub const SANDBOX_PAY_IN: &str = r#"{"balance": {"currency": "rub", "units": "100000", "nano": 0}}"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_broker_round_trip() {
        let broker = FakeBroker::new(dec!(1000)).with_fill_prices(&[dec!(100), dec!(120)]);

        let fill = broker.market_buy(INSTRUMENT_ID, ACCOUNT_ID, 5).await.unwrap();
        assert_eq!(fill.executed_price, dec!(500));
        assert_eq!(broker.balance(INSTRUMENT_ID), 5);

        let fill = broker.market_sell(INSTRUMENT_ID, ACCOUNT_ID, 5).await.unwrap();
        assert_eq!(fill.executed_price, dec!(600));
        assert_eq!(broker.cash(), dec!(1100));
    }

    #[test]
    fn test_msk_is_utc_plus_three() {
        assert_eq!(msk(8, 10, 0), Utc.with_ymd_and_hms(2024, 1, 8, 7, 0, 0).unwrap());
        assert!(moscow_clock().is_open(msk(8, 10, 0)));
    }
}
