//! REST gateway client for the brokerage

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::messages::*;
use crate::common::errors::{Result, TradingError};
use crate::common::traits::Brokerage;
use crate::common::types::{Candle, OrderFill, Portfolio, Position, Side};
use crate::config::types::{BrokerConfig, BrokerEnvironment};

const SERVICE_PREFIX: &str = "tinkoff.public.invest.api.contract.v1";

/// REST client for the brokerage gateway
#[derive(Debug, Clone)]
pub struct BrokerRestClient {
    /// HTTP client
    client: Client,
    /// Base URL of the REST gateway
    base_url: String,
    /// Bearer token
    token: String,
    /// Value of the x-app-name header
    app_name: String,
    /// Retries for transient failures
    max_retries: u32,
    /// Delay before the first retry, grows linearly
    retry_backoff: Duration,
}

impl BrokerRestClient {
    /// Create a new REST client
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Self::with_timeout(base_url, token, Duration::from_secs(30))
    }

    /// Create a new REST client with custom timeout
    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TradingError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            app_name: "oracle-trader".to_string(),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &BrokerConfig) -> Result<Self> {
        Ok(
            Self::with_timeout(&config.rest_url(), &config.token, config.request_timeout())?
                .with_app_name(&config.app_name)
                .with_retries(config.max_retries),
        )
    }

    pub fn with_app_name(mut self, app_name: &str) -> Self {
        self.app_name = app_name.to_string();
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Invoke a gateway method, retrying transient failures
    async fn call<Req, Resp>(&self, service: &str, method: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}.{}/{}", self.base_url, SERVICE_PREFIX, service, method);
        let mut attempt = 0;

        loop {
            match self.send_once(&url, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = match &e {
                        TradingError::RateLimit {
                            retry_after_seconds: Some(secs),
                            ..
                        } => Duration::from_secs(*secs),
                        _ => self.retry_backoff * attempt,
                    };
                    warn!(
                        "{}/{} failed ({}), retry {}/{} in {:?}",
                        service, method, e, attempt, self.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header("x-app-name", &self.app_name)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_seconds = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let message = response.text().await.unwrap_or_default();
            return Err(TradingError::RateLimit {
                message,
                retry_after_seconds,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<GatewayError>(&body) {
                Ok(err) if !err.message.is_empty() => {
                    format!("{} (code {}) {}", err.message, err.code, err.description)
                        .trim_end()
                        .to_string()
                }
                _ => body,
            };
            return Err(TradingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Accounts of the token owner (production)
    #[instrument(skip(self))]
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        let response: AccountsResponse = self
            .call("UsersService", "GetAccounts", &EmptyRequest::default())
            .await?;
        Ok(response.accounts)
    }

    /// Sandbox accounts of the token owner
    #[instrument(skip(self))]
    pub async fn sandbox_accounts(&self) -> Result<Vec<Account>> {
        let response: AccountsResponse = self
            .call("SandboxService", "GetSandboxAccounts", &EmptyRequest::default())
            .await?;
        Ok(response.accounts)
    }

    /// Open a new sandbox account
    #[instrument(skip(self))]
    pub async fn open_sandbox_account(&self) -> Result<String> {
        let response: OpenSandboxAccountResponse = self
            .call("SandboxService", "OpenSandboxAccount", &EmptyRequest::default())
            .await?;
        if response.account_id.is_empty() {
            return Err(TradingError::InvalidResponse(
                "OpenSandboxAccount returned no account id".to_string(),
            ));
        }
        info!("Opened sandbox account {}", response.account_id);
        Ok(response.account_id)
    }

    /// Top up a sandbox account, returns the new balance
    #[instrument(skip(self))]
    pub async fn sandbox_pay_in(&self, account_id: &str, amount: Decimal) -> Result<Decimal> {
        let request = SandboxPayInRequest {
            account_id: account_id.to_string(),
            amount: MoneyValue::new("RUB", amount),
        };
        let response: SandboxPayInResponse =
            self.call("SandboxService", "SandboxPayIn", &request).await?;
        let balance = response.balance.amount();
        info!("Sandbox account {} balance after pay-in: {}", account_id, balance);
        Ok(balance)
    }

    /// Pick the account to trade on
    ///
    /// A configured id wins. Otherwise the first existing account is used;
    /// in the sandbox a new account is opened when there is none.
    #[instrument(skip(self))]
    pub async fn resolve_account_id(
        &self,
        configured: Option<&str>,
        environment: BrokerEnvironment,
    ) -> Result<String> {
        if let Some(id) = configured.filter(|id| !id.is_empty()) {
            return Ok(id.to_string());
        }

        let accounts = match environment {
            BrokerEnvironment::Sandbox => self.sandbox_accounts().await,
            BrokerEnvironment::Production => self.accounts().await,
        }
        .map_err(|e| TradingError::AccountUnavailable(e.to_string()))?;

        if let Some(account) = accounts.first() {
            return Ok(account.id.clone());
        }

        match environment {
            BrokerEnvironment::Sandbox => self
                .open_sandbox_account()
                .await
                .map_err(|e| TradingError::AccountUnavailable(e.to_string())),
            BrokerEnvironment::Production => Err(TradingError::AccountUnavailable(
                "token has no brokerage accounts".to_string(),
            )),
        }
    }

    // ========================================================================
    // Orders
    // ========================================================================

    async fn post_market_order(
        &self,
        instrument_id: &str,
        account_id: &str,
        lots: i64,
        side: Side,
    ) -> Result<OrderFill> {
        let request = PostOrderRequest::market(instrument_id, account_id, lots, side);
        debug!("Posting {} order {} for {} lots", side, request.order_id, lots);

        let response: PostOrderResponse = self.call("OrdersService", "PostOrder", &request).await?;

        if response.is_rejected() {
            return Err(TradingError::OrderRejected(format!(
                "{} order {} rejected: {}",
                side, response.order_id, response.message
            )));
        }

        info!(
            "Executed {}: status = {}, lots {}/{}",
            side, response.execution_report_status, response.lots_executed, response.lots_requested
        );

        Ok(OrderFill {
            lots_executed: response.lots_executed,
            lots_requested: response.lots_requested,
            executed_price: response.executed_order_price.amount(),
        })
    }
}

#[async_trait]
impl Brokerage for BrokerRestClient {
    #[instrument(skip(self))]
    async fn find_instrument(&self, ticker: &str) -> Result<String> {
        let response: FindInstrumentResponse = self
            .call(
                "InstrumentsService",
                "FindInstrument",
                &FindInstrumentRequest::shares(ticker),
            )
            .await?;

        response
            .instruments
            .into_iter()
            .find(|i| i.ticker == ticker)
            .map(|i| i.uid)
            .ok_or_else(|| TradingError::InstrumentNotFound(ticker.to_string()))
    }

    #[instrument(skip(self))]
    async fn list_positions(&self, account_id: &str) -> Result<Portfolio> {
        let request = PositionsRequest {
            account_id: account_id.to_string(),
        };
        let response: PositionsResponse =
            self.call("OperationsService", "GetPositions", &request).await?;

        let cash = match response.money.first() {
            Some(money) => money.amount(),
            None => {
                warn!("Positions response for {} has no money entry", account_id);
                Decimal::ZERO
            }
        };

        let positions: Vec<Position> = response.securities.iter().map(Position::from).collect();
        for position in &positions {
            debug!(
                "Position {}: balance = {}",
                position.instrument_id, position.balance
            );
        }

        Ok(Portfolio { positions, cash })
    }

    #[instrument(skip(self))]
    async fn last_price(&self, instrument_id: &str) -> Result<Decimal> {
        let request = LastPricesRequest {
            instrument_id: vec![instrument_id.to_string()],
        };
        let response: LastPricesResponse =
            self.call("MarketDataService", "GetLastPrices", &request).await?;

        response
            .last_prices
            .iter()
            .find(|p| p.instrument_uid == instrument_id || p.instrument_uid.is_empty())
            .and_then(|p| p.price)
            .map(Decimal::from)
            .ok_or_else(|| TradingError::NoMarketData(format!("no last price for {}", instrument_id)))
    }

    #[instrument(skip(self))]
    async fn latest_candle(
        &self,
        instrument_id: &str,
        window: ChronoDuration,
    ) -> Result<Option<Candle>> {
        let to = Utc::now();
        let request = CandlesRequest::one_minute(instrument_id, to - window, to);
        let response: CandlesResponse =
            self.call("MarketDataService", "GetCandles", &request).await?;

        Ok(response.candles.last().map(Candle::from))
    }

    #[instrument(skip(self))]
    async fn market_buy(&self, instrument_id: &str, account_id: &str, lots: i64) -> Result<OrderFill> {
        self.post_market_order(instrument_id, account_id, lots, Side::Buy)
            .await
    }

    #[instrument(skip(self))]
    async fn market_sell(&self, instrument_id: &str, account_id: &str, lots: i64) -> Result<OrderFill> {
        self.post_market_order(instrument_id, account_id, lots, Side::Sell)
            .await
    }
}
