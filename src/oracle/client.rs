//! HTTP client for the decision oracle

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::messages::{PredictRequest, PredictResponse};
use crate::common::errors::{Result, TradingError};
use crate::common::traits::DecisionOracle;
use crate::common::types::{Action, MarketSnapshot};
use crate::config::types::OracleConfig;

/// Sends market snapshots to the prediction service and decodes its verdict
#[derive(Debug, Clone)]
pub struct HttpOracleClient {
    client: Client,
    endpoint: Url,
}

impl HttpOracleClient {
    /// Create a client for an explicit endpoint
    pub fn new(endpoint: Url) -> Result<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(30))
    }

    /// Create a client with custom timeout
    pub fn with_timeout(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TradingError::Internal(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    /// Create a client from configuration
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        Self::with_timeout(config.endpoint()?, config.request_timeout())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one prediction request and return the raw response
    #[instrument(skip(self, request), fields(req_id = request.req_id))]
    pub async fn predict(&self, request: &PredictRequest) -> Result<PredictResponse> {
        debug!("Sending snapshot to oracle at {}", self.endpoint);

        // The service reads the JSON body of a GET request
        let response = self
            .client
            .get(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let parsed: PredictResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}

#[async_trait]
impl DecisionOracle for HttpOracleClient {
    async fn decide(&self, snapshot: &MarketSnapshot) -> Result<Action> {
        let request = PredictRequest::from(snapshot);
        let response = self.predict(&request).await.map_err(|e| {
            error!(req_id = request.req_id, "Oracle request failed: {}", e);
            e
        })?;

        if response.is_error() {
            error!(
                req_id = request.req_id,
                "Oracle could not predict next action: {}", response.error
            );
            return Err(TradingError::OracleRejected {
                request_id: request.req_id,
                message: response.error,
            });
        }

        if response.resp_id != request.req_id as i64 {
            warn!(
                req_id = request.req_id,
                resp_id = response.resp_id,
                "Oracle response id does not match request id"
            );
        }

        let action = Action::from_oracle_code(response.action);
        info!(req_id = request.req_id, %action, "Got verdict from oracle");
        Ok(action)
    }
}
