//! REST client for the Sebo balance and opportunity service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use super::messages::{BalanceDocument, OpportunityDocument, WithdrawalFeesResponse};
use crate::common::errors::{EngineError, Result};
use crate::common::traits::LedgerClient;
use crate::common::types::{BalanceConfig, Opportunity, WithdrawalQuote};

/// REST client for the Sebo API
#[derive(Debug, Clone)]
pub struct SeboClient {
    /// HTTP client
    client: Client,
    /// Base URL of the Sebo API, without a trailing slash
    base_url: String,
}

impl SeboClient {
    /// Create a new client with the default timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a new client with a custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| EngineError::Configuration(format!("invalid Sebo URL: {}", e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the current ranked opportunity list.
    ///
    /// Entries without usable prices are dropped with a warning rather than
    /// failing the whole batch.
    #[instrument(skip(self))]
    pub async fn get_top_opportunities(&self, limit: Option<u32>) -> Result<Vec<Opportunity>> {
        let mut url = format!("{}/spot/top-opportunities", self.base_url);
        if let Some(limit) = limit {
            url = format!("{}?limit={}", url, limit);
        }
        debug!("Fetching ranked opportunities from: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::InvalidResponse(format!(
                "Sebo returned status {}: {}",
                status, body
            )));
        }

        let documents: Vec<OpportunityDocument> = response.json().await?;
        let total = documents.len();
        let opportunities: Vec<Opportunity> = documents
            .into_iter()
            .filter_map(|doc| {
                let symbol = doc.symbol.clone();
                let opportunity = doc.into_opportunity();
                if opportunity.is_none() {
                    warn!(%symbol, "dropping ranked opportunity without usable prices");
                }
                opportunity
            })
            .collect();
        debug!(total, usable = opportunities.len(), "ranked batch fetched");
        Ok(opportunities)
    }

    #[instrument(skip(self))]
    async fn get_balance_document(&self, exchange_id: &str) -> Result<BalanceDocument> {
        let url = format!("{}/balances/exchange/{}", self.base_url, exchange_id);
        debug!("Fetching balance config from: {}", url);

        let response = self.client.get(&url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            // An exchange the ledger does not know yet starts from zero.
            StatusCode::NOT_FOUND => {
                debug!(%exchange_id, "no balance document on Sebo, using empty default");
                Ok(BalanceDocument::empty(exchange_id))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(EngineError::Ledger(format!(
                    "balance load for {} failed with status {}: {}",
                    exchange_id, status, body
                )))
            }
        }
    }

    #[instrument(skip(self, document), fields(exchange_id = %document.id_exchange))]
    async fn put_balance_document(&self, document: &BalanceDocument) -> Result<BalanceDocument> {
        let url = format!(
            "{}/balances/exchange/{}",
            self.base_url, document.id_exchange
        );
        debug!("Updating balance config at: {}", url);

        let response = self.client.put(&url).json(document).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Ledger(format!(
                "balance update for {} failed with status {}: {}",
                document.id_exchange, status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Withdrawal-fee listing for one currency on one exchange
    #[instrument(skip(self))]
    pub async fn get_withdrawal_fees(
        &self,
        exchange_id: &str,
        currency: &str,
    ) -> Result<Option<WithdrawalFeesResponse>> {
        let url = format!(
            "{}/exchanges/{}/withdrawal-fees/{}",
            self.base_url, exchange_id, currency
        );
        debug!("Fetching withdrawal fees from: {}", url);

        let response = self.client.get(&url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(EngineError::InvalidResponse(format!(
                    "withdrawal fees for {}@{} failed with status {}: {}",
                    currency, exchange_id, status, body
                )))
            }
        }
    }
}

#[async_trait]
impl LedgerClient for SeboClient {
    async fn fetch_balance(&self, exchange_id: &str) -> Result<BalanceConfig> {
        Ok(self.get_balance_document(exchange_id).await?.into_config())
    }

    async fn store_balance(&self, config: &BalanceConfig) -> Result<BalanceConfig> {
        let document = BalanceDocument::from_config(config);
        Ok(self.put_balance_document(&document).await?.into_config())
    }

    async fn usdt_withdrawal_quote(&self, exchange_id: &str) -> Result<Option<WithdrawalQuote>> {
        Ok(self
            .get_withdrawal_fees(exchange_id, "USDT")
            .await?
            .and_then(|fees| fees.cheapest_quote()))
    }
}
