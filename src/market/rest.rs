//! Public ticker lookups against the supported spot exchanges
//!
//! Only the best bid/ask is needed, and only for the re-verification step,
//! so the unauthenticated book-ticker endpoints are enough. The provider
//! never fails: every problem degrades to `None` prices.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::common::traits::MarketDataProvider;

/// `MarketDataProvider` over the public REST ticker endpoints
#[derive(Debug, Clone)]
pub struct RestMarketDataProvider {
    client: Client,
}

impl RestMarketDataProvider {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// "BTC/USDT" → "BTCUSDT"
    fn compact_symbol(symbol: &str) -> String {
        symbol.replace('/', "")
    }

    /// "BTC/USDT" → "BTC-USDT"
    fn dashed_symbol(symbol: &str) -> String {
        symbol.replace('/', "-")
    }

    /// "BTC/USDT" → "BTC_USDT"
    fn underscored_symbol(symbol: &str) -> String {
        symbol.replace('/', "_")
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Option<T> {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => match response.json().await {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    debug!(%url, error = %err, "ticker response did not parse");
                    None
                }
            },
            Ok(response) => {
                debug!(%url, status = %response.status(), "ticker request rejected");
                None
            }
            Err(err) => {
                debug!(%url, error = %err, "ticker request failed");
                None
            }
        }
    }

    async fn binance(&self, symbol: &str) -> (Option<Decimal>, Option<Decimal>) {
        #[derive(Deserialize)]
        struct BookTicker {
            #[serde(rename = "askPrice")]
            ask_price: String,
            #[serde(rename = "bidPrice")]
            bid_price: String,
        }

        let url = format!(
            "https://api.binance.com/api/v3/ticker/bookTicker?symbol={}",
            Self::compact_symbol(symbol)
        );
        match self.fetch_json::<BookTicker>(&url).await {
            Some(ticker) => (ticker.ask_price.parse().ok(), ticker.bid_price.parse().ok()),
            None => (None, None),
        }
    }

    async fn okx(&self, symbol: &str) -> (Option<Decimal>, Option<Decimal>) {
        #[derive(Deserialize)]
        struct Ticker {
            #[serde(rename = "askPx")]
            ask_px: String,
            #[serde(rename = "bidPx")]
            bid_px: String,
        }
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            data: Vec<Ticker>,
        }

        let url = format!(
            "https://www.okx.com/api/v5/market/ticker?instId={}",
            Self::dashed_symbol(symbol)
        );
        match self.fetch_json::<Response>(&url).await {
            Some(response) => match response.data.first() {
                Some(ticker) => (ticker.ask_px.parse().ok(), ticker.bid_px.parse().ok()),
                None => (None, None),
            },
            None => (None, None),
        }
    }

    async fn kucoin(&self, symbol: &str) -> (Option<Decimal>, Option<Decimal>) {
        #[derive(Deserialize)]
        struct Level1 {
            #[serde(rename = "bestAsk")]
            best_ask: Option<String>,
            #[serde(rename = "bestBid")]
            best_bid: Option<String>,
        }
        #[derive(Deserialize)]
        struct Response {
            data: Option<Level1>,
        }

        let url = format!(
            "https://api.kucoin.com/api/v1/market/orderbook/level1?symbol={}",
            Self::dashed_symbol(symbol)
        );
        match self.fetch_json::<Response>(&url).await {
            Some(Response { data: Some(level) }) => (
                level.best_ask.and_then(|p| p.parse().ok()),
                level.best_bid.and_then(|p| p.parse().ok()),
            ),
            _ => (None, None),
        }
    }

    async fn bybit(&self, symbol: &str) -> (Option<Decimal>, Option<Decimal>) {
        #[derive(Deserialize)]
        struct Ticker {
            #[serde(rename = "ask1Price")]
            ask_price: String,
            #[serde(rename = "bid1Price")]
            bid_price: String,
        }
        #[derive(Deserialize, Default)]
        struct TickerList {
            #[serde(default)]
            list: Vec<Ticker>,
        }
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            result: TickerList,
        }

        let url = format!(
            "https://api.bybit.com/v5/market/tickers?category=spot&symbol={}",
            Self::compact_symbol(symbol)
        );
        match self.fetch_json::<Response>(&url).await {
            Some(response) => match response.result.list.first() {
                Some(ticker) => (ticker.ask_price.parse().ok(), ticker.bid_price.parse().ok()),
                None => (None, None),
            },
            None => (None, None),
        }
    }

    async fn gate(&self, symbol: &str) -> (Option<Decimal>, Option<Decimal>) {
        #[derive(Deserialize)]
        struct Ticker {
            lowest_ask: Option<String>,
            highest_bid: Option<String>,
        }

        let url = format!(
            "https://api.gateio.ws/api/v4/spot/tickers?currency_pair={}",
            Self::underscored_symbol(symbol)
        );
        match self.fetch_json::<Vec<Ticker>>(&url).await {
            Some(tickers) => match tickers.into_iter().next() {
                Some(ticker) => (
                    ticker.lowest_ask.and_then(|p| p.parse().ok()),
                    ticker.highest_bid.and_then(|p| p.parse().ok()),
                ),
                None => (None, None),
            },
            None => (None, None),
        }
    }
}

impl Default for RestMarketDataProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl MarketDataProvider for RestMarketDataProvider {
    async fn current_prices(
        &self,
        exchange_id: &str,
        symbol: &str,
    ) -> (Option<Decimal>, Option<Decimal>) {
        match exchange_id {
            "binance" => self.binance(symbol).await,
            "okx" => self.okx(symbol).await,
            "kucoin" => self.kucoin(symbol).await,
            "bybit" => self.bybit(symbol).await,
            "gate" => self.gate(symbol).await,
            other => {
                debug!(exchange = other, "unsupported exchange for market data");
                (None, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_formats() {
        assert_eq!(RestMarketDataProvider::compact_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(RestMarketDataProvider::dashed_symbol("BTC/USDT"), "BTC-USDT");
        assert_eq!(
            RestMarketDataProvider::underscored_symbol("BTC/USDT"),
            "BTC_USDT"
        );
    }

    #[tokio::test]
    async fn test_unsupported_exchange_yields_no_prices() {
        let provider = RestMarketDataProvider::default();
        let (ask, bid) = provider.current_prices("hyperdex", "BTC/USDT").await;
        assert!(ask.is_none());
        assert!(bid.is_none());
    }
}
