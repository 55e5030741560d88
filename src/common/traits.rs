//! Trait definitions for the engine's external collaborators
//!
//! Everything the decision pipeline needs from the outside world is behind
//! one of these interfaces, injected into the controller. That keeps the
//! sizing/decision logic pure and lets tests substitute mocks.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use rust_decimal::Decimal;

use super::errors::Result;
use super::types::{
    BalanceConfig, DecisionEvent, FeatureVector, OperationRecord, Prediction, WithdrawalQuote,
};

/// Live price source for the re-verification step.
///
/// Implementations never fail: any problem (network, unsupported exchange,
/// unsupported symbol) maps to `None` prices.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current best ask and bid for a symbol on an exchange
    ///
    /// # Returns
    /// `(ask, bid)`, either of which may be `None`
    async fn current_prices(
        &self,
        exchange_id: &str,
        symbol: &str,
    ) -> (Option<Decimal>, Option<Decimal>);
}

/// Remote service of record for per-exchange USDT balances
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Load the balance configuration for an exchange.
    ///
    /// An exchange unknown to the ledger yields a zero-balance default
    /// document, not an error.
    async fn fetch_balance(&self, exchange_id: &str) -> Result<BalanceConfig>;

    /// Store a full balance configuration and return the updated document
    async fn store_balance(&self, config: &BalanceConfig) -> Result<BalanceConfig>;

    /// Cheapest viable network for withdrawing USDT from an exchange.
    ///
    /// `None` when no active network is available.
    async fn usdt_withdrawal_quote(&self, exchange_id: &str) -> Result<Option<WithdrawalQuote>>;
}

/// Cheap admission gate queried before the costly sizing and re-pricing work.
///
/// Implementations must not fail; an untrained model falls back to a
/// deterministic heuristic.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AdmissionClassifier: Send + Sync {
    async fn predict(&self, features: &FeatureVector) -> Prediction;
}

/// Append-only audit destination for operation records.
///
/// Fire and forget: implementations log failures and never propagate them
/// into the decision pipeline.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: &OperationRecord);
}

/// Best-effort fan-out of decision outcomes to observers.
///
/// Per-subscriber failures are isolated and must not affect the pipeline.
#[cfg_attr(test, automock)]
pub trait Broadcaster: Send + Sync {
    fn publish(&self, event: DecisionEvent);
}
