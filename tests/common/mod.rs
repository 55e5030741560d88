//! Shared fixtures and in-memory collaborator doubles for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;

use spotarb::common::errors::{EngineError, Result};
use spotarb::common::traits::{
    AdmissionClassifier, AuditSink, Broadcaster, LedgerClient, MarketDataProvider,
};
use spotarb::common::types::{
    BalanceConfig, DecisionEvent, FeatureVector, InvestmentMode, OperationRecord, Opportunity,
    Prediction, WithdrawalQuote,
};

/// A profitable reference opportunity: 2% gap, 0.1% taker legs, no
/// transfer fees
pub fn profitable_opportunity(symbol: &str, sell_exchange: &str) -> Opportunity {
    Opportunity {
        symbol: symbol.to_string(),
        symbol_name: symbol.split('/').next().unwrap_or(symbol).to_string(),
        buy_exchange_id: "kucoin".to_string(),
        sell_exchange_id: sell_exchange.to_string(),
        buy_price: dec!(100),
        sell_price: dec!(102),
        taker_fee_buy: dec!(0.001),
        taker_fee_sell: dec!(0.001),
        asset_withdrawal_fee: Decimal::ZERO,
        asset_withdrawal_network: Some("TRC20".to_string()),
        initial_usdt_withdrawal_fee: Some(Decimal::ZERO),
        gross_percent_diff: dec!(2),
        analysis_id: Some(format!("analysis-{}", symbol)),
        fetched_at: Utc::now(),
    }
}

pub fn holder_balance(balance_usdt: Decimal) -> BalanceConfig {
    BalanceConfig {
        exchange_id: "binance".to_string(),
        balance_usdt,
        investment_mode: InvestmentMode::Fixed,
        fixed_investment_usdt: dec!(50),
        investment_percentage: dec!(10),
        stop_loss_percent_operation: dec!(50),
        take_profit_percent_operation: None,
        stop_loss_percent_global: dec!(50),
        initial_capital_for_global_sl: None,
    }
}

/// In-memory ledger double with call counters and failure injection
pub struct MemoryLedger {
    pub balances: Mutex<HashMap<String, BalanceConfig>>,
    pub fetch_count: AtomicUsize,
    pub store_count: AtomicUsize,
    pub fetch_delay: Option<Duration>,
    pub quote: Option<WithdrawalQuote>,
    pub fail_store: bool,
}

impl MemoryLedger {
    pub fn new(initial: Vec<BalanceConfig>) -> Self {
        let balances = initial
            .into_iter()
            .map(|config| (config.exchange_id.clone(), config))
            .collect();
        Self {
            balances: Mutex::new(balances),
            fetch_count: AtomicUsize::new(0),
            store_count: AtomicUsize::new(0),
            fetch_delay: None,
            quote: Some(WithdrawalQuote {
                network: "TRC20".to_string(),
                fee_usdt: Decimal::ZERO,
            }),
            fail_store: false,
        }
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn with_failing_store(mut self) -> Self {
        self.fail_store = true;
        self
    }

    pub async fn balance_of(&self, exchange_id: &str) -> Option<Decimal> {
        self.balances
            .lock()
            .await
            .get(exchange_id)
            .map(|config| config.balance_usdt)
    }

    pub async fn set_balance(&self, exchange_id: &str, balance_usdt: Decimal) {
        let mut balances = self.balances.lock().await;
        balances
            .entry(exchange_id.to_string())
            .or_insert_with(|| BalanceConfig::empty(exchange_id))
            .balance_usdt = balance_usdt;
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn fetch_balance(&self, exchange_id: &str) -> Result<BalanceConfig> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let balances = self.balances.lock().await;
        Ok(balances
            .get(exchange_id)
            .cloned()
            .unwrap_or_else(|| BalanceConfig::empty(exchange_id)))
    }

    async fn store_balance(&self, config: &BalanceConfig) -> Result<BalanceConfig> {
        self.store_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_store {
            return Err(EngineError::Ledger("injected store failure".to_string()));
        }
        let mut balances = self.balances.lock().await;
        balances.insert(config.exchange_id.clone(), config.clone());
        Ok(config.clone())
    }

    async fn usdt_withdrawal_quote(&self, _exchange_id: &str) -> Result<Option<WithdrawalQuote>> {
        Ok(self.quote.clone())
    }
}

/// Market double answering every re-pricing with a fixed bid
pub struct FixedMarket {
    pub bid: Option<Decimal>,
    pub calls: AtomicUsize,
}

impl FixedMarket {
    pub fn new(bid: Option<Decimal>) -> Self {
        Self {
            bid,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MarketDataProvider for FixedMarket {
    async fn current_prices(
        &self,
        _exchange_id: &str,
        _symbol: &str,
    ) -> (Option<Decimal>, Option<Decimal>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.bid, self.bid)
    }
}

/// Classifier double with a fixed verdict
pub struct FixedClassifier {
    pub should_execute: bool,
}

#[async_trait]
impl AdmissionClassifier for FixedClassifier {
    async fn predict(&self, _features: &FeatureVector) -> Prediction {
        Prediction {
            should_execute: self.should_execute,
            confidence: if self.should_execute { 1.0 } else { 0.0 },
        }
    }
}

/// Audit sink double collecting records in memory
#[derive(Default)]
pub struct MemoryAudit {
    pub records: Mutex<Vec<OperationRecord>>,
}

#[async_trait]
impl AuditSink for MemoryAudit {
    async fn append(&self, record: &OperationRecord) {
        self.records.lock().await.push(record.clone());
    }
}

/// Broadcaster double collecting events in memory
#[derive(Default)]
pub struct MemoryBroadcaster {
    pub events: std::sync::Mutex<Vec<DecisionEvent>>,
}

impl Broadcaster for MemoryBroadcaster {
    fn publish(&self, event: DecisionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Bundle of collaborator doubles wired into one controller
pub struct TestHarness {
    pub ledger: Arc<MemoryLedger>,
    pub market: Arc<FixedMarket>,
    pub audit: Arc<MemoryAudit>,
    pub broadcaster: Arc<MemoryBroadcaster>,
}

impl TestHarness {
    pub fn new(ledger: MemoryLedger, market: FixedMarket) -> Self {
        Self {
            ledger: Arc::new(ledger),
            market: Arc::new(market),
            audit: Arc::new(MemoryAudit::default()),
            broadcaster: Arc::new(MemoryBroadcaster::default()),
        }
    }

    pub fn controller(
        &self,
        settings: spotarb::config::EngineSettings,
        admit: bool,
    ) -> spotarb::engine::AdmissionController {
        spotarb::engine::AdmissionController::new(
            settings,
            self.ledger.clone(),
            Some(self.market.clone()),
            Arc::new(FixedClassifier {
                should_execute: admit,
            }),
            self.audit.clone(),
            self.broadcaster.clone(),
        )
    }
}

/// Engine settings tuned for fast tests
pub fn fast_settings() -> spotarb::config::EngineSettings {
    spotarb::config::EngineSettings {
        settlement_delay_ms: 1,
        ..spotarb::config::EngineSettings::default()
    }
}
