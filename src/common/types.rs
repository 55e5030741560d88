//! Unified types shared across the engine, the ledger client and the sinks

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the investment amount is derived from the holder balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvestmentMode {
    /// Invest a fixed USDT amount per operation
    Fixed,
    /// Invest a percentage of the current balance
    Percentage,
}

impl Default for InvestmentMode {
    fn default() -> Self {
        InvestmentMode::Fixed
    }
}

impl std::fmt::Display for InvestmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvestmentMode::Fixed => write!(f, "FIXED"),
            InvestmentMode::Percentage => write!(f, "PERCENTAGE"),
        }
    }
}

/// A candidate price discrepancy for one symbol across two exchanges.
///
/// `buy_exchange_id` is the cheaper venue (where the asset is bought) and
/// `sell_exchange_id` the pricier one. Immutable once received; the only
/// field resolved later is the initial USDT withdrawal fee, which depends on
/// the current holder exchange and is quoted per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Trading pair, e.g. "BTC/USDT"
    pub symbol: String,
    /// Base asset short name, e.g. "BTC"
    pub symbol_name: String,
    pub buy_exchange_id: String,
    pub sell_exchange_id: String,
    /// Ask price at the buy exchange
    pub buy_price: Decimal,
    /// Bid price at the sell exchange
    pub sell_price: Decimal,
    /// Taker fee rate at the buy exchange (e.g. 0.001)
    pub taker_fee_buy: Decimal,
    /// Taker fee rate at the sell exchange
    pub taker_fee_sell: Decimal,
    /// Withdrawal fee for moving the asset off the buy exchange, in asset units
    pub asset_withdrawal_fee: Decimal,
    /// Network used for the asset transfer, when known
    pub asset_withdrawal_network: Option<String>,
    /// Fee for the initial USDT withdrawal from the holder exchange
    pub initial_usdt_withdrawal_fee: Option<Decimal>,
    /// Gross percentage gap between sell and buy price as reported upstream
    pub gross_percent_diff: Decimal,
    /// Identifier of the upstream analysis that produced this candidate
    pub analysis_id: Option<String>,
    /// When the upstream snapshot was taken
    pub fetched_at: DateTime<Utc>,
}

impl Opportunity {
    /// Returns a copy with the initial USDT withdrawal fee filled in
    pub fn with_initial_withdrawal_fee(&self, fee: Decimal) -> Self {
        let mut opp = self.clone();
        opp.initial_usdt_withdrawal_fee = Some(fee);
        opp
    }
}

/// Per-exchange balance and risk configuration, owned by the remote ledger.
///
/// The local copy is a cache; it is reloaded at the start of every cycle and
/// after any balance mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    pub exchange_id: String,
    pub balance_usdt: Decimal,
    pub investment_mode: InvestmentMode,
    pub fixed_investment_usdt: Decimal,
    pub investment_percentage: Decimal,
    /// Max acceptable loss per operation, percent of the invested amount
    pub stop_loss_percent_operation: Decimal,
    /// Optional early-exit profit target, percent of the invested amount
    pub take_profit_percent_operation: Option<Decimal>,
    /// Global drawdown limit, percent of the initial capital
    pub stop_loss_percent_global: Decimal,
    /// Capital baseline for the global stop loss; set on first credit
    pub initial_capital_for_global_sl: Option<Decimal>,
}

impl BalanceConfig {
    /// A zero-balance document for an exchange the ledger does not know yet
    pub fn empty(exchange_id: impl Into<String>) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            balance_usdt: Decimal::ZERO,
            investment_mode: InvestmentMode::default(),
            fixed_investment_usdt: Decimal::from(50),
            investment_percentage: Decimal::from(10),
            stop_loss_percent_operation: Decimal::from(50),
            take_profit_percent_operation: None,
            stop_loss_percent_global: Decimal::from(50),
            initial_capital_for_global_sl: None,
        }
    }
}

/// Cheapest viable network quote for a USDT withdrawal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalQuote {
    pub network: String,
    pub fee_usdt: Decimal,
}

/// Terminal outcome of one simulated execution.
///
/// Exactly one value per simulation run; consumers match exhaustively so a
/// new outcome forces every call site to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    NotEvaluated,
    CalcError,
    SlTriggeredInitial,
    TpTriggeredInitial,
    BelowProfitThreshold,
    MarketDataUnavailable,
    NoFinalPrice,
    SlTriggeredReprice,
    TpTriggeredFinal,
    Executed,
    NotProfitableReprice,
}

impl DecisionOutcome {
    /// True for every outcome that commits capital
    pub fn is_executed(&self) -> bool {
        matches!(
            self,
            DecisionOutcome::Executed
                | DecisionOutcome::TpTriggeredInitial
                | DecisionOutcome::TpTriggeredFinal
        )
    }
}

impl std::fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DecisionOutcome::NotEvaluated => "NOT_EVALUATED",
            DecisionOutcome::CalcError => "CALC_ERROR",
            DecisionOutcome::SlTriggeredInitial => "SL_TRIGGERED_INITIAL",
            DecisionOutcome::TpTriggeredInitial => "TP_TRIGGERED_INITIAL",
            DecisionOutcome::BelowProfitThreshold => "BELOW_PROFIT_THRESHOLD",
            DecisionOutcome::MarketDataUnavailable => "MARKET_DATA_UNAVAILABLE",
            DecisionOutcome::NoFinalPrice => "NO_FINAL_PRICE",
            DecisionOutcome::SlTriggeredReprice => "SL_TRIGGERED_REPRICE",
            DecisionOutcome::TpTriggeredFinal => "TP_TRIGGERED_FINAL",
            DecisionOutcome::Executed => "EXECUTED",
            DecisionOutcome::NotProfitableReprice => "NOT_PROFITABLE_REPRICE",
        };
        write!(f, "{}", label)
    }
}

/// A single feature passed to the admission classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

/// Feature vector consumed by the admission classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(BTreeMap<String, FeatureValue>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_number(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), FeatureValue::Number(value));
    }

    pub fn insert_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), FeatureValue::Text(value.into()));
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(FeatureValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(FeatureValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Verdict returned by the admission classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub should_execute: bool,
    pub confidence: f64,
}

/// Flattened per-opportunity audit row.
///
/// One record is appended per evaluated opportunity regardless of outcome,
/// so skips and errors are as observable as executions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub analysis_id: Option<String>,
    pub buy_exchange_id: String,
    pub sell_exchange_id: String,
    pub decision_outcome: DecisionOutcome,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub repriced_sell_price: Option<Decimal>,
    pub investment_usdt: Decimal,
    pub net_profit_usdt: Decimal,
    pub net_profit_percentage: Decimal,
    pub final_profit_usdt: Decimal,
    pub balance_before_usdt: Decimal,
    pub classifier_should_execute: bool,
    pub classifier_confidence: f64,
    pub sizing_attempts: u32,
    pub skip_reason: Option<String>,
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
}

impl OperationRecord {
    /// A fresh record for an opportunity that has not been evaluated yet
    pub fn for_opportunity(opportunity: &Opportunity) -> Self {
        Self {
            timestamp: Utc::now(),
            symbol: opportunity.symbol.clone(),
            analysis_id: opportunity.analysis_id.clone(),
            buy_exchange_id: opportunity.buy_exchange_id.clone(),
            sell_exchange_id: opportunity.sell_exchange_id.clone(),
            decision_outcome: DecisionOutcome::NotEvaluated,
            buy_price: opportunity.buy_price,
            sell_price: opportunity.sell_price,
            repriced_sell_price: None,
            investment_usdt: Decimal::ZERO,
            net_profit_usdt: Decimal::ZERO,
            net_profit_percentage: Decimal::ZERO,
            final_profit_usdt: Decimal::ZERO,
            balance_before_usdt: Decimal::ZERO,
            classifier_should_execute: false,
            classifier_confidence: 0.0,
            sizing_attempts: 0,
            skip_reason: None,
            error_message: None,
            execution_time_ms: 0,
        }
    }
}

/// Decision outcome pushed to observers, best effort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub symbol: String,
    pub outcome: DecisionOutcome,
    pub investment_usdt: Decimal,
    pub final_profit_usdt: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl DecisionEvent {
    pub fn from_record(record: &OperationRecord) -> Self {
        Self {
            symbol: record.symbol.clone(),
            outcome: record.decision_outcome,
            investment_usdt: record.investment_usdt,
            final_profit_usdt: record.final_profit_usdt,
            timestamp: record.timestamp,
        }
    }
}
