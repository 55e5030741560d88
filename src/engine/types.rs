//! Engine-internal result and report types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::types::{BalanceConfig, DecisionOutcome};

/// Why the fee cascade collapsed.
///
/// These are expected business branches, not failures of the engine; the
/// calculator stays a total function and reports them in its result.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalcFailure {
    #[error("investment must be positive")]
    InvalidInvestment,
    #[error("market prices are invalid or unavailable")]
    InvalidPrice,
    #[error("no USDT left after the initial withdrawal fee")]
    WithdrawalExhaustsCapital,
    #[error("could not buy a positive amount of asset")]
    NoAssetAcquired,
    #[error("no asset left to transfer after the withdrawal fee")]
    TransferExhaustsAsset,
}

/// Ordered stage snapshots of the buy-transfer-sell cascade.
///
/// Retained up to the failure point so every outcome is diagnosable from
/// the record alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityStages {
    /// s0: capital committed
    pub investment_usdt: Decimal,
    /// s1: USDT arriving at the buy exchange after the withdrawal fee
    pub usdt_after_withdrawal: Decimal,
    /// s2: asset bought before the taker fee
    pub asset_bought_gross: Decimal,
    /// s2: asset held after the taker fee
    pub asset_bought_net: Decimal,
    /// s3: asset leaving for the sell exchange after the transfer fee
    pub asset_to_transfer: Decimal,
    /// s4: sale proceeds before the taker fee
    pub sale_proceeds_gross: Decimal,
    /// s4: USDT held after all fees
    pub final_usdt: Decimal,
}

/// Staged profit/loss breakdown for one opportunity at one investment amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityResult {
    pub stages: ProfitabilityStages,
    pub net_profit_usdt: Decimal,
    pub net_profit_percentage: Decimal,
    pub is_profitable: bool,
    pub error: Option<CalcFailure>,
}

impl ProfitabilityResult {
    pub(crate) fn failed(stages: ProfitabilityStages, error: CalcFailure) -> Self {
        Self {
            stages,
            net_profit_usdt: Decimal::ZERO,
            net_profit_percentage: Decimal::ZERO,
            is_profitable: false,
            error: Some(error),
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// Risk thresholds applied by the execution simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// Max acceptable loss, percent of the invested amount
    pub stop_loss_percent_operation: Decimal,
    /// Optional early-exit profit target, percent of the invested amount
    pub take_profit_percent_operation: Option<Decimal>,
}

impl RiskPolicy {
    pub fn from_balance(config: &BalanceConfig) -> Self {
        Self {
            stop_loss_percent_operation: config.stop_loss_percent_operation,
            take_profit_percent_operation: config.take_profit_percent_operation,
        }
    }
}

/// Outcome of one simulated execution, with its audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub outcome: DecisionOutcome,
    pub final_profit_usdt: Decimal,
    /// Sell price observed at re-verification, when the fetch happened
    pub repriced_sell_price: Option<Decimal>,
    pub sl_triggered: bool,
    pub tp_triggered: bool,
    /// Human-readable trail of the simulated steps
    pub steps: Vec<String>,
}

impl SimulationReport {
    pub(crate) fn new(outcome: DecisionOutcome, final_profit_usdt: Decimal) -> Self {
        Self {
            outcome,
            final_profit_usdt,
            repriced_sell_price: None,
            sl_triggered: false,
            tp_triggered: false,
            steps: Vec::new(),
        }
    }
}

/// Result of the bounded investment-adjustment loop
#[derive(Debug, Clone, PartialEq)]
pub struct SizingOutcome {
    /// Amount belonging to the retained best attempt
    pub investment_usdt: Decimal,
    /// Base amount before any adjustment
    pub original_investment_usdt: Decimal,
    /// Attempts actually evaluated (base attempt included)
    pub attempts_made: u32,
    /// Best profitability seen; carries the calc error when the base
    /// attempt already failed
    pub best: ProfitabilityResult,
}

/// Details of the single capital-committing action of a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedTrade {
    pub symbol: String,
    pub buy_exchange_id: String,
    pub sell_exchange_id: String,
    pub investment_usdt: Decimal,
    pub final_profit_usdt: Decimal,
    pub outcome: DecisionOutcome,
}

/// What happened to one `run_cycle` invocation
#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    /// Another cycle was in flight; this trigger was dropped, not queued
    SkippedInFlight,
    /// The sticky global stop loss blocked the cycle
    AbortedGlobalStopLoss,
    /// The holder balance configuration could not be loaded
    AbortedBalanceLoad(String),
    /// Shutdown aborted the cycle mid-flight
    Cancelled,
    /// The batch was evaluated; at most one opportunity executed
    Completed {
        evaluated: usize,
        executed: Option<ExecutedTrade>,
    },
}

impl CycleReport {
    pub fn executed(&self) -> Option<&ExecutedTrade> {
        match self {
            CycleReport::Completed { executed, .. } => executed.as_ref(),
            _ => None,
        }
    }
}
