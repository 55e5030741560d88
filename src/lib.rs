//! spotarb Library
//!
//! An automated cross-exchange USDT spot arbitrage engine: ranked
//! opportunities in, at most one fee-verified, risk-gated capital movement
//! per cycle out, with the balance ledger kept in sync.

pub mod common;
pub mod config;
pub mod engine;
pub mod market;
pub mod persistence;
pub mod sebo;

// Re-export commonly used types
pub use common::channels::{shutdown_channel, ChannelBroadcaster, Shutdown, ShutdownHandle};
pub use common::errors::{EngineError, Result};
pub use common::traits::{
    AdmissionClassifier, AuditSink, Broadcaster, LedgerClient, MarketDataProvider,
};
pub use common::types::{
    BalanceConfig, DecisionEvent, DecisionOutcome, FeatureValue, FeatureVector, InvestmentMode,
    OperationRecord, Opportunity, Prediction, WithdrawalQuote,
};
pub use config::{load_config, AppConfig, EngineSettings};
pub use market::RestMarketDataProvider;
pub use persistence::CsvAuditSink;
pub use sebo::SeboClient;

// Engine types
pub use engine::{
    AdmissionController, CalcFailure, CycleReport, ExecutedTrade, ExecutionSimulator,
    HeuristicClassifier, ProfitabilityCalculator, ProfitabilityResult, ProfitabilityStages,
    RiskPolicy, SimulationReport, SizingOutcome, TradingState, TradingStateSnapshot,
};
