//! Arbitrage decision and execution engine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PURE (no I/O)                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ProfitabilityCalculator                                    │
//! │    - fee cascade: withdraw → buy → transfer → sell          │
//! │    - total function, staged snapshots retained              │
//! │  sizing                                                     │
//! │    - base amount from the holder balance                    │
//! │    - bounded adjustment loop, best attempt retained         │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    I/O EDGES (injected)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Ranked batch arrives                                       │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  AdmissionController.run_cycle()   (single flight)          │
//! │    - global stop loss gate                                  │
//! │    - per candidate: classifier → sizing → simulator         │
//! │       │                                                     │
//! │       ▼ (first executed outcome)                            │
//! │  Ledger bookkeeping: debit source, credit destination,      │
//! │  switch holder, end cycle                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`ProfitabilityCalculator`]: staged profit/loss breakdown
//! - [`ExecutionSimulator`]: SL/TP state machine with re-pricing
//! - [`AdmissionController`]: batch driver and single `TradingState` writer
//! - [`HeuristicClassifier`]: deterministic fallback admission gate

mod calculator;
mod classifier;
mod controller;
mod simulator;
mod sizing;
mod state;
mod types;

pub use calculator::ProfitabilityCalculator;
pub use classifier::{extract_features, HeuristicClassifier};
pub use controller::AdmissionController;
pub use simulator::ExecutionSimulator;
pub use sizing::{adjust_investment, base_investment};
pub use state::{TradingState, TradingStateSnapshot};
pub use types::{
    CalcFailure, CycleReport, ExecutedTrade, ProfitabilityResult, ProfitabilityStages,
    RiskPolicy, SimulationReport, SizingOutcome,
};
