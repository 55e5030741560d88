//! Process-wide trading state
//!
//! Owned by the admission controller, which is its single writer. The state
//! lives behind one mutex; holding that mutex is what marks a batch as in
//! flight, so there is no separate flag to keep in sync.

use serde::{Deserialize, Serialize};

use crate::common::types::BalanceConfig;

/// Mutable state threaded through cycles
#[derive(Debug, Clone)]
pub struct TradingState {
    /// Exchange currently holding the USDT capital
    pub active_holder_exchange_id: String,
    /// Ledger balance document cached for the active holder; invalidated
    /// (reloaded) at the start of every cycle
    pub cached_balance: Option<BalanceConfig>,
    global_sl_tripped: bool,
}

impl TradingState {
    pub fn new(holder_exchange_id: impl Into<String>) -> Self {
        Self {
            active_holder_exchange_id: holder_exchange_id.into(),
            cached_balance: None,
            global_sl_tripped: false,
        }
    }

    pub fn global_sl_tripped(&self) -> bool {
        self.global_sl_tripped
    }

    /// One-way: the engine never resets this; recovery is an operator
    /// action (restart with replenished capital).
    pub fn trip_global_sl(&mut self) {
        self.global_sl_tripped = true;
    }

    /// Read-only view for observers outside the controller
    pub fn snapshot(&self) -> TradingStateSnapshot {
        TradingStateSnapshot {
            active_holder_exchange_id: self.active_holder_exchange_id.clone(),
            balance_usdt: self.cached_balance.as_ref().map(|b| b.balance_usdt),
            global_sl_tripped: self.global_sl_tripped,
        }
    }
}

/// Immutable view of the trading state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingStateSnapshot {
    pub active_holder_exchange_id: String,
    pub balance_usdt: Option<rust_decimal::Decimal>,
    pub global_sl_tripped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_global_sl_is_sticky() {
        let mut state = TradingState::new("binance");
        assert!(!state.global_sl_tripped());

        state.trip_global_sl();
        assert!(state.global_sl_tripped());
        // no API exists to reset it
    }

    #[test]
    fn test_snapshot_reflects_cached_balance() {
        let mut state = TradingState::new("binance");
        assert_eq!(state.snapshot().balance_usdt, None);

        let mut balance = BalanceConfig::empty("binance");
        balance.balance_usdt = dec!(750);
        state.cached_balance = Some(balance);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.active_holder_exchange_id, "binance");
        assert_eq!(snapshot.balance_usdt, Some(dec!(750)));
        assert!(!snapshot.global_sl_tripped);
    }
}
