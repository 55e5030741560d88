//! Risk-gated execution simulator
//!
//! Takes a calculated profitability breakdown and decides whether capital
//! would actually be committed: stop-loss and take-profit are checked on the
//! initial numbers first (so certain cases skip the market-data round trip),
//! then the sell price is re-verified after a short settlement delay and the
//! same gates run again on the refreshed profit before anything is final.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::common::channels::Shutdown;
use crate::common::errors::Result;
use crate::common::traits::MarketDataProvider;
use crate::common::types::{DecisionOutcome, Opportunity};
use crate::config::types::EngineSettings;
use crate::engine::types::{ProfitabilityResult, RiskPolicy, SimulationReport};

/// Decides the terminal outcome for one sized opportunity
pub struct ExecutionSimulator {
    market: Option<Arc<dyn MarketDataProvider>>,
    min_absolute_profit_usdt: Decimal,
    settlement_delay: Duration,
}

impl ExecutionSimulator {
    pub fn new(market: Option<Arc<dyn MarketDataProvider>>, settings: &EngineSettings) -> Self {
        Self {
            market,
            min_absolute_profit_usdt: settings.min_absolute_profit_usdt,
            settlement_delay: Duration::from_millis(settings.settlement_delay_ms),
        }
    }

    /// Run the decision state machine.
    ///
    /// Deterministic ordering, no retries; the only error this returns is
    /// `EngineError::Cancelled` when shutdown interrupts a suspension point.
    #[instrument(skip_all, fields(symbol = %opportunity.symbol))]
    pub async fn simulate(
        &self,
        opportunity: &Opportunity,
        calc: &ProfitabilityResult,
        policy: &RiskPolicy,
        investment_usdt: Decimal,
        shutdown: &Shutdown,
    ) -> Result<SimulationReport> {
        if let Some(failure) = calc.error {
            let mut report = SimulationReport::new(DecisionOutcome::CalcError, Decimal::ZERO);
            report
                .steps
                .push(format!("not viable: calculation failed ({})", failure));
            return Ok(report);
        }

        let net_profit = calc.net_profit_usdt;
        let sl_threshold =
            -(investment_usdt * policy.stop_loss_percent_operation / Decimal::from(100));

        // Initial stop loss: a certain loss skips the market round trip.
        if net_profit < sl_threshold {
            let mut report =
                SimulationReport::new(DecisionOutcome::SlTriggeredInitial, net_profit);
            report.sl_triggered = true;
            report.steps.push(format!(
                "not viable: loss {:.4} USDT exceeds operation stop loss {:.4} USDT",
                net_profit, sl_threshold
            ));
            return Ok(report);
        }

        // Initial take profit: a certain win executes without re-pricing.
        if let Some(tp_threshold) = self.take_profit_threshold(policy, investment_usdt) {
            if net_profit >= tp_threshold {
                let mut report =
                    SimulationReport::new(DecisionOutcome::TpTriggeredInitial, net_profit);
                report.tp_triggered = true;
                report.steps.push(format!(
                    "take profit reached on initial evaluation: {:.4} USDT (target {:.4} USDT)",
                    net_profit, tp_threshold
                ));
                return Ok(report);
            }
        }

        if net_profit < self.min_absolute_profit_usdt {
            let mut report =
                SimulationReport::new(DecisionOutcome::BelowProfitThreshold, net_profit);
            report.steps.push(format!(
                "not viable: initial net profit {:.4} USDT below floor {:.4} USDT",
                net_profit, self.min_absolute_profit_usdt
            ));
            return Ok(report);
        }

        let mut report = SimulationReport::new(DecisionOutcome::NotEvaluated, net_profit);
        report.steps.push(format!(
            "viable on initial evaluation, expected net profit {:.4} USDT",
            net_profit
        ));
        report.steps.push(format!(
            "withdraw {:.4} USDT fee, buy {:.8} {} at {} on {}, transfer {:.8} {} (network {})",
            investment_usdt - calc.stages.usdt_after_withdrawal,
            calc.stages.asset_bought_net,
            opportunity.symbol_name,
            opportunity.buy_price,
            opportunity.buy_exchange_id,
            calc.stages.asset_to_transfer,
            opportunity.symbol_name,
            opportunity
                .asset_withdrawal_network
                .as_deref()
                .unwrap_or("unknown"),
        ));

        // Settlement latency before the final sell decision.
        shutdown.guard(tokio::time::sleep(self.settlement_delay)).await?;

        let Some(market) = self.market.as_deref() else {
            report.outcome = DecisionOutcome::MarketDataUnavailable;
            report
                .steps
                .push("aborted: no market data capability for re-verification".to_string());
            return Ok(report);
        };

        let (_, latest_bid) = shutdown
            .guard(market.current_prices(&opportunity.sell_exchange_id, &opportunity.symbol))
            .await?;

        let Some(latest_bid) = latest_bid else {
            report.outcome = DecisionOutcome::NoFinalPrice;
            report.steps.push(format!(
                "aborted: no current sell price on {}",
                opportunity.sell_exchange_id
            ));
            return Ok(report);
        };

        report.repriced_sell_price = Some(latest_bid);
        debug!(%latest_bid, "re-verified sell price");

        // Recompute only the sell leg; every other leg is already settled.
        let fee_factor = Decimal::ONE - opportunity.taker_fee_sell;
        let original_sale_net =
            calc.stages.asset_to_transfer * opportunity.sell_price * fee_factor;
        let repriced_sale_net = calc.stages.asset_to_transfer * latest_bid * fee_factor;
        let final_profit = net_profit + (repriced_sale_net - original_sale_net);
        report.final_profit_usdt = final_profit;

        if let Some(tp_threshold) = self.take_profit_threshold(policy, investment_usdt) {
            if final_profit >= tp_threshold {
                report.outcome = DecisionOutcome::TpTriggeredFinal;
                report.tp_triggered = true;
                report.steps.push(format!(
                    "take profit reached after re-pricing: sell at {} nets {:.4} USDT",
                    latest_bid, final_profit
                ));
                return Ok(report);
            }
        }

        if final_profit < sl_threshold {
            report.outcome = DecisionOutcome::SlTriggeredReprice;
            report.sl_triggered = true;
            report.steps.push(format!(
                "aborted: repriced sell at {} loses {:.4} USDT, past the operation stop loss",
                latest_bid, final_profit
            ));
            return Ok(report);
        }

        if final_profit >= self.min_absolute_profit_usdt {
            report.outcome = DecisionOutcome::Executed;
            report.steps.push(format!(
                "sell {:.8} {} at {} on {}, final net profit {:.4} USDT",
                calc.stages.asset_to_transfer,
                opportunity.symbol_name,
                latest_bid,
                opportunity.sell_exchange_id,
                final_profit
            ));
        } else {
            report.outcome = DecisionOutcome::NotProfitableReprice;
            report.steps.push(format!(
                "aborted: repriced sell at {} nets {:.4} USDT, below the profit floor",
                latest_bid, final_profit
            ));
        }

        Ok(report)
    }

    fn take_profit_threshold(
        &self,
        policy: &RiskPolicy,
        investment_usdt: Decimal,
    ) -> Option<Decimal> {
        policy
            .take_profit_percent_operation
            .filter(|pct| *pct > Decimal::ZERO)
            .map(|pct| investment_usdt * pct / Decimal::from(100))
    }
}
