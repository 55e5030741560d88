//! Investment sizing: base amount derivation and the bounded adjustment loop
//!
//! Pure logic on top of the calculator, kept free of I/O so it can be tested
//! without mocks. The controller composes it with the ledger and market
//! edges.

use rust_decimal::Decimal;

use crate::common::types::{BalanceConfig, InvestmentMode, Opportunity};
use crate::config::types::EngineSettings;
use crate::engine::calculator::ProfitabilityCalculator;
use crate::engine::types::SizingOutcome;

/// Derive the base investment from the holder balance.
///
/// A balance below the low-balance threshold is committed whole; otherwise
/// the configured mode applies, floored to the practical minimum and capped
/// at the balance. Returns zero when the balance is not operational at all.
pub fn base_investment(balance: &BalanceConfig, settings: &EngineSettings) -> Decimal {
    let current = balance.balance_usdt;

    if current < settings.min_operational_usdt {
        return Decimal::ZERO;
    }

    if current < settings.low_balance_threshold_usdt {
        return current;
    }

    let mut amount = match balance.investment_mode {
        InvestmentMode::Fixed => balance.fixed_investment_usdt,
        InvestmentMode::Percentage => {
            current * balance.investment_percentage / Decimal::from(100)
        }
    };

    if amount < settings.practical_min_investment_usdt {
        amount = settings.practical_min_investment_usdt;
    }

    amount.min(current)
}

/// Bounded adjustment loop over the profitability calculator.
///
/// Starting from `base`, the amount is only ever increased, in fixed steps,
/// clamped to `min(balance, max_investment_percent_of_balance)`. The attempt
/// with the highest net profit is retained; the loop stops early once an
/// attempt clears the acceptance threshold.
pub fn adjust_investment(
    opportunity: &Opportunity,
    base: Decimal,
    balance_usdt: Decimal,
    settings: &EngineSettings,
) -> SizingOutcome {
    let cap = balance_usdt * settings.max_investment_percent_of_balance / Decimal::from(100);

    let mut amount = base;
    let mut best = None;
    let mut best_amount = base;
    let mut attempts_made = 0;

    for attempt in 0..=settings.max_adjustment_attempts {
        if attempt > 0 {
            amount += settings.investment_step_usdt;
        }
        amount = amount.min(balance_usdt).min(cap);
        if attempt > 0 && amount < settings.min_operational_usdt {
            break;
        }
        attempts_made = attempt + 1;

        let result = ProfitabilityCalculator::compute(opportunity, amount);
        if result.is_err() {
            // A failed base attempt is the outcome; a failure after a good
            // attempt just ends the search.
            if best.is_none() {
                best = Some(result);
                best_amount = amount;
            }
            break;
        }

        let improves = best
            .as_ref()
            .map(|current| result.net_profit_usdt > current.net_profit_usdt)
            .unwrap_or(true);
        let net_profit = result.net_profit_usdt;
        if improves {
            best = Some(result);
            best_amount = amount;
        }

        if net_profit >= settings.adjustment_acceptance_threshold_usdt {
            break;
        }
        if amount >= balance_usdt || amount >= cap {
            break;
        }
    }

    let best = best.unwrap_or_else(|| ProfitabilityCalculator::compute(opportunity, base));

    SizingOutcome {
        investment_usdt: best_amount,
        original_investment_usdt: base,
        attempts_made,
        best,
    }
}
