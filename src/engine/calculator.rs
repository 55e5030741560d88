//! Fee-cascading profitability calculator
//!
//! A pure, total function: identical inputs always produce the identical
//! staged breakdown, and every failure mode is reported in the result
//! rather than raised.

use rust_decimal::Decimal;

use crate::common::types::Opportunity;
use crate::engine::types::{CalcFailure, ProfitabilityResult, ProfitabilityStages};

/// Computes the staged profit/loss of a buy-transfer-sell cycle
pub struct ProfitabilityCalculator;

impl ProfitabilityCalculator {
    /// Run the fee cascade for one opportunity at one investment amount.
    ///
    /// Stages fail fast; snapshots computed up to the failure point are
    /// retained in the result.
    pub fn compute(opportunity: &Opportunity, investment_usdt: Decimal) -> ProfitabilityResult {
        let mut stages = ProfitabilityStages::default();

        if investment_usdt <= Decimal::ZERO {
            return ProfitabilityResult::failed(stages, CalcFailure::InvalidInvestment);
        }
        stages.investment_usdt = investment_usdt;

        let withdrawal_fee = opportunity.initial_usdt_withdrawal_fee.unwrap_or(Decimal::ZERO);
        let usdt_after_withdrawal = investment_usdt - withdrawal_fee;
        stages.usdt_after_withdrawal = usdt_after_withdrawal;
        if usdt_after_withdrawal <= Decimal::ZERO {
            return ProfitabilityResult::failed(stages, CalcFailure::WithdrawalExhaustsCapital);
        }

        if opportunity.buy_price <= Decimal::ZERO || opportunity.sell_price <= Decimal::ZERO {
            return ProfitabilityResult::failed(stages, CalcFailure::InvalidPrice);
        }

        let asset_bought_gross = usdt_after_withdrawal / opportunity.buy_price;
        let asset_bought_net = asset_bought_gross * (Decimal::ONE - opportunity.taker_fee_buy);
        stages.asset_bought_gross = asset_bought_gross;
        stages.asset_bought_net = asset_bought_net;
        if asset_bought_net <= Decimal::ZERO {
            return ProfitabilityResult::failed(stages, CalcFailure::NoAssetAcquired);
        }

        let asset_to_transfer = asset_bought_net - opportunity.asset_withdrawal_fee;
        stages.asset_to_transfer = asset_to_transfer;
        if asset_to_transfer <= Decimal::ZERO {
            return ProfitabilityResult::failed(stages, CalcFailure::TransferExhaustsAsset);
        }

        let sale_proceeds_gross = asset_to_transfer * opportunity.sell_price;
        let final_usdt = sale_proceeds_gross * (Decimal::ONE - opportunity.taker_fee_sell);
        stages.sale_proceeds_gross = sale_proceeds_gross;
        stages.final_usdt = final_usdt;

        let net_profit_usdt = final_usdt - investment_usdt;
        let net_profit_percentage = net_profit_usdt / investment_usdt * Decimal::from(100);

        ProfitabilityResult {
            stages,
            net_profit_usdt,
            net_profit_percentage,
            is_profitable: net_profit_usdt > Decimal::ZERO,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn opportunity(
        buy_price: Decimal,
        sell_price: Decimal,
        withdrawal_fee: Decimal,
    ) -> Opportunity {
        Opportunity {
            symbol: "BTC/USDT".to_string(),
            symbol_name: "BTC".to_string(),
            buy_exchange_id: "binance".to_string(),
            sell_exchange_id: "okx".to_string(),
            buy_price,
            sell_price,
            taker_fee_buy: dec!(0.001),
            taker_fee_sell: dec!(0.001),
            asset_withdrawal_fee: Decimal::ZERO,
            asset_withdrawal_network: Some("TRC20".to_string()),
            initial_usdt_withdrawal_fee: Some(withdrawal_fee),
            gross_percent_diff: dec!(2),
            analysis_id: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_compute_is_deterministic() {
        let opp = opportunity(dec!(100), dec!(102), dec!(1));
        let first = ProfitabilityCalculator::compute(&opp, dec!(1000));
        let second = ProfitabilityCalculator::compute(&opp, dec!(1000));
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_positive_investment_is_rejected_with_zeroed_stages() {
        let opp = opportunity(dec!(100), dec!(102), dec!(1));

        for investment in [Decimal::ZERO, dec!(-5)] {
            let result = ProfitabilityCalculator::compute(&opp, investment);
            assert_eq!(result.error, Some(CalcFailure::InvalidInvestment));
            assert_eq!(result.stages, ProfitabilityStages::default());
            assert_eq!(result.net_profit_usdt, Decimal::ZERO);
            assert!(!result.is_profitable);
        }
    }

    #[test]
    fn test_reference_case_matches_hand_computed_cascade() {
        // buy 100, sell 102, invest 1000, 1 USDT withdrawal fee,
        // taker fees 0.1%/0.1%, no asset withdrawal fee:
        //   s1: 1000 - 1            = 999
        //   s2: 999 / 100           = 9.99 gross, * 0.999 = 9.98001 net
        //   s3: 9.98001 - 0         = 9.98001
        //   s4: 9.98001 * 102       = 1017.96102, * 0.999 = 1016.94305898
        //   net: 1016.94305898 - 1000 = 16.94305898
        let opp = opportunity(dec!(100), dec!(102), dec!(1));
        let result = ProfitabilityCalculator::compute(&opp, dec!(1000));

        assert_eq!(result.error, None);
        assert_eq!(result.stages.usdt_after_withdrawal, dec!(999));
        assert_eq!(result.stages.asset_bought_gross, dec!(9.99));
        assert_eq!(result.stages.asset_bought_net, dec!(9.98001));
        assert_eq!(result.stages.asset_to_transfer, dec!(9.98001));
        assert_eq!(result.stages.sale_proceeds_gross, dec!(1017.96102));
        assert_eq!(result.stages.final_usdt, dec!(1016.94305898));
        assert_eq!(result.net_profit_usdt, dec!(16.94305898));
        assert_eq!(result.net_profit_percentage, dec!(1.694305898));
        assert!(result.is_profitable);
    }

    #[test]
    fn test_net_profit_is_monotonic_in_sell_price() {
        let investment = dec!(500);
        let mut previous = None;

        for sell_price in [dec!(99), dec!(100), dec!(101), dec!(103), dec!(110)] {
            let opp = opportunity(dec!(100), sell_price, dec!(1));
            let result = ProfitabilityCalculator::compute(&opp, investment);
            assert_eq!(result.error, None);

            if let Some(prior) = previous {
                assert!(
                    result.net_profit_usdt >= prior,
                    "net profit decreased when sell price rose to {}",
                    sell_price
                );
            }
            previous = Some(result.net_profit_usdt);
        }
    }

    #[test]
    fn test_withdrawal_fee_exhausting_capital() {
        let opp = opportunity(dec!(100), dec!(102), dec!(10));
        let result = ProfitabilityCalculator::compute(&opp, dec!(10));

        assert_eq!(result.error, Some(CalcFailure::WithdrawalExhaustsCapital));
        assert_eq!(result.stages.investment_usdt, dec!(10));
        assert_eq!(result.stages.usdt_after_withdrawal, Decimal::ZERO);
        // later stages untouched
        assert_eq!(result.stages.asset_bought_gross, Decimal::ZERO);
    }

    #[test]
    fn test_invalid_buy_price() {
        let opp = opportunity(Decimal::ZERO, dec!(102), dec!(1));
        let result = ProfitabilityCalculator::compute(&opp, dec!(100));
        assert_eq!(result.error, Some(CalcFailure::InvalidPrice));
    }

    #[test]
    fn test_asset_withdrawal_fee_exhausting_position() {
        let mut opp = opportunity(dec!(100), dec!(102), dec!(1));
        opp.asset_withdrawal_fee = dec!(5);
        // 99 USDT buys under 1 unit of asset; a 5-unit transfer fee eats it
        let result = ProfitabilityCalculator::compute(&opp, dec!(100));
        assert_eq!(result.error, Some(CalcFailure::TransferExhaustsAsset));
        assert!(result.stages.asset_bought_net > Decimal::ZERO);
    }

    #[test]
    fn test_missing_withdrawal_fee_defaults_to_zero() {
        let mut opp = opportunity(dec!(100), dec!(102), dec!(0));
        opp.initial_usdt_withdrawal_fee = None;
        let result = ProfitabilityCalculator::compute(&opp, dec!(100));
        assert_eq!(result.error, None);
        assert_eq!(result.stages.usdt_after_withdrawal, dec!(100));
    }
}
