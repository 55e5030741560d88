//! Feature extraction and the fallback admission gate
//!
//! The classifier seam is pluggable; what lives here is the deterministic
//! heuristic used when no trained model is attached:
//! an opportunity passes iff its gross gap survives the estimated fee drag.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::common::traits::AdmissionClassifier;
use crate::common::types::{BalanceConfig, FeatureVector, Opportunity, Prediction};
use crate::config::types::EngineSettings;

/// Flatten one candidate into the classifier feature space
pub fn extract_features(
    opportunity: &Opportunity,
    investment_usdt: Decimal,
    balance: &BalanceConfig,
) -> FeatureVector {
    let mut features = FeatureVector::new();

    features.insert_number(
        "gross_percent_diff",
        opportunity.gross_percent_diff.to_f64().unwrap_or(0.0),
    );
    features.insert_number("buy_price", opportunity.buy_price.to_f64().unwrap_or(0.0));
    features.insert_number("sell_price", opportunity.sell_price.to_f64().unwrap_or(0.0));
    features.insert_number(
        "taker_fee_buy",
        opportunity.taker_fee_buy.to_f64().unwrap_or(0.0),
    );
    features.insert_number(
        "taker_fee_sell",
        opportunity.taker_fee_sell.to_f64().unwrap_or(0.0),
    );
    features.insert_number(
        "asset_withdrawal_fee",
        opportunity.asset_withdrawal_fee.to_f64().unwrap_or(0.0),
    );
    features.insert_number(
        "initial_usdt_withdrawal_fee",
        opportunity
            .initial_usdt_withdrawal_fee
            .and_then(|fee| fee.to_f64())
            .unwrap_or(0.0),
    );
    features.insert_number("investment_usdt", investment_usdt.to_f64().unwrap_or(0.0));
    features.insert_number("balance_usdt", balance.balance_usdt.to_f64().unwrap_or(0.0));
    features.insert_text("symbol_name", opportunity.symbol_name.clone());
    features.insert_text("buy_exchange_id", opportunity.buy_exchange_id.clone());
    features.insert_text("sell_exchange_id", opportunity.sell_exchange_id.clone());

    features
}

/// Deterministic admission gate used while no model is trained.
///
/// Estimates the percentage drag of both taker legs plus the fixed
/// withdrawal fee relative to the investment, and admits the candidate iff
/// the remaining net gap is positive. Confidence scales against the
/// configured minimum profit percentage.
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    min_profit_percentage: f64,
}

impl HeuristicClassifier {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            min_profit_percentage: settings
                .min_profit_percentage
                .to_f64()
                .unwrap_or(0.6)
                .max(f64::EPSILON),
        }
    }

    fn estimated_net_percent(features: &FeatureVector) -> f64 {
        let gross = features.number("gross_percent_diff").unwrap_or(0.0);
        let fee_buy = features.number("taker_fee_buy").unwrap_or(0.0);
        let fee_sell = features.number("taker_fee_sell").unwrap_or(0.0);
        let withdrawal = features.number("initial_usdt_withdrawal_fee").unwrap_or(0.0);
        let investment = features.number("investment_usdt").unwrap_or(0.0);

        let withdrawal_drag = if investment > 0.0 {
            withdrawal / investment * 100.0
        } else {
            0.0
        };

        gross - (fee_buy + fee_sell) * 100.0 - withdrawal_drag
    }
}

#[async_trait]
impl AdmissionClassifier for HeuristicClassifier {
    async fn predict(&self, features: &FeatureVector) -> Prediction {
        let net_percent = Self::estimated_net_percent(features);
        let should_execute = net_percent > 0.0;
        let confidence = if should_execute {
            (net_percent / self.min_profit_percentage).min(1.0)
        } else {
            0.0
        };

        debug!(net_percent, should_execute, "heuristic admission verdict");
        Prediction {
            should_execute,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn opportunity(gross_percent: Decimal) -> Opportunity {
        Opportunity {
            symbol: "BTC/USDT".to_string(),
            symbol_name: "BTC".to_string(),
            buy_exchange_id: "binance".to_string(),
            sell_exchange_id: "okx".to_string(),
            buy_price: dec!(100),
            sell_price: dec!(100) * (Decimal::ONE + gross_percent / dec!(100)),
            taker_fee_buy: dec!(0.001),
            taker_fee_sell: dec!(0.001),
            asset_withdrawal_fee: Decimal::ZERO,
            asset_withdrawal_network: None,
            initial_usdt_withdrawal_fee: Some(dec!(0.5)),
            gross_percent_diff: gross_percent,
            analysis_id: None,
            fetched_at: Utc::now(),
        }
    }

    fn balance() -> BalanceConfig {
        let mut config = BalanceConfig::empty("binance");
        config.balance_usdt = dec!(500);
        config
    }

    #[test]
    fn test_feature_extraction_covers_fee_inputs() {
        let features = extract_features(&opportunity(dec!(2)), dec!(100), &balance());

        assert_eq!(features.number("gross_percent_diff"), Some(2.0));
        assert_eq!(features.number("taker_fee_buy"), Some(0.001));
        assert_eq!(features.number("initial_usdt_withdrawal_fee"), Some(0.5));
        assert_eq!(features.text("buy_exchange_id"), Some("binance"));
        assert_eq!(features.number("balance_usdt"), Some(500.0));
    }

    #[tokio::test]
    async fn test_wide_gap_is_admitted_with_full_confidence() {
        let classifier = HeuristicClassifier::new(&EngineSettings::default());
        let features = extract_features(&opportunity(dec!(2)), dec!(100), &balance());

        let prediction = classifier.predict(&features).await;
        // 2.0 - 0.2 (taker legs) - 0.5 (withdrawal on 100) = 1.3 > 0.6
        assert!(prediction.should_execute);
        assert_eq!(prediction.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_gap_eaten_by_fees_is_rejected() {
        let classifier = HeuristicClassifier::new(&EngineSettings::default());
        let features = extract_features(&opportunity(dec!(0.3)), dec!(100), &balance());

        let prediction = classifier.predict(&features).await;
        // 0.3 - 0.2 - 0.5 < 0
        assert!(!prediction.should_execute);
        assert_eq!(prediction.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_prediction_is_deterministic() {
        let classifier = HeuristicClassifier::new(&EngineSettings::default());
        let features = extract_features(&opportunity(dec!(1)), dec!(100), &balance());

        let first = classifier.predict(&features).await;
        let second = classifier.predict(&features).await;
        assert_eq!(first, second);
    }
}
