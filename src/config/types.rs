//! Configuration types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Sebo balance-ledger service configuration
    #[serde(default)]
    pub sebo: SeboConfig,
    /// Decision-engine thresholds
    #[serde(default)]
    pub engine: EngineSettings,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sebo: SeboConfig::default(),
            engine: EngineSettings::default(),
            settings: AppSettings::default(),
        }
    }
}

/// Connection settings for the Sebo balance service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeboConfig {
    /// Base URL of the Sebo REST API
    #[serde(default = "default_sebo_api_url")]
    pub api_url: String,
    /// How many ranked opportunities to request per cycle
    #[serde(default = "default_top_opportunity_limit")]
    pub top_opportunity_limit: u32,
}

impl Default for SeboConfig {
    fn default() -> Self {
        Self {
            api_url: default_sebo_api_url(),
            top_opportunity_limit: default_top_opportunity_limit(),
        }
    }
}

fn default_sebo_api_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_top_opportunity_limit() -> u32 {
    20
}

/// Thresholds governing admission, sizing and risk gating.
///
/// Defaults mirror the values the engine has been operated with; every one
/// of them can be overridden from the config file or `APP_`-prefixed
/// environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Exchange holding the USDT capital at startup
    #[serde(default = "default_holder_exchange_id")]
    pub default_holder_exchange_id: String,
    /// Gross percentage gap below which the heuristic gate rejects outright
    #[serde(default = "default_min_profit_percentage")]
    pub min_profit_percentage: Decimal,
    /// Absolute profit floor for committing capital, in USDT
    #[serde(default = "default_min_absolute_profit_usdt")]
    pub min_absolute_profit_usdt: Decimal,
    /// Smallest investment worth executing at all
    #[serde(default = "default_min_operational_usdt")]
    pub min_operational_usdt: Decimal,
    /// Below this balance the whole balance is committed
    #[serde(default = "default_low_balance_threshold_usdt")]
    pub low_balance_threshold_usdt: Decimal,
    /// Investment floor applied when the balance comfortably allows it
    #[serde(default = "default_practical_min_investment_usdt")]
    pub practical_min_investment_usdt: Decimal,
    /// Sizing loop stops once an attempt clears this net profit
    #[serde(default = "default_adjustment_acceptance_threshold_usdt")]
    pub adjustment_acceptance_threshold_usdt: Decimal,
    /// Increment added per sizing attempt
    #[serde(default = "default_investment_step_usdt")]
    pub investment_step_usdt: Decimal,
    /// Extra sizing attempts after the base amount
    #[serde(default = "default_max_adjustment_attempts")]
    pub max_adjustment_attempts: u32,
    /// Hard cap on investment as percent of the holder balance
    #[serde(default = "default_max_investment_percent_of_balance")]
    pub max_investment_percent_of_balance: Decimal,
    /// Settlement-simulation delay before the sell price is re-verified
    #[serde(default = "default_settlement_delay_ms")]
    pub settlement_delay_ms: u64,
    /// Seconds between ranked-batch polls
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_holder_exchange_id: default_holder_exchange_id(),
            min_profit_percentage: default_min_profit_percentage(),
            min_absolute_profit_usdt: default_min_absolute_profit_usdt(),
            min_operational_usdt: default_min_operational_usdt(),
            low_balance_threshold_usdt: default_low_balance_threshold_usdt(),
            practical_min_investment_usdt: default_practical_min_investment_usdt(),
            adjustment_acceptance_threshold_usdt: default_adjustment_acceptance_threshold_usdt(),
            investment_step_usdt: default_investment_step_usdt(),
            max_adjustment_attempts: default_max_adjustment_attempts(),
            max_investment_percent_of_balance: default_max_investment_percent_of_balance(),
            settlement_delay_ms: default_settlement_delay_ms(),
            poll_interval_seconds: default_poll_interval_seconds(),
        }
    }
}

fn default_holder_exchange_id() -> String {
    "binance".to_string()
}

fn default_min_profit_percentage() -> Decimal {
    Decimal::new(6, 1) // 0.6
}

fn default_min_absolute_profit_usdt() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_min_operational_usdt() -> Decimal {
    Decimal::from(10)
}

fn default_low_balance_threshold_usdt() -> Decimal {
    Decimal::from(150)
}

fn default_practical_min_investment_usdt() -> Decimal {
    Decimal::from(50)
}

fn default_adjustment_acceptance_threshold_usdt() -> Decimal {
    Decimal::new(1, 1) // 0.1
}

fn default_investment_step_usdt() -> Decimal {
    Decimal::from(20)
}

fn default_max_adjustment_attempts() -> u32 {
    5
}

fn default_max_investment_percent_of_balance() -> Decimal {
    Decimal::from(90)
}

fn default_settlement_delay_ms() -> u64 {
    50
}

fn default_poll_interval_seconds() -> u64 {
    30
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Path of the append-only operations CSV
    #[serde(default = "default_audit_csv_path")]
    pub audit_csv_path: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            request_timeout_seconds: default_request_timeout(),
            audit_csv_path: default_audit_csv_path(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_audit_csv_path() -> String {
    "logs/operations.csv".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_engine_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.min_absolute_profit_usdt, dec!(0.01));
        assert_eq!(settings.low_balance_threshold_usdt, dec!(150));
        assert_eq!(settings.practical_min_investment_usdt, dec!(50));
        assert_eq!(settings.investment_step_usdt, dec!(20));
        assert_eq!(settings.max_adjustment_attempts, 5);
    }

    #[test]
    fn test_app_config_default_holder() {
        let config = AppConfig::default();
        assert_eq!(config.engine.default_holder_exchange_id, "binance");
        assert_eq!(config.sebo.top_opportunity_limit, 20);
    }
}
