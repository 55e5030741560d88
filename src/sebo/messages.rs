//! Wire types for the Sebo balance service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{
    BalanceConfig, InvestmentMode, Opportunity, WithdrawalQuote,
};

/// Balance document as stored by Sebo.
///
/// The Mongo bookkeeping fields (`_id`, `__v`) are accepted on read and
/// always stripped before a PUT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceDocument {
    #[serde(rename = "_id", default, skip_serializing)]
    pub mongo_id: Option<String>,
    #[serde(rename = "__v", default, skip_serializing)]
    pub mongo_version: Option<i64>,
    pub id_exchange: String,
    #[serde(default)]
    pub balance_usdt: Decimal,
    #[serde(default)]
    pub investment_mode: InvestmentMode,
    #[serde(default = "default_fixed_investment")]
    pub fixed_investment_usdt: Decimal,
    #[serde(default = "default_investment_percentage")]
    pub investment_percentage: Decimal,
    #[serde(default = "default_stop_loss_percentage")]
    pub stop_loss_percentage_operation: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit_percentage_operation: Option<Decimal>,
    #[serde(default = "default_stop_loss_percentage")]
    pub stop_loss_percentage_global: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_capital_for_global_sl: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

fn default_fixed_investment() -> Decimal {
    Decimal::from(50)
}

fn default_investment_percentage() -> Decimal {
    Decimal::from(10)
}

fn default_stop_loss_percentage() -> Decimal {
    Decimal::from(50)
}

impl BalanceDocument {
    /// Zero-balance document for an exchange Sebo does not know yet
    pub fn empty(exchange_id: impl Into<String>) -> Self {
        Self::from_config(&BalanceConfig::empty(exchange_id))
    }

    /// Build an upsert payload from a domain config, stamped now
    pub fn from_config(config: &BalanceConfig) -> Self {
        Self {
            mongo_id: None,
            mongo_version: None,
            id_exchange: config.exchange_id.clone(),
            balance_usdt: config.balance_usdt,
            investment_mode: config.investment_mode,
            fixed_investment_usdt: config.fixed_investment_usdt,
            investment_percentage: config.investment_percentage,
            stop_loss_percentage_operation: config.stop_loss_percent_operation,
            take_profit_percentage_operation: config.take_profit_percent_operation,
            stop_loss_percentage_global: config.stop_loss_percent_global,
            initial_capital_for_global_sl: config.initial_capital_for_global_sl,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn into_config(self) -> BalanceConfig {
        BalanceConfig {
            exchange_id: self.id_exchange,
            balance_usdt: self.balance_usdt,
            investment_mode: self.investment_mode,
            fixed_investment_usdt: self.fixed_investment_usdt,
            investment_percentage: self.investment_percentage,
            stop_loss_percent_operation: self.stop_loss_percentage_operation,
            take_profit_percent_operation: self.take_profit_percentage_operation,
            stop_loss_percent_global: self.stop_loss_percentage_global,
            initial_capital_for_global_sl: self.initial_capital_for_global_sl,
        }
    }
}

/// One transfer network in a withdrawal-fees response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub network: String,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub withdraw: bool,
}

/// Withdrawal-fee listing for one currency on one exchange
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WithdrawalFeesResponse {
    #[serde(default)]
    pub networks: Vec<NetworkInfo>,
}

impl WithdrawalFeesResponse {
    /// Cheapest network that is active and allows withdrawals
    pub fn cheapest_quote(&self) -> Option<WithdrawalQuote> {
        self.networks
            .iter()
            .filter(|net| net.active && net.withdraw)
            .filter_map(|net| {
                net.fee.map(|fee| WithdrawalQuote {
                    network: net.network.clone(),
                    fee_usdt: fee,
                })
            })
            .min_by(|a, b| a.fee_usdt.cmp(&b.fee_usdt))
    }
}

/// Per-exchange fee block inside a ranked opportunity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeFees {
    #[serde(default)]
    pub taker_fee: Option<Decimal>,
    #[serde(default)]
    pub maker_fee: Option<Decimal>,
    #[serde(default)]
    pub withdrawal_fee_asset: Option<Decimal>,
    #[serde(default)]
    pub withdrawal_network: Option<String>,
}

/// Ranked opportunity as published by Sebo's analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityDocument {
    pub symbol: String,
    #[serde(default)]
    pub symbol_name: Option<String>,
    #[serde(default)]
    pub analysis_id: Option<String>,
    pub exchange_min_id: String,
    pub exchange_max_id: String,
    #[serde(rename = "price_at_exMin_to_buy_asset", default)]
    pub price_at_ex_min: Option<Decimal>,
    #[serde(rename = "price_at_exMax_to_sell_asset", default)]
    pub price_at_ex_max: Option<Decimal>,
    #[serde(rename = "fees_exMin", default)]
    pub fees_ex_min: ExchangeFees,
    #[serde(rename = "fees_exMax", default)]
    pub fees_ex_max: ExchangeFees,
    /// Formatted as "1.23%" upstream
    #[serde(default)]
    pub percentage_difference: Option<String>,
    #[serde(rename = "fetch_timestamp_sebo", default)]
    pub fetch_timestamp: Option<DateTime<Utc>>,
}

impl OpportunityDocument {
    /// Convert to the domain type; `None` when prices are missing or
    /// unusable.
    pub fn into_opportunity(self) -> Option<Opportunity> {
        let buy_price = self.price_at_ex_min?;
        let sell_price = self.price_at_ex_max?;
        if buy_price <= Decimal::ZERO || sell_price <= Decimal::ZERO {
            return None;
        }

        let symbol_name = self.symbol_name.unwrap_or_else(|| {
            self.symbol
                .split('/')
                .next()
                .unwrap_or(self.symbol.as_str())
                .to_string()
        });
        let gross_percent_diff = self
            .percentage_difference
            .as_deref()
            .and_then(parse_percentage)
            .unwrap_or_else(|| (sell_price - buy_price) / buy_price * Decimal::from(100));

        Some(Opportunity {
            symbol: self.symbol,
            symbol_name,
            buy_exchange_id: self.exchange_min_id,
            sell_exchange_id: self.exchange_max_id,
            buy_price,
            sell_price,
            taker_fee_buy: self.fees_ex_min.taker_fee.unwrap_or(Decimal::ZERO),
            taker_fee_sell: self.fees_ex_max.taker_fee.unwrap_or(Decimal::ZERO),
            asset_withdrawal_fee: self
                .fees_ex_min
                .withdrawal_fee_asset
                .unwrap_or(Decimal::ZERO),
            asset_withdrawal_network: self.fees_ex_min.withdrawal_network,
            initial_usdt_withdrawal_fee: None,
            gross_percent_diff,
            analysis_id: self.analysis_id,
            fetched_at: self.fetch_timestamp.unwrap_or_else(Utc::now),
        })
    }
}

fn parse_percentage(raw: &str) -> Option<Decimal> {
    raw.trim().trim_end_matches('%').trim().parse().ok()
}
