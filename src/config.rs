//! Configuration management
//!
//! JSON config file with environment-variable overrides for secrets. Every
//! section has defaults so a minimal file (or none at all, for public-data
//! commands) is enough to start.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::filter::FilterParams;
use crate::rebalance::RebalanceLimits;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    pub filter: FilterConfig,
    pub rebalance: RebalanceConfig,
    pub monitor: MonitorConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    /// Load configuration from a JSON file; secrets from the environment
    /// take precedence over the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env();
        Ok(config)
    }

    /// Overlay credentials from the environment
    pub fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("MEXC_API_KEY") {
            self.exchange.api_key = Some(api_key);
        }
        if let Ok(api_secret) = std::env::var("MEXC_API_SECRET") {
            self.exchange.api_secret = Some(api_secret);
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            let chat_id = std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default();
            if !chat_id.is_empty() {
                self.telegram = Some(TelegramConfig { bot_token: token, chat_id });
            }
        }
    }

    /// Reject configurations with no safe interpretation. Only called by
    /// commands that trade; read-only commands run without credentials.
    pub fn validate_for_trading(&self) -> Result<()> {
        if self.exchange.api_key.is_none() || self.exchange.api_secret.is_none() {
            bail!("MEXC API credentials are required (config file or MEXC_API_KEY / MEXC_API_SECRET)");
        }
        if self.trading.symbols.is_empty() {
            bail!("trading.symbols must not be empty");
        }
        if self.trading.buy_notional <= 0.0 {
            bail!("trading.buy_notional must be positive");
        }
        if self.rebalance.enabled && self.rebalance.asset_a == self.rebalance.asset_b {
            bail!("rebalance buckets must name two different assets");
        }
        Ok(())
    }
}

/// Exchange credentials and endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    /// Override for test servers; empty means the production endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// What to trade and how much per buy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Symbols the monitors sweep (e.g. "BTCUSDC")
    pub symbols: Vec<String>,
    /// Quote units per unrestricted buy, before the verdict multiplier
    pub buy_notional: f64,
    /// Accepted overshoot when an order is bumped to exchange minimums
    pub sizing_tolerance: f64,
    /// Trades pulled per symbol when rebuilding a position
    pub trade_history_limit: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            symbols: vec!["BTCUSDC".to_string()],
            buy_notional: 20.0,
            sizing_tolerance: 0.1,
            trade_history_limit: 500,
        }
    }
}

/// Both anti-hype parameter sets, individually overridable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub opportunistic: FilterParams,
    pub rebalancing: FilterParams,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            opportunistic: FilterParams::opportunistic(),
            rebalancing: FilterParams::rebalancing(),
        }
    }
}

/// 50/50 bucket definition and guard rails
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    pub enabled: bool,
    /// First bucket asset (valued in the quote currency)
    pub asset_a: String,
    /// Second bucket asset
    pub asset_b: String,
    pub limits: RebalanceLimits,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        RebalanceConfig {
            enabled: false,
            asset_a: "BTC".to_string(),
            asset_b: "USDC".to_string(),
            limits: RebalanceLimits {
                min_conversion: 5.0,
                max_conversion: 100.0,
                reserve_floor: 20.0,
                tolerance: 0.02,
            },
        }
    }
}

/// Sweep intervals for the long-running mode, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub filter_interval_secs: u64,
    pub pnl_interval_secs: u64,
    pub rebalance_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            filter_interval_secs: 300,
            pnl_interval_secs: 600,
            rebalance_interval_secs: 900,
        }
    }
}

/// Telegram delivery target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.trading.buy_notional, 20.0);
        assert_eq!(config.monitor.filter_interval_secs, 300);
        assert!(!config.rebalance.enabled);
        assert_eq!(config.filter.opportunistic.rsi_overbought, 65.0);
        assert_eq!(config.filter.rebalancing.rsi_overbought, 70.0);
    }

    #[test]
    fn test_partial_filter_override() {
        let config: Config = serde_json::from_str(
            r#"{"filter": {"rebalancing": {"rsi_overbought": 75.0}}}"#,
        )
        .unwrap();
        assert_eq!(config.filter.rebalancing.rsi_overbought, 75.0);
        // Untouched fields fall back to defaults
        assert_eq!(config.filter.rebalancing.atr_period, 14);
        assert_eq!(config.filter.opportunistic.rsi_overbought, 65.0);
    }

    #[test]
    fn test_trading_validation_requires_credentials() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.validate_for_trading().is_err());

        let config: Config = serde_json::from_str(
            r#"{"exchange": {"api_key": "k", "api_secret": "s"}}"#,
        )
        .unwrap();
        assert!(config.validate_for_trading().is_ok());
    }

    #[test]
    fn test_same_bucket_assets_rejected() {
        let config: Config = serde_json::from_str(
            r#"{"exchange": {"api_key": "k", "api_secret": "s"},
                "rebalance": {"enabled": true, "asset_a": "BTC", "asset_b": "BTC"}}"#,
        )
        .unwrap();
        assert!(config.validate_for_trading().is_err());
    }
}
