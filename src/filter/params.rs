//! Anti-hype filter parameter sets
//!
//! Two named sets ship with the bot: a stricter one for opportunistic
//! new-asset buys and a looser one for restoring the 50/50 split. Both run
//! the same rule chain; the rebalancing set additionally enables the
//! high-proximity and volume rules. Every threshold is a named field so a
//! config file can override either set without touching code.

use serde::{Deserialize, Serialize};

/// Thresholds for one instance of the anti-hype rule chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Fraction below the 24h high that still counts as "at the high"
    pub daily_high_block_threshold: f64,
    /// Fraction below the 24h high that triggers the size restriction
    pub daily_high_safety_margin: f64,
    /// Size factor carried into allowed outcomes when near the daily high
    pub daily_high_multiplier: f64,

    /// Momentum above `impulse_multiplier * ATR%` blocks the buy
    pub impulse_multiplier: f64,
    /// Momentum below `-dca_multiplier * ATR%` arms the DCA boost
    pub dca_multiplier: f64,
    /// Size multiplier applied when the DCA boost fires
    pub dca_boost: f64,

    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub rsi_neutral: f64,
    /// Stretch above EMA20 required alongside the overbought RSI
    pub ema_deviation: f64,
    /// Price below `ema200 * bear_tolerance` is a bear-trend block
    pub bear_tolerance: f64,
    /// Size multiplier for the neutral RSI zone
    pub neutral_multiplier: f64,

    /// Bars of the 1h series scanned for the lookback high; None disables
    /// the historical-high block
    pub historical_lookback: Option<usize>,
    /// Fraction below the lookback high that still blocks
    pub max_historical_deviation: f64,
    /// Bars of the 1h series scanned for the recent high; None disables
    /// the recent-high restriction
    pub recent_lookback: Option<usize>,
    /// Fraction below the recent high that triggers the restriction
    pub recent_high_threshold: f64,
    /// Size factor applied by the recent-high restriction
    pub recent_high_multiplier: f64,
    /// Volume window for the hype check; None disables it
    pub volume_lookback: Option<usize>,
    /// Current volume above `threshold x` trailing average is a hype block
    pub volume_hype_threshold: f64,

    pub atr_period: usize,
    pub rsi_period: usize,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self::opportunistic()
    }
}

impl FilterParams {
    /// Strict set for opportunistic new-asset buys
    pub fn opportunistic() -> Self {
        FilterParams {
            daily_high_block_threshold: 0.002,
            daily_high_safety_margin: 0.01,
            daily_high_multiplier: 0.5,
            impulse_multiplier: 3.0,
            dca_multiplier: 2.0,
            dca_boost: 2.0,
            rsi_overbought: 65.0,
            rsi_oversold: 45.0,
            rsi_neutral: 55.0,
            ema_deviation: 0.03,
            bear_tolerance: 1.0,
            neutral_multiplier: 0.7,
            historical_lookback: None,
            max_historical_deviation: 0.02,
            recent_lookback: None,
            recent_high_threshold: 0.01,
            recent_high_multiplier: 0.5,
            volume_lookback: None,
            volume_hype_threshold: 3.0,
            atr_period: 14,
            rsi_period: 14,
            ema_fast_period: 20,
            ema_slow_period: 200,
        }
    }

    /// Looser set for restoring an existing 50/50 split. Tolerates more RSI
    /// and a 5% undershoot of EMA200, but adds high-proximity and volume
    /// rules so the rebalancer cannot chase a spike.
    pub fn rebalancing() -> Self {
        FilterParams {
            daily_high_block_threshold: 0.002,
            daily_high_safety_margin: 0.01,
            daily_high_multiplier: 0.5,
            impulse_multiplier: 3.0,
            dca_multiplier: 1.5,
            dca_boost: 1.5,
            rsi_overbought: 70.0,
            rsi_oversold: 35.0,
            rsi_neutral: 55.0,
            ema_deviation: 0.03,
            bear_tolerance: 0.95,
            neutral_multiplier: 0.7,
            historical_lookback: Some(30),
            max_historical_deviation: 0.02,
            recent_lookback: Some(24),
            recent_high_threshold: 0.01,
            recent_high_multiplier: 0.5,
            volume_lookback: Some(20),
            volume_hype_threshold: 3.0,
            atr_period: 14,
            rsi_period: 14,
            ema_fast_period: 20,
            ema_slow_period: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sets_differ_where_expected() {
        let opp = FilterParams::opportunistic();
        let reb = FilterParams::rebalancing();

        assert!(reb.rsi_overbought > opp.rsi_overbought);
        assert!(reb.rsi_oversold < opp.rsi_oversold);
        assert!(reb.bear_tolerance < opp.bear_tolerance);
        assert!(reb.dca_boost < opp.dca_boost);
        assert!(opp.historical_lookback.is_none());
        assert!(reb.historical_lookback.is_some());
    }

    #[test]
    fn test_params_roundtrip_json() {
        let reb = FilterParams::rebalancing();
        let json = serde_json::to_string(&reb).unwrap();
        let back: FilterParams = serde_json::from_str(&json).unwrap();
        assert_eq!(reb, back);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let p: FilterParams = serde_json::from_str(r#"{"rsi_neutral": 60.0}"#).unwrap();
        assert_eq!(p.rsi_neutral, 60.0);
        assert_eq!(p.atr_period, 14);
    }
}
