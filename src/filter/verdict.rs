//! Buy-permission verdicts
//!
//! Tagged result type for the filter: a verdict is either a hard block, an
//! allowed buy with a reduced size multiplier, or a plain allowed buy. The
//! reason code travels with every verdict so reporting can explain a
//! decision without re-deriving it.

use serde::{Deserialize, Serialize};

/// Why the filter decided what it decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Price essentially at the 24h high
    DailyHighBlock,
    /// Price near the lookback high (rebalancing set)
    HistoricalHighBlock,
    /// Price near a short-lookback high, size reduced (rebalancing set)
    RecentHighRestricted,
    /// Current bar volume far above trailing average (rebalancing set)
    VolumeHypeBlock,
    /// Price moved further than volatility explains
    ImpulseBlock,
    /// RSI overbought and price stretched above EMA20
    OverboughtBlock,
    /// Price below the long EMA
    BearTrendBlock,
    /// Genuine dip: boosted size
    DcaBoost,
    /// RSI below the neutral threshold
    NormalBuy,
    /// Neutral RSI zone, mildly reduced size
    NeutralZone,
    /// Candle data missing, permissive fallback
    NoData,
    /// Fetch or compute failed, permissive fallback
    ErrorFallback,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::DailyHighBlock => "daily_high_block",
            ReasonCode::HistoricalHighBlock => "historical_high_block",
            ReasonCode::RecentHighRestricted => "recent_high_restricted",
            ReasonCode::VolumeHypeBlock => "volume_hype_block",
            ReasonCode::ImpulseBlock => "impulse_block",
            ReasonCode::OverboughtBlock => "overbought_block",
            ReasonCode::BearTrendBlock => "bear_trend_block",
            ReasonCode::DcaBoost => "dca_boost",
            ReasonCode::NormalBuy => "normal_buy",
            ReasonCode::NeutralZone => "neutral_zone",
            ReasonCode::NoData => "no_data_fallback",
            ReasonCode::ErrorFallback => "error_fallback",
        }
    }

    /// Fallback verdicts are permissive but must stay distinguishable from a
    /// genuine normal-buy in logs and telemetry.
    pub fn is_fallback(&self) -> bool {
        matches!(self, ReasonCode::NoData | ReasonCode::ErrorFallback)
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price context captured when the daily high was available
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub daily_high: f64,
    pub current_price: f64,
    /// Distance below the daily high, percent of the high
    pub distance_percent: f64,
}

impl PriceSnapshot {
    pub fn new(daily_high: f64, current_price: f64) -> Self {
        let distance_percent = if daily_high > 0.0 {
            (daily_high - current_price) / daily_high * 100.0
        } else {
            0.0
        };
        PriceSnapshot {
            daily_high,
            current_price,
            distance_percent,
        }
    }
}

/// Outcome of one buy-permission evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    /// Buy is blocked outright
    FullBlock {
        reason: ReasonCode,
        snapshot: Option<PriceSnapshot>,
    },
    /// Buy is permitted at a reduced size
    Restricted {
        multiplier: f64,
        reason: ReasonCode,
        snapshot: Option<PriceSnapshot>,
    },
    /// Buy is permitted
    Allowed {
        multiplier: f64,
        reason: ReasonCode,
        snapshot: Option<PriceSnapshot>,
    },
}

impl Verdict {
    pub fn allowed(&self) -> bool {
        !matches!(self, Verdict::FullBlock { .. })
    }

    /// Position-size multiplier; 0.0 for blocks
    pub fn multiplier(&self) -> f64 {
        match self {
            Verdict::FullBlock { .. } => 0.0,
            Verdict::Restricted { multiplier, .. } | Verdict::Allowed { multiplier, .. } => {
                *multiplier
            }
        }
    }

    pub fn reason(&self) -> ReasonCode {
        match self {
            Verdict::FullBlock { reason, .. }
            | Verdict::Restricted { reason, .. }
            | Verdict::Allowed { reason, .. } => *reason,
        }
    }

    pub fn snapshot(&self) -> Option<&PriceSnapshot> {
        match self {
            Verdict::FullBlock { snapshot, .. }
            | Verdict::Restricted { snapshot, .. }
            | Verdict::Allowed { snapshot, .. } => snapshot.as_ref(),
        }
    }

    /// Permissive verdict used when market data cannot be evaluated
    pub fn fallback(reason: ReasonCode) -> Self {
        Verdict::Allowed {
            multiplier: 1.0,
            reason,
            snapshot: None,
        }
    }
}
