//! Anti-hype buy filter
//!
//! Guards every buy against chasing a spike. The filter pulls 1h and 4h
//! candles plus the 24h high, computes ATR/RSI/EMA signals and walks an
//! ordered rule chain where the first match wins. Data problems never block
//! trading: any fetch or compute failure resolves to a permissive verdict
//! whose reason code stays distinguishable from a genuine normal-buy.

mod cache;
mod params;
mod verdict;

pub use cache::{Clock, SystemClock, TtlCache};
pub use params::FilterParams;
pub use verdict::{PriceSnapshot, ReasonCode, Verdict};

use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::indicators;
use crate::types::{Candle, Symbol};

/// Verdicts are reused for this long per symbol
const VERDICT_TTL: Duration = Duration::from_secs(120);
/// Fetched candle series are reused for this long
const CANDLE_TTL: Duration = Duration::from_secs(300);

/// Low timeframe for RSI / EMA20 and the high-proximity lookbacks
const LOW_TIMEFRAME: &str = "1h";
/// High timeframe for ATR / EMA200 / momentum
const HIGH_TIMEFRAME: &str = "4h";
/// Candles fetched per series
const KLINE_LIMIT: u32 = 100;

/// Market data the filter needs, kept behind a trait so evaluations are
/// testable against canned candles.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Ordered candles, oldest first; may return fewer than `limit`, empty
    /// is a valid answer.
    async fn klines(&self, symbol: &Symbol, interval: &str, limit: u32) -> Result<Vec<Candle>>;

    /// Highest traded price of the last 24 hours
    async fn daily_high(&self, symbol: &Symbol) -> Result<f64>;
}

/// The buy-permission filter. Owns its caches; one instance per parameter
/// set (opportunistic or rebalancing).
pub struct AntiHypeFilter<M> {
    market: M,
    params: FilterParams,
    clock: Box<dyn Clock>,
    candle_cache: Mutex<TtlCache<(Symbol, String), Vec<Candle>>>,
    verdict_cache: Mutex<TtlCache<Symbol, Verdict>>,
}

impl<M: MarketData> AntiHypeFilter<M> {
    pub fn new(market: M, params: FilterParams) -> Self {
        Self::with_clock(market, params, Box::new(SystemClock))
    }

    /// Test seam: inject a controllable clock for TTL expiry
    pub fn with_clock(market: M, params: FilterParams, clock: Box<dyn Clock>) -> Self {
        AntiHypeFilter {
            market,
            params,
            clock,
            candle_cache: Mutex::new(TtlCache::new(CANDLE_TTL)),
            verdict_cache: Mutex::new(TtlCache::new(VERDICT_TTL)),
        }
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    /// Evaluate whether buying `symbol` right now is acceptable.
    ///
    /// Verdicts are cached per symbol for a short TTL; repeated calls inside
    /// the window return the identical verdict without refetching.
    pub async fn check_buy_permission(&self, symbol: &Symbol) -> Verdict {
        let now = self.clock.now();
        if let Some(cached) = self.verdict_cache.lock().unwrap().get(symbol, now) {
            debug!(%symbol, reason = %cached.reason(), "using cached verdict");
            return cached;
        }

        let verdict = match self.evaluate(symbol).await {
            Ok(v) => v,
            Err(e) => {
                warn!(%symbol, error = %e, "filter evaluation failed, permissive fallback");
                Verdict::fallback(ReasonCode::ErrorFallback)
            }
        };

        info!(
            %symbol,
            allowed = verdict.allowed(),
            multiplier = verdict.multiplier(),
            reason = %verdict.reason(),
            "buy permission evaluated"
        );

        self.verdict_cache
            .lock()
            .unwrap()
            .insert(symbol.clone(), verdict.clone(), self.clock.now());
        verdict
    }

    async fn cached_klines(&self, symbol: &Symbol, interval: &str) -> Result<Vec<Candle>> {
        let key = (symbol.clone(), interval.to_string());
        let now = self.clock.now();
        if let Some(candles) = self.candle_cache.lock().unwrap().get(&key, now) {
            return Ok(candles);
        }

        let candles = self.market.klines(symbol, interval, KLINE_LIMIT).await?;
        self.candle_cache
            .lock()
            .unwrap()
            .insert(key, candles.clone(), self.clock.now());
        Ok(candles)
    }

    async fn evaluate(&self, symbol: &Symbol) -> Result<Verdict> {
        let p = &self.params;

        let candles_low = self.cached_klines(symbol, LOW_TIMEFRAME).await?;
        let candles_high = self.cached_klines(symbol, HIGH_TIMEFRAME).await?;

        if candles_low.is_empty() || candles_high.is_empty() {
            warn!(%symbol, "no candle data, permissive fallback");
            return Ok(Verdict::fallback(ReasonCode::NoData));
        }

        let price = candles_low[candles_low.len() - 1].close;
        if price <= 0.0 {
            return Ok(Verdict::fallback(ReasonCode::NoData));
        }

        // 24h high from the ticker, falling back to the tail of the 1h series
        let daily_high = match self.market.daily_high(symbol).await {
            Ok(h) if h > 0.0 => h,
            _ => indicators::highest_high(&candles_low, 24.min(candles_low.len())),
        };
        let snapshot = (daily_high > 0.0).then(|| PriceSnapshot::new(daily_high, price));

        // Rules 1 + 2: proximity to the daily high. Inside the block band the
        // buy dies here; inside the safety margin later allowed outcomes get
        // the daily-high factor applied.
        let mut daily_factor = 1.0;
        if daily_high > 0.0 {
            let distance = (daily_high - price) / daily_high;
            if distance < p.daily_high_block_threshold {
                warn!(%symbol, price, daily_high, "price at the daily high, blocking");
                return Ok(Verdict::FullBlock {
                    reason: ReasonCode::DailyHighBlock,
                    snapshot,
                });
            }
            if distance < p.daily_high_safety_margin {
                debug!(%symbol, distance_pct = distance * 100.0, "near daily high, restricting size");
                daily_factor = p.daily_high_multiplier;
            }
        }

        // Rule 3: lookback high (rebalancing set only)
        if let Some(lookback) = p.historical_lookback {
            let historical_max = indicators::highest_high(&candles_low, lookback);
            if historical_max > 0.0 && price > historical_max * (1.0 - p.max_historical_deviation)
            {
                warn!(%symbol, price, historical_max, "price near lookback high, blocking");
                return Ok(Verdict::FullBlock {
                    reason: ReasonCode::HistoricalHighBlock,
                    snapshot,
                });
            }
        }

        // Rule 4: recent high restriction and volume hype (rebalancing set only)
        if let Some(lookback) = p.recent_lookback {
            let recent_high = indicators::highest_high(&candles_low, lookback);
            if recent_high > 0.0 && price > recent_high * (1.0 - p.recent_high_threshold) {
                return Ok(Verdict::Restricted {
                    multiplier: p.recent_high_multiplier * daily_factor,
                    reason: ReasonCode::RecentHighRestricted,
                    snapshot,
                });
            }
        }
        if let Some(lookback) = p.volume_lookback {
            if indicators::volume_spike(&candles_low, lookback, p.volume_hype_threshold) {
                warn!(%symbol, "volume spike above trailing average, blocking");
                return Ok(Verdict::FullBlock {
                    reason: ReasonCode::VolumeHypeBlock,
                    snapshot,
                });
            }
        }

        let atr = indicators::atr(&candles_high, p.atr_period);
        let rsi = indicators::rsi(&candles_low, p.rsi_period);
        let ema_fast = indicators::ema(&candles_low, p.ema_fast_period);
        let ema_slow = indicators::ema(&candles_high, p.ema_slow_period);
        let momentum = indicators::momentum_htf(&candles_high);
        let atr_percent = atr / price * 100.0;

        debug!(
            %symbol,
            price,
            atr,
            rsi,
            ema_fast,
            ema_slow,
            momentum_pct = momentum,
            "filter inputs"
        );

        // Rule 5: impulse — price moved further than volatility explains
        if momentum > p.impulse_multiplier * atr_percent {
            warn!(%symbol, momentum_pct = momentum, threshold = p.impulse_multiplier * atr_percent,
                "upward impulse beyond ATR budget, blocking");
            return Ok(Verdict::FullBlock {
                reason: ReasonCode::ImpulseBlock,
                snapshot,
            });
        }

        // Rule 6: overbought — hot RSI and price stretched above EMA20
        if rsi > p.rsi_overbought && price > ema_fast * (1.0 + p.ema_deviation) {
            warn!(%symbol, rsi, "overbought and stretched above EMA20, blocking");
            return Ok(Verdict::FullBlock {
                reason: ReasonCode::OverboughtBlock,
                snapshot,
            });
        }

        // Rule 7: bear trend — below the long EMA (with tolerance)
        if ema_slow > 0.0 && price < ema_slow * p.bear_tolerance {
            warn!(%symbol, price, ema_slow, "below long EMA, blocking");
            return Ok(Verdict::FullBlock {
                reason: ReasonCode::BearTrendBlock,
                snapshot,
            });
        }

        // Rule 8: DCA boost — a genuine dip gets extra size
        if momentum < -(p.dca_multiplier * atr_percent) && rsi < p.rsi_oversold {
            info!(%symbol, momentum_pct = momentum, rsi, "dip detected, boosting buy size");
            return Ok(self.allowed(p.dca_boost * daily_factor, ReasonCode::DcaBoost, snapshot));
        }

        // Rule 9: normal buy
        if rsi < p.rsi_neutral {
            return Ok(self.allowed(daily_factor, ReasonCode::NormalBuy, snapshot));
        }

        // Rule 10: neutral zone
        Ok(self.allowed(
            p.neutral_multiplier * daily_factor,
            ReasonCode::NeutralZone,
            snapshot,
        ))
    }

    /// Allowed outcome, downgraded to Restricted when the daily-high factor
    /// shaved the multiplier.
    fn allowed(&self, multiplier: f64, reason: ReasonCode, snapshot: Option<PriceSnapshot>) -> Verdict {
        if multiplier < 1.0 && reason != ReasonCode::NeutralZone {
            Verdict::Restricted {
                multiplier,
                reason,
                snapshot,
            }
        } else {
            Verdict::Allowed {
                multiplier,
                reason,
                snapshot,
            }
        }
    }
}
