//! Technical indicators for the anti-hype filter
//!
//! All functions are pure over a candle slice and use plain window averages,
//! not Wilder smoothing. The insufficient-data fallbacks are part of the
//! contract: ATR and EMA return 0.0 ("unknown", not "zero volatility"), RSI
//! returns a neutral 50.0. Callers pick the timeframe; the usual split is
//! 1h for RSI/EMA20 and 4h for ATR/EMA200.

use crate::types::Candle;

/// Average True Range over the last `period` bars.
///
/// Needs `period + 1` candles (the previous close seeds the first true
/// range); returns 0.0 otherwise.
pub fn atr(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period + 1 {
        return 0.0;
    }

    let window = &candles[candles.len() - period - 1..];
    let mut sum = 0.0;
    for i in 1..window.len() {
        let prev_close = window[i - 1].close;
        let hl = window[i].high - window[i].low;
        let hc = (window[i].high - prev_close).abs();
        let lc = (window[i].low - prev_close).abs();
        sum += hl.max(hc).max(lc);
    }

    sum / period as f64
}

/// Relative Strength Index over the last `period` close-to-close changes.
///
/// Simple gain/loss averages over the window. Returns the neutral 50.0 when
/// there are not enough candles and 100.0 when the window has no losses.
pub fn rsi(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period + 1 {
        return 50.0;
    }

    let window = &candles[candles.len() - period - 1..];
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    let deltas = window.len() - 1;

    for i in 1..window.len() {
        let change = window[i].close - window[i - 1].close;
        if change > 0.0 {
            gain_sum += change;
        } else {
            loss_sum += change.abs();
        }
    }

    let avg_gain = gain_sum / deltas as f64;
    let avg_loss = loss_sum / deltas as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Exponential Moving Average over the last `period` closes.
///
/// Seeded with the first close of the window, multiplier `2 / (period + 1)`.
/// Returns 0.0 with fewer than `period` candles.
pub fn ema(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period {
        return 0.0;
    }

    let window = &candles[candles.len() - period..];
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut value = window[0].close;

    for candle in &window[1..] {
        value = candle.close * multiplier + value * (1.0 - multiplier);
    }

    value
}

/// Percent change between the last two closes of a high-timeframe series.
///
/// On a 4h series this is "how far did price move over the last bar", the
/// momentum input of the impulse and DCA rules. 0.0 with fewer than 2 bars.
pub fn momentum_htf(candles: &[Candle]) -> f64 {
    if candles.len() < 2 {
        return 0.0;
    }

    let current = candles[candles.len() - 1].close;
    let previous = candles[candles.len() - 2].close;
    if previous == 0.0 {
        return 0.0;
    }

    (current - previous) / previous * 100.0
}

/// Highest high over the last `lookback` bars; 0.0 when the series is
/// shorter than the lookback (treated as "no reference high").
pub fn highest_high(candles: &[Candle], lookback: usize) -> f64 {
    if lookback == 0 || candles.len() < lookback {
        return 0.0;
    }

    candles[candles.len() - lookback..]
        .iter()
        .fold(0.0_f64, |acc, c| acc.max(c.high))
}

/// Whether the last bar's volume exceeds `threshold` times the average of
/// the preceding `period - 1` bars.
pub fn volume_spike(candles: &[Candle], period: usize, threshold: f64) -> bool {
    if period < 2 || candles.len() < period {
        return false;
    }

    let window = &candles[candles.len() - period..];
    let current = window[window.len() - 1].volume;
    let prior = &window[..window.len() - 1];
    let avg = prior.iter().map(|c| c.volume).sum::<f64>() / prior.len() as f64;

    if avg <= 0.0 {
        return false;
    }

    current > avg * threshold
}
