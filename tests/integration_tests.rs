//! Integration tests for the anti-hype trading system
//!
//! These tests verify that the components work together correctly: verdicts
//! flowing into order sizing, trade history into position reports, and
//! portfolio snapshots into rebalance actions.

use approx::assert_relative_eq;
use async_trait::async_trait;

use hypeguard::filter::{AntiHypeFilter, FilterParams, MarketData, ReasonCode};
use hypeguard::rebalance::{self, Bucket, PortfolioSnapshot, RebalanceAction, RebalanceLimits};
use hypeguard::{accountant, indicators, sizing};
use hypeguard::{Candle, Symbol, SymbolRules, TradeRecord};

// =============================================================================
// Test Utilities
// =============================================================================

/// Generate mock candle data with a deterministic price walk
fn generate_mock_candles(count: usize, base_price: f64, volatility: f64) -> Vec<Candle> {
    let mut candles = Vec::with_capacity(count);
    let mut price = base_price;

    for i in 0..count {
        let change = if i % 3 == 0 {
            volatility
        } else if i % 3 == 1 {
            -volatility * 0.5
        } else {
            volatility * 0.3
        };

        price += change;
        candles.push(Candle {
            open_time: i as i64 * 3_600_000,
            open: price - change * 0.3,
            high: price + volatility * 0.5,
            low: price - volatility * 0.5,
            close: price,
            volume: 1000.0 + (i as f64 * 10.0),
        });
    }

    candles
}

fn trade(is_buyer: bool, qty: f64, price: f64, time_ms: i64) -> TradeRecord {
    TradeRecord {
        symbol: Symbol::new("BTCUSDC"),
        order_id: format!("o{time_ms}"),
        price,
        qty,
        quote_qty: qty * price,
        commission: 0.0,
        commission_asset: "USDC".to_string(),
        time_ms,
        is_buyer,
    }
}

/// Canned market data for filter tests
struct FixedMarket {
    candles: Vec<Candle>,
    daily_high: f64,
}

#[async_trait]
impl MarketData for FixedMarket {
    async fn klines(&self, _s: &Symbol, _i: &str, _l: u32) -> anyhow::Result<Vec<Candle>> {
        Ok(self.candles.clone())
    }

    async fn daily_high(&self, _s: &Symbol) -> anyhow::Result<f64> {
        Ok(self.daily_high)
    }
}

// =============================================================================
// Position Accounting
// =============================================================================

#[test]
fn test_single_buy_position() {
    // BUY 1.0 @ 100, price now 110
    let trades = vec![trade(true, 1.0, 100.0, 1)];
    let report = accountant::compute(&trades, 1.0, 110.0);

    assert_relative_eq!(report.avg_cost, 100.0);
    assert_relative_eq!(report.unrealized_pnl, 10.0);
    assert_relative_eq!(report.realized_pnl, 0.0);
}

#[test]
fn test_partial_exit_position() {
    // BUY 2.0 @ 100, SELL 1.0 @ 120, price now 120
    let trades = vec![trade(true, 2.0, 100.0, 1), trade(false, 1.0, 120.0, 2)];
    let report = accountant::compute(&trades, 1.0, 120.0);

    assert_relative_eq!(report.avg_cost, 100.0);
    assert_relative_eq!(report.realized_pnl, 20.0);
    assert_relative_eq!(report.unrealized_pnl, 20.0);
}

#[test]
fn test_accounting_invariants_over_sequences() {
    // Varied sequences, including oversells: quantity and basis never go
    // negative and a flat position always has a zero basis.
    let sequences: Vec<Vec<TradeRecord>> = vec![
        vec![trade(true, 1.0, 100.0, 1), trade(false, 1.0, 90.0, 2)],
        vec![trade(false, 5.0, 100.0, 1)],
        vec![
            trade(true, 0.7, 50.0, 1),
            trade(true, 0.3, 80.0, 2),
            trade(false, 1.5, 70.0, 3),
            trade(true, 0.2, 60.0, 4),
        ],
        vec![
            trade(true, 10.0, 1.0, 3),
            trade(false, 4.0, 2.0, 5),
            trade(false, 6.0, 1.5, 4),
        ],
    ];

    for trades in &sequences {
        let report = accountant::compute(trades, 0.0, 100.0);
        assert!(report.open_quantity >= 0.0);
        assert!(report.avg_cost >= 0.0);
        if report.open_quantity == 0.0 {
            assert_eq!(report.avg_cost, 0.0);
        }
    }
}

// =============================================================================
// Indicators
// =============================================================================

#[test]
fn test_indicator_bounds_on_mock_data() {
    let candles = generate_mock_candles(250, 100.0, 2.0);

    let rsi = indicators::rsi(&candles, 14);
    assert!((0.0..=100.0).contains(&rsi));
    assert!(indicators::atr(&candles, 14) >= 0.0);
    assert!(indicators::ema(&candles, 20) > 0.0);
}

#[test]
fn test_insufficient_rsi_data_is_neutral() {
    // Too few candles for RSI(14)
    let candles = generate_mock_candles(5, 100.0, 1.0);
    assert_eq!(indicators::rsi(&candles, 14), 50.0);
}

// =============================================================================
// Filter
// =============================================================================

#[tokio::test]
async fn test_filter_handles_thin_data_without_error() {
    // Same thin series: the filter must answer, not raise
    let market = FixedMarket {
        candles: generate_mock_candles(5, 100.0, 1.0),
        daily_high: 200.0,
    };
    let filter = AntiHypeFilter::new(market, FilterParams::opportunistic());
    let verdict = filter.check_buy_permission(&Symbol::new("BTCUSDC")).await;

    assert!(verdict.allowed());
    assert!(verdict.multiplier() >= 0.0);
}

#[tokio::test]
async fn test_filter_blocks_at_daily_high() {
    let mut candles = generate_mock_candles(250, 100.0, 1.0);
    let peak = candles.iter().fold(0.0_f64, |acc, c| acc.max(c.high));
    // Pin the last close right at the running high
    let n = candles.len();
    candles[n - 1].close = peak * 0.9995;

    let market = FixedMarket {
        candles,
        daily_high: peak,
    };
    let filter = AntiHypeFilter::new(market, FilterParams::opportunistic());
    let verdict = filter.check_buy_permission(&Symbol::new("BTCUSDC")).await;

    assert!(!verdict.allowed());
    assert_eq!(verdict.reason(), ReasonCode::DailyHighBlock);
    assert_eq!(verdict.multiplier(), 0.0);
}

#[tokio::test]
async fn test_filter_verdict_idempotent_within_ttl() {
    let market = FixedMarket {
        candles: generate_mock_candles(250, 100.0, 1.0),
        daily_high: 500.0,
    };
    let filter = AntiHypeFilter::new(market, FilterParams::opportunistic());
    let symbol = Symbol::new("BTCUSDC");

    let first = filter.check_buy_permission(&symbol).await;
    let second = filter.check_buy_permission(&symbol).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_empty_market_data_is_permissive_fallback() {
    let market = FixedMarket {
        candles: vec![],
        daily_high: 0.0,
    };
    let filter = AntiHypeFilter::new(market, FilterParams::rebalancing());
    let verdict = filter.check_buy_permission(&Symbol::new("BTCUSDC")).await;

    assert!(verdict.allowed());
    assert_eq!(verdict.multiplier(), 1.0);
    assert!(verdict.reason().is_fallback());
}

// =============================================================================
// Rebalancing
// =============================================================================

#[test]
fn test_partial_rebalance_is_labeled_partial() {
    // 700/300 with only 50 free on the heavy side: move 50, flag partial
    let snapshot = PortfolioSnapshot {
        bucket_a_value: 700.0,
        bucket_b_value: 300.0,
        free_a: 50.0,
        free_b: 0.0,
    };
    let action = rebalance::plan(&snapshot, &RebalanceLimits::default());

    match action {
        RebalanceAction::Convert {
            from,
            amount,
            partial,
            ..
        } => {
            assert_eq!(from, Bucket::A);
            assert_relative_eq!(amount, 50.0);
            assert!(partial);
        }
        other => panic!("expected conversion, got {other:?}"),
    }
}

#[test]
fn test_planner_never_exceeds_free_or_imbalance() {
    let cases = [
        (700.0, 300.0, 50.0, 0.0),
        (700.0, 300.0, 5000.0, 0.0),
        (300.0, 700.0, 0.0, 120.0),
        (510.0, 490.0, 1000.0, 1000.0),
    ];

    for (a, b, free_a, free_b) in cases {
        let snapshot = PortfolioSnapshot {
            bucket_a_value: a,
            bucket_b_value: b,
            free_a,
            free_b,
        };
        let excess = (a - b).abs() / 2.0;
        let free = if a > b { free_a } else { free_b };

        if let RebalanceAction::Convert { amount, .. } =
            rebalance::plan(&snapshot, &RebalanceLimits::default())
        {
            assert!(amount <= free.min(excess) + 1e-9);
        }
    }
}

// =============================================================================
// Sizing (and verdict multiplier flowing into it)
// =============================================================================

#[test]
fn test_sized_orders_are_exchange_legal() {
    let rules = SymbolRules {
        min_qty: 0.0001,
        step_size: 0.0001,
        min_notional: 5.0,
        price_precision: 2,
        quantity_precision: 4,
    };

    for notional in [5.0, 8.5, 20.0, 123.0] {
        let qty = sizing::size_buy(notional, 97.31, &rules, 0.1);
        if qty > 0.0 {
            let steps = qty / rules.step_size;
            assert_relative_eq!(steps, steps.round(), epsilon = 1e-6);
            assert!(qty * 97.31 >= rules.min_notional - 1e-9);
        }
    }
}

#[tokio::test]
async fn test_restricted_verdict_shrinks_order() {
    // Price 0.5% below the daily high: allowed, but the multiplier carries
    // the near-high restriction into the sized order.
    let candles: Vec<Candle> = (0..250)
        .map(|i| Candle {
            open_time: i as i64 * 3_600_000,
            open: 99.5,
            high: 99.6,
            low: 99.4,
            close: 99.5,
            volume: 100.0,
        })
        .collect();
    let market = FixedMarket {
        candles,
        daily_high: 100.0,
    };
    let filter = AntiHypeFilter::new(market, FilterParams::opportunistic());
    let verdict = filter.check_buy_permission(&Symbol::new("BTCUSDC")).await;

    assert!(verdict.allowed());
    assert!(verdict.multiplier() < 1.0);

    let rules = SymbolRules {
        min_qty: 0.001,
        step_size: 0.001,
        min_notional: 1.0,
        price_precision: 2,
        quantity_precision: 3,
    };
    let full = sizing::size_buy(20.0, 99.5, &rules, 0.1);
    let restricted = sizing::size_buy(20.0 * verdict.multiplier(), 99.5, &rules, 0.1);
    assert!(restricted > 0.0);
    assert!(restricted < full);
}
