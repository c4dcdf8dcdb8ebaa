//! Average-cost position accounting from raw trade history
//!
//! Rebuilds one position per (base, quote) pair by folding the full trade
//! list every call. Stateless by design: nothing is persisted or mutated
//! incrementally, so a bad cache can never corrupt the cost basis.

use tracing::{debug, warn};

use crate::types::{PositionReport, TradeRecord};

/// Open quantities below this are snapped to exactly zero after a sell so
/// float drift cannot leave a phantom dust position with a cost basis.
const FLAT_EPSILON: f64 = 1e-12;

/// Convert a trade's commission into quote currency.
///
/// Fee paid in the quote asset counts directly; fee paid in the base asset
/// is valued at the trade price. Fees in any third asset (e.g. exchange
/// token rebates) are not tracked — a deliberate simplification.
fn commission_in_quote(trade: &TradeRecord, base_asset: &str, quote_asset: &str) -> f64 {
    if trade.commission <= 0.0 {
        return 0.0;
    }
    if trade.commission_asset == quote_asset {
        return trade.commission;
    }
    if trade.commission_asset == base_asset && trade.price > 0.0 {
        return trade.commission * trade.price;
    }
    0.0
}

/// Fold a trade history into an average-cost position report.
///
/// Trades are sorted by execution time internally; callers may pass the
/// exchange response as-is. Malformed trades (non-positive quantity or
/// price) are skipped. Sells against a flat ledger are skipped too — they
/// cannot reduce a position that the visible history never opened.
///
/// `held_quantity` is the balance actually at the exchange; unrealized PnL
/// is computed over `min(held_quantity, ledger open quantity)` so a history
/// gap or manual transfer never inflates the figure.
pub fn compute(
    trades: &[TradeRecord],
    held_quantity: f64,
    current_price: f64,
) -> PositionReport {
    if trades.is_empty() {
        debug!("no trade history, reporting flat position");
        return PositionReport {
            held_quantity,
            ..PositionReport::flat()
        };
    }

    let base_asset = trades[0].symbol.base_asset().to_string();
    let quote_asset = trades[0].symbol.quote_asset().to_string();

    let mut sorted: Vec<&TradeRecord> = trades.iter().collect();
    sorted.sort_by_key(|t| t.time_ms);

    let mut open_qty = 0.0_f64;
    let mut cost_basis = 0.0_f64;
    let mut realized = 0.0_f64;

    for trade in sorted {
        if trade.qty <= 0.0 || trade.price <= 0.0 {
            debug!(
                symbol = %trade.symbol,
                order_id = %trade.order_id,
                "skipping malformed trade"
            );
            continue;
        }

        let fee_q = commission_in_quote(trade, &base_asset, &quote_asset);

        if trade.is_buyer {
            cost_basis += trade.quote_qty + fee_q;
            open_qty += trade.qty;
        } else {
            if open_qty <= 0.0 {
                debug!(
                    symbol = %trade.symbol,
                    order_id = %trade.order_id,
                    "sell against flat ledger, skipping"
                );
                continue;
            }
            let avg = cost_basis / open_qty;
            let revenue = trade.quote_qty - fee_q;
            realized += revenue - avg * trade.qty;
            cost_basis -= avg * trade.qty;
            open_qty -= trade.qty;
            if open_qty < FLAT_EPSILON {
                open_qty = 0.0;
                cost_basis = 0.0;
            }
        }
    }

    let avg_cost = if open_qty > 0.0 { cost_basis / open_qty } else { 0.0 };
    let qty_for_pnl = if open_qty > 0.0 {
        held_quantity.min(open_qty)
    } else {
        0.0
    };
    let unrealized = (current_price - avg_cost) * qty_for_pnl;

    if (held_quantity - open_qty).abs() > FLAT_EPSILON.max(held_quantity * 1e-6) {
        warn!(
            held = held_quantity,
            ledger = open_qty,
            "held balance diverges from trade ledger (dust, transfer, or short history window)"
        );
    }

    PositionReport {
        avg_cost,
        open_quantity: open_qty,
        held_quantity,
        realized_pnl: realized,
        unrealized_pnl: unrealized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;
    use approx::assert_relative_eq;

    fn trade(is_buyer: bool, qty: f64, price: f64, time_ms: i64) -> TradeRecord {
        TradeRecord {
            symbol: Symbol::new("BTCUSDC"),
            order_id: format!("o{}", time_ms),
            price,
            qty,
            quote_qty: qty * price,
            commission: 0.0,
            commission_asset: "USDC".to_string(),
            time_ms,
            is_buyer,
        }
    }

    #[test]
    fn test_single_buy() {
        // Scenario: BUY 1.0 @ 100, price now 110
        let trades = vec![trade(true, 1.0, 100.0, 1)];
        let report = compute(&trades, 1.0, 110.0);

        assert_relative_eq!(report.avg_cost, 100.0);
        assert_relative_eq!(report.unrealized_pnl, 10.0);
        assert_relative_eq!(report.realized_pnl, 0.0);
    }

    #[test]
    fn test_partial_sell_realizes_against_average() {
        // BUY 2.0 @ 100, SELL 1.0 @ 120, price now 120
        let trades = vec![trade(true, 2.0, 100.0, 1), trade(false, 1.0, 120.0, 2)];
        let report = compute(&trades, 1.0, 120.0);

        assert_relative_eq!(report.avg_cost, 100.0);
        assert_relative_eq!(report.realized_pnl, 20.0);
        assert_relative_eq!(report.unrealized_pnl, 20.0);
        assert_relative_eq!(report.open_quantity, 1.0);
    }

    #[test]
    fn test_average_moves_with_second_buy() {
        let trades = vec![trade(true, 1.0, 100.0, 1), trade(true, 1.0, 200.0, 2)];
        let report = compute(&trades, 2.0, 150.0);

        assert_relative_eq!(report.avg_cost, 150.0);
        assert_relative_eq!(report.unrealized_pnl, 0.0);
    }

    #[test]
    fn test_out_of_order_trades_are_sorted() {
        // Sell delivered before the buy that opened the position
        let trades = vec![trade(false, 1.0, 120.0, 2), trade(true, 2.0, 100.0, 1)];
        let report = compute(&trades, 1.0, 120.0);

        assert_relative_eq!(report.realized_pnl, 20.0);
        assert_relative_eq!(report.open_quantity, 1.0);
    }

    #[test]
    fn test_sell_into_flat_ledger_is_skipped() {
        let trades = vec![trade(false, 1.0, 120.0, 1)];
        let report = compute(&trades, 0.0, 120.0);

        assert_eq!(report.realized_pnl, 0.0);
        assert_eq!(report.open_quantity, 0.0);
        assert_eq!(report.avg_cost, 0.0);
    }

    #[test]
    fn test_full_exit_snaps_to_zero() {
        // Quantities chosen so the subtraction leaves float residue
        let trades = vec![trade(true, 0.3, 100.0, 1), trade(false, 0.3, 110.0, 2)];
        let report = compute(&trades, 0.0, 110.0);

        assert_eq!(report.open_quantity, 0.0);
        assert_eq!(report.avg_cost, 0.0);
        assert_relative_eq!(report.realized_pnl, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_commission_in_base_asset() {
        // Fee of 0.001 BTC on a buy at 100 adds 0.1 USDC to the basis
        let mut t = trade(true, 1.0, 100.0, 1);
        t.commission = 0.001;
        t.commission_asset = "BTC".to_string();
        let report = compute(&[t], 1.0, 100.0);

        assert_relative_eq!(report.avg_cost, 100.1);
    }

    #[test]
    fn test_commission_in_third_asset_ignored() {
        let mut t = trade(true, 1.0, 100.0, 1);
        t.commission = 5.0;
        t.commission_asset = "MX".to_string();
        let report = compute(&[t], 1.0, 100.0);

        assert_relative_eq!(report.avg_cost, 100.0);
    }

    #[test]
    fn test_sell_fee_reduces_realized() {
        let buy = trade(true, 1.0, 100.0, 1);
        let mut sell = trade(false, 1.0, 120.0, 2);
        sell.commission = 0.12;
        sell.commission_asset = "USDC".to_string();
        let report = compute(&[buy, sell], 0.0, 120.0);

        assert_relative_eq!(report.realized_pnl, 19.88, epsilon = 1e-9);
    }

    #[test]
    fn test_malformed_trades_skipped() {
        let trades = vec![trade(true, 0.0, 100.0, 1), trade(true, 1.0, 0.0, 2)];
        let report = compute(&trades, 0.0, 100.0);
        assert_eq!(report, PositionReport::flat());
    }

    #[test]
    fn test_unrealized_capped_by_held_balance() {
        // Ledger says 2.0 open, exchange only holds 0.5
        let trades = vec![trade(true, 2.0, 100.0, 1)];
        let report = compute(&trades, 0.5, 110.0);

        assert_relative_eq!(report.unrealized_pnl, 5.0);
        assert_relative_eq!(report.open_quantity, 2.0);
        assert_relative_eq!(report.held_quantity, 0.5);
    }

    #[test]
    fn test_invariants_over_random_sequence() {
        // Mixed sequence keeps basis and quantity non-negative throughout
        let trades = vec![
            trade(true, 1.5, 100.0, 1),
            trade(false, 0.5, 90.0, 2),
            trade(true, 0.25, 120.0, 3),
            trade(false, 2.0, 130.0, 4), // oversell beyond ledger
            trade(true, 0.1, 110.0, 5),
        ];
        let report = compute(&trades, 0.1, 115.0);

        assert!(report.open_quantity >= 0.0);
        assert!(report.avg_cost >= 0.0);
    }
}
