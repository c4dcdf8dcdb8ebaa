//! Exchange-legal order sizing
//!
//! Turns a target notional into a quantity the exchange will accept: aligned
//! to the symbol's step size, above its minimum quantity, and (for buys)
//! above the minimum notional. Step arithmetic works in units-of-step with a
//! small epsilon so 0.1-style binary float residue never flips a floor.

use tracing::debug;

use crate::types::SymbolRules;

/// Guards step division against float residue (0.30000000000000004 / 0.1
/// must floor to 3 steps, not 2).
const STEP_EPSILON: f64 = 1e-9;

fn floor_to_step(quantity: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return quantity;
    }
    (quantity / step + STEP_EPSILON).floor() * step
}

fn ceil_to_step(quantity: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return quantity;
    }
    (quantity / step - STEP_EPSILON).ceil() * step
}

/// Quantity for a buy of roughly `target_notional` quote units.
///
/// Floors `target_notional / price` to the step size. If the floored
/// quantity falls under the exchange minimums (quantity or notional) it is
/// rounded up to the smallest legal step multiple instead of being silently
/// dropped; the bump is abandoned (0.0 returned) only when it would
/// overshoot the target notional by more than `tolerance`.
pub fn size_buy(target_notional: f64, price: f64, rules: &SymbolRules, tolerance: f64) -> f64 {
    if target_notional <= 0.0 || price <= 0.0 {
        return 0.0;
    }

    let step = rules.step_size;
    let mut qty = floor_to_step(target_notional / price, step);

    // Smallest step-aligned quantity that satisfies both exchange minimums
    let mut floor_qty = ceil_to_step(rules.min_qty, step);
    if rules.min_notional > 0.0 {
        floor_qty = floor_qty.max(ceil_to_step(rules.min_notional / price, step));
    }

    if qty < floor_qty {
        let bumped_notional = floor_qty * price;
        if bumped_notional > target_notional * (1.0 + tolerance) {
            debug!(
                target_notional,
                bumped_notional, "minimum legal order overshoots target, skipping"
            );
            return 0.0;
        }
        qty = floor_qty;
    }

    qty
}

/// Quantity for a sell out of `free_quantity`.
///
/// Shaves 0.1% off the free balance before flooring so balance drift between
/// the read and the order cannot trigger an insufficient-funds rejection.
pub fn size_sell(free_quantity: f64, rules: &SymbolRules) -> f64 {
    if free_quantity <= 0.0 {
        return 0.0;
    }

    let qty = floor_to_step(free_quantity * 0.999, rules.step_size);
    if qty < rules.min_qty || qty <= 0.0 {
        return 0.0;
    }
    qty
}
