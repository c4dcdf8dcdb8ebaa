//! Two-bucket 50/50 rebalance planning
//!
//! The planner looks at the quote valuation of two buckets and proposes at
//! most one conversion per invocation, moving free stablecoin from the
//! overweight side toward the other. It never schedules a sale of a held
//! position — only balances that are already free may move. That constraint
//! is deliberate and asserted in tests, not an accident of implementation.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Quote-currency valuation of both buckets plus the free stablecoin on
/// each side. Recomputed from live balances on every check, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub bucket_a_value: f64,
    pub bucket_b_value: f64,
    pub free_a: f64,
    pub free_b: f64,
}

impl PortfolioSnapshot {
    pub fn total(&self) -> f64 {
        self.bucket_a_value + self.bucket_b_value
    }
}

/// Which side of the split a conversion originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    A,
    B,
}

impl Bucket {
    pub fn other(&self) -> Bucket {
        match self {
            Bucket::A => Bucket::B,
            Bucket::B => Bucket::A,
        }
    }
}

/// Why the planner declined to act
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// Imbalance within tolerance, nothing to do
    AlreadyBalanced,
    /// Overweight side has no free funds to move
    NoFreeFunds,
    /// Movable amount fell under the configured minimum conversion
    BelowMinimum,
}

/// One planning outcome: a single conversion, or a reasoned no-op
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RebalanceAction {
    Convert {
        from: Bucket,
        to: Bucket,
        /// Quote-currency amount to convert
        amount: f64,
        /// Free funds covered only part of the imbalance; the residual
        /// waits for the next invocation
        partial: bool,
    },
    NoOp { reason: NoOpReason },
}

impl RebalanceAction {
    pub fn is_noop(&self) -> bool {
        matches!(self, RebalanceAction::NoOp { .. })
    }
}

/// Operational guard rails applied after the core min(free, excess) math
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceLimits {
    /// Conversions smaller than this are dropped as BelowMinimum
    pub min_conversion: f64,
    /// Per-invocation cap; capped conversions are marked partial
    pub max_conversion: f64,
    /// Free funds kept untouched on the overweight side
    pub reserve_floor: f64,
    /// Imbalance below this fraction of the portfolio counts as balanced
    pub tolerance: f64,
}

impl Default for RebalanceLimits {
    fn default() -> Self {
        RebalanceLimits {
            min_conversion: 0.0,
            max_conversion: f64::INFINITY,
            reserve_floor: 0.0,
            tolerance: 0.0,
        }
    }
}

/// Decide at most one conversion that moves the split toward 50/50.
pub fn plan(snapshot: &PortfolioSnapshot, limits: &RebalanceLimits) -> RebalanceAction {
    let total = snapshot.total();
    if total <= 0.0 {
        return RebalanceAction::NoOp {
            reason: NoOpReason::AlreadyBalanced,
        };
    }

    let target = total / 2.0;
    let (from, excess, free) = if snapshot.bucket_a_value > target {
        (Bucket::A, snapshot.bucket_a_value - target, snapshot.free_a)
    } else {
        (Bucket::B, snapshot.bucket_b_value - target, snapshot.free_b)
    };

    if excess <= target * limits.tolerance || excess <= 0.0 {
        debug!(excess, target, "buckets within tolerance");
        return RebalanceAction::NoOp {
            reason: NoOpReason::AlreadyBalanced,
        };
    }

    let movable = (free - limits.reserve_floor).max(0.0);
    if movable <= 0.0 {
        debug!(?from, excess, free, "imbalance present but no free funds");
        return RebalanceAction::NoOp {
            reason: NoOpReason::NoFreeFunds,
        };
    }

    let uncapped = movable.min(excess);
    let amount = uncapped.min(limits.max_conversion);
    if amount < limits.min_conversion {
        debug!(amount, min = limits.min_conversion, "conversion below minimum");
        return RebalanceAction::NoOp {
            reason: NoOpReason::BelowMinimum,
        };
    }

    let partial = amount < excess;
    info!(
        ?from,
        amount,
        excess,
        partial,
        "planned conversion toward 50/50"
    );
    RebalanceAction::Convert {
        from,
        to: from.other(),
        amount,
        partial,
    }
}
