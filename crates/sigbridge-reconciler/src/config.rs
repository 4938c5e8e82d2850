//! Reconciler configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sigbridge_core::{SizeRounding, Symbol};

/// Pause between a close and the following open.
pub const DEFAULT_SETTLEMENT_DELAY: Duration = Duration::from_millis(500);

/// Decimal places of an order quantity.
pub const DEFAULT_SIZE_DECIMALS: u32 = 4;

/// What to do when the position query fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionQueryPolicy {
    /// Log the failure and reconcile as if FLAT.
    ///
    /// An existing position may be missed, so a needed close can be skipped.
    #[default]
    FailFlat,
    /// Abort the reconciliation without submitting orders.
    Abort,
}

/// Parameters of one reconciler, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    pub symbol: Symbol,
    /// Target notional of a new position, in USDT.
    pub position_size_usdt: Decimal,
    pub size_decimals: u32,
    pub size_rounding: SizeRounding,
    pub settlement_delay: Duration,
    pub position_policy: PositionQueryPolicy,
}

impl ReconcilerConfig {
    /// Defaults: 50 USDT, 4 decimals, rounded, 500 ms settlement, fail-flat.
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            position_size_usdt: Decimal::from(50),
            size_decimals: DEFAULT_SIZE_DECIMALS,
            size_rounding: SizeRounding::default(),
            settlement_delay: DEFAULT_SETTLEMENT_DELAY,
            position_policy: PositionQueryPolicy::default(),
        }
    }
}
