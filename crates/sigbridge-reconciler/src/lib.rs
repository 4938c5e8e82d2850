//! Signal reconciliation for sigbridge.
//!
//! Turns a BUY/SELL signal plus the position currently held at the exchange
//! into the order sequence that leaves the account on the signalled side.
//!
//! # Key Components
//!
//! - [`plan`]: the decision table (current side × signal → action)
//! - [`order_quantity`]: USDT notional → contract quantity
//! - [`Reconciler`]: executes a plan through the gateway, one signal at a
//!   time per symbol
//! - [`ReconcileOutcome`]: what happened, reported back to the webhook

pub mod config;
pub mod error;
pub mod plan;
pub mod reconciler;
pub mod sizing;

pub use config::{
    PositionQueryPolicy, ReconcilerConfig, DEFAULT_SETTLEMENT_DELAY, DEFAULT_SIZE_DECIMALS,
};
pub use error::{ReconcileError, ReconcileResult, Stage};
pub use plan::{plan, Plan};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use sizing::order_quantity;
