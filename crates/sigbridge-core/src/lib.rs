//! Core domain types for the sigbridge trading bridge.
//!
//! This crate provides the vocabulary shared by the gateway, the reconciler
//! and the webhook layer:
//! - `Symbol`: the perpetual contract being traded
//! - `Price`, `Size`: precision-safe numeric types
//! - `Position`, `PositionSide`: exchange position snapshot
//! - `Signal`: normalized BUY/SELL webhook signal
//! - `OrderRequest`, `OrderResult`: what the reconciler asks the gateway to do

pub mod decimal;
pub mod error;
pub mod order;
pub mod position;
pub mod signal;
pub mod symbol;

pub use decimal::{Price, Size, SizeRounding};
pub use error::{CoreError, Result};
pub use order::{ClientOrderId, MarginMode, OrderRequest, OrderResult, OrderSide};
pub use position::{Position, PositionSide};
pub use signal::Signal;
pub use symbol::Symbol;
