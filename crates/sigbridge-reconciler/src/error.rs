//! Reconciliation error types.

use rust_decimal::Decimal;
use serde::Serialize;
use sigbridge_core::Price;
use sigbridge_gateway::GatewayError;
use thiserror::Error;

/// Step of a reconciliation at which it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Signal,
    Position,
    Price,
    Sizing,
    Close,
    Open,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Unrecognized signal: {0:?}")]
    UnrecognizedSignal(String),

    #[error("Position query failed: {0}")]
    Position(#[source] GatewayError),

    #[error("Price query failed: {0}")]
    Price(#[source] GatewayError),

    #[error("Order quantity rounds to zero: {notional} USDT at {price}")]
    ZeroQuantity { notional: Decimal, price: Price },

    #[error("Close failed: {0}")]
    Close(#[source] GatewayError),

    #[error("Open failed: {0}")]
    Open(#[source] GatewayError),
}

impl ReconcileError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::UnrecognizedSignal(_) => Stage::Signal,
            Self::Position(_) => Stage::Position,
            Self::Price(_) => Stage::Price,
            Self::ZeroQuantity { .. } => Stage::Sizing,
            Self::Close(_) => Stage::Close,
            Self::Open(_) => Stage::Open,
        }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
