//! Gateway error types.

use std::time::Duration;

use sigbridge_core::{OrderSide, Size, Symbol};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Price or position query failed.
    #[error("Market data error for {symbol}: {reason}")]
    MarketData { symbol: Symbol, reason: String },

    /// Exchange rejected or failed to confirm an order.
    #[error("Order error: {side} {quantity} {symbol} (reduce_only={reduce_only}): {reason}")]
    Order {
        symbol: Symbol,
        side: OrderSide,
        quantity: Size,
        reduce_only: bool,
        reason: String,
    },

    #[error("{op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("Exchange rejected request: code={code} msg={msg}")]
    Rejected { code: String, msg: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Authentication setup failed: {0}")]
    Auth(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
