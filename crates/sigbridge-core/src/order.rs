//! Order-related types and identifiers.
//!
//! Provides order side, margin mode, client order IDs and the
//! request/result pair exchanged between reconciler and gateway.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Size;
use crate::symbol::Symbol;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Margin mode for the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    /// Collateral shared across positions.
    #[default]
    Cross,
    /// Collateral dedicated to this position.
    Isolated,
}

impl MarginMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cross => "cross",
            Self::Isolated => "isolated",
        }
    }
}

impl fmt::Display for MarginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client order ID for traceability.
///
/// Every submitted order carries one so exchange-side records can be
/// matched against our logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `sb{timestamp_ms}{uuid_short}`, alphanumeric only and at most
    /// 32 characters (exchange limit).
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid = Uuid::new_v4().simple().to_string();
        Self(format!("sb{ts}{}", &uuid[..12]))
    }

    /// Create from an existing string (for parsing responses).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

/// A single market order to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Size,
    pub reduce_only: bool,
    pub leverage: u32,
    pub margin_mode: MarginMode,
    pub client_order_id: ClientOrderId,
}

impl OrderRequest {
    /// Opening order: never reduce-only.
    pub fn open(
        symbol: Symbol,
        side: OrderSide,
        quantity: Size,
        leverage: u32,
        margin_mode: MarginMode,
    ) -> Self {
        Self {
            symbol,
            side,
            quantity,
            reduce_only: false,
            leverage,
            margin_mode,
            client_order_id: ClientOrderId::new(),
        }
    }

    /// Closing order: always reduce-only.
    pub fn close(
        symbol: Symbol,
        side: OrderSide,
        quantity: Size,
        leverage: u32,
        margin_mode: MarginMode,
    ) -> Self {
        Self {
            reduce_only: true,
            ..Self::open(symbol, side, quantity, leverage, margin_mode)
        }
    }
}

/// Confirmation returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderResult {
    /// Order accepted by the exchange.
    Submitted {
        order_id: String,
        client_order_id: ClientOrderId,
    },
    /// Nothing had to be sent (e.g. closing an empty position).
    NoOp,
}

impl OrderResult {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }

    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::Submitted { order_id, .. } => Some(order_id),
            Self::NoOp => None,
        }
    }
}
