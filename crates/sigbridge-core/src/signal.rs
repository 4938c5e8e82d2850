//! Webhook trading signal.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::order::OrderSide;
use crate::position::PositionSide;

/// Normalized trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
}

impl Signal {
    /// Order direction that enters the signalled position.
    pub fn direction(&self) -> OrderSide {
        match self {
            Self::Buy => OrderSide::Buy,
            Self::Sell => OrderSide::Sell,
        }
    }

    /// Position side the account should hold after this signal.
    pub fn target_side(&self) -> PositionSide {
        match self {
            Self::Buy => PositionSide::Long,
            Self::Sell => PositionSide::Short,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl FromStr for Signal {
    type Err = CoreError;

    /// Trims and upper-cases before matching; anything but BUY/SELL is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            _ => Err(CoreError::UnrecognizedSignal(s.to_string())),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
