//! Exchange position snapshot.
//!
//! A `Position` is never owned by the bridge: it is re-read from the
//! exchange on every decision and discarded afterwards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::Size;
use crate::error::{CoreError, Result};
use crate::order::OrderSide;

/// Net direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
    Flat,
}

impl PositionSide {
    /// Side of the reduce-only order that flattens this position.
    pub fn closing_side(&self) -> Option<OrderSide> {
        match self {
            Self::Long => Some(OrderSide::Sell),
            Self::Short => Some(OrderSide::Buy),
            Self::Flat => None,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
            Self::Flat => write!(f, "FLAT"),
        }
    }
}

/// Net position for one symbol.
///
/// Invariant: `size == 0` if and only if `side == Flat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    side: PositionSide,
    size: Size,
}

impl Position {
    /// Create a position, enforcing the side/size invariant.
    pub fn new(side: PositionSide, size: Size) -> Result<Self> {
        if size.inner().is_sign_negative() && !size.is_zero() {
            return Err(CoreError::InvalidPosition(format!(
                "negative size {size}"
            )));
        }
        match (side, size.is_zero()) {
            (PositionSide::Flat, true) => Ok(Self::flat()),
            (PositionSide::Flat, false) => Err(CoreError::InvalidPosition(format!(
                "FLAT with size {size}"
            ))),
            (_, true) => Err(CoreError::InvalidPosition(format!("{side} with zero size"))),
            (_, false) => Ok(Self { side, size }),
        }
    }

    pub fn flat() -> Self {
        Self {
            side: PositionSide::Flat,
            size: Size::ZERO,
        }
    }

    /// Build from a signed net quantity (positive = long, negative = short).
    pub fn from_signed(net: Decimal) -> Self {
        if net.is_zero() {
            Self::flat()
        } else if net.is_sign_positive() {
            Self {
                side: PositionSide::Long,
                size: Size::new(net),
            }
        } else {
            Self {
                side: PositionSide::Short,
                size: Size::new(net.abs()),
            }
        }
    }

    pub fn side(&self) -> PositionSide {
        self.side
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_flat(&self) -> bool {
        self.side == PositionSide::Flat
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::flat()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.side, self.size)
    }
}
