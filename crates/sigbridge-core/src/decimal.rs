//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors when converting a quote-currency notional
//! into a contract quantity.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// How a computed quantity is brought down to the instrument's step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeRounding {
    /// Round to nearest, ties to even.
    #[default]
    Round,
    /// Drop the excess digits (never exceeds the target notional).
    Truncate,
}

impl SizeRounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Self::Round => RoundingStrategy::MidpointNearestEven,
            Self::Truncate => RoundingStrategy::ToZero,
        }
    }
}

/// Size/quantity with exact decimal precision.
///
/// Always expressed in contracts of the underlying. Sign is carried by
/// `PositionSide` / `OrderSide`, never by the size itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Round to a fixed number of decimal places.
    #[inline]
    pub fn round_to_decimals(&self, decimals: u32, rounding: SizeRounding) -> Self {
        Self(self.0.round_dp_with_strategy(decimals, rounding.strategy()))
    }

    /// Convert a quote-currency notional into a quantity at `price`.
    ///
    /// Returns `None` when the price is not strictly positive.
    pub fn from_notional(
        notional: Decimal,
        price: Price,
        decimals: u32,
        rounding: SizeRounding,
    ) -> Option<Self> {
        if !price.is_positive() {
            return None;
        }
        let raw = notional.checked_div(price.0)?;
        Some(Self(raw).round_to_decimals(decimals, rounding))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_notional_basic() {
        let qty = Size::from_notional(
            dec!(50),
            Price::new(dec!(2000)),
            4,
            SizeRounding::Round,
        )
        .unwrap();
        assert_eq!(qty.inner(), dec!(0.0250));
    }

    #[test]
    fn test_from_notional_rounds_to_four_places() {
        // 50 / 3000 = 0.016666...
        let rounded =
            Size::from_notional(dec!(50), Price::new(dec!(3000)), 4, SizeRounding::Round).unwrap();
        assert_eq!(rounded.inner(), dec!(0.0167));

        let truncated =
            Size::from_notional(dec!(50), Price::new(dec!(3000)), 4, SizeRounding::Truncate)
                .unwrap();
        assert_eq!(truncated.inner(), dec!(0.0166));
    }

    #[test]
    fn test_from_notional_rejects_non_positive_price() {
        assert!(Size::from_notional(dec!(50), Price::ZERO, 4, SizeRounding::Round).is_none());
        assert!(
            Size::from_notional(dec!(50), Price::new(dec!(-1)), 4, SizeRounding::Round).is_none()
        );
    }

    #[test]
    fn test_from_notional_can_round_to_zero() {
        // Tiny notional at a high price disappears at 4 decimals.
        let qty = Size::from_notional(
            dec!(1),
            Price::new(dec!(100000)),
            4,
            SizeRounding::Truncate,
        )
        .unwrap();
        assert!(qty.is_zero());
    }

    #[test]
    fn test_size_display_is_normalized() {
        assert_eq!(Size::new(dec!(0.0250)).to_string(), "0.025");
        assert_eq!(Size::new(dec!(1.5000)).to_string(), "1.5");
    }

    #[test]
    fn test_size_rounding_deserialize() {
        let r: SizeRounding = serde_json::from_str("\"truncate\"").unwrap();
        assert_eq!(r, SizeRounding::Truncate);
    }
}
