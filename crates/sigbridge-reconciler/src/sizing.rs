//! USDT notional → contract quantity.

use rust_decimal::Decimal;
use sigbridge_core::{Price, Size, SizeRounding};

use crate::error::{ReconcileError, ReconcileResult};

/// `notional / price`, rounded to `decimals` places.
///
/// Fails when the result is zero, since an empty order cannot be opened.
/// The step size is a configuration value rather than the instrument's
/// exchange-reported lot size.
pub fn order_quantity(
    notional: Decimal,
    price: Price,
    decimals: u32,
    rounding: SizeRounding,
) -> ReconcileResult<Size> {
    match Size::from_notional(notional, price, decimals, rounding) {
        Some(quantity) if quantity.is_positive() => Ok(quantity),
        _ => Err(ReconcileError::ZeroQuantity { notional, price }),
    }
}
