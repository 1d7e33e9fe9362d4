//! Exact decimal price and quantity types.
//!
//! Quotes, order quantities and balance checks are all computed in
//! `rust_decimal`; nothing is converted through floats.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Round `value` to `dp` decimal places (banker's rounding) and render it
/// with exactly `dp` digits after the point, e.g. `100` → `"100.00"`.
fn to_fixed(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp(dp);
    rounded.rescale(dp);
    rounded.to_string()
}

/// Exchange precision for one trading pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    /// Decimal places of a limit price (2 for `BTC/USDC`).
    pub price_decimals: u32,
    /// Decimal places of an order quantity (6 for `BTC/USDC`).
    pub size_decimals: u32,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            price_decimals: 2,
            size_decimals: 6,
        }
    }
}

/// Limit price in quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    /// Placeholder price carried by market orders.
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }

    /// Round to `decimals` places, half to even.
    pub fn round_dp(&self, decimals: u32) -> Self {
        Self(self.0.round_dp(decimals))
    }

    /// Wire representation with exactly `decimals` fractional digits.
    pub fn to_fixed(&self, decimals: u32) -> String {
        to_fixed(self.0, decimals)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order quantity in base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }

    pub fn round_dp(&self, decimals: u32) -> Self {
        Self(self.0.round_dp(decimals))
    }

    pub fn to_fixed(&self, decimals: u32) -> String {
        to_fixed(self.0, decimals)
    }

    /// Quote-currency cost of this quantity at `price`.
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_to_fixed_pads_zeros() {
        assert_eq!(Price::new(dec!(100)).to_fixed(2), "100.00");
        assert_eq!(Price::new(dec!(100.899)).to_fixed(2), "100.90");
        assert_eq!(Price::new(dec!(101.101)).to_fixed(2), "101.10");
    }

    #[test]
    fn test_price_round_is_bankers() {
        assert_eq!(Price::new(dec!(0.125)).round_dp(2).inner(), dec!(0.12));
        assert_eq!(Price::new(dec!(0.135)).round_dp(2).inner(), dec!(0.14));
    }

    #[test]
    fn test_size_to_fixed() {
        assert_eq!(Size::new(dec!(0.001)).to_fixed(6), "0.001000");
        assert_eq!(Size::new(dec!(0.0123456789)).to_fixed(6), "0.012346");
    }

    #[test]
    fn test_notional_calculation() {
        let size = Size::new(dec!(0.01));
        let price = Price::new(dec!(100));

        assert_eq!(size.notional(price), dec!(1.00));
    }

    #[test]
    fn test_default_precision() {
        let precision = Precision::default();
        assert_eq!(precision.price_decimals, 2);
        assert_eq!(precision.size_decimals, 6);
    }
}
