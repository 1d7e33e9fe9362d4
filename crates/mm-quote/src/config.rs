//! Quote configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{QuoteError, QuoteResult};

/// Quoting parameters for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Half-width of the quoted spread as a fraction of mid.
    /// 0.001 = buy 0.1% below mid, sell 0.1% above.
    #[serde(default = "default_spread_fraction")]
    pub spread_fraction: Decimal,

    /// Decimal places of a limit price.
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            spread_fraction: default_spread_fraction(),
            price_decimals: default_price_decimals(),
        }
    }
}

impl QuoteConfig {
    /// Check the spread is strictly between 0 and 1.
    ///
    /// # Errors
    /// Returns `QuoteError::InvalidSpread` otherwise.
    pub fn validate(&self) -> QuoteResult<()> {
        validate_spread(self.spread_fraction)
    }
}

pub(crate) fn validate_spread(spread_fraction: Decimal) -> QuoteResult<()> {
    if spread_fraction <= Decimal::ZERO || spread_fraction >= Decimal::ONE {
        return Err(QuoteError::InvalidSpread(spread_fraction));
    }
    Ok(())
}

pub fn default_spread_fraction() -> Decimal {
    Decimal::new(1, 3) // 0.001 = 10 bps
}
pub fn default_price_decimals() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = QuoteConfig::default();
        assert_eq!(config.spread_fraction, dec!(0.001));
        assert_eq!(config.price_decimals, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: QuoteConfig = toml::from_str("price_decimals = 4").unwrap();
        assert_eq!(config.spread_fraction, dec!(0.001));
        assert_eq!(config.price_decimals, 4);
    }

    #[test]
    fn test_spread_bounds() {
        for bad in [dec!(0), dec!(-0.01), dec!(1), dec!(1.5)] {
            let config = QuoteConfig {
                spread_fraction: bad,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(QuoteError::InvalidSpread(bad)));
        }
    }
}
