//! Quote price calculation.
//!
//! `mid = (best_bid + best_ask) / 2`, then
//! `buy = mid * (1 - spread)` and `sell = mid * (1 + spread)`,
//! both rounded to the pair's price precision.

use mm_core::{OrderBookSnapshot, Price};
use rust_decimal::Decimal;

use crate::config::{validate_spread, QuoteConfig};
use crate::error::{QuoteError, QuoteResult};

/// Two-sided quote for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    /// Unrounded midpoint of best bid and best ask.
    pub mid: Price,
    /// Buy limit price, below mid.
    pub buy_price: Price,
    /// Sell limit price, above mid.
    pub sell_price: Price,
}

/// Compute a quote from `snapshot`.
///
/// # Errors
/// - `QuoteError::Unquotable` if either side of the book is empty
/// - `QuoteError::InvalidSpread` if `spread_fraction` is not in (0, 1)
pub fn compute_quote(
    snapshot: &OrderBookSnapshot,
    spread_fraction: Decimal,
    price_decimals: u32,
) -> QuoteResult<Quote> {
    validate_spread(spread_fraction)?;

    let (bid, ask) = match (snapshot.best_bid(), snapshot.best_ask()) {
        (Some(bid), Some(ask)) => (bid.price, ask.price),
        _ => return Err(QuoteError::Unquotable(snapshot.state())),
    };

    let mid = (bid.inner() + ask.inner()) / Decimal::TWO;
    let buy = mid * (Decimal::ONE - spread_fraction);
    let sell = mid * (Decimal::ONE + spread_fraction);

    Ok(Quote {
        mid: Price::new(mid),
        buy_price: Price::new(buy).round_dp(price_decimals),
        sell_price: Price::new(sell).round_dp(price_decimals),
    })
}

/// `compute_quote` bound to a validated configuration.
#[derive(Debug, Clone)]
pub struct QuoteEngine {
    config: QuoteConfig,
}

impl QuoteEngine {
    /// Create an engine.
    ///
    /// # Errors
    /// Returns `QuoteError::InvalidSpread` for an out-of-range spread.
    pub fn new(config: QuoteConfig) -> QuoteResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Quote `snapshot` with the configured spread and precision.
    ///
    /// # Errors
    /// Returns `QuoteError::Unquotable` if either side of the book is empty.
    pub fn quote(&self, snapshot: &OrderBookSnapshot) -> QuoteResult<Quote> {
        compute_quote(
            snapshot,
            self.config.spread_fraction,
            self.config.price_decimals,
        )
    }
}
