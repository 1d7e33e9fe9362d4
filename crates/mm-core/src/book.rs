//! Order book snapshot.
//!
//! The exchange returns `{"BUY": [{price, quantity}, ...], "SELL": [...]}`
//! with bids sorted best-first (descending) and asks best-first (ascending).
//! A snapshot is transient: it is refetched every cycle.

use crate::{Price, Size};
use serde::{Deserialize, Serialize};

/// Book state used to decide whether a snapshot can be quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    /// Both bid and ask are present.
    Valid,
    /// No bid side.
    NoBid,
    /// No ask side.
    NoAsk,
    /// Both sides missing.
    Empty,
}

impl std::fmt::Display for BookState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "VALID"),
            Self::NoBid => write!(f, "NO_BID"),
            Self::NoAsk => write!(f, "NO_ASK"),
            Self::Empty => write!(f, "EMPTY"),
        }
    }
}

/// One resting price level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub quantity: Size,
}

impl BookLevel {
    pub fn new(price: Price, quantity: Size) -> Self {
        Self { price, quantity }
    }
}

/// Order book for one trading pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Resting buy orders, best (highest) price first.
    #[serde(rename = "BUY")]
    pub bids: Vec<BookLevel>,
    /// Resting sell orders, best (lowest) price first.
    #[serde(rename = "SELL")]
    pub asks: Vec<BookLevel>,
}

impl OrderBookSnapshot {
    pub fn new(bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Self {
        Self { bids, asks }
    }

    /// Best bid (element 0 of the BUY side).
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    /// Best ask (element 0 of the SELL side).
    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// Determine whether both sides are populated.
    pub fn state(&self) -> BookState {
        match (self.bids.is_empty(), self.asks.is_empty()) {
            (true, true) => BookState::Empty,
            (true, false) => BookState::NoBid,
            (false, true) => BookState::NoAsk,
            (false, false) => BookState::Valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: rust_decimal::Decimal) -> BookLevel {
        BookLevel::new(Price::new(price), Size::new(dec!(1)))
    }

    #[test]
    fn test_best_levels_are_first_elements() {
        let book = OrderBookSnapshot::new(
            vec![level(dec!(100)), level(dec!(99))],
            vec![level(dec!(102)), level(dec!(103))],
        );
        assert_eq!(book.best_bid().unwrap().price.inner(), dec!(100));
        assert_eq!(book.best_ask().unwrap().price.inner(), dec!(102));
        assert_eq!(book.state(), BookState::Valid);
    }

    #[test]
    fn test_state_detects_missing_sides() {
        let no_ask = OrderBookSnapshot::new(vec![level(dec!(100))], vec![]);
        assert_eq!(no_ask.state(), BookState::NoAsk);

        let no_bid = OrderBookSnapshot::new(vec![], vec![level(dec!(100))]);
        assert_eq!(no_bid.state(), BookState::NoBid);

        assert_eq!(OrderBookSnapshot::default().state(), BookState::Empty);
    }

    #[test]
    fn test_deserialize_exchange_shape() {
        let raw = r#"{
            "BUY": [{"price": "100.00", "quantity": "0.5"}],
            "SELL": [{"price": 102.5, "quantity": 1}]
        }"#;
        let book: OrderBookSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(book.best_bid().unwrap().price.inner(), dec!(100.00));
        assert_eq!(book.best_ask().unwrap().price.inner(), dec!(102.5));
        assert_eq!(book.best_ask().unwrap().quantity.inner(), dec!(1));
    }
}
