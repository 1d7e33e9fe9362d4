//! Available wallet balances.

use rust_decimal::Decimal;
use std::collections::HashMap;

/// Snapshot of available amount per asset, fetched once per cycle.
///
/// An asset missing from the exchange response has zero available balance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
    available: HashMap<String, Decimal>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the available amount for `asset` (case-insensitive).
    pub fn insert(&mut self, asset: impl AsRef<str>, amount: Decimal) {
        self.available
            .insert(asset.as_ref().to_uppercase(), amount);
    }

    /// Available amount for `asset`, zero when absent.
    pub fn available(&self, asset: &str) -> Decimal {
        self.available
            .get(&asset.to_uppercase())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, Decimal)> for Balances {
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        let mut balances = Self::new();
        for (asset, amount) in iter {
            balances.insert(asset, amount);
        }
        balances
    }
}
