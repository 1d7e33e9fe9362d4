//! Trading pair identifier.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A base/quote trading pair such as `BTC/USDC`.
///
/// The exchange names the pair `BTC/USDC` in order bodies and
/// `BTC_USDC` in market-data paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradingPair {
    base: String,
    quote: String,
}

impl TradingPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Asset being bought or sold (e.g. `BTC`).
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Asset prices are denominated in (e.g. `USDC`).
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Path segment used by `/v1/markets/{pair}/order-book`.
    pub fn path_segment(&self) -> String {
        format!("{}_{}", self.base, self.quote)
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = CoreError;

    /// Accepts `BTC/USDC`, `BTC_USDC` and `BTC-USDC`.
    fn from_str(s: &str) -> Result<Self> {
        let (base, quote) = s
            .trim()
            .split_once(['/', '_', '-'])
            .ok_or_else(|| CoreError::InvalidPair(s.to_string()))?;

        if base.is_empty() || quote.is_empty() {
            return Err(CoreError::InvalidPair(s.to_string()));
        }

        Ok(Self::new(base.to_uppercase(), quote.to_uppercase()))
    }
}

impl Serialize for TradingPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TradingPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
