//! Order-related types.
//!
//! An `OrderIntent` is what the loop decides to place; an `OrderRequest`
//! is the same order after the wallet attestation has been attached.
//! Requests are built fresh every cycle and never resubmitted.

use crate::{Precision, Price, Size, TradingPair};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Wire name, also used in the attestation message.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Limit order at an explicit price.
    #[default]
    Limit,
    /// Market order; carries no price.
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "LIMIT"),
            Self::Market => write!(f, "MARKET"),
        }
    }
}

/// Unsigned order decided by the quoting loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIntent {
    pub ticker: TradingPair,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Limit price; ignored for market orders.
    pub price: Price,
    pub quantity: Size,
    pub precision: Precision,
}

impl OrderIntent {
    /// Create a limit order.
    pub fn limit(
        ticker: TradingPair,
        side: OrderSide,
        price: Price,
        quantity: Size,
        precision: Precision,
    ) -> Self {
        Self {
            ticker,
            side,
            order_type: OrderType::Limit,
            price,
            quantity,
            precision,
        }
    }

    /// Create a market order.
    pub fn market(ticker: TradingPair, side: OrderSide, quantity: Size, precision: Precision) -> Self {
        Self {
            ticker,
            side,
            order_type: OrderType::Market,
            price: Price::ZERO,
            quantity,
            precision,
        }
    }

    /// Price as sent on the wire; `None` for market orders.
    pub fn price_field(&self) -> Option<String> {
        match self.order_type {
            OrderType::Limit => Some(self.price.to_fixed(self.precision.price_decimals)),
            OrderType::Market => None,
        }
    }

    /// Quantity as sent on the wire.
    pub fn quantity_field(&self) -> String {
        self.quantity.to_fixed(self.precision.size_decimals)
    }
}

/// Wallet proof of order authorship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    /// Human-readable message that was signed.
    pub message: String,
    /// `0x`-prefixed 65-byte personal-message signature.
    pub signature: String,
}

/// Attested order body posted to `/v1/orders`.
///
/// Field order is significant: the serialized body is the exact byte
/// string covered by the request HMAC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub quantity: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub message: String,
    pub signature: String,
}

impl OrderRequest {
    pub fn new(intent: &OrderIntent, attestation: Attestation) -> Self {
        Self {
            ticker: intent.ticker.to_string(),
            price: intent.price_field(),
            quantity: intent.quantity_field(),
            side: intent.side,
            order_type: intent.order_type,
            message: attestation.message,
            signature: attestation.signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc_usdc() -> TradingPair {
        TradingPair::new("BTC", "USDC")
    }

    #[test]
    fn test_side_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&OrderSide::Buy).unwrap(), r#""BUY""#);
        assert_eq!(serde_json::to_string(&OrderType::Market).unwrap(), r#""MARKET""#);
    }

    #[test]
    fn test_intent_wire_fields() {
        let intent = OrderIntent::limit(
            btc_usdc(),
            OrderSide::Buy,
            Price::new(dec!(100.899)),
            Size::new(dec!(0.001)),
            Precision::default(),
        );
        assert_eq!(intent.price_field().as_deref(), Some("100.90"));
        assert_eq!(intent.quantity_field(), "0.001000");

        let market = OrderIntent::market(
            btc_usdc(),
            OrderSide::Sell,
            Size::new(dec!(0.5)),
            Precision::default(),
        );
        assert_eq!(market.price_field(), None);
    }

    #[test]
    fn test_request_body_field_order() {
        let intent = OrderIntent::limit(
            btc_usdc(),
            OrderSide::Sell,
            Price::new(dec!(101.10)),
            Size::new(dec!(0.002)),
            Precision::default(),
        );
        let request = OrderRequest::new(
            &intent,
            Attestation {
                message: "m".to_string(),
                signature: "0xsig".to_string(),
            },
        );

        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"ticker":"BTC/USDC","price":"101.10","quantity":"0.002000","side":"SELL","order_type":"LIMIT","message":"m","signature":"0xsig"}"#
        );
    }
}
