//! Core domain types for the wallet market maker.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `TradingPair`: Base/quote ticker (e.g. `BTC/USDC`)
//! - `OrderBookSnapshot`: Top-of-book view used for quoting
//! - `Balances`: Available amounts per asset
//! - `OrderIntent`, `OrderRequest`: Unsigned and attested orders

pub mod balance;
pub mod book;
pub mod decimal;
pub mod error;
pub mod order;
pub mod pair;

pub use balance::Balances;
pub use book::{BookLevel, BookState, OrderBookSnapshot};
pub use decimal::{Precision, Price, Size};
pub use error::{CoreError, Result};
pub use order::{Attestation, OrderIntent, OrderRequest, OrderSide, OrderType};
pub use pair::TradingPair;
