//! Quote calculation for the market maker.
//!
//! ```text
//! OrderBookSnapshot ─→ compute_quote(spread) ─→ Quote { mid, buy, sell }
//!                          │
//!                          └─ empty side → QuoteError (cycle is skipped)
//! ```

pub mod config;
pub mod error;
pub mod quote_engine;

pub use config::QuoteConfig;
pub use error::{QuoteError, QuoteResult};
pub use quote_engine::{compute_quote, Quote, QuoteEngine};
