//! Signed REST client for the exchange.
//!
//! Every authenticated call carries two independent proofs:
//! - `RequestSigner`: HMAC-SHA256 over `method|path|body|timestamp`, keyed by
//!   the API secret (proves possession of the API credential)
//! - `OrderAttestor`: EIP-191 personal-message signature by the wallet key
//!   derived from the seed phrase (proves the wallet authored the order)
//!
//! `Exchange` is the seam the quoting loop talks to; `ExchangeClient` is the
//! HTTP implementation and `MockExchange` a scripted one for tests.

pub mod attestor;
pub mod auth;
pub mod client;
pub mod error;
pub mod exchange;

pub use attestor::{AttestError, OrderAttestor};
pub use auth::{AuthHeaders, Clock, RequestSigner, SystemClock};
pub use client::{ClientConfig, ExchangeClient};
pub use error::{ExchangeError, ExchangeResult};
pub use exchange::{BoxFuture, Exchange, ExchangeCall, MockExchange, SubmitResponse};
