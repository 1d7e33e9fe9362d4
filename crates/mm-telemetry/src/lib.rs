//! Prometheus metrics and structured logging for the market maker.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Per-wallet counters for cycles, submissions and skips

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
