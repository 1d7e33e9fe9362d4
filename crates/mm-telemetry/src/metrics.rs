//! Prometheus metrics for the market maker.
//!
//! Every series is labelled by wallet name so agents can be told apart.
//! There is no exporter here; the default registry can be gathered by
//! whatever embeds the bot.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A failure means a
//! duplicate metric name, which is a programming error caught on first use.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge,
};

/// Completed quoting cycles.
pub static CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_cycles_total",
        "Quoting cycles that reached the placement steps",
        &["wallet"]
    )
    .unwrap()
});

/// Order submissions.
/// Labels: side (BUY/SELL), outcome (accepted/rejected/error)
pub static ORDERS_SUBMITTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_orders_submitted_total",
        "Order submissions by side and outcome",
        &["wallet", "side", "outcome"]
    )
    .unwrap()
});

/// Sides skipped before submission.
/// Labels: side, reason (insufficient_balance/balance_unavailable)
pub static SIDE_SKIPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_side_skipped_total",
        "Quote sides skipped before submission",
        &["wallet", "side", "reason"]
    )
    .unwrap()
});

/// Cycles abandoned because the order book was unavailable or unquotable.
pub static BOOK_UNAVAILABLE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_book_unavailable_total",
        "Cycles backed off for lack of a usable order book",
        &["wallet"]
    )
    .unwrap()
});

/// Unexpected failures caught at the loop boundary.
pub static UNEXPECTED_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_unexpected_errors_total",
        "Unexpected failures caught by the quoting loop",
        &["wallet"]
    )
    .unwrap()
});

/// Agents currently running.
pub static AGENTS_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("mm_agents_running", "Market maker agents currently running").unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a cycle that reached placement.
    pub fn cycle_completed(wallet: &str) {
        CYCLES_TOTAL.with_label_values(&[wallet]).inc();
    }

    /// Record an order submission outcome.
    pub fn order_submitted(wallet: &str, side: &str, outcome: &str) {
        ORDERS_SUBMITTED_TOTAL
            .with_label_values(&[wallet, side, outcome])
            .inc();
    }

    /// Record a skipped side.
    pub fn side_skipped(wallet: &str, side: &str, reason: &str) {
        SIDE_SKIPPED_TOTAL
            .with_label_values(&[wallet, side, reason])
            .inc();
    }

    /// Record a backoff for lack of a usable book.
    pub fn book_unavailable(wallet: &str) {
        BOOK_UNAVAILABLE_TOTAL.with_label_values(&[wallet]).inc();
    }

    /// Record an unexpected error.
    pub fn unexpected_error(wallet: &str) {
        UNEXPECTED_ERRORS_TOTAL.with_label_values(&[wallet]).inc();
    }

    pub fn agent_started() {
        AGENTS_RUNNING.inc();
    }

    pub fn agent_stopped() {
        AGENTS_RUNNING.dec();
    }

    /// Current cycle count for `wallet`.
    pub fn cycles(wallet: &str) -> u64 {
        CYCLES_TOTAL.with_label_values(&[wallet]).get()
    }

    /// Current submission count for `wallet`, `side` and `outcome`.
    pub fn submissions(wallet: &str, side: &str, outcome: &str) -> u64 {
        ORDERS_SUBMITTED_TOTAL
            .with_label_values(&[wallet, side, outcome])
            .get()
    }

    /// Current skip count for `wallet`, `side` and `reason`.
    pub fn skips(wallet: &str, side: &str, reason: &str) -> u64 {
        SIDE_SKIPPED_TOTAL
            .with_label_values(&[wallet, side, reason])
            .get()
    }

    /// Current unexpected error count for `wallet`.
    pub fn unexpected_errors(wallet: &str) -> u64 {
        UNEXPECTED_ERRORS_TOTAL.with_label_values(&[wallet]).get()
    }
}
