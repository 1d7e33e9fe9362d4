//! Per-wallet quoting loop.
//!
//! # State machine
//!
//! ```text
//! FetchingBook ─→ CheckingBook ─→ [CheckingBalance] ─→ PlacingBuy ─→ PlacingSell ─→ Sleeping
//!      ↑   │            │                                                              │
//!      │   └── error ───┴──→ backoff (retry_backoff) ──────────────────────────────────┤
//!      └───────────────────────────────────────────────────────────────────────────────┘
//!
//! Stopped is reachable from every state once the cancellation token fires.
//! ```
//!
//! Failures travel as `Step` values, never as errors out of `run`. A panic
//! inside a cycle is caught at the loop boundary and handled like any other
//! unexpected failure: back off, then fetch the book again.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use mm_core::{Balances, OrderIntent, OrderSide, Precision, Price, Size, TradingPair};
use mm_exchange::{Exchange, ExchangeError};
use mm_quote::{Quote, QuoteEngine, QuoteError};
use mm_telemetry::Metrics;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{AppConfig, OrderSizeRange};
use crate::error::AppResult;

/// Loop states, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    FetchingBook,
    CheckingBook,
    CheckingBalance,
    PlacingBuy,
    PlacingSell,
    Sleeping,
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FetchingBook => "FETCHING_BOOK",
            Self::CheckingBook => "CHECKING_BOOK",
            Self::CheckingBalance => "CHECKING_BALANCE",
            Self::PlacingBuy => "PLACING_BUY",
            Self::PlacingSell => "PLACING_SELL",
            Self::Sleeping => "SLEEPING",
            Self::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}

/// Why one side of a cycle was not submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InsufficientBalance {
        asset: String,
        required: Decimal,
        available: Decimal,
    },
    /// Balances could not be fetched; neither side is placed blind.
    BalanceUnavailable(String),
}

impl SkipReason {
    fn label(&self) -> &'static str {
        match self {
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::BalanceUnavailable(_) => "balance_unavailable",
        }
    }
}

/// Result of one side of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideOutcome {
    /// 2xx response.
    Accepted(u16),
    /// Non-2xx response. The body is logged, not interpreted.
    Rejected(u16),
    /// Transport failure or timeout.
    Failed(String),
    Skipped(SkipReason),
}

impl SideOutcome {
    /// Whether a submission was attempted.
    pub fn was_submitted(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

/// Summary of a cycle that reached placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub quote: Quote,
    pub size: Size,
    pub buy: SideOutcome,
    pub sell: SideOutcome,
}

/// Why a cycle backed off before placement.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    BookUnavailable(ExchangeError),
    Unquotable(QuoteError),
    Unexpected(String),
}

impl fmt::Display for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BookUnavailable(e) => write!(f, "order book unavailable: {e}"),
            Self::Unquotable(e) => write!(f, "{e}"),
            Self::Unexpected(msg) => write!(f, "unexpected failure: {msg}"),
        }
    }
}

/// Outcome of one pass through the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Both sides handled; sleep the refresh interval.
    Completed(CycleReport),
    /// No placement this cycle; sleep the retry backoff.
    Backoff(Backoff),
    /// Cancellation observed; stop without further calls.
    Cancelled,
}

/// Counters returned when an agent stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentSummary {
    pub wallet: String,
    pub cycles: u64,
    pub backoffs: u64,
    pub orders_submitted: u64,
    pub orders_accepted: u64,
    pub unexpected_errors: u64,
}

/// Loop parameters, resolved from `AppConfig`.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub pair: TradingPair,
    pub precision: Precision,
    pub order_size: Decimal,
    pub order_size_range: Option<OrderSizeRange>,
    pub refresh_interval: Duration,
    pub retry_backoff: Duration,
    pub inter_order_delay: Duration,
    pub balance_check: bool,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            pair: config.ticker.clone(),
            precision: config.precision(),
            order_size: config.order_size,
            order_size_range: config.order_size_range,
            refresh_interval: config.refresh_interval(),
            retry_backoff: config.retry_backoff(),
            inter_order_delay: config.inter_order_delay(),
            balance_check: config.balance_check,
        }
    }

    /// Order size for the next cycle.
    ///
    /// Draws uniformly from `order_size_range` in steps of the size
    /// precision when a range is configured.
    pub fn next_size(&self) -> Size {
        let size = match self.order_size_range {
            Some(range) => draw_size(range, self.precision.size_decimals)
                .unwrap_or(self.order_size),
            None => self.order_size,
        };
        Size::new(size).round_dp(self.precision.size_decimals)
    }
}

/// Uniform draw from `range` on the `decimals` grid.
fn draw_size(range: OrderSizeRange, decimals: u32) -> Option<Decimal> {
    let scale = Decimal::from(10u64.checked_pow(decimals)?);
    let low = (range.min * scale).ceil().to_i64()?;
    let high = (range.max * scale).floor().to_i64()?;
    if low > high {
        return None;
    }
    let units = rand::thread_rng().gen_range(low..=high);
    Some(Decimal::new(units, decimals))
}

/// Quoting loop for one wallet.
pub struct MarketMakerLoop {
    name: String,
    exchange: Arc<dyn Exchange>,
    engine: QuoteEngine,
    settings: AgentSettings,
}

impl MarketMakerLoop {
    /// Create a loop.
    ///
    /// # Errors
    /// Returns `AppError::Quote` if the quote configuration is invalid.
    pub fn new(
        name: impl Into<String>,
        exchange: Arc<dyn Exchange>,
        config: &AppConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            name: name.into(),
            exchange,
            engine: QuoteEngine::new(config.quote_config())?,
            settings: AgentSettings::from_config(config),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run until `cancel` fires.
    ///
    /// Never returns early on exchange failures or panics inside a cycle.
    pub async fn run(self, cancel: CancellationToken) -> AgentSummary {
        let span = info_span!("agent", wallet = %self.name);
        self.run_inner(cancel).instrument(span).await
    }

    async fn run_inner(self, cancel: CancellationToken) -> AgentSummary {
        let mut summary = AgentSummary {
            wallet: self.name.clone(),
            ..Default::default()
        };

        info!(pair = %self.settings.pair, "Agent started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let step = AssertUnwindSafe(self.cycle(&cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Step::Backoff(Backoff::Unexpected(panic_message(&*panic))));

            let pause = match step {
                Step::Cancelled => break,
                Step::Completed(report) => {
                    self.record_cycle(&report, &mut summary);
                    self.settings.refresh_interval
                }
                Step::Backoff(reason) => {
                    self.record_backoff(&reason, &mut summary);
                    self.settings.retry_backoff
                }
            };

            debug!(state = %LoopState::Sleeping, secs = pause.as_secs_f64(), "State transition");
            if !pause_or_cancel(pause, &cancel).await {
                break;
            }
        }

        debug!(state = %LoopState::Stopped, "State transition");
        info!(
            cycles = summary.cycles,
            orders_submitted = summary.orders_submitted,
            "Agent stopped"
        );
        summary
    }

    /// Run one pass from `FetchingBook` through `PlacingSell`.
    ///
    /// The token is checked before every network call.
    pub async fn cycle(&self, cancel: &CancellationToken) -> Step {
        // FETCHING_BOOK
        if cancel.is_cancelled() {
            return Step::Cancelled;
        }
        debug!(state = %LoopState::FetchingBook, "State transition");
        let book = match self.exchange.fetch_order_book(&self.settings.pair).await {
            Ok(book) => book,
            Err(e) => return Step::Backoff(Backoff::BookUnavailable(e)),
        };

        // CHECKING_BOOK
        debug!(state = %LoopState::CheckingBook, "State transition");
        let quote = match self.engine.quote(&book) {
            Ok(quote) => quote,
            Err(e) => return Step::Backoff(Backoff::Unquotable(e)),
        };
        let size = self.settings.next_size();
        debug!(
            mid = %quote.mid,
            buy = %quote.buy_price,
            sell = %quote.sell_price,
            %size,
            "Quote computed"
        );

        // CHECKING_BALANCE
        let (mut buy_skip, mut sell_skip) = (None, None);
        if self.settings.balance_check {
            if cancel.is_cancelled() {
                return Step::Cancelled;
            }
            debug!(state = %LoopState::CheckingBalance, "State transition");
            match self.exchange.fetch_balances().await {
                Ok(balances) => {
                    (buy_skip, sell_skip) = self.balance_plan(&balances, &quote, size);
                }
                Err(e) => {
                    let reason = SkipReason::BalanceUnavailable(e.to_string());
                    buy_skip = Some(reason.clone());
                    sell_skip = Some(reason);
                }
            }
        }

        // PLACING_BUY
        let buy = match buy_skip {
            Some(reason) => self.skip(OrderSide::Buy, reason),
            None => {
                if cancel.is_cancelled() {
                    return Step::Cancelled;
                }
                debug!(state = %LoopState::PlacingBuy, "State transition");
                self.place(OrderSide::Buy, quote.buy_price, size).await
            }
        };

        // PLACING_SELL
        let sell = match sell_skip {
            Some(reason) => self.skip(OrderSide::Sell, reason),
            None => {
                if buy.was_submitted()
                    && !pause_or_cancel(self.settings.inter_order_delay, cancel).await
                {
                    return Step::Cancelled;
                }
                if cancel.is_cancelled() {
                    return Step::Cancelled;
                }
                debug!(state = %LoopState::PlacingSell, "State transition");
                self.place(OrderSide::Sell, quote.sell_price, size).await
            }
        };

        Step::Completed(CycleReport {
            quote,
            size,
            buy,
            sell,
        })
    }

    /// Decide which sides the wallet can afford.
    ///
    /// BUY needs `buy_price * size` of the quote asset; SELL needs `size`
    /// of the base asset. Open orders are not netted out.
    fn balance_plan(
        &self,
        balances: &Balances,
        quote: &Quote,
        size: Size,
    ) -> (Option<SkipReason>, Option<SkipReason>) {
        let pair = &self.settings.pair;

        let quote_available = balances.available(pair.quote());
        let quote_required = size.notional(quote.buy_price);
        let buy = (quote_available < quote_required).then(|| SkipReason::InsufficientBalance {
            asset: pair.quote().to_string(),
            required: quote_required,
            available: quote_available,
        });

        let base_available = balances.available(pair.base());
        let sell = (base_available < size.inner()).then(|| SkipReason::InsufficientBalance {
            asset: pair.base().to_string(),
            required: size.inner(),
            available: base_available,
        });

        (buy, sell)
    }

    fn skip(&self, side: OrderSide, reason: SkipReason) -> SideOutcome {
        match &reason {
            SkipReason::InsufficientBalance {
                asset,
                required,
                available,
            } => info!(%side, %asset, %required, %available, "Skipping side: insufficient balance"),
            SkipReason::BalanceUnavailable(e) => {
                info!(%side, error = %e, "Skipping side: balances unavailable")
            }
        }
        Metrics::side_skipped(&self.name, side.as_str(), reason.label());
        SideOutcome::Skipped(reason)
    }

    async fn place(&self, side: OrderSide, price: Price, size: Size) -> SideOutcome {
        let order = OrderIntent::limit(
            self.settings.pair.clone(),
            side,
            price,
            size,
            self.settings.precision,
        );

        let outcome = match self.exchange.submit_order(&order).await {
            Ok(response) if response.is_success() => {
                info!(%side, %price, %size, status = response.status, "Order accepted");
                SideOutcome::Accepted(response.status)
            }
            Ok(response) => {
                warn!(
                    %side,
                    %price,
                    %size,
                    status = response.status,
                    body = %response.body,
                    "Order rejected"
                );
                SideOutcome::Rejected(response.status)
            }
            Err(e) => {
                warn!(%side, error = %e, "Order submission failed");
                SideOutcome::Failed(e.to_string())
            }
        };

        let label = match outcome {
            SideOutcome::Accepted(_) => "accepted",
            SideOutcome::Rejected(_) => "rejected",
            _ => "error",
        };
        Metrics::order_submitted(&self.name, side.as_str(), label);
        outcome
    }

    fn record_cycle(&self, report: &CycleReport, summary: &mut AgentSummary) {
        summary.cycles += 1;
        for outcome in [&report.buy, &report.sell] {
            if outcome.was_submitted() {
                summary.orders_submitted += 1;
            }
            if matches!(outcome, SideOutcome::Accepted(_)) {
                summary.orders_accepted += 1;
            }
        }
        Metrics::cycle_completed(&self.name);
    }

    fn record_backoff(&self, reason: &Backoff, summary: &mut AgentSummary) {
        summary.backoffs += 1;
        match reason {
            Backoff::Unexpected(_) => {
                summary.unexpected_errors += 1;
                Metrics::unexpected_error(&self.name);
                warn!(%reason, "Cycle failed unexpectedly, backing off");
            }
            Backoff::Unquotable(_) => {
                Metrics::book_unavailable(&self.name);
                info!(%reason, "Order book not quotable, backing off");
            }
            Backoff::BookUnavailable(_) => {
                Metrics::book_unavailable(&self.name);
                warn!(%reason, "Backing off");
            }
        }
    }
}

/// Sleep for `duration` unless cancelled first. Returns false on cancellation.
async fn pause_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::{BookLevel, OrderBookSnapshot};
    use mm_exchange::MockExchange;
    use rust_decimal_macros::dec;

    fn book(bid: Decimal, ask: Decimal) -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            vec![BookLevel::new(Price::new(bid), Size::new(dec!(1)))],
            vec![BookLevel::new(Price::new(ask), Size::new(dec!(1)))],
        )
    }

    fn agent(mock: Arc<MockExchange>, config: &AppConfig) -> MarketMakerLoop {
        MarketMakerLoop::new("unit", mock, config).unwrap()
    }

    #[test]
    fn test_fixed_size_without_range() {
        let settings = AgentSettings::from_config(&AppConfig::default());
        assert_eq!(settings.next_size(), Size::new(dec!(0.001)));
    }

    #[test]
    fn test_random_size_within_range() {
        let config = AppConfig {
            order_size_range: Some(OrderSizeRange {
                min: dec!(0.001),
                max: dec!(0.002),
            }),
            ..Default::default()
        };
        let settings = AgentSettings::from_config(&config);
        for _ in 0..100 {
            let size = settings.next_size().inner();
            assert!(size >= dec!(0.001) && size <= dec!(0.002), "{size}");
            assert!(size.scale() <= 6);
        }
    }

    #[test]
    fn test_degenerate_range_falls_back() {
        // No grid point inside [0.0000001, 0.0000002] at 6 decimals
        let range = OrderSizeRange {
            min: dec!(0.0000001),
            max: dec!(0.0000002),
        };
        assert_eq!(draw_size(range, 6), None);
    }

    #[test]
    fn test_panic_message_downcasts() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*boxed), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*boxed), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*boxed), "panic");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_places_buy_then_sell() {
        let mock = Arc::new(MockExchange::new());
        mock.set_fallback_book(book(dec!(100), dec!(102)));
        let agent = agent(mock.clone(), &AppConfig::default());

        let step = agent.cycle(&CancellationToken::new()).await;
        let Step::Completed(report) = step else {
            panic!("expected completed cycle, got {step:?}");
        };
        assert_eq!(report.buy, SideOutcome::Accepted(200));
        assert_eq!(report.sell, SideOutcome::Accepted(200));

        let submitted = mock.submitted();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].side, OrderSide::Buy);
        assert_eq!(submitted[0].price.inner(), dec!(100.90));
        assert_eq!(submitted[1].side, OrderSide::Sell);
        assert_eq!(submitted[1].price.inner(), dec!(101.10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_book_error_backs_off() {
        let mock = Arc::new(MockExchange::new());
        mock.push_book(Err(ExchangeError::Timeout("slow".to_string())));
        let agent = agent(mock.clone(), &AppConfig::default());

        let step = agent.cycle(&CancellationToken::new()).await;
        assert!(matches!(step, Step::Backoff(Backoff::BookUnavailable(_))));
        assert!(mock.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_token_makes_no_calls() {
        let mock = Arc::new(MockExchange::new());
        let agent = agent(mock.clone(), &AppConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(agent.cycle(&cancel).await, Step::Cancelled);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_fetch_failure_skips_both_sides() {
        let mock = Arc::new(MockExchange::new());
        mock.set_fallback_book(book(dec!(100), dec!(102)));
        mock.set_balances(Err(ExchangeError::Transport("down".to_string())));
        let config = AppConfig {
            balance_check: true,
            ..Default::default()
        };
        let agent = agent(mock.clone(), &config);

        let Step::Completed(report) = agent.cycle(&CancellationToken::new()).await else {
            panic!("expected completed cycle");
        };
        assert!(matches!(report.buy, SideOutcome::Skipped(SkipReason::BalanceUnavailable(_))));
        assert!(matches!(report.sell, SideOutcome::Skipped(SkipReason::BalanceUnavailable(_))));
        assert!(mock.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_failure_does_not_block_other_side() {
        let mock = Arc::new(MockExchange::new());
        mock.set_fallback_book(book(dec!(100), dec!(102)));
        mock.push_submit(Err(ExchangeError::Timeout("slow".to_string())));
        let agent = agent(mock.clone(), &AppConfig::default());

        let Step::Completed(report) = agent.cycle(&CancellationToken::new()).await else {
            panic!("expected completed cycle");
        };
        assert!(matches!(report.buy, SideOutcome::Failed(_)));
        assert_eq!(report.sell, SideOutcome::Accepted(200));
    }
}
