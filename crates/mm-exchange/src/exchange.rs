//! Exchange trait for the quoting loop.
//!
//! Provides a trait-based abstraction over the three exchange operations.
//! This allows for:
//! - Dependency injection for testing
//! - Separation of decision logic from transport

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use mm_core::{Balances, OrderBookSnapshot, OrderIntent, TradingPair};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::{ExchangeError, ExchangeResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Raw result of an order submission.
///
/// Exchange-specific error codes are not interpreted here.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResponse {
    pub status: u16,
    pub body: Value,
}

impl SubmitResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Check for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Operations the quoting loop performs against the exchange.
pub trait Exchange: Send + Sync {
    /// Fetch the current order book for `pair`.
    fn fetch_order_book<'a>(
        &'a self,
        pair: &'a TradingPair,
    ) -> BoxFuture<'a, ExchangeResult<OrderBookSnapshot>>;

    /// Fetch available balances. Missing assets mean zero.
    fn fetch_balances(&self) -> BoxFuture<'_, ExchangeResult<Balances>>;

    /// Attest, sign and submit `order`.
    fn submit_order<'a>(&'a self, order: &'a OrderIntent)
        -> BoxFuture<'a, ExchangeResult<SubmitResponse>>;
}

/// Call recorded by `MockExchange`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeCall {
    FetchOrderBook(TradingPair),
    FetchBalances,
    SubmitOrder(OrderIntent),
}

/// Scripted exchange for testing.
///
/// Queued results are consumed first; once a queue is empty the
/// fallback (if any) is returned on every call.
#[derive(Debug, Default)]
pub struct MockExchange {
    books: Mutex<VecDeque<ExchangeResult<OrderBookSnapshot>>>,
    fallback_book: Mutex<Option<OrderBookSnapshot>>,
    balances: Mutex<Option<ExchangeResult<Balances>>>,
    submits: Mutex<VecDeque<ExchangeResult<SubmitResponse>>>,
    calls: Mutex<Vec<ExchangeCall>>,
    panic_on_next_book: AtomicBool,
}

impl MockExchange {
    /// Create a new mock with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot order book result.
    pub fn push_book(&self, result: ExchangeResult<OrderBookSnapshot>) {
        self.books.lock().push_back(result);
    }

    /// Book returned whenever the queue is empty.
    pub fn set_fallback_book(&self, book: OrderBookSnapshot) {
        *self.fallback_book.lock() = Some(book);
    }

    /// Result returned by every balance fetch.
    pub fn set_balances(&self, result: ExchangeResult<Balances>) {
        *self.balances.lock() = Some(result);
    }

    /// Queue a one-shot submission result. Default is HTTP 200.
    pub fn push_submit(&self, result: ExchangeResult<SubmitResponse>) {
        self.submits.lock().push_back(result);
    }

    /// Make the next order book fetch panic.
    pub fn panic_on_next_book(&self) {
        self.panic_on_next_book.store(true, Ordering::SeqCst);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<ExchangeCall> {
        self.calls.lock().clone()
    }

    /// Recorded order submissions, in order.
    pub fn submitted(&self) -> Vec<OrderIntent> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ExchangeCall::SubmitOrder(order) => Some(order.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Exchange for MockExchange {
    fn fetch_order_book<'a>(
        &'a self,
        pair: &'a TradingPair,
    ) -> BoxFuture<'a, ExchangeResult<OrderBookSnapshot>> {
        Box::pin(async move {
            self.calls
                .lock()
                .push(ExchangeCall::FetchOrderBook(pair.clone()));

            if self.panic_on_next_book.swap(false, Ordering::SeqCst) {
                panic!("scripted order book panic");
            }

            if let Some(result) = self.books.lock().pop_front() {
                return result;
            }
            self.fallback_book
                .lock()
                .clone()
                .ok_or_else(|| ExchangeError::Transport("no order book scripted".to_string()))
        })
    }

    fn fetch_balances(&self) -> BoxFuture<'_, ExchangeResult<Balances>> {
        Box::pin(async move {
            self.calls.lock().push(ExchangeCall::FetchBalances);
            self.balances
                .lock()
                .clone()
                .unwrap_or_else(|| Ok(Balances::new()))
        })
    }

    fn submit_order<'a>(
        &'a self,
        order: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<SubmitResponse>> {
        Box::pin(async move {
            self.calls
                .lock()
                .push(ExchangeCall::SubmitOrder(order.clone()));
            self.submits
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(SubmitResponse::new(200, json!({"status": "ok"}))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::{BookLevel, OrderSide, Precision, Price, Size};
    use rust_decimal_macros::dec;

    fn pair() -> TradingPair {
        TradingPair::new("BTC", "USDC")
    }

    fn book() -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            vec![BookLevel::new(Price::new(dec!(100)), Size::new(dec!(1)))],
            vec![BookLevel::new(Price::new(dec!(102)), Size::new(dec!(1)))],
        )
    }

    #[test]
    fn test_submit_response_success_range() {
        assert!(SubmitResponse::new(200, Value::Null).is_success());
        assert!(SubmitResponse::new(201, Value::Null).is_success());
        assert!(!SubmitResponse::new(400, Value::Null).is_success());
        assert!(!SubmitResponse::new(500, Value::Null).is_success());
    }

    #[tokio::test]
    async fn test_mock_queue_then_fallback() {
        let mock = MockExchange::new();
        mock.push_book(Err(ExchangeError::Timeout("slow".to_string())));
        mock.set_fallback_book(book());

        assert!(mock.fetch_order_book(&pair()).await.is_err());
        assert_eq!(mock.fetch_order_book(&pair()).await.unwrap(), book());
        assert_eq!(mock.fetch_order_book(&pair()).await.unwrap(), book());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_records_submissions() {
        let mock = MockExchange::new();
        let order = OrderIntent::limit(
            pair(),
            OrderSide::Buy,
            Price::new(dec!(100)),
            Size::new(dec!(0.01)),
            Precision::default(),
        );
        let response = mock.submit_order(&order).await.unwrap();
        assert!(response.is_success());
        assert_eq!(mock.submitted(), vec![order]);
    }
}
