//! HTTP client for the exchange REST API.
//!
//! Endpoints:
//! - `GET  {base}/v1/markets/{BASE_QUOTE}/order-book` → `{"BUY": [...], "SELL": [...]}`
//! - `GET  {base}/v1/wallet/balances` → `{"data": [{"asset", "available"}, ...]}`
//! - `POST {base}/v1/orders` with the attested order body
//!
//! Every call has a bounded timeout so a hung server cannot stall the loop.

use std::sync::Arc;
use std::time::Duration;

use mm_core::{Balances, BookLevel, OrderBookSnapshot, OrderIntent, OrderRequest, TradingPair};
use mm_vault::CredentialVault;
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::attestor::OrderAttestor;
use crate::auth::{AuthHeaders, Clock, RequestSigner, SystemClock};
use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange::{BoxFuture, Exchange, SubmitResponse};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Order submission path.
pub const ORDERS_PATH: &str = "/v1/orders";

/// Balance path.
pub const BALANCES_PATH: &str = "/v1/wallet/balances";

/// Order book path for `pair`.
pub fn order_book_path(pair: &TradingPair) -> String {
    format!("/v1/markets/{}/order-book", pair.path_segment())
}

/// Connection settings for one agent's client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin (e.g. "https://testnet-api.kalqix.com").
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attach auth headers to order book requests too.
    pub sign_market_data: bool,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            sign_market_data: true,
        }
    }
}

/// Raw order book. A side that is absent (not just empty) is invalid data.
#[derive(Debug, Deserialize)]
struct RawOrderBook {
    #[serde(rename = "BUY")]
    buy: Option<Vec<BookLevel>>,
    #[serde(rename = "SELL")]
    sell: Option<Vec<BookLevel>>,
}

#[derive(Debug, Deserialize)]
struct RawBalances {
    #[serde(default)]
    data: Vec<RawBalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct RawBalanceEntry {
    asset: String,
    available: Decimal,
}

/// Signed REST client for one wallet.
///
/// Owns the wallet's vault, derived attestor and HTTP connection pool;
/// nothing here is shared with other agents.
pub struct ExchangeClient {
    client: Client,
    config: ClientConfig,
    vault: Arc<CredentialVault>,
    attestor: OrderAttestor,
    clock: Arc<dyn Clock>,
}

impl ExchangeClient {
    /// Create a new client.
    ///
    /// Derives the wallet key from the vault's seed phrase.
    ///
    /// # Errors
    /// Returns `ExchangeError::HttpClient` if the HTTP client cannot be built
    /// and `ExchangeError::Attestation` if the seed phrase is invalid.
    pub fn new(config: ClientConfig, vault: Arc<CredentialVault>) -> ExchangeResult<Self> {
        let attestor = OrderAttestor::from_seed(vault.credential().wallet_seed())
            .map_err(|e| ExchangeError::Attestation(e.to_string()))?;
        Self::with_attestor(config, vault, attestor, Arc::new(SystemClock))
    }

    /// Create a client with an already-derived attestor and a custom clock.
    ///
    /// # Errors
    /// Returns `ExchangeError::HttpClient` if the HTTP client cannot be built.
    pub fn with_attestor(
        config: ClientConfig,
        vault: Arc<CredentialVault>,
        attestor: OrderAttestor,
        clock: Arc<dyn Clock>,
    ) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExchangeError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        info!(
            wallet = %vault.name(),
            address = %attestor.address(),
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            "Exchange client ready"
        );

        Ok(Self {
            client,
            config,
            vault,
            attestor,
            clock,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Signed auth headers for `method path body`, timestamped now.
    fn auth_headers(&self, method: &Method, path: &str, canonical_body: &str) -> AuthHeaders {
        let credential = self.vault.credential();
        AuthHeaders::new(
            credential.api_key(),
            credential.api_secret(),
            method.as_str(),
            path,
            canonical_body,
            self.clock.now_ms(),
        )
    }

    /// Send a request and return the status with the raw body text.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        signed: bool,
    ) -> ExchangeResult<(u16, String)> {
        let canonical_body = RequestSigner::canonical_body(body);

        let mut request = self
            .client
            .request(method.clone(), self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if signed {
            for (name, value) in self.auth_headers(&method, path, &canonical_body).pairs() {
                request = request.header(name, value);
            }
        }

        if !canonical_body.is_empty() {
            // Send the exact bytes that were signed
            request = request.body(canonical_body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }

    async fn get_order_book(&self, pair: &TradingPair) -> ExchangeResult<OrderBookSnapshot> {
        let path = order_book_path(pair);
        debug!(%path, "Fetching order book");

        let (status, text) = self
            .send(Method::GET, &path, None, self.config.sign_market_data)
            .await?;

        if status != 200 {
            return Err(ExchangeError::HttpStatus { status, body: text });
        }

        let raw: RawOrderBook = serde_json::from_str(&text)
            .map_err(|e| ExchangeError::MalformedResponse(format!("order book: {e}")))?;

        match (raw.buy, raw.sell) {
            (Some(bids), Some(asks)) => Ok(OrderBookSnapshot::new(bids, asks)),
            (None, _) => Err(ExchangeError::InvalidMarketData(
                "order book has no BUY side".to_string(),
            )),
            (_, None) => Err(ExchangeError::InvalidMarketData(
                "order book has no SELL side".to_string(),
            )),
        }
    }

    async fn get_balances(&self) -> ExchangeResult<Balances> {
        debug!("Fetching balances");

        let (status, text) = self.send(Method::GET, BALANCES_PATH, None, true).await?;

        if !(200..300).contains(&status) {
            return Err(ExchangeError::HttpStatus { status, body: text });
        }

        let raw: RawBalances = serde_json::from_str(&text)
            .map_err(|e| ExchangeError::MalformedResponse(format!("balances: {e}")))?;

        Ok(raw
            .data
            .into_iter()
            .map(|entry| (entry.asset, entry.available))
            .collect())
    }

    async fn post_order(&self, order: &OrderIntent) -> ExchangeResult<SubmitResponse> {
        let attestation = self
            .attestor
            .attest(order)
            .await
            .map_err(|e| ExchangeError::Attestation(e.to_string()))?;

        let request = OrderRequest::new(order, attestation);
        let body = serde_json::to_value(&request)
            .map_err(|e| ExchangeError::MalformedResponse(format!("order body: {e}")))?;

        let (status, text) = self
            .send(Method::POST, ORDERS_PATH, Some(&body), true)
            .await?;

        // Non-JSON bodies are preserved verbatim
        let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }));

        if !(200..300).contains(&status) {
            warn!(status, side = %order.side, "Order submission returned non-2xx");
        }

        Ok(SubmitResponse::new(status, body))
    }
}

impl Exchange for ExchangeClient {
    fn fetch_order_book<'a>(
        &'a self,
        pair: &'a TradingPair,
    ) -> BoxFuture<'a, ExchangeResult<OrderBookSnapshot>> {
        Box::pin(self.get_order_book(pair))
    }

    fn fetch_balances(&self) -> BoxFuture<'_, ExchangeResult<Balances>> {
        Box::pin(self.get_balances())
    }

    fn submit_order<'a>(
        &'a self,
        order: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<SubmitResponse>> {
        Box::pin(self.post_order(order))
    }
}
