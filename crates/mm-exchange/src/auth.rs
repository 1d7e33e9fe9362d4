//! HMAC request authentication.
//!
//! Signing input: `{METHOD}|{path}|{canonical_body}|{timestamp_ms}` where the
//! canonical body is compact JSON (`{"a":1}`, no spaces) and an absent or
//! empty body is the empty string. The signature is lowercase hex
//! HMAC-SHA256 keyed by the API secret.
//!
//! The timestamp is sent in `x-api-timestamp` and bounds replay; the
//! server's tolerance window is not enforced here.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// API key header.
pub const HEADER_API_KEY: &str = "x-api-key";
/// HMAC signature header.
pub const HEADER_SIGNATURE: &str = "x-api-signature";
/// Signing timestamp header (decimal milliseconds since epoch).
pub const HEADER_TIMESTAMP: &str = "x-api-timestamp";

/// Trait for obtaining current time, enabling testability.
pub trait Clock: Send + Sync {
    /// Returns current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_millis() as u64
    }
}

/// Computes request signatures. Stateless and deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSigner;

impl RequestSigner {
    /// Compact JSON for `body`; `None`, `null`, `{}` and `[]` become `""`.
    pub fn canonical_body(body: Option<&Value>) -> String {
        match body {
            None | Some(Value::Null) => String::new(),
            Some(Value::Object(map)) if map.is_empty() => String::new(),
            Some(Value::Array(items)) if items.is_empty() => String::new(),
            Some(value) => value.to_string(),
        }
    }

    /// Sign a request whose body is given as a JSON value.
    pub fn sign(
        method: &str,
        path: &str,
        body: Option<&Value>,
        timestamp_ms: u64,
        secret: &str,
    ) -> String {
        Self::sign_canonical(
            method,
            path,
            &Self::canonical_body(body),
            timestamp_ms,
            secret,
        )
    }

    /// Sign a request whose body is already canonical.
    ///
    /// Use this when the exact bytes being sent are at hand, so the signed
    /// string and the transmitted body cannot diverge.
    pub fn sign_canonical(
        method: &str,
        path: &str,
        canonical_body: &str,
        timestamp_ms: u64,
        secret: &str,
    ) -> String {
        let payload = format!("{method}|{path}|{canonical_body}|{timestamp_ms}");

        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// The three authentication headers for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub api_key: String,
    pub signature: String,
    pub timestamp_ms: u64,
}

impl AuthHeaders {
    /// Sign `method path body` at `timestamp_ms`.
    pub fn new(
        api_key: &str,
        api_secret: &str,
        method: &str,
        path: &str,
        canonical_body: &str,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            api_key: api_key.to_string(),
            signature: RequestSigner::sign_canonical(
                method,
                path,
                canonical_body,
                timestamp_ms,
                api_secret,
            ),
            timestamp_ms,
        }
    }

    /// Header name/value pairs in send order.
    pub fn pairs(&self) -> [(&'static str, String); 3] {
        [
            (HEADER_API_KEY, self.api_key.clone()),
            (HEADER_SIGNATURE, self.signature.clone()),
            (HEADER_TIMESTAMP, self.timestamp_ms.to_string()),
        ]
    }
}
