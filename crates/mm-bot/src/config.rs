//! Application configuration.

use crate::error::{AppError, AppResult};
use mm_core::{Precision, TradingPair};
use mm_quote::QuoteConfig;
use mm_vault::KeySource;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "MM_CONFIG";

/// Config file used when neither `--config` nor `MM_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Accepted request timeout range in seconds.
pub const REQUEST_TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 5..=15;

/// Accepted gap between the BUY and SELL placements in milliseconds.
pub const INTER_ORDER_DELAY_RANGE_MS: std::ops::RangeInclusive<u64> = 1000..=2000;

/// Inclusive range for a per-cycle random order size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSizeRange {
    pub min: Decimal,
    pub max: Decimal,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API origin.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Pair to quote, e.g. "BTC/USDC".
    #[serde(default = "default_ticker")]
    pub ticker: TradingPair,

    /// Half-width of the quoted spread around mid (0.001 = 0.1%).
    #[serde(default = "mm_quote::config::default_spread_fraction")]
    pub spread_fraction: Decimal,

    /// Fixed quantity per order in base currency.
    #[serde(default = "default_order_size")]
    pub order_size: Decimal,

    /// When set, each cycle draws a size uniformly from this range
    /// instead of using `order_size`. Both sides use the same draw.
    #[serde(default)]
    pub order_size_range: Option<OrderSizeRange>,

    /// Sleep between cycles.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Backoff after a book failure or unexpected error.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Delay between the BUY and SELL placements. Must be within 1000..=2000 ms.
    #[serde(default = "default_inter_order_delay_ms")]
    pub inter_order_delay_ms: u64,

    /// Per-request timeout. Must be within 5..=15 seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "mm_quote::config::default_price_decimals")]
    pub price_decimals: u32,

    #[serde(default = "default_size_decimals")]
    pub size_decimals: u32,

    /// Check balances before placing and skip unaffordable sides.
    #[serde(default)]
    pub balance_check: bool,

    /// Attach auth headers to order book requests.
    #[serde(default = "default_true")]
    pub sign_market_data: bool,

    /// Directory of `*.json` wallet records.
    #[serde(default = "default_wallets_dir")]
    pub wallets_dir: PathBuf,

    /// Where wallet decryption keys come from.
    #[serde(default)]
    pub key_source: KeySource,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ticker: default_ticker(),
            spread_fraction: mm_quote::config::default_spread_fraction(),
            order_size: default_order_size(),
            order_size_range: None,
            refresh_interval_secs: default_refresh_interval_secs(),
            retry_backoff_secs: default_retry_backoff_secs(),
            inter_order_delay_ms: default_inter_order_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            price_decimals: mm_quote::config::default_price_decimals(),
            size_decimals: default_size_decimals(),
            balance_check: false,
            sign_market_data: true,
            wallets_dir: default_wallets_dir(),
            key_source: KeySource::default(),
        }
    }
}

fn default_base_url() -> String {
    "https://testnet-api.kalqix.com".to_string()
}
fn default_ticker() -> TradingPair {
    TradingPair::new("BTC", "USDC")
}
fn default_order_size() -> Decimal {
    Decimal::new(1, 3) // 0.001 BTC
}
fn default_refresh_interval_secs() -> u64 {
    10
}
fn default_retry_backoff_secs() -> u64 {
    5
}
fn default_inter_order_delay_ms() -> u64 {
    1000
}
fn default_request_timeout_secs() -> u64 {
    15
}
fn default_size_decimals() -> u32 {
    6
}
fn default_true() -> bool {
    true
}
fn default_wallets_dir() -> PathBuf {
    PathBuf::from("wallets")
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate TOML configuration.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Resolve the config path: CLI arg > `MM_CONFIG` > default.
    pub fn resolve_path(cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        self.quote_config()
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        // Sizes are placed after rounding to size_decimals.
        if self.order_size.round_dp(self.size_decimals) <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "order_size must be positive at {} decimals, got {}",
                self.size_decimals, self.order_size
            )));
        }

        if let Some(range) = &self.order_size_range {
            if range.min <= Decimal::ZERO || range.min > range.max {
                return Err(AppError::Config(format!(
                    "order_size_range must satisfy 0 < min <= max, got [{}, {}]",
                    range.min, range.max
                )));
            }
            if range.max.round_dp(self.size_decimals) <= Decimal::ZERO {
                return Err(AppError::Config(format!(
                    "order_size_range.max must be positive at {} decimals, got {}",
                    self.size_decimals, range.max
                )));
            }
        }

        if !REQUEST_TIMEOUT_RANGE_SECS.contains(&self.request_timeout_secs) {
            return Err(AppError::Config(format!(
                "request_timeout_secs must be within 5..=15, got {}",
                self.request_timeout_secs
            )));
        }

        if self.refresh_interval_secs == 0 {
            return Err(AppError::Config(
                "refresh_interval_secs must be positive".to_string(),
            ));
        }

        if self.retry_backoff_secs == 0 {
            return Err(AppError::Config(
                "retry_backoff_secs must be positive".to_string(),
            ));
        }

        if !INTER_ORDER_DELAY_RANGE_MS.contains(&self.inter_order_delay_ms) {
            return Err(AppError::Config(format!(
                "inter_order_delay_ms must be within 1000..=2000, got {}",
                self.inter_order_delay_ms
            )));
        }

        Ok(())
    }

    pub fn quote_config(&self) -> QuoteConfig {
        QuoteConfig {
            spread_fraction: self.spread_fraction,
            price_decimals: self.price_decimals,
        }
    }

    pub fn precision(&self) -> Precision {
        Precision {
            price_decimals: self.price_decimals,
            size_decimals: self.size_decimals,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn inter_order_delay(&self) -> Duration {
        Duration::from_millis(self.inter_order_delay_ms)
    }
}
