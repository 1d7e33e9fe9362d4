//! Multi-wallet market maker.
//!
//! - `AgentSupervisor`: one task per wallet, shared cancellation token
//! - `MarketMakerLoop`: fetch book → quote → (balance check) → BUY → SELL → sleep
//! - `setup`: provisions encrypted wallet records

pub mod agent;
pub mod config;
pub mod error;
pub mod setup;
pub mod supervisor;

pub use agent::{
    AgentSettings, AgentSummary, Backoff, CycleReport, LoopState, MarketMakerLoop, SideOutcome,
    SkipReason, Step,
};
pub use config::{AppConfig, OrderSizeRange};
pub use error::{AppError, AppResult};
pub use setup::provision_wallets;
pub use supervisor::{AgentSupervisor, StartupReport, WalletFailure};
