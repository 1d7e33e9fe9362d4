//! Agent supervision.
//!
//! Loads every wallet record in `wallets_dir`, starts one quoting loop per
//! wallet that opens cleanly, and shares a single cancellation token across
//! all of them. A wallet that fails to load, decrypt or connect is reported
//! and left out; it never prevents the others from starting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mm_exchange::{ClientConfig, Exchange, ExchangeClient};
use mm_telemetry::Metrics;
use mm_vault::{CredentialVault, EncryptedWalletRecord, KeySource};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::{AgentSummary, MarketMakerLoop};
use crate::config::AppConfig;
use crate::error::AppResult;

/// A wallet that could not be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Per-wallet startup outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    /// Names of running agents.
    pub started: Vec<String>,
    pub failed: Vec<WalletFailure>,
}

/// Wallet records found in a directory, in file-name order.
///
/// # Errors
/// Returns `AppError::Io` if the directory cannot be listed.
pub fn wallet_paths(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load and decrypt one wallet record.
///
/// # Errors
/// Returns `AppError::Vault` if the record is unreadable, malformed or
/// cannot be decrypted.
pub fn open_wallet(path: &Path, key_source: &KeySource) -> AppResult<CredentialVault> {
    let record = EncryptedWalletRecord::load(path)?;
    Ok(CredentialVault::open(&record, key_source)?)
}

/// Runs one `MarketMakerLoop` per wallet.
pub struct AgentSupervisor {
    cancel: CancellationToken,
    agents: Vec<(String, JoinHandle<AgentSummary>)>,
    report: StartupReport,
}

impl AgentSupervisor {
    /// Start agents for every wallet in `config.wallets_dir`, each with its
    /// own HTTP client.
    ///
    /// # Errors
    /// Returns `AppError::Config` if `config` fails validation and
    /// `AppError::Io` if the wallets directory cannot be listed.
    pub fn start(config: &AppConfig) -> AppResult<Self> {
        let client_config = ClientConfig {
            base_url: config.base_url.clone(),
            timeout: config.request_timeout(),
            sign_market_data: config.sign_market_data,
        };

        Self::start_with(config, move |vault| {
            let client = ExchangeClient::new(client_config.clone(), Arc::new(vault))?;
            Ok(Arc::new(client) as Arc<dyn Exchange>)
        })
    }

    /// Start agents with a custom exchange per wallet.
    ///
    /// # Errors
    /// Returns `AppError::Config` if `config` fails validation and
    /// `AppError::Io` if the wallets directory cannot be listed.
    pub fn start_with<F>(config: &AppConfig, connect: F) -> AppResult<Self>
    where
        F: Fn(CredentialVault) -> AppResult<Arc<dyn Exchange>>,
    {
        config.validate()?;
        let paths = wallet_paths(&config.wallets_dir)?;
        info!(
            wallets_dir = %config.wallets_dir.display(),
            count = paths.len(),
            "Loading wallets"
        );

        let cancel = CancellationToken::new();
        let mut supervisor = Self {
            cancel,
            agents: Vec::with_capacity(paths.len()),
            report: StartupReport::default(),
        };

        for path in paths {
            match Self::prepare(&path, config, &connect) {
                Ok(agent) => supervisor.spawn(agent),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Wallet excluded from run");
                    supervisor.report.failed.push(WalletFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            started = supervisor.report.started.len(),
            failed = supervisor.report.failed.len(),
            "Agents started"
        );
        Ok(supervisor)
    }

    fn prepare<F>(path: &Path, config: &AppConfig, connect: &F) -> AppResult<MarketMakerLoop>
    where
        F: Fn(CredentialVault) -> AppResult<Arc<dyn Exchange>>,
    {
        let vault = open_wallet(path, &config.key_source)?;
        let name = vault.name().to_string();
        let exchange = connect(vault)?;
        MarketMakerLoop::new(name, exchange, config)
    }

    fn spawn(&mut self, agent: MarketMakerLoop) {
        let name = agent.name().to_string();
        let cancel = self.cancel.clone();

        Metrics::agent_started();
        let handle = tokio::spawn(async move {
            let summary = agent.run(cancel).await;
            Metrics::agent_stopped();
            summary
        });

        self.report.started.push(name.clone());
        self.agents.push((name, handle));
    }

    pub fn report(&self) -> &StartupReport {
        &self.report
    }

    /// Number of running agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Token shared by every agent.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signal every agent to stop.
    pub fn shutdown(&self) {
        info!(agents = self.agents.len(), "Shutdown requested");
        self.cancel.cancel();
    }

    /// Wait for every agent to stop.
    pub async fn wait(self) -> Vec<AgentSummary> {
        let mut summaries = Vec::with_capacity(self.agents.len());
        for (name, handle) in self.agents {
            match handle.await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    warn!(wallet = %name, error = %e, "Agent task ended abnormally");
                    Metrics::agent_stopped();
                }
            }
        }
        info!(stopped = summaries.len(), "All agents stopped");
        summaries
    }
}

