//! Multi-wallet market maker - Entry Point
//!
//! `run` (default): quote every wallet in `wallets_dir` until Ctrl+C / SIGTERM.
//! `setup`: provision encrypted wallet records from stdin.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use mm_bot::{provision_wallets, AgentSupervisor, AppConfig};
use tracing::{info, warn};

/// Multi-wallet market maker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MM_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one agent per wallet until interrupted
    Run,
    /// Create encrypted wallet records (API key, secret, seed per line)
    Setup {
        /// Number of wallets to create
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
        /// Output directory (defaults to `wallets_dir` from config)
        #[arg(long)]
        wallets_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    mm_telemetry::init_logging()?;

    let config_path = AppConfig::resolve_path(args.config);
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = AppConfig::load_or_default(&config_path)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Setup { count, wallets_dir } => {
            let dir = wallets_dir.unwrap_or_else(|| config.wallets_dir.clone());
            let stdin = std::io::stdin();
            let paths = provision_wallets(&mut stdin.lock(), &mut std::io::stderr(), &dir, count)?;
            info!(count = paths.len(), dir = %dir.display(), "Wallet setup complete");
            Ok(())
        }
    }
}

async fn run(config: AppConfig) -> Result<()> {
    info!(
        "Starting market maker v{} ({} on {})",
        env!("CARGO_PKG_VERSION"),
        config.ticker,
        config.base_url
    );

    let supervisor = AgentSupervisor::start(&config)?;
    if supervisor.agent_count() == 0 {
        bail!(
            "no wallets could be started from {}",
            config.wallets_dir.display()
        );
    }

    info!(agents = supervisor.agent_count(), "All wallets started. Press Ctrl+C to stop.");
    shutdown_signal().await;

    supervisor.shutdown();
    let summaries = supervisor.wait().await;
    for summary in &summaries {
        info!(
            wallet = %summary.wallet,
            cycles = summary.cycles,
            orders_submitted = summary.orders_submitted,
            orders_accepted = summary.orders_accepted,
            "Agent summary"
        );
    }
    Ok(())
}

/// Resolve on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received");
}
