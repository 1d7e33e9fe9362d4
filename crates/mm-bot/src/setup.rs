//! Wallet provisioning.
//!
//! For each of `count` wallets, reads three lines (API key, API secret,
//! seed phrase) and writes `wallet{i}.json` encrypted under a fresh key.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use mm_vault::{EncryptedWalletRecord, WalletCredential};
use tracing::info;
use zeroize::Zeroizing;

use crate::error::{AppError, AppResult};

/// Read one line, prompting first. End of input is an error.
fn read_field<R: BufRead, W: Write>(
    input: &mut R,
    prompt: &mut W,
    label: &str,
) -> AppResult<Zeroizing<String>> {
    write!(prompt, "{label}: ")?;
    prompt.flush()?;

    let mut line = Zeroizing::new(String::new());
    if input.read_line(&mut line)? == 0 {
        return Err(AppError::Setup(format!("unexpected end of input reading {label}")));
    }
    let value = line.trim();
    if value.is_empty() {
        return Err(AppError::Setup(format!("{label} must not be empty")));
    }
    Ok(Zeroizing::new(value.to_string()))
}

/// Provision `count` wallets into `dir`, returning the written paths.
///
/// # Errors
/// Returns `AppError::Setup` on short or empty input and `AppError::Io` /
/// `AppError::Vault` if a record cannot be written.
pub fn provision_wallets<R: BufRead, W: Write>(
    input: &mut R,
    prompt: &mut W,
    dir: &Path,
    count: u32,
) -> AppResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(count as usize);
    for i in 1..=count {
        let name = format!("wallet{i}");
        writeln!(prompt, "\nWallet {i}")?;

        let api_key = read_field(input, prompt, "API Key")?;
        let api_secret = read_field(input, prompt, "API Secret")?;
        let seed = read_field(input, prompt, "Wallet Seed")?;

        let credential =
            WalletCredential::new(name.clone(), api_key.as_str(), api_secret.as_str(), seed.as_str());
        let record = EncryptedWalletRecord::seal_with_fresh_key(&credential)?;

        let path = dir.join(format!("{name}.json"));
        record.save(&path)?;
        info!(wallet = %name, path = %path.display(), "Wallet saved");
        written.push(path);
    }

    Ok(written)
}
