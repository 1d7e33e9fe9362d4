//! Persisted wallet record.
//!
//! On-disk layout (kept for compatibility with existing wallet files):
//!
//! ```json
//! {
//!   "name": "wallet1",
//!   "_key": "<fernet key>",
//!   "api_key": "<fernet token>",
//!   "api_secret": "<fernet token>",
//!   "wallet_seed": "<fernet token>"
//! }
//! ```
//!
//! The camelCase names (`encryptionKey`, `apiKeyCiphertext`, ...) are
//! accepted on read. A record written with `seal_detached` omits `_key`
//! and must be opened with an external `KeySource`.

use std::path::Path;

use fernet::Fernet;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};
use crate::vault::WalletCredential;

/// Encrypted form of a `WalletCredential`. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedWalletRecord {
    pub name: String,
    #[serde(
        rename = "_key",
        alias = "encryptionKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub encryption_key: Option<String>,
    #[serde(rename = "api_key", alias = "apiKeyCiphertext")]
    pub api_key_ciphertext: String,
    #[serde(rename = "api_secret", alias = "apiSecretCiphertext")]
    pub api_secret_ciphertext: String,
    #[serde(rename = "wallet_seed", alias = "walletSeedCiphertext")]
    pub wallet_seed_ciphertext: String,
}

impl EncryptedWalletRecord {
    /// Encrypt `credential` with `key` and store the key alongside.
    ///
    /// # Errors
    /// Returns `VaultError::InvalidKey` if `key` is not a Fernet key.
    pub fn seal(credential: &WalletCredential, key: &str) -> VaultResult<Self> {
        let mut record = Self::seal_detached(credential, key)?;
        record.encryption_key = Some(key.to_string());
        Ok(record)
    }

    /// Encrypt `credential` with a newly generated key stored alongside.
    ///
    /// # Errors
    /// Returns `VaultError` only if the generated key is rejected.
    pub fn seal_with_fresh_key(credential: &WalletCredential) -> VaultResult<Self> {
        let key = Zeroizing::new(Fernet::generate_key());
        Self::seal(credential, &key)
    }

    /// Encrypt `credential` with `key` without storing the key.
    ///
    /// # Errors
    /// Returns `VaultError::InvalidKey` if `key` is not a Fernet key.
    pub fn seal_detached(credential: &WalletCredential, key: &str) -> VaultResult<Self> {
        let fernet = Fernet::new(key).ok_or(VaultError::InvalidKey)?;
        Ok(Self {
            name: credential.name().to_string(),
            encryption_key: None,
            api_key_ciphertext: fernet.encrypt(credential.api_key().as_bytes()),
            api_secret_ciphertext: fernet.encrypt(credential.api_secret().as_bytes()),
            wallet_seed_ciphertext: fernet.encrypt(credential.wallet_seed().as_bytes()),
        })
    }

    /// Read a record from a JSON file.
    ///
    /// # Errors
    /// Returns `VaultError::Read` if the file cannot be read and
    /// `VaultError::Malformed` if it is not a wallet record.
    pub fn load(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| VaultError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let record: Self = serde_json::from_str(&content)
            .map_err(|e| VaultError::Malformed(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), wallet = %record.name, "Loaded wallet record");
        Ok(record)
    }

    /// Write the record as pretty JSON, owner-readable only on Unix.
    ///
    /// # Errors
    /// Returns `VaultError` on IO or serialization failure.
    pub fn save(&self, path: impl AsRef<Path>) -> VaultResult<()> {
        use std::io::Write;

        let json = serde_json::to_string_pretty(self)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path.as_ref())?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
