//! In-memory credential vault.
//!
//! Security notes:
//! - Secrets are decrypted once at agent start and live only here.
//! - Every secret is `Zeroizing`, wiped when the agent's vault is dropped.
//! - `Debug` output is redacted; never log credential material.

use std::fmt;
use std::path::PathBuf;

use fernet::Fernet;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};
use crate::record::EncryptedWalletRecord;

/// Source of the symmetric key that decrypts a wallet record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeySource {
    /// Use the key stored inside the record itself (legacy layout).
    #[default]
    Embedded,
    /// Load from environment variable.
    EnvVar { var_name: String },
    /// Load from file (recommend 0600 permissions).
    File { path: PathBuf },
}

impl KeySource {
    /// Resolve the Fernet key for `record`.
    ///
    /// # Errors
    /// Returns `VaultError` if the key cannot be found or read.
    pub fn resolve(&self, record: &EncryptedWalletRecord) -> VaultResult<Zeroizing<String>> {
        let key = match self {
            Self::Embedded => record
                .encryption_key
                .clone()
                .ok_or(VaultError::MissingKey)?,
            Self::EnvVar { var_name } => std::env::var(var_name)
                .map_err(|_| VaultError::EnvVarNotFound(var_name.clone()))?,
            Self::File { path } => std::fs::read_to_string(path)?,
        };
        Ok(Zeroizing::new(key.trim().to_string()))
    }
}

/// Plaintext credentials for one wallet.
pub struct WalletCredential {
    name: String,
    api_key: Zeroizing<String>,
    api_secret: Zeroizing<String>,
    wallet_seed: Zeroizing<String>,
}

impl WalletCredential {
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        wallet_seed: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            api_key: Zeroizing::new(api_key.into()),
            api_secret: Zeroizing::new(api_secret.into()),
            wallet_seed: Zeroizing::new(wallet_seed.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    pub fn wallet_seed(&self) -> &str {
        &self.wallet_seed
    }
}

impl fmt::Debug for WalletCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCredential")
            .field("name", &self.name)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("wallet_seed", &"<redacted>")
            .finish()
    }
}

/// Holds one wallet's decrypted credentials for the lifetime of an agent.
#[derive(Debug)]
pub struct CredentialVault {
    credential: WalletCredential,
}

impl CredentialVault {
    /// Decrypt `record` with the key from `key_source`.
    ///
    /// # Errors
    /// Returns `VaultError` if the key is missing or invalid, or any
    /// ciphertext fails to decrypt.
    pub fn open(record: &EncryptedWalletRecord, key_source: &KeySource) -> VaultResult<Self> {
        let key = key_source.resolve(record)?;
        let fernet = Fernet::new(&key).ok_or(VaultError::InvalidKey)?;

        let decrypt = |field: &'static str, token: &str| -> VaultResult<String> {
            let bytes = Zeroizing::new(
                fernet
                    .decrypt(token)
                    .map_err(|_| VaultError::Decryption(field))?,
            );
            String::from_utf8(bytes.to_vec()).map_err(|_| VaultError::InvalidUtf8(field))
        };

        let credential = WalletCredential::new(
            record.name.clone(),
            decrypt("api_key", &record.api_key_ciphertext)?,
            decrypt("api_secret", &record.api_secret_ciphertext)?,
            decrypt("wallet_seed", &record.wallet_seed_ciphertext)?,
        );

        Ok(Self { credential })
    }

    /// Wrap credentials that are already in memory.
    pub fn from_credential(credential: WalletCredential) -> Self {
        Self { credential }
    }

    pub fn name(&self) -> &str {
        self.credential.name()
    }

    pub fn credential(&self) -> &WalletCredential {
        &self.credential
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> WalletCredential {
        WalletCredential::new(
            "wallet1",
            "key-123",
            "secret-456",
            "test test test test test test test test test test test junk",
        )
    }

    #[test]
    fn test_seal_then_open_round_trip() {
        let key = Fernet::generate_key();
        let record = EncryptedWalletRecord::seal(&credential(), &key).unwrap();

        let vault = CredentialVault::open(&record, &KeySource::Embedded).unwrap();
        let opened = vault.credential();
        assert_eq!(opened.name(), "wallet1");
        assert_eq!(opened.api_key(), "key-123");
        assert_eq!(opened.api_secret(), "secret-456");
        assert_eq!(
            opened.wallet_seed(),
            "test test test test test test test test test test test junk"
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let record = EncryptedWalletRecord::seal(&credential(), &Fernet::generate_key()).unwrap();
        let other = KeySource::EnvVar {
            var_name: "MM_VAULT_TEST_WRONG_KEY".to_string(),
        };
        std::env::set_var("MM_VAULT_TEST_WRONG_KEY", Fernet::generate_key());

        let err = CredentialVault::open(&record, &other).unwrap_err();
        assert!(matches!(err, VaultError::Decryption("api_key")));
    }

    #[test]
    fn test_detached_record_needs_external_key() {
        let key = Fernet::generate_key();
        let record = EncryptedWalletRecord::seal_detached(&credential(), &key).unwrap();
        assert!(record.encryption_key.is_none());

        let err = CredentialVault::open(&record, &KeySource::Embedded).unwrap_err();
        assert!(matches!(err, VaultError::MissingKey));

        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("master.key");
        std::fs::write(&key_path, format!("{key}\n")).unwrap();

        let vault = CredentialVault::open(&record, &KeySource::File { path: key_path }).unwrap();
        assert_eq!(vault.credential().api_secret(), "secret-456");
    }

    #[test]
    fn test_invalid_key_rejected() {
        let mut record =
            EncryptedWalletRecord::seal(&credential(), &Fernet::generate_key()).unwrap();
        record.encryption_key = Some("not-a-fernet-key".to_string());

        let err = CredentialVault::open(&record, &KeySource::Embedded).unwrap_err();
        assert!(matches!(err, VaultError::InvalidKey));
    }

    #[test]
    fn test_debug_is_redacted() {
        let rendered = format!("{:?}", credential());
        assert!(rendered.contains("wallet1"));
        assert!(!rendered.contains("secret-456"));
        assert!(!rendered.contains("junk"));
    }
}
