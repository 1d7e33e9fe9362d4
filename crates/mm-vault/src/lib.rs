//! Wallet credential storage for the market maker.
//!
//! - `EncryptedWalletRecord`: persisted JSON form (Fernet ciphertexts)
//! - `KeySource`: where the decryption key comes from
//! - `CredentialVault`: decrypted secrets held in memory for one agent
//!
//! Decrypted secrets are wrapped in `Zeroizing` and never logged.

pub mod error;
pub mod record;
pub mod vault;

pub use error::{VaultError, VaultResult};
pub use record::EncryptedWalletRecord;
pub use vault::{CredentialVault, KeySource, WalletCredential};
