//! Wallet attestation of order content.
//!
//! The wallet key is derived from the BIP-39 seed phrase along the standard
//! Ethereum path `m/44'/60'/0'/0/0`. The order is described by a
//! human-readable message:
//!
//! ```text
//! {SIDE} {quantity} {TICKER} @PRICE: {price}
//! ```
//!
//! where `price` is the wire limit price, or the literal `MARKET` for market
//! orders. The message is signed with EIP-191 personal-message signing
//! (`keccak256("\x19Ethereum Signed Message:\n" || len || message)`) and the
//! 65-byte `r || s || v` signature is sent as `0x`-prefixed hex with
//! `v ∈ {27, 28}`.

use alloy::primitives::{Address, PrimitiveSignature};
use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use alloy::signers::Signer as AlloySigner;
use mm_core::{Attestation, OrderIntent, OrderType};
use thiserror::Error;
use zeroize::Zeroizing;

/// Attestation errors.
#[derive(Debug, Error)]
pub enum AttestError {
    #[error("Invalid seed phrase: {0}")]
    InvalidSeed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(#[from] alloy::signers::Error),

    #[error("Invalid signature encoding: {0}")]
    InvalidSignature(String),
}

/// Signs order messages with the wallet key.
///
/// The derived key lives in the `PrivateKeySigner`; derive once per agent
/// and reuse, since BIP-39 seed stretching is deliberately slow.
pub struct OrderAttestor {
    signer: PrivateKeySigner,
}

impl std::fmt::Debug for OrderAttestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderAttestor")
            .field("address", &self.signer.address())
            .finish()
    }
}

impl OrderAttestor {
    /// Derive the wallet key from a seed phrase.
    ///
    /// # Errors
    /// Returns `AttestError::InvalidSeed` if the phrase is not a valid
    /// BIP-39 English mnemonic.
    pub fn from_seed(seed_phrase: &str) -> Result<Self, AttestError> {
        // Normalize whitespace so "a  b\n" and "a b" derive the same key
        let phrase = Zeroizing::new(seed_phrase.split_whitespace().collect::<Vec<_>>().join(" "));

        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.as_str())
            .index(0u32)
            .map_err(|e| AttestError::InvalidSeed(e.to_string()))?
            .build()
            .map_err(|e| AttestError::InvalidSeed(e.to_string()))?;

        Ok(Self { signer })
    }

    /// Address of the derived wallet key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Human-readable message describing `order`.
    pub fn message(order: &OrderIntent) -> String {
        let price = match order.order_type {
            OrderType::Limit => order.price.to_fixed(order.precision.price_decimals),
            OrderType::Market => "MARKET".to_string(),
        };
        format!(
            "{} {} {} @PRICE: {}",
            order.side,
            order.quantity_field(),
            order.ticker,
            price
        )
    }

    /// Build and sign the message for `order`.
    ///
    /// # Errors
    /// Returns `AttestError::SigningFailed` if the signer fails.
    pub async fn attest(&self, order: &OrderIntent) -> Result<Attestation, AttestError> {
        let message = Self::message(order);
        // NOTE: Do not log the signature
        let signature = self.signer.sign_message(message.as_bytes()).await?;
        Ok(Attestation {
            message,
            signature: encode_signature(&signature),
        })
    }

    /// Derive from `seed_phrase` and attest `order` in one step.
    ///
    /// # Errors
    /// Returns `AttestError` if derivation or signing fails.
    pub async fn attest_with_seed(
        order: &OrderIntent,
        seed_phrase: &str,
    ) -> Result<Attestation, AttestError> {
        Self::from_seed(seed_phrase)?.attest(order).await
    }

    /// Recover the signer of `message` from a `0x`-prefixed signature.
    ///
    /// # Errors
    /// Returns `AttestError::InvalidSignature` if the signature is malformed
    /// or recovery fails.
    pub fn recover(message: &str, signature_hex: &str) -> Result<Address, AttestError> {
        let bytes = hex::decode(signature_hex.trim_start_matches("0x"))
            .map_err(|e| AttestError::InvalidSignature(e.to_string()))?;
        let signature = PrimitiveSignature::try_from(bytes.as_slice())
            .map_err(|e| AttestError::InvalidSignature(e.to_string()))?;
        signature
            .recover_address_from_msg(message.as_bytes())
            .map_err(|e| AttestError::InvalidSignature(e.to_string()))
    }

    /// Check that `signature_hex` over `message` was produced by `expected`.
    pub fn verify(message: &str, signature_hex: &str, expected: Address) -> bool {
        Self::recover(message, signature_hex).is_ok_and(|address| address == expected)
    }
}

/// Encode as `0x` + hex(r || s || v), normalizing v from parity (0/1) to 27/28.
fn encode_signature(signature: &PrimitiveSignature) -> String {
    let mut bytes = signature.as_bytes();
    if bytes[64] < 27 {
        bytes[64] += 27;
    }
    format!("0x{}", hex::encode(bytes))
}
