//! Key Generation
//!
//! Creates Ethereum key material from entropy, a recovery phrase, or a raw
//! private key.
//!
//! SECURITY: All sensitive data (entropy, seeds, phrases) is zeroized on drop.

use bip39::Mnemonic;
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::Network;
use ethers_signers::{LocalWallet, Signer};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{WalletError, WalletResult};
use crate::types::WalletRecord;
use crate::utils::crypto::address_from_public_key;

use super::validation::ALLOWED_WORD_COUNTS;

/// BIP-44 path of the first Ethereum account
pub const ETHEREUM_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// Address plus secret key material produced by a provider
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    pub address: String,
    pub private_key: String,
    pub mnemonic: Option<String>,
}

impl KeyMaterial {
    /// Convert into a wallet record; the phrase is kept only if present
    pub fn to_record(&self) -> WalletRecord {
        match &self.mnemonic {
            Some(phrase) => WalletRecord::generated(
                self.address.clone(),
                self.private_key.clone(),
                phrase.clone(),
            ),
            None => WalletRecord::imported(self.address.clone(), self.private_key.clone()),
        }
    }

    /// Same key material without the recovery phrase
    pub fn without_mnemonic(&self) -> KeyMaterial {
        KeyMaterial {
            address: self.address.clone(),
            private_key: self.private_key.clone(),
            mnemonic: None,
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("address", &self.address)
            .field("private_key", &"[REDACTED]")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Source of key material for the setup flow.
///
/// Implementations are pure functions of their inputs (apart from the
/// randomness consumed by `generate`).
pub trait KeyMaterialProvider: Send + Sync {
    /// Fail with `UnsupportedEnvironment` when secure random bytes are unavailable
    fn ensure_secure_randomness(&self) -> WalletResult<()>;

    /// Generate a new key pair and recovery phrase
    fn generate(&self) -> WalletResult<KeyMaterial>;

    /// Derive the key pair of a recovery phrase
    fn from_mnemonic(&self, phrase: &str) -> WalletResult<KeyMaterial>;

    /// Derive the address of a raw hex private key
    fn from_private_key(&self, private_key: &str) -> WalletResult<KeyMaterial>;
}

/// BIP-39 / BIP-44 provider for Ethereum-compatible chains
#[derive(Debug, Clone)]
pub struct EvmKeyProvider {
    word_count: usize,
}

impl Default for EvmKeyProvider {
    fn default() -> Self {
        Self { word_count: 12 }
    }
}

impl EvmKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate phrases of `word_count` words (12, 15, 18, 21 or 24)
    pub fn with_word_count(word_count: usize) -> WalletResult<Self> {
        if !ALLOWED_WORD_COUNTS.contains(&word_count) {
            return Err(WalletError::config(format!(
                "Unsupported recovery phrase length: {} words",
                word_count
            )));
        }
        Ok(Self { word_count })
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    // 12 words = 128 bits, each 3 extra words add 32 bits
    fn entropy_len(&self) -> usize {
        self.word_count * 4 / 3
    }
}

impl KeyMaterialProvider for EvmKeyProvider {
    fn ensure_secure_randomness(&self) -> WalletResult<()> {
        let mut sample = Zeroizing::new([0u8; 32]);
        OsRng.try_fill_bytes(sample.as_mut()).map_err(|e| {
            WalletError::unsupported_environment(
                "This platform doesn't support secure wallet generation",
            )
            .with_details(e.to_string())
        })
    }

    fn generate(&self) -> WalletResult<KeyMaterial> {
        let mut entropy = Zeroizing::new(vec![0u8; self.entropy_len()]);
        OsRng.try_fill_bytes(entropy.as_mut_slice()).map_err(|e| {
            WalletError::unsupported_environment(
                "This platform doesn't support secure wallet generation",
            )
            .with_details(e.to_string())
        })?;

        let mnemonic = Mnemonic::from_entropy(entropy.as_slice())
            .map_err(|e| WalletError::generation_failed(format!("Failed to create mnemonic: {}", e)))?;

        let phrase = Zeroizing::new(mnemonic.to_string());
        let seed = Zeroizing::new(mnemonic.to_seed(""));

        let (private_key, address) = derive_ethereum_key(seed.as_ref())
            .map_err(|e| WalletError::generation_failed("Failed to derive wallet keys").with_details(e.message.clone()))?;

        Ok(KeyMaterial {
            address,
            private_key: private_key.to_string(),
            mnemonic: Some(phrase.to_string()),
        })
    }

    fn from_mnemonic(&self, phrase: &str) -> WalletResult<KeyMaterial> {
        let normalized = Zeroizing::new(
            phrase
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(" "),
        );

        let mnemonic = Mnemonic::parse(normalized.as_str())?;

        let seed = Zeroizing::new(mnemonic.to_seed(""));
        let (private_key, address) = derive_ethereum_key(seed.as_ref())?;

        Ok(KeyMaterial {
            address,
            private_key: private_key.to_string(),
            mnemonic: Some(normalized.to_string()),
        })
    }

    fn from_private_key(&self, private_key: &str) -> WalletResult<KeyMaterial> {
        let trimmed = private_key.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let bytes = Zeroizing::new(hex::decode(hex_part)?);
        if bytes.len() != 32 {
            return Err(WalletError::invalid_private_key(
                "Private key must be 32 bytes of hex",
            ));
        }

        let wallet = LocalWallet::from_bytes(bytes.as_slice())
            .map_err(|e| WalletError::invalid_private_key(format!("Invalid private key: {}", e)))?;

        Ok(KeyMaterial {
            address: ethers_core::utils::to_checksum(&wallet.address(), None),
            private_key: format!("0x{}", hex_part.to_lowercase()),
            mnemonic: None,
        })
    }
}

/// Derive the first Ethereum account from a BIP-39 seed.
///
/// Returns the `0x`-prefixed private key and the checksummed address.
fn derive_ethereum_key(seed: &[u8]) -> WalletResult<(Zeroizing<String>, String)> {
    let secp = Secp256k1::new();
    let master = Xpriv::new_master(Network::Bitcoin, seed)?;
    let path = DerivationPath::from_str(ETHEREUM_DERIVATION_PATH)?;
    let child = master.derive_priv(&secp, &path)?;
    let secret_key = child.private_key;

    let private_key = Zeroizing::new(format!("0x{}", hex::encode(secret_key.secret_bytes())));
    let uncompressed = secret_key.public_key(&secp).serialize_uncompressed();
    let address = address_from_public_key(&uncompressed[1..]);

    Ok((private_key, address))
}
