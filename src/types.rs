//! Core Types
//!
//! Shared data structures: the persisted wallet record and the
//! per-refresh token balance line items.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

// =============================================================================
// Wallet Record
// =============================================================================

/// The single persisted wallet session.
///
/// Stored as `{"address": .., "privateKey": .., "mnemonic": ..}`. Secret
/// fields are wiped when the record is dropped and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
}

impl WalletRecord {
    /// Record for a freshly generated wallet (address, key and phrase)
    pub fn generated(address: String, private_key: String, mnemonic: String) -> Self {
        Self {
            address,
            private_key: Some(private_key),
            mnemonic: Some(mnemonic),
        }
    }

    /// Record for an imported key (no recovery phrase is kept)
    pub fn imported(address: String, private_key: String) -> Self {
        Self {
            address,
            private_key: Some(private_key),
            mnemonic: None,
        }
    }

    /// Address-only record used for balance viewing
    pub fn watch_only(address: String) -> Self {
        Self {
            address,
            private_key: None,
            mnemonic: None,
        }
    }

    pub fn kind(&self) -> WalletKind {
        match (&self.private_key, &self.mnemonic) {
            (Some(_), Some(_)) => WalletKind::Generated,
            (Some(_), None) => WalletKind::Imported,
            _ => WalletKind::WatchOnly,
        }
    }

    pub fn is_watch_only(&self) -> bool {
        self.private_key.is_none()
    }

    pub fn has_mnemonic(&self) -> bool {
        self.mnemonic.is_some()
    }
}

impl fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRecord")
            .field("address", &self.address)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// How a wallet record came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    Generated,
    Imported,
    WatchOnly,
}

// =============================================================================
// Token Balances
// =============================================================================

/// One line of a portfolio, rebuilt on every fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub symbol: String,
    pub name: String,
    /// Human-readable quantity, already scaled by token decimals
    pub balance: String,
    /// Integer quantity in base units; empty when unavailable
    pub balance_raw: String,
    /// Empty for the chain's native asset
    pub contract_address: String,
    pub usd_price: Option<f64>,
    pub usd_price_change: Option<f64>,
    pub usd_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

impl TokenBalance {
    pub fn is_native(&self) -> bool {
        self.contract_address.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_layout() {
        let record = WalletRecord::imported(
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94".to_string(),
            "0xabc".to_string(),
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"privateKey\":\"0xabc\""));
        assert!(!json.contains("mnemonic"));
    }

    #[test]
    fn test_watch_only_omits_secrets() {
        let record = WalletRecord::watch_only("0x9858EfFD232B4033E47d90003D41EC34EcaEda94".to_string());
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"address":"0x9858EfFD232B4033E47d90003D41EC34EcaEda94"}"#);
        assert_eq!(record.kind(), WalletKind::WatchOnly);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let record = WalletRecord::generated(
            "0x01".to_string(),
            "secret-key".to_string(),
            "secret phrase".to_string(),
        );
        let debug = format!("{:?}", record);
        assert!(!debug.contains("secret-key"));
        assert!(!debug.contains("secret phrase"));
        assert_eq!(record.kind(), WalletKind::Generated);
    }
}
