//! Unified error types for the wallet core
//!
//! Every collaborator failure is converted into a `WalletError` at the
//! controller boundary so the rendering layer only ever sees a code and a
//! user-facing message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all wallet operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl WalletError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn unsupported_environment(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedEnvironment, msg)
    }

    pub fn generation_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::GenerationFailed, msg)
    }

    pub fn invalid_mnemonic_format(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMnemonicFormat, msg)
    }

    pub fn invalid_mnemonic(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMnemonic, msg)
    }

    pub fn invalid_private_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPrivateKey, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FetchFailed, msg)
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransition, msg)
    }

    pub fn session_missing(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SessionMissing, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Config, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for WalletError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Environment / key material
    UnsupportedEnvironment,
    GenerationFailed,

    // Input errors
    InvalidMnemonicFormat,
    InvalidMnemonic,
    InvalidPrivateKey,
    InvalidAddress,

    // Storage
    PersistenceUnavailable,
    SessionMissing,

    // Network
    FetchFailed,

    // Flow
    InvalidTransition,

    // Internal
    Config,
    Internal,
}

/// Result type alias for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

// Conversions from common error types

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::new(ErrorCode::Internal, e.to_string())
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(e: hex::FromHexError) -> Self {
        WalletError::new(ErrorCode::InvalidPrivateKey, format!("Hex error: {}", e))
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WalletError::new(ErrorCode::FetchFailed, "Request timed out")
        } else if e.is_connect() {
            WalletError::new(ErrorCode::FetchFailed, "Connection failed")
        } else {
            WalletError::new(ErrorCode::FetchFailed, e.to_string())
        }
    }
}

impl From<bitcoin::bip32::Error> for WalletError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        WalletError::new(ErrorCode::GenerationFailed, format!("BIP32 error: {}", e))
    }
}

impl From<bip39::Error> for WalletError {
    fn from(e: bip39::Error) -> Self {
        WalletError::new(ErrorCode::InvalidMnemonic, format!("BIP39 error: {}", e))
    }
}

impl From<crate::storage::StorageError> for WalletError {
    fn from(e: crate::storage::StorageError) -> Self {
        WalletError::new(ErrorCode::PersistenceUnavailable, "Wallet storage is unavailable")
            .with_details(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = WalletError::invalid_mnemonic_format("Invalid mnemonic phrase format")
            .with_details("11 words");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("invalid_mnemonic_format"));
        assert!(json.contains("11 words"));
    }

    #[test]
    fn test_display_includes_details() {
        let err = WalletError::fetch_failed("Balance request failed").with_details("HTTP 500");
        assert_eq!(
            err.to_string(),
            "[FetchFailed] Balance request failed (HTTP 500)"
        );
    }
}
