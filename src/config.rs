//! Application Configuration
//!
//! Where the wallet is stored, which balance API to call, and how often the
//! dashboard refreshes. Endpoint URLs are validated before use.

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{WalletError, WalletResult};

pub const DEFAULT_MORALIS_BASE_URL: &str = "https://deep-index.moralis.io/api/v2.2";

/// Ethereum mainnet, as a hex chain id
pub const DEFAULT_CHAIN: &str = "0x1";

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Directory name used under the home directory when none is given
const DEFAULT_HOME_DIR: &str = ".chainfusion";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the persisted wallet
    pub storage_dir: PathBuf,
    pub moralis_api_key: Option<String>,
    pub moralis_base_url: String,
    pub chain: String,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            moralis_api_key: None,
            moralis_base_url: DEFAULT_MORALIS_BASE_URL.to_string(),
            chain: DEFAULT_CHAIN.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Check every field, returning the first problem found
    pub fn validate(&self) -> WalletResult<()> {
        validate_endpoint(&self.moralis_base_url)?;

        let chain_hex = self
            .chain
            .strip_prefix("0x")
            .ok_or_else(|| WalletError::config("Chain id must be 0x-prefixed hex"))?;
        if chain_hex.is_empty() || !chain_hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WalletError::config(format!("Invalid chain id: {}", self.chain)));
        }

        if self.refresh_interval.is_zero() {
            return Err(WalletError::config("Refresh interval must be positive"));
        }
        if self.request_timeout.is_zero() {
            return Err(WalletError::config("Request timeout must be positive"));
        }

        Ok(())
    }
}

/// `$HOME/.chainfusion`, or `./.chainfusion` when no home directory is set
pub fn default_storage_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_HOME_DIR)
}

/// API endpoints must be HTTPS, except on loopback hosts
pub fn validate_endpoint(url: &str) -> WalletResult<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| WalletError::config(format!("Invalid URL format: {}", e)))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| WalletError::config("URL has no host"))?;
    let is_loopback = matches!(host, "localhost" | "127.0.0.1" | "[::1]");

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if is_loopback => Ok(parsed),
        scheme => Err(WalletError::config(format!(
            "Endpoint must use HTTPS, got {}",
            scheme
        ))),
    }
}
