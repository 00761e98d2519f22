//! Wallet Session Store
//!
//! Owns the single persisted wallet record. Saving overwrites, loading fails
//! open: unreadable or corrupt data reads as "no wallet".

use zeroize::Zeroizing;

use super::KeyValueStore;
use crate::error::WalletResult;
use crate::types::WalletRecord;
use crate::wallet::normalize_address;
use crate::{log_info, log_warn};

/// Key of the one persisted wallet entry
pub const WALLET_STORAGE_KEY: &str = "chainfusion_wallet";

#[derive(Debug, Clone)]
pub struct WalletSessionStore<S> {
    backend: S,
}

impl<S: KeyValueStore> WalletSessionStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Persist `record` as the only wallet, replacing any previous one
    pub fn save(&self, record: &WalletRecord) -> WalletResult<()> {
        let json = Zeroizing::new(serde_json::to_string(record)?);

        self.backend.set(WALLET_STORAGE_KEY, json.as_str())?;

        log_info!("storage", "Wallet saved", address = record.address, kind = format!("{:?}", record.kind()));
        Ok(())
    }

    /// The persisted wallet, or `None` when absent or unreadable
    pub fn load(&self) -> Option<WalletRecord> {
        let raw = match self.backend.get(WALLET_STORAGE_KEY) {
            Ok(Some(raw)) => Zeroizing::new(raw),
            Ok(None) => return None,
            Err(e) => {
                log_warn!("storage", "Wallet storage unreadable, treating as empty", error = e);
                return None;
            }
        };

        let record: WalletRecord = match serde_json::from_str(raw.as_str()) {
            Ok(record) => record,
            Err(e) => {
                log_warn!("storage", "Stored wallet is corrupt, treating as empty", error = e);
                return None;
            }
        };

        if normalize_address(&record.address).is_none() {
            log_warn!("storage", "Stored wallet has a malformed address, treating as empty");
            return None;
        }

        Some(record)
    }

    /// True iff `load` would return a record
    pub fn exists(&self) -> bool {
        self.load().is_some()
    }

    /// Remove the persisted wallet; clearing an empty store succeeds
    pub fn clear(&self) -> WalletResult<()> {
        self.backend.remove(WALLET_STORAGE_KEY)?;
        log_info!("storage", "Wallet cleared");
        Ok(())
    }
}
