//! ChainFusion Core Library
//!
//! Single-wallet EVM portfolio viewer: create, import or watch one wallet,
//! persist it locally and show its token balances with a USD total.
//!
//! # Architecture
//!
//! This crate provides:
//! - **wallet**: Key generation, recovery phrase and address validation
//! - **storage**: The persisted wallet session
//! - **api**: Balance sources (Moralis and demo data)
//! - **portfolio**: USD total of a token list
//! - **controller**: Setup flow and dashboard state machines
//! - **navigation**: Route resolution and redirects
//!
//! # Security
//!
//! Private keys, recovery phrases and entropy are zeroized on drop and
//! redacted from logs and `Debug` output.
//!
//! # Example
//!
//! ```rust,ignore
//! use chainfusion::controller::WalletSetupController;
//! use chainfusion::storage::{FileStore, WalletSessionStore};
//! use chainfusion::wallet::EvmKeyProvider;
//!
//! let store = WalletSessionStore::new(FileStore::new("/tmp/wallet"));
//! let mut setup = WalletSetupController::new(EvmKeyProvider::new(), store);
//! setup.choose_create()?;
//! setup.generate()?;
//! let record = setup.confirm()?;
//! println!("Address: {}", record.address);
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod navigation;
pub mod portfolio;
pub mod storage;
pub mod types;
pub mod utils;
pub mod wallet;

pub use error::{ErrorCode, WalletError, WalletResult};
pub use types::*;

pub use config::AppConfig;
pub use navigation::Route;
pub use portfolio::aggregate;
pub use utils::crypto::{keccak256, to_checksum_address};
pub use wallet::{is_valid_address, is_valid_mnemonic_format};
