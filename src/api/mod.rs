//! Balance Sources
//!
//! The dashboard pulls token balances through `BalanceSource`. The live
//! implementation talks to the Moralis wallet API; the mock one synthesizes
//! demo data.

pub mod mock;
pub mod providers;

pub use mock::*;
pub use providers::*;

use async_trait::async_trait;

use crate::error::WalletResult;
use crate::types::TokenBalance;

/// Anything that can list the token balances of an address
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// All balances of `address`. Failures are `FetchFailed`.
    async fn fetch_balances(&self, address: &str) -> WalletResult<Vec<TokenBalance>>;
}
