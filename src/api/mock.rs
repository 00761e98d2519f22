//! Demo Balance Source
//!
//! Synthesizes a fixed token list with random balances and no pricing, for
//! exploring the dashboard without an API key.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

use super::BalanceSource;
use crate::error::WalletResult;
use crate::types::TokenBalance;

/// Static description of a demo token
#[derive(Debug, Clone, Copy)]
pub struct DemoToken {
    pub symbol: &'static str,
    pub name: &'static str,
    /// Empty for the native asset
    pub contract_address: &'static str,
    pub icon_url: &'static str,
}

pub const NATIVE_DEMO_TOKEN: DemoToken = DemoToken {
    symbol: "BNB",
    name: "Binance Coin",
    contract_address: "",
    icon_url: "https://cryptologos.cc/logos/bnb-bnb-logo.png",
};

/// Common BEP-20 tokens shown in demo mode
pub const DEMO_TOKENS: [DemoToken; 4] = [
    DemoToken {
        symbol: "BUSD",
        name: "Binance USD",
        contract_address: "0xe9e7cea3dedca5984780bafc599bd69add087d56",
        icon_url: "https://cryptologos.cc/logos/binance-usd-busd-logo.png",
    },
    DemoToken {
        symbol: "CAKE",
        name: "PancakeSwap",
        contract_address: "0x0e09fabb73bd3ade0a17ecc321fd13a19e81ce82",
        icon_url: "https://cryptologos.cc/logos/pancakeswap-cake-logo.png",
    },
    DemoToken {
        symbol: "USDT",
        name: "Tether USD",
        contract_address: "0x55d398326f99059ff775485246999027b3197955",
        icon_url: "https://cryptologos.cc/logos/tether-usdt-logo.png",
    },
    DemoToken {
        symbol: "ETH",
        name: "Ethereum Token",
        contract_address: "0x2170ed0880ac9a755fd29b2688956bd959f933f8",
        icon_url: "https://cryptologos.cc/logos/ethereum-eth-logo.png",
    },
];

/// Fixed native balance of the demo wallet
const NATIVE_DEMO_BALANCE: &str = "0.05";
const NATIVE_DEMO_BALANCE_RAW: &str = "50000000000000000";

pub struct MockBalanceSource {
    rng: Mutex<StdRng>,
}

impl Default for MockBalanceSource {
    fn default() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl MockBalanceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reproducible balances for a given seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// The native token plus every demo token, with fresh random balances
    pub fn demo_tokens(&self) -> Vec<TokenBalance> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let native = TokenBalance {
            symbol: NATIVE_DEMO_TOKEN.symbol.to_string(),
            name: NATIVE_DEMO_TOKEN.name.to_string(),
            balance: NATIVE_DEMO_BALANCE.to_string(),
            balance_raw: NATIVE_DEMO_BALANCE_RAW.to_string(),
            contract_address: String::new(),
            usd_price: None,
            usd_price_change: None,
            usd_value: None,
            icon_url: Some(NATIVE_DEMO_TOKEN.icon_url.to_string()),
        };

        let template: Vec<TokenBalance> = DEMO_TOKENS
            .iter()
            .map(|token| TokenBalance {
                symbol: token.symbol.to_string(),
                name: token.name.to_string(),
                balance: "0".to_string(),
                balance_raw: String::new(),
                contract_address: token.contract_address.to_string(),
                usd_price: None,
                usd_price_change: None,
                usd_value: None,
                icon_url: Some(token.icon_url.to_string()),
            })
            .collect();

        std::iter::once(native)
            .chain(randomize_balances(&template, &mut *rng))
            .collect()
    }
}

#[async_trait]
impl BalanceSource for MockBalanceSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_balances(&self, _address: &str) -> WalletResult<Vec<TokenBalance>> {
        Ok(self.demo_tokens())
    }
}

/// Re-roll the balance of every token, dropping raw amount and pricing
pub fn randomize_balances<R: Rng>(tokens: &[TokenBalance], rng: &mut R) -> Vec<TokenBalance> {
    tokens
        .iter()
        .map(|token| TokenBalance {
            balance: random_balance(rng),
            balance_raw: String::new(),
            usd_price: None,
            usd_value: None,
            ..token.clone()
        })
        .collect()
}

fn random_balance<R: Rng>(rng: &mut R) -> String {
    format!("{:.4}", rng.gen::<f64>())
}
