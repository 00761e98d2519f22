//! Live Balance Provider
//!
//! Fetches ERC-20 and native balances with USD pricing from the Moralis
//! wallet API and maps each record into a `TokenBalance`.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

use super::BalanceSource;
use crate::config::AppConfig;
use crate::error::{WalletError, WalletResult};
use crate::types::TokenBalance;
use crate::log_debug;

/// Placeholder contract address some indexers report for the native asset
const NATIVE_TOKEN_PLACEHOLDER: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";

/// Longest slice of an error body kept in error details
const MAX_ERROR_BODY: usize = 200;

/// Moralis-backed `BalanceSource`
pub struct MoralisBalanceFetcher {
    client: reqwest::Client,
    base_url: String,
    chain: String,
    api_key: Option<String>,
}

impl fmt::Debug for MoralisBalanceFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoralisBalanceFetcher")
            .field("base_url", &self.base_url)
            .field("chain", &self.chain)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl MoralisBalanceFetcher {
    pub fn new(
        base_url: impl Into<String>,
        chain: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> WalletResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("ChainFusion/0.1")
            .build()
            .map_err(|e| WalletError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chain: chain.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn from_config(config: &AppConfig) -> WalletResult<Self> {
        Self::new(
            config.moralis_base_url.as_str(),
            config.chain.as_str(),
            config.moralis_api_key.clone(),
            config.request_timeout,
        )
    }

    fn balances_url(&self, address: &str) -> String {
        format!("{}/wallets/{}/tokens", self.base_url, address)
    }
}

#[async_trait]
impl BalanceSource for MoralisBalanceFetcher {
    fn name(&self) -> &'static str {
        "moralis"
    }

    async fn fetch_balances(&self, address: &str) -> WalletResult<Vec<TokenBalance>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| WalletError::fetch_failed("Moralis API key is not configured"))?;

        let response = self
            .client
            .get(self.balances_url(address))
            .query(&[("chain", self.chain.as_str())])
            .header("X-API-Key", api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(WalletError::fetch_failed(format!(
                "Balance API returned HTTP {}",
                status.as_u16()
            ))
            .with_details(snippet));
        }

        let body: Value = response.json().await?;
        let tokens = parse_token_balances(&body)?;

        log_debug!("api", "Fetched balances", address = address, tokens = tokens.len());
        Ok(tokens)
    }
}

/// Map a balance API response body into token balances.
///
/// Accepts either `{"result": [..]}` or a bare array. Records that are not
/// objects or whose USD value is exactly zero are skipped; every other
/// record is kept with missing fields defaulted.
pub fn parse_token_balances(body: &Value) -> WalletResult<Vec<TokenBalance>> {
    let records = body
        .get("result")
        .unwrap_or(body)
        .as_array()
        .ok_or_else(|| WalletError::fetch_failed("Unexpected balance response shape"))?;

    Ok(records.iter().filter_map(adapt_token_record).collect())
}

/// Boundary adapter from one external balance record to a `TokenBalance`
pub fn adapt_token_record(record: &Value) -> Option<TokenBalance> {
    let obj = record.as_object()?;

    let usd_value = number_field(obj, &["usd_value", "usdValue"]);
    if usd_value == Some(0.0) {
        return None;
    }

    let native = obj
        .get("native_token")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let contract_address = if native {
        String::new()
    } else {
        string_field(obj, &["token_address", "tokenAddress", "contract_address"])
            .filter(|a| !a.eq_ignore_ascii_case(NATIVE_TOKEN_PLACEHOLDER))
            .unwrap_or_default()
    };

    Some(TokenBalance {
        symbol: string_field(obj, &["symbol"]).unwrap_or_default(),
        name: string_field(obj, &["name"]).unwrap_or_default(),
        balance: string_field(obj, &["balance_formatted", "balanceFormatted"]).unwrap_or_default(),
        balance_raw: string_field(obj, &["balance_raw", "balance"]).unwrap_or_default(),
        contract_address,
        usd_price: number_field(obj, &["usd_price", "usdPrice"]),
        usd_price_change: number_field(
            obj,
            &["usd_price_24hr_percent_change", "usdPrice24hrPercentChange"],
        ),
        usd_value,
        icon_url: string_field(obj, &["logo", "thumbnail"]),
    })
}

/// First non-empty string (or number rendered as string) among `keys`
fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First finite number (or numeric string) among `keys`
fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| match obj.get(*key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_adapt_full_record() {
        let record = json!({
            "token_address": "0xdac17f958d2ee523a2206206994597c13d831ec7",
            "symbol": "USDT",
            "name": "Tether USD",
            "logo": "https://logo.example/usdt.png",
            "balance": "1500000",
            "balance_formatted": "1.5",
            "usd_price": 1.0002,
            "usd_price_24hr_percent_change": -0.01,
            "usd_value": 1.5003,
            "native_token": false
        });

        let token = adapt_token_record(&record).unwrap();
        assert_eq!(token.symbol, "USDT");
        assert_eq!(token.balance, "1.5");
        assert_eq!(token.balance_raw, "1500000");
        assert_eq!(token.contract_address, "0xdac17f958d2ee523a2206206994597c13d831ec7");
        assert_eq!(token.usd_price, Some(1.0002));
        assert_eq!(token.usd_price_change, Some(-0.01));
        assert_eq!(token.usd_value, Some(1.5003));
        assert_eq!(token.icon_url.as_deref(), Some("https://logo.example/usdt.png"));
    }

    #[test]
    fn test_adapt_missing_fields() {
        let token = adapt_token_record(&json!({"symbol": "XYZ"})).unwrap();
        assert_eq!(token.name, "");
        assert_eq!(token.balance_raw, "");
        assert_eq!(token.usd_price, None);
        assert_eq!(token.usd_value, None);
        assert_eq!(token.icon_url, None);
        assert!(token.is_native());
    }

    #[test]
    fn test_adapt_native_and_string_numbers() {
        let record = json!({
            "token_address": "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
            "symbol": "ETH",
            "usd_value": "2500.25",
            "usd_price": null,
            "logo": ""
        });
        let token = adapt_token_record(&record).unwrap();
        assert!(token.is_native());
        assert_eq!(token.usd_value, Some(2500.25));
        assert_eq!(token.usd_price, None);
        assert_eq!(token.icon_url, None);
    }

    #[test]
    fn test_parse_skips_zero_value() {
        let body = json!({
            "result": [
                {"symbol": "DUST", "usd_value": 0},
                {"symbol": "UNPRICED"},
                {"symbol": "ETH", "native_token": true, "usd_value": 10.5},
                "garbage"
            ]
        });
        let tokens = parse_token_balances(&body).unwrap();
        let symbols: Vec<_> = tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["UNPRICED", "ETH"]);
    }

    #[test]
    fn test_parse_rejects_unexpected_shape() {
        let err = parse_token_balances(&json!({"message": "Invalid key"})).unwrap_err();
        assert_eq!(err.code, ErrorCode::FetchFailed);
    }

    #[tokio::test]
    async fn test_fetch_without_api_key() {
        let fetcher = MoralisBalanceFetcher::new(
            "https://deep-index.moralis.io/api/v2.2/",
            "0x1",
            Some("  ".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            fetcher.balances_url("0xabc"),
            "https://deep-index.moralis.io/api/v2.2/wallets/0xabc/tokens"
        );

        let err = fetcher.fetch_balances("0xabc").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FetchFailed);
    }
}
