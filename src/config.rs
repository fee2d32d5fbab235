//! Configuration management for the bot
//!
//! Settings come from `POLY_`-prefixed environment variables (a `.env` file is
//! loaded first if present). The resulting [`Config`] is built once in `main`
//! and handed to every component that needs it.

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Polygon mainnet
pub const POLYGON_CHAIN_ID: u64 = 137;
pub const DEFAULT_RPC_URL: &str = "https://polygon-rpc.com";

pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";
pub const CLOB_API_URL: &str = "https://clob.polymarket.com";
pub const DATA_API_URL: &str = "https://data-api.polymarket.com";

/// Safety limit on a single order's notional, in USDC
pub const DEFAULT_MAX_ORDER_SIZE_USDC: Decimal = dec!(50);

pub const DEFAULT_TRADE_LOG_PATH: &str = "trades.csv";

/// Bot configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Hex-encoded EOA private key
    pub private_key: String,

    /// EOA wallet address
    pub wallet_address: String,

    /// Polygon RPC URL
    pub rpc_url: String,

    pub chain_id: u64,

    pub gamma_api_url: String,
    pub clob_api_url: String,
    pub data_api_url: String,

    /// Maximum notional (price * size) per order in USDC
    pub max_order_size_usdc: Decimal,

    /// CSV ledger of placed orders
    pub trade_log_path: String,

    /// Pause between on-chain reads and after each approval transaction
    pub approval_pacing: ApprovalPacing,
}

/// Pauses used while walking the approval checklist.
///
/// Public RPC nodes throttle aggressively; these spread the calls out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalPacing {
    /// After each allowance / approval read
    pub after_read: Duration,
    /// After each confirmed approval transaction
    pub after_write: Duration,
    /// Between the nonce, gas price and gas estimate calls of one transaction
    pub between_rpc_calls: Duration,
}

impl Default for ApprovalPacing {
    fn default() -> Self {
        Self {
            after_read: Duration::from_secs(1),
            after_write: Duration::from_secs(3),
            between_rpc_calls: Duration::from_secs(1),
        }
    }
}

impl ApprovalPacing {
    /// No pauses at all (tests, private RPC nodes)
    pub fn none() -> Self {
        Self {
            after_read: Duration::ZERO,
            after_write: Duration::ZERO,
            between_rpc_calls: Duration::ZERO,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Only presence is validated: the private key and wallet address must be
    /// set and non-empty. Everything else falls back to a default.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let private_key = get("POLY_PRIVATE_KEY")
            .ok_or_else(|| Error::Config("POLY_PRIVATE_KEY is required".to_string()))?;

        let wallet_address = get("POLY_WALLET_ADDRESS")
            .ok_or_else(|| Error::Config("POLY_WALLET_ADDRESS is required".to_string()))?;

        let rpc_url = get("POLY_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        let chain_id = match get("POLY_CHAIN_ID") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("POLY_CHAIN_ID is not a number: {}", v)))?,
            None => POLYGON_CHAIN_ID,
        };

        let gamma_api_url = get("POLY_GAMMA_API_URL").unwrap_or_else(|| GAMMA_API_URL.to_string());
        let clob_api_url = get("POLY_CLOB_API_URL").unwrap_or_else(|| CLOB_API_URL.to_string());
        let data_api_url = get("POLY_DATA_API_URL").unwrap_or_else(|| DATA_API_URL.to_string());

        let max_order_size_usdc = match get("POLY_MAX_ORDER_SIZE_USDC") {
            Some(v) => Decimal::from_str(v.trim()).map_err(|_| {
                Error::Config(format!("POLY_MAX_ORDER_SIZE_USDC is not a decimal: {}", v))
            })?,
            None => DEFAULT_MAX_ORDER_SIZE_USDC,
        };

        let trade_log_path =
            get("POLY_TRADE_LOG_PATH").unwrap_or_else(|| DEFAULT_TRADE_LOG_PATH.to_string());

        let approval_pacing = match get("POLY_APPROVAL_PACING_SECS") {
            Some(v) => {
                let secs: u64 = v.trim().parse().map_err(|_| {
                    Error::Config(format!("POLY_APPROVAL_PACING_SECS is not a number: {}", v))
                })?;
                ApprovalPacing {
                    after_read: Duration::from_secs(secs),
                    after_write: Duration::from_secs(secs),
                    between_rpc_calls: Duration::from_secs(secs),
                }
            }
            None => ApprovalPacing::default(),
        };

        Ok(Self {
            private_key,
            wallet_address,
            rpc_url,
            chain_id,
            gamma_api_url,
            clob_api_url,
            data_api_url,
            max_order_size_usdc,
            trade_log_path,
            approval_pacing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_loads_required_and_defaults() {
        let config = config_from(&[
            ("POLY_PRIVATE_KEY", "0xdeadbeef"),
            ("POLY_WALLET_ADDRESS", "0x1234567890abcdef"),
        ])
        .unwrap();

        assert_eq!(config.private_key, "0xdeadbeef");
        assert_eq!(config.wallet_address, "0x1234567890abcdef");
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.chain_id, 137);
        assert_eq!(config.gamma_api_url, GAMMA_API_URL);
        assert_eq!(config.clob_api_url, CLOB_API_URL);
        assert_eq!(config.data_api_url, DATA_API_URL);
        assert_eq!(config.max_order_size_usdc, dec!(50));
        assert_eq!(config.trade_log_path, "trades.csv");
        assert_eq!(config.approval_pacing, ApprovalPacing::default());
    }

    #[test]
    fn test_custom_overrides() {
        let config = config_from(&[
            ("POLY_PRIVATE_KEY", "0xabc"),
            ("POLY_WALLET_ADDRESS", "0xdef"),
            ("POLY_RPC_URL", "https://custom-rpc.example.com"),
            ("POLY_MAX_ORDER_SIZE_USDC", "100.0"),
            ("POLY_CHAIN_ID", "80002"),
            ("POLY_APPROVAL_PACING_SECS", "0"),
        ])
        .unwrap();

        assert_eq!(config.rpc_url, "https://custom-rpc.example.com");
        assert_eq!(config.max_order_size_usdc, dec!(100));
        assert_eq!(config.chain_id, 80002);
        assert_eq!(config.approval_pacing, ApprovalPacing::none());
    }

    #[test]
    fn test_missing_private_key() {
        let err = config_from(&[("POLY_WALLET_ADDRESS", "0xdef")]).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("POLY_PRIVATE_KEY")));
    }

    #[test]
    fn test_empty_wallet_address_counts_as_missing() {
        let err = config_from(&[
            ("POLY_PRIVATE_KEY", "0xabc"),
            ("POLY_WALLET_ADDRESS", "   "),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("POLY_WALLET_ADDRESS")));
    }
}
