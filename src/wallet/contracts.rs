//! Polygon contract addresses and the ABI fragments the wallet needs

use crate::error::{Error, Result};
use alloy::primitives::{address, Address, U256};
use alloy::sol;

/// USDC.e on Polygon (6 decimals)
pub const USDC_ADDRESS: Address = address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174");
/// Gnosis Conditional Tokens (ERC-1155 outcome tokens)
pub const CONDITIONAL_TOKENS_ADDRESS: Address = address!("4D97DCd97eC945f40cF65F87097ACe5EA0476045");
pub const CTF_EXCHANGE_ADDRESS: Address = address!("4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E");
pub const NEG_RISK_CTF_EXCHANGE_ADDRESS: Address = address!("C5d563A36AE78145C45a50134d48A1215220f80a");
pub const NEG_RISK_ADAPTER_ADDRESS: Address = address!("d91E80cF2E7be2e162c6513ceD06f1dD0dA35296");

pub const USDC_DECIMALS: u32 = 6;
/// Outcome tokens share USDC's precision
pub const CONDITIONAL_TOKEN_DECIMALS: u32 = 6;
pub const POL_DECIMALS: u32 = 18;

/// Allowances below this many USDC are topped up to the maximum
pub const MIN_USDC_ALLOWANCE: u64 = 1_000;

/// Contracts that must be able to move both USDC and outcome tokens
pub const EXCHANGE_SPENDERS: [(&str, Address); 3] = [
    ("CTF Exchange", CTF_EXCHANGE_ADDRESS),
    ("Neg Risk CTF Exchange", NEG_RISK_CTF_EXCHANGE_ADDRESS),
    ("Neg Risk Adapter", NEG_RISK_ADAPTER_ADDRESS),
];

sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IConditionalTokens {
        function balanceOf(address account, uint256 id) external view returns (uint256);
        function isApprovedForAll(address account, address operator) external view returns (bool);
        function setApprovalForAll(address operator, bool approved) external;
    }
}

/// First 32-byte word of an `eth_call` result as uint256
pub fn decode_uint(ret: &[u8]) -> Result<U256> {
    if ret.len() < 32 {
        return Err(Error::Rpc(format!(
            "expected a 32-byte word, got {} bytes",
            ret.len()
        )));
    }
    Ok(U256::from_be_slice(&ret[..32]))
}

/// First 32-byte word of an `eth_call` result as bool
pub fn decode_bool(ret: &[u8]) -> Result<bool> {
    Ok(!decode_uint(ret)?.is_zero())
}
