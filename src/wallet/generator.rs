//! Fresh EOA generation for `wallet generate`

use crate::error::{Error, Result};
use alloy::signers::local::PrivateKeySigner;
use serde::Serialize;

/// A newly generated wallet with address and private key
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedWallet {
    /// Checksummed address (0x prefixed)
    pub address: String,
    /// Private key in hex (0x prefixed). Shown once, never stored.
    pub private_key: String,
}

impl GeneratedWallet {
    /// Lines to paste into `.env`
    pub fn env_lines(&self) -> String {
        format!(
            "POLY_PRIVATE_KEY={}\nPOLY_WALLET_ADDRESS={}",
            self.private_key, self.address
        )
    }
}

/// Generate a new random wallet
pub fn generate_wallet() -> GeneratedWallet {
    let signer = PrivateKeySigner::random();

    GeneratedWallet {
        address: signer.address().to_checksum(None),
        private_key: format!("0x{}", hex::encode(signer.to_bytes())),
    }
}

/// Checksummed address for a private key
pub fn address_from_private_key(private_key: &str) -> Result<String> {
    let signer: PrivateKeySigner = private_key
        .trim()
        .parse()
        .map_err(|e| Error::Wallet(format!("Failed to parse private key: {}", e)))?;

    Ok(signer.address().to_checksum(None))
}
