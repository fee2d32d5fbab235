//! Error taxonomy for the bot
//!
//! Every component re-labels third-party failures into one of these variants
//! and otherwise lets errors propagate unchanged.

use thiserror::Error;

/// Substring the RPC providers use to signal rate limiting
pub const RATE_LIMIT_MARKER: &str = "Too many requests";

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or empty required setting
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gamma API error: {}", format_api(.status, .message))]
    GammaApi { status: Option<u16>, message: String },

    #[error("Data API error: {}", format_api(.status, .message))]
    DataApi { status: Option<u16>, message: String },

    #[error("CLOB API error: {}", format_api(.status, .message))]
    ClobApi { status: Option<u16>, message: String },

    /// Low-level chain RPC failure (transport, JSON-RPC error object, bad payload)
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Order validation failed: {0}")]
    OrderValidation(String),

    #[error("Order rejected: {0}")]
    OrderPlacement(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Trade ledger file could not be read or written
    #[error("Trade ledger error: {0}")]
    Ledger(String),
}

fn format_api(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("{} {}", code, message),
        None => message.to_string(),
    }
}

impl Error {
    pub fn clob(message: impl std::fmt::Display) -> Self {
        Error::ClobApi {
            status: None,
            message: message.to_string(),
        }
    }

    /// Whether the RPC node asked us to back off
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Error::Rpc(msg) => msg.contains(RATE_LIMIT_MARKER),
            _ => false,
        }
    }

    /// HTTP status carried by a remote API failure, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::GammaApi { status, .. }
            | Error::DataApi { status, .. }
            | Error::ClobApi { status, .. } => *status,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
