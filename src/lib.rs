//! Polymarket Trading Bot Library
//!
//! Command-line trading against Polymarket:
//!
//! 1. **Discovery**: markets and events from the Gamma API, order books and
//!    prices from the CLOB, positions and activity from the Data API.
//! 2. **Trading**: validated limit orders through the CLOB, every accepted
//!    order appended to a CSV ledger.
//! 3. **Wallet**: balances, and the one-time USDC / ERC-1155 approvals the
//!    exchange contracts need, sent as paced, rate-limit tolerant Polygon
//!    transactions.
//! 4. **NO Bias**: 78.4% of binary markets resolve NO. Buy NO when it's
//!    priced below that base rate.

pub mod clients;
pub mod config;
pub mod error;
pub mod format;
pub mod strategies;
pub mod trading;
pub mod types;
pub mod wallet;

pub use clients::{ClobClient, DataClient, GammaClient};
pub use config::Config;
pub use error::{Error, Result};
pub use strategies::{NoBiasStrategy, Signal, Strategy};
pub use trading::{OrderApi, OrderManager, TradeLedger};
pub use types::{Market, OrderRequest, OrderResponse, Side};
pub use wallet::{generate_wallet, HttpRpc, TokioSleeper, WalletManager};
