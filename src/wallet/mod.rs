//! Wallet: key generation, chain reads and approval transactions
//!
//! Everything on-chain goes through [`ChainRpc`]; node calls are wrapped in
//! [`RpcRetryPolicy`] so public-RPC throttling is absorbed rather than
//! surfaced.

pub mod contracts;
mod generator;
pub mod manager;
pub mod retry;
pub mod rpc;
pub mod submitter;

pub use generator::{address_from_private_key, generate_wallet, GeneratedWallet};
pub use manager::{ApprovalAsset, ApprovalState, SubmittedApproval, WalletManager};
pub use retry::{RpcRetryPolicy, Sleeper, TokioSleeper};
pub use rpc::{ChainRpc, HttpRpc, TxReceipt, TxRequest};
pub use submitter::{SubmitterSettings, TransactionSubmitter, TxState};
