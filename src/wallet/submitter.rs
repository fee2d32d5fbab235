//! Builds, signs and submits legacy Polygon transactions
//!
//! Every node call goes through [`RpcRetryPolicy`]; after submission the
//! receipt is polled at a fixed interval until it appears or the poll budget
//! runs out.

use super::retry::{RpcRetryPolicy, Sleeper};
use super::rpc::{ChainRpc, TxReceipt, TxRequest};
use crate::error::{Error, Result};
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of one submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Building,
    Signed,
    Submitted,
    Confirmed,
    Failed,
    TimedOut,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxState::Building => "BUILDING",
            TxState::Signed => "SIGNED",
            TxState::Submitted => "SUBMITTED",
            TxState::Confirmed => "CONFIRMED",
            TxState::Failed => "FAILED",
            TxState::TimedOut => "TIMED_OUT",
        };
        f.write_str(s)
    }
}

/// Receipt polling and pacing knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitterSettings {
    pub receipt_polls: u32,
    pub poll_interval: Duration,
    /// Pause between the nonce, gas price and gas estimate calls
    pub pacing: Duration,
    pub retry: RpcRetryPolicy,
}

impl Default for SubmitterSettings {
    fn default() -> Self {
        Self {
            receipt_polls: 30,
            poll_interval: Duration::from_secs(5),
            pacing: Duration::from_secs(1),
            retry: RpcRetryPolicy::default(),
        }
    }
}

pub struct TransactionSubmitter<R> {
    rpc: Arc<R>,
    sleeper: Arc<dyn Sleeper>,
    signer: PrivateKeySigner,
    chain_id: u64,
    settings: SubmitterSettings,
}

impl<R: ChainRpc> TransactionSubmitter<R> {
    /// `signer` is bound to `chain_id` so signatures are EIP-155 protected
    pub fn new(
        rpc: Arc<R>,
        sleeper: Arc<dyn Sleeper>,
        signer: PrivateKeySigner,
        chain_id: u64,
        settings: SubmitterSettings,
    ) -> Self {
        use alloy::signers::Signer;
        let signer = signer.with_chain_id(Some(chain_id));

        Self {
            rpc,
            sleeper,
            signer,
            chain_id,
            settings,
        }
    }

    pub fn sender(&self) -> Address {
        self.signer.address()
    }

    /// Submit a zero-value call to `to` and wait for it to be mined.
    /// Returns the transaction hash.
    pub async fn submit(&self, to: Address, data: impl Into<Bytes>) -> Result<String> {
        let request = TxRequest::new(self.sender(), to, data, self.chain_id);
        self.submit_request(request).await
    }

    /// Like [`submit`](Self::submit) but starting from a caller-built request.
    /// Sender and chain id are always overwritten; fee fields are replaced by
    /// the node's legacy gas price.
    pub async fn submit_request(&self, mut request: TxRequest) -> Result<String> {
        let retry = &self.settings.retry;
        let sleeper = &*self.sleeper;
        let rpc = &*self.rpc;
        let from = self.sender();

        let mut state = TxState::Building;
        request.from = from;
        request.chain_id = self.chain_id;

        let nonce = retry
            .run(sleeper, "eth_getTransactionCount", || rpc.transaction_count(from))
            .await?;
        request.nonce = Some(nonce);

        self.pause().await;
        let gas_price = retry
            .run(sleeper, "eth_gasPrice", || rpc.gas_price())
            .await?;
        let mut request = request.with_legacy_gas_price(gas_price);

        self.pause().await;
        let gas = retry
            .run(sleeper, "eth_estimateGas", || rpc.estimate_gas(&request))
            .await?;
        request.gas = Some(gas);

        debug!(
            "Tx {}: to={:?} nonce={} gas_price={} gas={}",
            state, request.to, nonce, gas_price, gas
        );

        let raw = self.sign(&request, nonce, gas_price, gas)?;
        state = TxState::Signed;
        debug!("Tx {}: {} bytes", state, raw.len());

        let hash = retry
            .run(sleeper, "eth_sendRawTransaction", || rpc.send_raw_transaction(raw.clone()))
            .await?;
        state = TxState::Submitted;
        debug!("Tx {}: {}", state, hash);
        info!("Tx sent: {} waiting for confirmation...", hash);

        let receipt = self.wait_for_receipt(&hash).await;

        match receipt {
            None => {
                state = TxState::TimedOut;
                warn!("Tx {}: {}", state, hash);
                Err(Error::Wallet(format!("Timed out waiting for tx: {}", hash)))
            }
            Some(receipt) if !receipt.succeeded() => {
                state = TxState::Failed;
                warn!("Tx {}: {} (status {})", state, hash, receipt.status);
                Err(Error::Wallet(format!("Transaction failed: {}", hash)))
            }
            Some(_) => {
                state = TxState::Confirmed;
                debug!("Tx {}: {}", state, hash);
                info!("Transaction confirmed: {}", hash);
                Ok(hash)
            }
        }
    }

    fn sign(&self, request: &TxRequest, nonce: u64, gas_price: u128, gas: u64) -> Result<Bytes> {
        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit: gas,
            to: TxKind::Call(request.to),
            value: U256::ZERO,
            input: request.data.clone(),
        };

        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| Error::Wallet(format!("Failed to sign transaction: {}", e)))?;

        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(Bytes::from(envelope.encoded_2718()))
    }

    /// Poll for the receipt; per-attempt RPC errors are ignored
    async fn wait_for_receipt(&self, hash: &str) -> Option<TxReceipt> {
        for attempt in 1..=self.settings.receipt_polls {
            self.sleeper.sleep(self.settings.poll_interval).await;

            match self.rpc.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Some(receipt),
                Ok(None) => debug!("Receipt for {} not yet available ({})", hash, attempt),
                Err(e) => debug!("Receipt poll {} for {} failed: {}", attempt, hash, e),
            }
        }
        None
    }

    async fn pause(&self) {
        if !self.settings.pacing.is_zero() {
            self.sleeper.sleep(self.settings.pacing).await;
        }
    }
}
