//! Minimal Ethereum JSON-RPC over HTTP
//!
//! Only the handful of methods the wallet needs. Quantities are parsed from
//! hex; transport and node errors become [`Error::Rpc`] so the retry policy
//! can classify them.

use crate::error::{Error, Result, RATE_LIMIT_MARKER};
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Transaction object as sent to `eth_estimateGas`.
///
/// Optional fields are omitted from the JSON when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub chain_id: u64,
    pub nonce: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub gas: Option<u64>,
}

impl TxRequest {
    pub fn new(from: Address, to: Address, data: impl Into<Bytes>, chain_id: u64) -> Self {
        Self {
            from,
            to,
            data: data.into(),
            chain_id,
            nonce: None,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            gas: None,
        }
    }

    /// Switch to legacy pricing: set the gas price, drop EIP-1559 fee fields
    pub fn with_legacy_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self.max_fee_per_gas = None;
        self.max_priority_fee_per_gas = None;
        self
    }

    pub fn to_json(&self) -> Value {
        let mut obj = json!({
            "from": format!("{:?}", self.from),
            "to": format!("{:?}", self.to),
            "data": format!("0x{}", hex::encode(&self.data)),
            "value": "0x0",
            "chainId": quantity(self.chain_id as u128),
        });

        let optional = [
            ("nonce", self.nonce.map(u128::from)),
            ("gasPrice", self.gas_price),
            ("maxFeePerGas", self.max_fee_per_gas),
            ("maxPriorityFeePerGas", self.max_priority_fee_per_gas),
            ("gas", self.gas.map(u128::from)),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                obj[key] = Value::String(quantity(v));
            }
        }
        obj
    }
}

fn quantity(v: u128) -> String {
    format!("{:#x}", v)
}

/// Subset of a transaction receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: String,
    /// 1 = success, 0 = reverted
    pub status: u64,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// Chain access used by the wallet. Implemented over HTTP; faked in tests.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Native balance in wei
    async fn balance(&self, address: Address) -> Result<U256>;

    /// `eth_call` against the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    async fn transaction_count(&self, address: Address) -> Result<u64>;

    async fn gas_price(&self) -> Result<u128>;

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64>;

    /// Returns the transaction hash
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<String>;

    /// `None` while the transaction is still pending
    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TxReceipt>>;
}

/// JSON-RPC client over reqwest
pub struct HttpRpc {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Rpc(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        debug!("RPC {} #{}", method, id);

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Rpc(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::Rpc(format!("{} ({})", RATE_LIMIT_MARKER, method)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Rpc(format!("{} HTTP {}: {}", method, status, body)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::Rpc(format!("{}: invalid response: {}", method, e)))?;

        parse_response(json)
    }
}

/// Split a JSON-RPC envelope into its result or error
fn parse_response(json: Value) -> Result<Value> {
    if let Some(error) = json.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(Error::Rpc(message));
    }

    json.get("result")
        .cloned()
        .ok_or_else(|| Error::Rpc("response has neither result nor error".to_string()))
}

fn hex_str(value: &Value) -> Result<&str> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::Rpc(format!("expected hex string, got {}", value)))?;
    Ok(s.strip_prefix("0x").unwrap_or(s))
}

fn parse_u256(value: &Value) -> Result<U256> {
    let digits = hex_str(value)?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|e| Error::Rpc(format!("bad quantity {}: {}", digits, e)))
}

fn parse_u128(value: &Value) -> Result<u128> {
    let digits = hex_str(value)?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| Error::Rpc(format!("bad quantity {}: {}", digits, e)))
}

fn parse_u64(value: &Value) -> Result<u64> {
    let v = parse_u128(value)?;
    u64::try_from(v).map_err(|_| Error::Rpc(format!("quantity {} overflows u64", v)))
}

fn parse_bytes(value: &Value) -> Result<Bytes> {
    let digits = hex_str(value)?;
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| Error::Rpc(format!("bad hex data: {}", e)))
}

fn parse_receipt(value: &Value) -> Result<Option<TxReceipt>> {
    if value.is_null() {
        return Ok(None);
    }

    let optional = |key: &str| match value.get(key) {
        Some(v) if !v.is_null() => parse_u64(v).map(Some),
        _ => Ok(None),
    };

    Ok(Some(TxReceipt {
        transaction_hash: value
            .get("transactionHash")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        status: optional("status")?.unwrap_or(0),
        block_number: optional("blockNumber")?,
        gas_used: optional("gasUsed")?,
    }))
}

#[async_trait]
impl ChainRpc for HttpRpc {
    async fn balance(&self, address: Address) -> Result<U256> {
        let result = self
            .request("eth_getBalance", json!([format!("{:?}", address), "latest"]))
            .await?;
        parse_u256(&result)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let params = json!([{
            "to": format!("{:?}", to),
            "data": format!("0x{}", hex::encode(&data)),
        }, "latest"]);
        let result = self.request("eth_call", params).await?;
        parse_bytes(&result)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        let result = self
            .request(
                "eth_getTransactionCount",
                json!([format!("{:?}", address), "latest"]),
            )
            .await?;
        parse_u64(&result)
    }

    async fn gas_price(&self) -> Result<u128> {
        let result = self.request("eth_gasPrice", json!([])).await?;
        parse_u128(&result)
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64> {
        let result = self.request("eth_estimateGas", json!([tx.to_json()])).await?;
        parse_u64(&result)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<String> {
        let result = self
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(&raw))]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Rpc(format!("unexpected tx hash: {}", result)))
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TxReceipt>> {
        let result = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        parse_receipt(&result)
    }
}
