//! Append-only CSV ledger of submitted orders

use crate::error::{Error, Result};
use crate::types::{OrderRequest, OrderResponse};
use chrono::{SecondsFormat, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Column order of the ledger file
pub const LEDGER_HEADER: [&str; 9] = [
    "timestamp",
    "token_id",
    "side",
    "price",
    "size",
    "order_type",
    "order_id",
    "status",
    "success",
];

/// Round half away from zero, then print exactly `dp` places
pub fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

/// One row of the ledger, exactly as written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub timestamp: String,
    pub token_id: String,
    pub side: String,
    /// 4 decimal places
    pub price: String,
    /// 2 decimal places
    pub size: String,
    pub order_type: String,
    pub order_id: String,
    pub status: String,
    /// "True" or "False"
    pub success: String,
}

impl LedgerRecord {
    pub fn new(request: &OrderRequest, response: &OrderResponse) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            token_id: request.token_id.clone(),
            side: request.side.to_string(),
            price: fixed(request.price, 4),
            size: fixed(request.size, 2),
            order_type: request.order_type.to_string(),
            order_id: response.order_id.clone(),
            status: response.status.clone(),
            success: if response.success { "True" } else { "False" }.to_string(),
        }
    }

    /// Look a column up by its header name
    pub fn get(&self, field: &str) -> Option<&str> {
        let value = match field {
            "timestamp" => &self.timestamp,
            "token_id" => &self.token_id,
            "side" => &self.side,
            "price" => &self.price,
            "size" => &self.size,
            "order_type" => &self.order_type,
            "order_id" => &self.order_id,
            "status" => &self.status,
            "success" => &self.success,
            _ => return None,
        };
        Some(value)
    }
}

/// CSV trade ledger. One writer per process; no locking.
#[derive(Debug, Clone)]
pub struct TradeLedger {
    path: PathBuf,
}

impl TradeLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one order and its exchange response.
    ///
    /// The header is written only when the file is empty at open time, so
    /// reopening an existing ledger never duplicates it.
    pub fn append(&self, request: &OrderRequest, response: &OrderResponse) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Ledger(format!("create {}: {}", parent.display(), e))
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::Ledger(format!("open {}: {}", self.path.display(), e)))?;

        let is_empty = file
            .metadata()
            .map_err(|e| Error::Ledger(e.to_string()))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);

        let record = LedgerRecord::new(request, response);
        writer
            .serialize(&record)
            .map_err(|e| Error::Ledger(e.to_string()))?;
        writer.flush().map_err(|e| Error::Ledger(e.to_string()))?;

        debug!(
            "Ledger: {} {} {} @ {} -> {}",
            record.side, record.size, record.token_id, record.price, record.order_id
        );
        Ok(())
    }

    /// All rows in file order. A missing file is an empty ledger.
    pub fn read_all(&self) -> Result<Vec<LedgerRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| Error::Ledger(format!("open {}: {}", self.path.display(), e)))?;

        reader
            .deserialize()
            .map(|row| row.map_err(|e| Error::Ledger(e.to_string())))
            .collect()
    }
}
