//! Order pipeline: validation, placement through the exchange, CSV ledger

pub mod orders;
pub mod trade_log;

pub use orders::{validate_order, OrderApi, OrderManager, DEFAULT_TICK_SIZE, PRICE_MAX, PRICE_MIN};
pub use trade_log::{LedgerRecord, TradeLedger, LEDGER_HEADER};
