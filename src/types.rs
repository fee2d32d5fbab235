//! Core types for the Polymarket trading bot
//!
//! Remote payloads are reshaped here, at the adapter boundary, into strict
//! structs. Optional fields default rather than fail so a partially populated
//! API response still yields a usable value.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(format!("unknown side: {}", other)),
        }
    }
}

/// Order type. Only limit (GTC) orders are ever placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderType {
    #[default]
    #[serde(rename = "LMT")]
    Limit,
    #[serde(rename = "MKT")]
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "LMT",
            OrderType::Market => "MKT",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for placing an order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub token_id: String,
    pub side: Side,
    pub price: Decimal,
    /// Number of shares
    pub size: Decimal,
    pub order_type: OrderType,
}

impl OrderRequest {
    pub fn limit(token_id: impl Into<String>, side: Side, price: Decimal, size: Decimal) -> Self {
        Self {
            token_id: token_id.into(),
            side,
            price,
            size,
            order_type: OrderType::Limit,
        }
    }

    /// Notional value in USDC
    pub fn cost(&self) -> Decimal {
        self.price * self.size
    }
}

/// Exchange response to an order placement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    #[serde(rename = "orderID", default)]
    pub order_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "transactOrderID", default)]
    pub transact_order_id: String,
}

impl OrderResponse {
    /// Order id, falling back to the transaction order id
    pub fn display_id(&self) -> &str {
        if self.order_id.is_empty() {
            &self.transact_order_id
        } else {
            &self.order_id
        }
    }
}

/// An open (unfilled) order as reported by the CLOB
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenOrder {
    #[serde(rename = "id", default)]
    pub order_id: String,
    #[serde(rename = "asset_id", default)]
    pub token_id: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub side: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub original_size: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub size_matched: String,
    #[serde(default)]
    pub outcome: String,
}

/// A single outcome token within a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub token_id: String,
    pub outcome: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Decimal,
    #[serde(default)]
    pub winner: bool,
}

/// A Polymarket binary market (condition)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawMarket")]
pub struct Market {
    pub condition_id: String,
    pub question: String,
    pub description: String,
    pub slug: String,
    pub end_date_iso: String,
    pub active: bool,
    pub closed: bool,
    pub neg_risk: bool,
    pub tokens: Vec<Token>,
    pub minimum_order_size: Decimal,
    pub minimum_tick_size: Decimal,
    pub accepting_orders: bool,
}

impl Market {
    /// Token for the given outcome label, case-insensitive
    pub fn token(&self, outcome: &str) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case(outcome))
    }

    pub fn yes_token(&self) -> Option<&Token> {
        self.token("Yes")
    }

    pub fn no_token(&self) -> Option<&Token> {
        self.token("No")
    }

    /// Tick size formatted the way the exchange expects it ("0.01", "0.001")
    pub fn tick_size_str(&self) -> String {
        self.minimum_tick_size.normalize().to_string()
    }
}

/// Wire shape covering both the Gamma (camelCase, JSON-string token fields)
/// and CLOB (snake_case, explicit `tokens`) market payloads.
#[derive(Debug, Deserialize)]
struct RawMarket {
    #[serde(rename = "conditionId", alias = "condition_id", default)]
    condition_id: String,
    #[serde(default)]
    question: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(alias = "market_slug", default)]
    slug: String,
    #[serde(rename = "endDateIso", alias = "end_date_iso", default)]
    end_date_iso: Option<String>,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default)]
    closed: bool,
    #[serde(rename = "negRisk", alias = "neg_risk", default)]
    neg_risk: bool,
    #[serde(default)]
    tokens: Option<serde_json::Value>,
    #[serde(rename = "clobTokenIds", default)]
    clob_token_ids: Option<serde_json::Value>,
    #[serde(default)]
    outcomes: Option<serde_json::Value>,
    #[serde(rename = "outcomePrices", default)]
    outcome_prices: Option<serde_json::Value>,
    #[serde(rename = "orderMinSize", alias = "minimum_order_size", default, deserialize_with = "optional_decimal")]
    order_min_size: Option<Decimal>,
    #[serde(rename = "orderPriceMinTickSize", alias = "minimum_tick_size", default, deserialize_with = "optional_decimal")]
    order_price_min_tick_size: Option<Decimal>,
    #[serde(rename = "acceptingOrders", alias = "accepting_orders", default)]
    accepting_orders: bool,
}

fn default_true() -> bool {
    true
}

impl From<RawMarket> for Market {
    fn from(raw: RawMarket) -> Self {
        let tokens = build_tokens(&raw);

        Market {
            condition_id: raw.condition_id,
            question: raw.question,
            description: raw.description.unwrap_or_default(),
            slug: raw.slug,
            end_date_iso: raw.end_date_iso.unwrap_or_default(),
            active: raw.active,
            closed: raw.closed,
            neg_risk: raw.neg_risk,
            tokens,
            minimum_order_size: raw.order_min_size.unwrap_or(Decimal::ZERO),
            minimum_tick_size: raw.order_price_min_tick_size.unwrap_or(dec!(0.01)),
            accepting_orders: raw.accepting_orders,
        }
    }
}

/// Explicit `tokens` win; otherwise zip `clobTokenIds` with `outcomes`,
/// pricing each from `outcomePrices` by position (missing price = 0).
fn build_tokens(raw: &RawMarket) -> Vec<Token> {
    if let Some(tokens) = raw.tokens.as_ref().and_then(|v| json_list(v)) {
        if !tokens.is_empty() {
            return tokens
                .into_iter()
                .filter_map(|t| match serde_json::from_value::<Token>(t) {
                    Ok(token) => Some(token),
                    Err(e) => {
                        warn!("Skipping malformed token in market {}: {}", raw.condition_id, e);
                        None
                    }
                })
                .collect();
        }
    }

    let ids = raw.clob_token_ids.as_ref().and_then(json_list).unwrap_or_default();
    let outcomes = raw.outcomes.as_ref().and_then(json_list).unwrap_or_default();
    let prices = raw.outcome_prices.as_ref().and_then(json_list).unwrap_or_default();

    ids.iter()
        .zip(outcomes.iter())
        .enumerate()
        .map(|(i, (id, outcome))| Token {
            token_id: value_to_string(id),
            outcome: value_to_string(outcome),
            price: prices
                .get(i)
                .and_then(|p| Decimal::from_str(&value_to_string(p)).ok())
                .unwrap_or(Decimal::ZERO),
            winner: false,
        })
        .collect()
}

/// Accept either a JSON array or a string containing one
fn json_list(value: &serde_json::Value) -> Option<Vec<serde_json::Value>> {
    match value {
        serde_json::Value::Array(items) => Some(items.clone()),
        serde_json::Value::String(s) if !s.is_empty() => match serde_json::from_str(s) {
            Ok(serde_json::Value::Array(items)) => Some(items),
            _ => {
                warn!("Expected a JSON list, got: {}", s);
                None
            }
        },
        _ => None,
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A Polymarket event (can contain multiple markets)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "markets_list")]
    pub markets: Vec<Market>,
}

fn markets_list<'de, D>(deserializer: D) -> Result<Vec<Market>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let items = value.as_ref().and_then(json_list).unwrap_or_default();
    items
        .into_iter()
        .map(|m| serde_json::from_value(m).map_err(serde::de::Error::custom))
        .collect()
}

/// A single entry in the order book (bid or ask)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
    #[serde(deserialize_with = "string_or_number")]
    pub size: String,
}

/// Order book snapshot for a token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(alias = "asset_id", default)]
    pub token_id: String,
    #[serde(default)]
    pub bids: Vec<OrderBookEntry>,
    #[serde(default)]
    pub asks: Vec<OrderBookEntry>,
}

impl OrderBook {
    fn prices(entries: &[OrderBookEntry]) -> impl Iterator<Item = Decimal> + '_ {
        entries.iter().filter_map(|e| Decimal::from_str(&e.price).ok())
    }

    /// Highest bid, regardless of entry order
    pub fn best_bid(&self) -> Option<Decimal> {
        Self::prices(&self.bids).max()
    }

    /// Lowest ask, regardless of entry order
    pub fn best_ask(&self) -> Option<Decimal> {
        Self::prices(&self.asks).min()
    }

    pub fn midpoint(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / dec!(2)),
            _ => None,
        }
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

/// Ownership of outcome tokens, as reported by the Data API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub asset: String,
    #[serde(rename = "conditionId", alias = "condition_id", default)]
    pub condition_id: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub size: Decimal,
    #[serde(rename = "avgPrice", alias = "avg_price", default, deserialize_with = "lenient_decimal")]
    pub avg_price: Decimal,
    #[serde(rename = "curPrice", alias = "cur_price", default, deserialize_with = "lenient_decimal")]
    pub cur_price: Decimal,
    #[serde(rename = "realizedPnl", alias = "realized_pnl", default, deserialize_with = "lenient_decimal")]
    pub realized_pnl: Decimal,
    #[serde(rename = "unrealizedPnl", alias = "unrealized_pnl", default, deserialize_with = "lenient_decimal")]
    pub unrealized_pnl: Decimal,
    #[serde(default)]
    pub outcome: String,
}

impl Position {
    pub fn total_pnl(&self) -> Decimal {
        self.realized_pnl + self.unrealized_pnl
    }
}

/// A historical trade / activity record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trade {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "asset", default)]
    pub token_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub size: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: String,
    #[serde(default)]
    pub status: String,
}

/// Exchange approval flags (ERC-1155 approval-for-all)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExchangeApprovals {
    pub ctf_exchange: bool,
    pub neg_risk_ctf_exchange: bool,
}

/// Aggregated wallet balances and approval state
#[derive(Debug, Clone, Serialize)]
pub struct WalletStatus {
    pub address: String,
    pub pol_balance: Decimal,
    pub usdc_balance: Decimal,
    pub approvals: ExchangeApprovals,
}

// ---------------------------------------------------------------------------
// Lenient field parsers
// ---------------------------------------------------------------------------

/// Strings, numbers and null all become a string ("" for null)
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_to_string).unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decimal from a number or numeric string; null or empty becomes None
fn optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => {
            let text = value_to_string(&v);
            if text.trim().is_empty() {
                return Ok(None);
            }
            Decimal::from_str(text.trim())
                .or_else(|_| Decimal::from_scientific(text.trim()))
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_decimal(deserializer)?.unwrap_or(Decimal::ZERO))
}
