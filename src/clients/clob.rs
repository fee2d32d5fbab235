//! CLOB client: order book reads, order placement and L2-authenticated calls
//!
//! Order construction and signing go through `polymarket-client-sdk`. Order
//! listing and cancellation are signed L2 requests made directly with
//! reqwest. API credentials are derived from the private key on first use
//! and cached for the life of the client.

use super::{base_url, http_client};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::trading::OrderApi;
use crate::types::{OpenOrder, OrderBook, OrderResponse, Side};
use alloy::primitives::U256;
use alloy::signers::{local::PrivateKeySigner, Signer};
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use polymarket_client_sdk::auth::state::State;
use polymarket_client_sdk::auth::ExposeSecret;
use polymarket_client_sdk::clob::types::{
    request::UpdateBalanceAllowanceRequest, response::PostOrderResponse, AssetType,
    OrderStatusType, OrderType as SdkOrderType, Side as SdkSide, TickSize,
};
use polymarket_client_sdk::clob::{Client as SdkClient, Config as SdkConfig};
use reqwest::{Client, Method, RequestBuilder};
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::Sha256;
use std::str::FromStr;
use tokio::sync::OnceCell;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// L2 API credentials
#[derive(Clone)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
    pub passphrase: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

pub struct ClobClient {
    http: Client,
    base_url: String,
    signer: PrivateKeySigner,
    address: String,
    creds: OnceCell<ApiCredentials>,
}

impl ClobClient {
    pub fn new(config: &Config) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("POLY_PRIVATE_KEY is not a valid key: {}", e)))?;
        let signer = signer.with_chain_id(Some(config.chain_id));

        let http = http_client()
            .map_err(|e| Error::clob(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url(&config.clob_api_url),
            address: format!("{:?}", signer.address()),
            signer,
            creds: OnceCell::new(),
        })
    }

    /// Signer address used for L2 headers
    pub fn address(&self) -> &str {
        &self.address
    }

    /// L2 credentials, deriving them on first call
    pub async fn credentials(&self) -> Result<&ApiCredentials> {
        self.creds
            .get_or_try_init(|| async {
                info!("Deriving CLOB API credentials for {}", self.address);

                let client = SdkClient::new(&self.base_url, sdk_config())
                    .map_err(|e| Error::clob(format!("Failed to create client: {}", e)))?;
                let creds = client
                    .create_or_derive_api_key(&self.signer, None)
                    .await
                    .map_err(|e| Error::clob(format!("Failed to derive API key: {}", e)))?;

                Ok(ApiCredentials {
                    key: creds.key().to_string(),
                    secret: creds.secret().expose_secret().to_string(),
                    passphrase: creds.passphrase().expose_secret().to_string(),
                })
            })
            .await
    }

    /// Ask the CLOB to re-read on-chain collateral and token allowances
    pub async fn update_balance_allowance(&self) -> Result<()> {
        let client = SdkClient::new(&self.base_url, sdk_config())
            .map_err(|e| Error::clob(format!("Failed to create client: {}", e)))?
            .authentication_builder(&self.signer)
            .authenticate()
            .await
            .map_err(|e| Error::clob(format!("Failed to authenticate: {}", e)))?;

        for asset_type in [AssetType::Collateral, AssetType::Conditional] {
            let request = UpdateBalanceAllowanceRequest::builder()
                .asset_type(asset_type)
                .build();
            client
                .update_balance_allowance(request)
                .await
                .map_err(|e| Error::clob(format!("Failed to update balance allowance: {}", e)))?;
        }

        info!("CLOB balance/allowance cache refreshed");
        Ok(())
    }

    async fn l2_request(&self, method: Method, path: &str, body: Option<String>) -> Result<RequestBuilder> {
        let creds = self.credentials().await?;
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = l2_signature(
            &creds.secret,
            &timestamp,
            method.as_str(),
            path,
            body.as_deref().unwrap_or(""),
        )?;

        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, &url)
            .header("POLY_ADDRESS", &self.address)
            .header("POLY_SIGNATURE", signature)
            .header("POLY_TIMESTAMP", timestamp)
            .header("POLY_API_KEY", &creds.key)
            .header("POLY_PASSPHRASE", &creds.passphrase);

        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }
        Ok(request)
    }

    /// Send and decode, labelling failures with `action`
    async fn send_json(&self, request: RequestBuilder, action: &str) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::clob(format!("Failed to {}: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ClobApi {
                status: Some(status.as_u16()),
                message: format!("Failed to {}: {}", action, body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::clob(format!("Failed to {}: invalid response: {}", action, e)))
    }

    async fn public_get(&self, path: &str, query: &[(&str, &str)], action: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);
        self.send_json(self.http.get(&url).query(query), action).await
    }
}

fn sdk_config() -> SdkConfig {
    SdkConfig::builder().use_server_time(true).build()
}

/// Parse a tick size string ("0.01") into one the exchange accepts
fn parse_tick_size(tick_size: &str) -> Result<TickSize> {
    let tick = Decimal::from_str(tick_size.trim())
        .map_err(|e| Error::OrderValidation(format!("Invalid tick size {}: {}", tick_size, e)))?;
    TickSize::try_from(tick.normalize())
        .map_err(|e| Error::OrderValidation(format!("Invalid tick size {}: {}", tick_size, e)))
}

/// Caller-supplied market hints take the place of the SDK's own lookups
fn seed_market_hints<S: State>(client: &SdkClient<S>, token: U256, tick: TickSize, neg_risk: Option<bool>) {
    client.set_tick_size(token, tick);
    if let Some(neg_risk) = neg_risk {
        client.set_neg_risk(token, neg_risk);
    }
}

fn status_text(status: &OrderStatusType) -> String {
    match status {
        OrderStatusType::Live => "live".to_string(),
        OrderStatusType::Matched => "matched".to_string(),
        OrderStatusType::Canceled => "canceled".to_string(),
        OrderStatusType::Delayed => "delayed".to_string(),
        OrderStatusType::Unmatched => "unmatched".to_string(),
        OrderStatusType::Unknown(raw) => raw.clone(),
        other => other.to_string().to_lowercase(),
    }
}

/// Rejections carry the exchange's reason as their status
fn order_response(response: &PostOrderResponse) -> OrderResponse {
    let error_msg = response
        .error_msg
        .as_deref()
        .map(str::trim)
        .filter(|msg| !msg.is_empty());

    let status = match error_msg {
        Some(msg) if !response.success => msg.to_string(),
        _ => status_text(&response.status),
    };

    OrderResponse {
        order_id: response.order_id.clone(),
        status,
        success: response.success,
        transact_order_id: response
            .transaction_hashes
            .first()
            .map(|hash| format!("{:#x}", hash))
            .unwrap_or_default(),
    }
}

/// HMAC-SHA256 over `timestamp + method + path + body`, URL-safe base64.
/// The secret is accepted in any of the base64 alphabets.
pub fn l2_signature(secret: &str, timestamp: &str, method: &str, path: &str, body: &str) -> Result<String> {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};

    let secret_bytes = URL_SAFE_NO_PAD
        .decode(secret)
        .or_else(|_| URL_SAFE.decode(secret))
        .or_else(|_| STANDARD.decode(secret))
        .map_err(|e| Error::clob(format!("Failed to decode API secret: {}", e)))?;

    let mut mac = HmacSha256::new_from_slice(&secret_bytes)
        .map_err(|e| Error::clob(format!("Failed to init HMAC: {}", e)))?;
    mac.update(format!("{}{}{}{}", timestamp, method, path, body).as_bytes());

    Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
}

fn decimal_field(value: &Value, key: &str, action: &str) -> Result<Decimal> {
    let raw = value
        .get(key)
        .ok_or_else(|| Error::clob(format!("Failed to {}: missing '{}'", action, key)))?;

    let text = match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| Error::clob(format!("Failed to {}: bad '{}' {}: {}", action, key, text, e)))
}

/// `/data/orders` answers either a bare list or a `{ "data": [...] }` page
fn parse_open_orders(value: Value) -> Result<Vec<OpenOrder>> {
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut obj) => obj.remove("data").unwrap_or(Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    };
    serde_json::from_value(list).map_err(|e| Error::clob(format!("Failed to get orders: {}", e)))
}

#[async_trait]
impl OrderApi for ClobClient {
    async fn place_limit_order(
        &self,
        token_id: &str,
        side: Side,
        price: Decimal,
        size: Decimal,
        tick_size: &str,
        neg_risk: Option<bool>,
    ) -> Result<OrderResponse> {
        let token = U256::from_str_radix(token_id.trim(), 10)
            .map_err(|e| Error::clob(format!("Failed to place order: bad token id {}: {}", token_id, e)))?;

        let tick = parse_tick_size(tick_size)?;
        // The CLOB rejects prices finer than the market tick
        let price = price.trunc_with_scale(tick.as_decimal().scale());

        info!(
            "Placing GTC limit {}: token={}, price={}, size={}, tick={}, neg_risk={:?}",
            side, token_id, price, size, tick_size, neg_risk
        );

        let client = SdkClient::new(&self.base_url, sdk_config())
            .map_err(|e| Error::clob(format!("Failed to create client: {}", e)))?
            .authentication_builder(&self.signer)
            .authenticate()
            .await
            .map_err(|e| Error::clob(format!("Failed to authenticate: {}", e)))?;

        seed_market_hints(&client, token, tick, neg_risk);

        let sdk_side = match side {
            Side::Buy => SdkSide::Buy,
            Side::Sell => SdkSide::Sell,
        };

        let order = client
            .limit_order()
            .token_id(token)
            .size(size)
            .side(sdk_side)
            .price(price)
            .order_type(SdkOrderType::GTC)
            .build()
            .await
            .map_err(|e| Error::clob(format!("Failed to build order: {}", e)))?;

        let signed = client
            .sign(&self.signer, order)
            .await
            .map_err(|e| Error::clob(format!("Failed to sign order: {}", e)))?;

        let response = client
            .post_order(signed)
            .await
            .map_err(|e| Error::clob(format!("Failed to place order: {}", e)))?;

        debug!("post_order response: {:?}", response);

        Ok(order_response(&response))
    }

    async fn open_orders(&self, market: Option<&str>, asset_id: Option<&str>) -> Result<Vec<OpenOrder>> {
        let mut query = Vec::new();
        if let Some(market) = market {
            query.push(("market", market));
        }
        if let Some(asset_id) = asset_id {
            query.push(("asset_id", asset_id));
        }

        let request = self
            .l2_request(Method::GET, "/data/orders", None)
            .await?
            .query(&query);
        let value = self.send_json(request, "get orders").await?;
        parse_open_orders(value)
    }

    async fn cancel(&self, order_id: &str) -> Result<bool> {
        let body = serde_json::json!({ "orderID": order_id }).to_string();
        let request = self.l2_request(Method::DELETE, "/order", Some(body)).await?;
        let value = self.send_json(request, "cancel order").await?;

        let cancelled = value
            .get("canceled")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().any(|id| id.as_str() == Some(order_id)))
            .unwrap_or(false);
        info!("Cancel {}: {}", order_id, if cancelled { "done" } else { "not cancelled" });
        Ok(cancelled)
    }

    async fn cancel_all(&self) -> Result<bool> {
        let request = self.l2_request(Method::DELETE, "/cancel-all", None).await?;
        let value = self.send_json(request, "cancel all orders").await?;

        let count = value
            .get("canceled")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        info!("Cancelled {} orders", count);
        Ok(true)
    }

    async fn order_book(&self, token_id: &str) -> Result<OrderBook> {
        let value = self
            .public_get("/book", &[("token_id", token_id)], "get order book")
            .await?;
        let mut book: OrderBook = serde_json::from_value(value)
            .map_err(|e| Error::clob(format!("Failed to get order book: {}", e)))?;
        if book.token_id.is_empty() {
            book.token_id = token_id.to_string();
        }
        Ok(book)
    }

    async fn price(&self, token_id: &str, side: Side) -> Result<Decimal> {
        let value = self
            .public_get(
                "/price",
                &[("token_id", token_id), ("side", side.as_str())],
                "get price",
            )
            .await?;
        decimal_field(&value, "price", "get price")
    }

    async fn midpoint(&self, token_id: &str) -> Result<Decimal> {
        let value = self
            .public_get("/midpoint", &[("token_id", token_id)], "get midpoint")
            .await?;
        decimal_field(&value, "mid", "get midpoint")
    }
}
