//! Gamma API client: market and event discovery

use super::{base_url, http_client, read_json};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Event, Market};
use reqwest::{Client, Response};
use tracing::debug;

fn gamma_error(status: Option<u16>, message: String) -> Error {
    Error::GammaApi { status, message }
}

pub struct GammaClient {
    client: Client,
    gamma_url: String,
    clob_url: String,
}

impl GammaClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = http_client()
            .map_err(|e| gamma_error(None, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            gamma_url: base_url(&config.gamma_api_url),
            clob_url: base_url(&config.clob_api_url),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| gamma_error(None, format!("Failed to fetch {}: {}", what, e)))?;

        read_json(response, what, gamma_error).await
    }

    /// One page of markets
    pub async fn markets(
        &self,
        limit: u32,
        offset: u32,
        active: bool,
        closed: bool,
    ) -> Result<Vec<Market>> {
        let url = format!("{}/markets", self.gamma_url);
        self.get(&url, &market_query(limit, offset, active, closed), "markets")
            .await
    }

    /// Free-text market search
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Market>> {
        let url = format!("{}/markets", self.gamma_url);
        let params = [("_q", query.to_string()), ("limit", limit.to_string())];
        self.get(&url, &params, "markets").await
    }

    pub async fn events(&self, limit: u32, offset: u32) -> Result<Vec<Event>> {
        let url = format!("{}/events", self.gamma_url);
        let params = [("limit", limit.to_string()), ("offset", offset.to_string())];
        self.get(&url, &params, "events").await
    }

    pub async fn event(&self, event_id: &str) -> Result<Event> {
        let url = format!("{}/events/{}", self.gamma_url, event_id);
        self.get(&url, &[], "event").await
    }

    /// Full market detail by condition id, read from the CLOB `/markets`
    /// endpoint which carries tick size, minimum order size and neg-risk.
    pub async fn market(&self, condition_id: &str) -> Result<Market> {
        let url = format!("{}/markets/{}", self.clob_url, condition_id);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| gamma_error(None, format!("Failed to fetch market: {}", e)))?;

        read_market(response, condition_id).await
    }
}

async fn read_market(response: Response, condition_id: &str) -> Result<Market> {
    let status = response.status();
    if !status.is_success() {
        return Err(gamma_error(
            Some(status.as_u16()),
            format!("Market not found: {} (status {})", condition_id, status.as_u16()),
        ));
    }

    read_json(response, "market", gamma_error).await
}

fn market_query(limit: u32, offset: u32, active: bool, closed: bool) -> [(&'static str, String); 4] {
    [
        ("limit", limit.to_string()),
        ("offset", offset.to_string()),
        ("active", active.to_string()),
        ("closed", closed.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_response(status: u16, body: &'static str) -> Response {
        http::Response::builder()
            .status(status)
            .body(body)
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn test_missing_market_is_gamma_error_with_status() {
        let err = read_market(http_response(404, "{\"error\":\"market not found\"}"), "0xabc")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GammaApi { status: Some(404), .. }));
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(
            err.to_string(),
            "Gamma API error: 404 Market not found: 0xabc (status 404)"
        );
    }

    #[tokio::test]
    async fn test_market_detail_decodes_clob_shape() {
        let body = r#"{
            "condition_id": "0xabc",
            "question": "Will it rain?",
            "neg_risk": true,
            "minimum_tick_size": 0.001,
            "tokens": [
                {"token_id": "1", "outcome": "Yes", "price": 0.4},
                {"token_id": "2", "outcome": "No", "price": 0.6}
            ]
        }"#;

        let market = read_market(http_response(200, body), "0xabc").await.unwrap();
        assert_eq!(market.condition_id, "0xabc");
        assert!(market.neg_risk);
        assert_eq!(market.tick_size_str(), "0.001");
        assert_eq!(market.tokens.len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_keeps_status_and_body() {
        let err = read_json::<Vec<Market>, _>(http_response(503, "upstream down"), "markets", gamma_error)
            .await
            .unwrap_err();

        match err {
            Error::GammaApi { status, message } => {
                assert_eq!(status, Some(503));
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected Gamma error, got {:?}", other),
        }
    }

    #[test]
    fn test_market_query_uses_lowercase_flags() {
        let query = market_query(20, 40, true, false);
        assert_eq!(query[0], ("limit", "20".to_string()));
        assert_eq!(query[1], ("offset", "40".to_string()));
        assert_eq!(query[2], ("active", "true".to_string()));
        assert_eq!(query[3], ("closed", "false".to_string()));
    }

    #[test]
    fn test_urls_from_config() {
        let config = Config::from_vars(|key| match key {
            "POLY_PRIVATE_KEY" => Some("0x01".to_string()),
            "POLY_WALLET_ADDRESS" => Some("0x02".to_string()),
            "POLY_GAMMA_API_URL" => Some("http://localhost:9000/".to_string()),
            _ => None,
        })
        .unwrap();

        let client = GammaClient::new(&config).unwrap();
        assert_eq!(client.gamma_url, "http://localhost:9000");
        assert_eq!(client.clob_url, "https://clob.polymarket.com");
    }
}
