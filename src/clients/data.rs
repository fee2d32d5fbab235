//! Data API client: positions and trade activity

use super::{base_url, http_client, read_json};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Position, Trade};
use reqwest::Client;
use tracing::debug;

fn data_error(status: Option<u16>, message: String) -> Error {
    Error::DataApi { status, message }
}

pub struct DataClient {
    client: Client,
    base_url: String,
}

impl DataClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = http_client()
            .map_err(|e| data_error(None, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url(&config.data_api_url),
        })
    }

    /// Current open positions for `address`
    pub async fn positions(&self, address: &str) -> Result<Vec<Position>> {
        let url = format!("{}/positions", self.base_url);
        debug!("GET {} user={}", url, address);

        let response = self
            .client
            .get(&url)
            .query(&[("user", address)])
            .send()
            .await
            .map_err(|e| data_error(None, format!("Failed to fetch positions: {}", e)))?;

        read_json(response, "positions", data_error).await
    }

    /// Most recent activity (fills) for `address`
    pub async fn trades(&self, address: &str, limit: u32) -> Result<Vec<Trade>> {
        let url = format!("{}/activity", self.base_url);
        debug!("GET {} user={} limit={}", url, address, limit);

        let response = self
            .client
            .get(&url)
            .query(&[("user", address.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| data_error(None, format!("Failed to fetch trades: {}", e)))?;

        read_json(response, "trades", data_error).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Response;

    fn http_response(status: u16, body: &'static str) -> Response {
        http::Response::builder()
            .status(status)
            .body(body)
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn test_error_status_is_data_error() {
        let err = read_json::<Vec<Position>, _>(
            http_response(400, "{\"error\":\"invalid user\"}"),
            "positions",
            data_error,
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.to_string(), "Data API error: 400 {\"error\":\"invalid user\"}");
    }

    #[tokio::test]
    async fn test_malformed_body_is_data_error_without_status() {
        let err = read_json::<Vec<Trade>, _>(http_response(200, "<html>"), "trades", data_error)
            .await
            .unwrap_err();

        match err {
            Error::DataApi { status, message } => {
                assert_eq!(status, None);
                assert!(message.starts_with("Failed to parse trades"));
            }
            other => panic!("expected Data error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_positions() {
        let positions: Vec<Position> = read_json(http_response(200, "[]"), "positions", data_error)
            .await
            .unwrap();
        assert!(positions.is_empty());
    }
}
