//! REST clients for the three Polymarket services
//!
//! Gamma (market discovery), Data (positions and activity) and the CLOB
//! (order book and orders). Each maps its failures onto its own
//! [`Error`](crate::error::Error) variant.

pub mod clob;
pub mod data;
pub mod gamma;

pub use clob::{ApiCredentials, ClobClient};
pub use data::DataClient;
pub use gamma::GammaClient;

use crate::error::{Error, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("polybot/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Decode a JSON body, turning non-2xx responses into `err(status, body)`
pub(crate) async fn read_json<T, F>(response: Response, what: &str, err: F) -> Result<T>
where
    T: DeserializeOwned,
    F: Fn(Option<u16>, String) -> Error,
{
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(err(Some(status.as_u16()), body));
    }

    response
        .json()
        .await
        .map_err(|e| err(None, format!("Failed to parse {}: {}", what, e)))
}

/// Strip a trailing slash so paths can be appended with `format!`
pub(crate) fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trims_slash() {
        assert_eq!(base_url("https://clob.polymarket.com/"), "https://clob.polymarket.com");
        assert_eq!(base_url("http://localhost:8080"), "http://localhost:8080");
    }
}
