//! Market price sampling via the CoinGecko simple-price API.
//!
//! All prices for a tick are fetched in one batched request. Every
//! failure mode -- rate limiting, upstream errors, network trouble,
//! unparseable payloads -- degrades to an empty snapshot so the caller
//! treats the affected assets as unknown.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{error, instrument, trace, warn};

use crate::PriceSnapshot;
use crate::config;

/// Upstream response shape: `{"bitcoin": {"usd": 50000.0}, ...}`
type PriceResponse = HashMap<String, HashMap<String, f64>>;

/// Bounded so a laggy market API cannot stall the monitor loop.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct MarketClient {
    /// HTTP client (reused across requests for efficiency)
    client: Client,
    base_url: String,
}

impl MarketClient {
    pub fn new() -> Self {
        Self::with_base_url(config::COINGECKO_URL)
    }

    /// Point the client at a different price endpoint (used by tests).
    pub fn with_base_url(base_url: impl ToString) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.to_string(),
        }
    }

    /// Fetch the current USD price for each asset in one batch request.
    ///
    /// The returned snapshot may cover a subset of the requested assets;
    /// missing keys mean the source did not report them.
    #[instrument(skip(self))]
    pub async fn fetch_prices(&self, assets: &[&str]) -> PriceSnapshot {
        if assets.is_empty() {
            return PriceSnapshot::new();
        }

        let ids = assets.join(",");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", "usd")])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!("market request failed: {e}");
                return PriceSnapshot::new();
            }
        };

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("market API rate limit exceeded (HTTP 429), skipping update");
                return PriceSnapshot::new();
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!("market API returned {status}: {body}");
                return PriceSnapshot::new();
            }
        }

        let payload = match response.json::<PriceResponse>().await {
            Ok(payload) => payload,
            Err(e) => {
                error!("failed to parse market response: {e}");
                return PriceSnapshot::new();
            }
        };

        let prices: PriceSnapshot = payload
            .into_iter()
            .filter_map(|(asset, quotes)| quotes.get("usd").map(|price| (asset, *price)))
            .collect();

        trace!("received {} prices", prices.len());
        prices
    }
}

impl Default for MarketClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(mock_server: &MockServer) -> MarketClient {
        MarketClient::with_base_url(mock_server.uri())
    }

    #[tokio::test]
    async fn test_batch_request_is_normalized() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("ids", "bitcoin,ethereum"))
            .and(query_param("vs_currencies", "usd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "bitcoin": {"usd": 50000.0},
                "ethereum": {"usd": 3000.0}
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let prices = client.fetch_prices(&["bitcoin", "ethereum"]).await;

        assert_eq!(prices.get("bitcoin"), Some(&50000.0));
        assert_eq!(prices.get("ethereum"), Some(&3000.0));
    }

    #[tokio::test]
    async fn test_partial_response_yields_partial_snapshot() {
        let mock_server = MockServer::start().await;

        // Upstream omitted ethereum entirely and left bitcoin without a
        // usd quote; neither may show up as a price.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "bitcoin": {}
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let prices = client.fetch_prices(&["bitcoin", "ethereum"]).await;

        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_degrades_to_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let prices = client.fetch_prices(&["bitcoin"]).await;

        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_degrades_to_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let prices = client.fetch_prices(&["bitcoin"]).await;

        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_degrades_to_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not valid json"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let prices = client.fetch_prices(&["bitcoin"]).await;

        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_degrades_to_empty() {
        // Port 9 is the discard port; nothing should be listening.
        let client = MarketClient::with_base_url("http://127.0.0.1:9");
        let prices = client.fetch_prices(&["bitcoin"]).await;

        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_empty_asset_list_skips_the_request() {
        let client = MarketClient::with_base_url("http://127.0.0.1:9");
        let prices = client.fetch_prices(&[]).await;

        assert!(prices.is_empty());
    }
}
