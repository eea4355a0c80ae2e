use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::MarketConfig;
use crate::error::ApiError;
use crate::services::market_data::{MarketCoin, MarketDataProvider, UpstreamSearchCoin};

/// Client CoinGecko v3 (offre publique ou clé démo).
///
/// La clé part dans le paramètre `x_cg_demo_api_key` : les URLs ne sont
/// jamais loggées avec leur query string.
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    coins: Vec<UpstreamSearchCoin>,
}

impl CoinGeckoClient {
    pub fn new(config: &MarketConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        failure: &str,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "calling market data API");

        let mut request = self.client.get(&url).query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("x_cg_demo_api_key", key)]);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                let status = e.status();
                error!(%url, ?status, error = %redact(e), "market data request failed");
                ApiError::Upstream(failure.to_string())
            })?;

        response.json::<T>().await.map_err(|e| {
            error!(%url, error = %redact(e), "market data response could not be decoded");
            ApiError::Upstream(failure.to_string())
        })
    }
}

/// Les erreurs reqwest embarquent l'URL complète, clé API comprise.
fn redact(e: reqwest::Error) -> reqwest::Error {
    e.without_url()
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    async fn top_coins(&self, limit: u64) -> Result<Vec<MarketCoin>, ApiError> {
        self.get_json(
            "/coins/markets",
            &[
                ("vs_currency", "usd".to_string()),
                ("order", "market_cap_desc".to_string()),
                ("per_page", limit.to_string()),
                ("page", "1".to_string()),
                ("sparkline", "false".to_string()),
            ],
            "Error fetching cryptocurrency data",
        )
        .await
    }

    async fn coin_details(&self, coin_id: &str) -> Result<Value, ApiError> {
        self.get_json(
            &format!("/coins/{}", coin_id),
            &[
                ("localization", "false".to_string()),
                ("tickers", "true".to_string()),
                ("market_data", "true".to_string()),
                ("community_data", "false".to_string()),
                ("developer_data", "false".to_string()),
                ("sparkline", "false".to_string()),
            ],
            "Error fetching coin details",
        )
        .await
    }

    async fn coin_history(&self, coin_id: &str, days: u32) -> Result<Value, ApiError> {
        self.get_json(
            &format!("/coins/{}/market_chart", coin_id),
            &[("vs_currency", "usd".to_string()), ("days", days.to_string())],
            "Error fetching price history",
        )
        .await
    }

    async fn search(&self, query: &str) -> Result<Vec<UpstreamSearchCoin>, ApiError> {
        let envelope: SearchEnvelope = self
            .get_json(
                "/search",
                &[("query", query.to_string())],
                "Error searching for coins",
            )
            .await?;
        Ok(envelope.coins)
    }

    async fn simple_prices(&self, ids: &str) -> Result<Value, ApiError> {
        self.get_json(
            "/simple/price",
            &[
                ("ids", ids.to_string()),
                ("vs_currencies", "usd".to_string()),
                ("include_market_cap", "true".to_string()),
                ("include_24hr_vol", "true".to_string()),
                ("include_24hr_change", "true".to_string()),
            ],
            "Error fetching cryptocurrency prices",
        )
        .await
    }
}
