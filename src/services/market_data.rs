use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::models::dto::SearchHit;

/// Source des données de marché en direct. `CoinGeckoClient` en production,
/// un faux fournisseur dans les tests.
///
/// Chaque méthode échoue avec `ApiError::Upstream` et un message
/// "Error fetching ..." montrable au client. Pas de retry.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Top `limit` des cryptos par capitalisation décroissante.
    async fn top_coins(&self, limit: u64) -> Result<Vec<MarketCoin>, ApiError>;

    /// Document de détail complet d'une crypto, relayé tel quel.
    async fn coin_details(&self, coin_id: &str) -> Result<Value, ApiError>;

    async fn coin_history(&self, coin_id: &str, days: u32) -> Result<Value, ApiError>;

    async fn search(&self, query: &str) -> Result<Vec<UpstreamSearchCoin>, ApiError>;

    /// Prix USD, capitalisation, volume et variation 24h pour des ids séparés par des virgules.
    async fn simple_prices(&self, ids: &str) -> Result<Value, ApiError>;
}

/// Une ligne de `/coins/markets`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MarketCoin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<i32>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// La partie d'un document `/coins/{id}` utile au catalogue.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinDetailSummary {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    image: Option<ImageLinks>,
    #[serde(default)]
    market_data: Option<DetailMarketData>,
}

#[derive(Debug, Clone, Deserialize)]
struct ImageLinks {
    #[serde(default)]
    large: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DetailMarketData {
    #[serde(default)]
    current_price: HashMap<String, Value>,
    #[serde(default)]
    market_cap: HashMap<String, Value>,
    #[serde(default)]
    market_cap_rank: Option<i32>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
}

impl CoinDetailSummary {
    pub fn from_payload(payload: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload.clone())
    }

    /// Ramène le document de détail à une ligne de listing.
    pub fn into_market_coin(self) -> MarketCoin {
        let usd = |map: &HashMap<String, Value>| map.get("usd").and_then(Value::as_f64);
        let market = self.market_data;

        MarketCoin {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            image: self.image.and_then(|i| i.large),
            current_price: market.as_ref().and_then(|m| usd(&m.current_price)),
            market_cap: market.as_ref().and_then(|m| usd(&m.market_cap)),
            market_cap_rank: market.as_ref().and_then(|m| m.market_cap_rank),
            price_change_percentage_24h: market.and_then(|m| m.price_change_percentage_24h),
        }
    }
}

/// Une crypto renvoyée par `/search`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UpstreamSearchCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<i32>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

impl From<UpstreamSearchCoin> for SearchHit {
    fn from(coin: UpstreamSearchCoin) -> Self {
        SearchHit {
            coin_id: coin.id,
            name: coin.name,
            symbol: coin.symbol,
            image: coin.large.or(coin.thumb),
            market_cap_rank: coin.market_cap_rank.unwrap_or(0),
        }
    }
}
