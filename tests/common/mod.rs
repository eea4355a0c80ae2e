// ═══════════════════════════════════════════════════════════════════
// Harnais commun : SQLite en mémoire, faux fournisseur de marché,
// helpers de requêtes
// ═══════════════════════════════════════════════════════════════════
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use crypto_tracker::db;
use crypto_tracker::error::ApiError;
use crypto_tracker::services::catalog_service::CatalogService;
use crypto_tracker::services::market_data::{MarketCoin, MarketDataProvider, UpstreamSearchCoin};
use crypto_tracker::state::AppState;
use crypto_tracker::utils::jwt::JwtKeys;

pub const TEST_SECRET: &str = "integration-test-secret";

// ═══════════════════════════════════════════════════════════════════
// Faux marché
// ═══════════════════════════════════════════════════════════════════

pub struct FakeMarket {
    pub coins: Vec<MarketCoin>,
    pub top_calls: AtomicUsize,
    pub details_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub price_calls: AtomicUsize,
}

pub fn market_coin(id: &str, symbol: &str, name: &str, rank: i32, price: f64) -> MarketCoin {
    MarketCoin {
        id: id.into(),
        symbol: symbol.into(),
        name: name.into(),
        image: Some(format!("https://img.example/{}.png", id)),
        current_price: Some(price),
        market_cap: Some(price * 1_000_000.0),
        market_cap_rank: Some(rank),
        price_change_percentage_24h: Some(1.5),
    }
}

impl FakeMarket {
    pub fn new() -> Self {
        // Volontairement dans le désordre des rangs
        Self {
            coins: vec![
                market_coin("ethereum", "eth", "Ethereum", 2, 3_000.0),
                market_coin("bitcoin", "btc", "Bitcoin", 1, 60_000.0),
                market_coin("solana", "sol", "Solana", 5, 150.0),
                market_coin("tether", "usdt", "Tether", 3, 1.0),
                market_coin("ripple", "xrp", "XRP", 4, 0.5),
            ],
            top_calls: AtomicUsize::new(0),
            details_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            price_calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn top_coins(&self, limit: u64) -> Result<Vec<MarketCoin>, ApiError> {
        self.top_calls.fetch_add(1, Ordering::SeqCst);
        let mut coins = self.coins.clone();
        coins.sort_by_key(|c| c.market_cap_rank);
        Ok(coins.into_iter().take(limit as usize).collect())
    }

    async fn coin_details(&self, coin_id: &str) -> Result<Value, ApiError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        let coin = self
            .coins
            .iter()
            .find(|c| c.id == coin_id)
            .ok_or_else(|| ApiError::Upstream("Error fetching coin details".into()))?;

        Ok(json!({
            "id": coin.id,
            "symbol": coin.symbol,
            "name": coin.name,
            "image": { "large": coin.image },
            "market_data": {
                "current_price": { "usd": coin.current_price },
                "market_cap": { "usd": coin.market_cap },
                "market_cap_rank": coin.market_cap_rank,
                "price_change_percentage_24h": coin.price_change_percentage_24h
            },
            "tickers": []
        }))
    }

    async fn coin_history(&self, _coin_id: &str, days: u32) -> Result<Value, ApiError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "days": days, "prices": [[1_700_000_000_000_i64, 42.0]] }))
    }

    async fn search(&self, _query: &str) -> Result<Vec<UpstreamSearchCoin>, ApiError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![UpstreamSearchCoin {
            id: "bittensor".into(),
            name: "Bittensor".into(),
            symbol: "TAO".into(),
            market_cap_rank: Some(30),
            thumb: Some("thumb.png".into()),
            large: Some("large.png".into()),
        }])
    }

    async fn simple_prices(&self, ids: &str) -> Result<Value, ApiError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let prices: serde_json::Map<String, Value> = ids
            .split(',')
            .map(|id| (id.to_string(), json!({ "usd": 1.0 })))
            .collect();
        Ok(Value::Object(prices))
    }
}

// ═══════════════════════════════════════════════════════════════════
// Setup
// ═══════════════════════════════════════════════════════════════════

/// Base en mémoire neuve (une seule connexion, donc une seule base visible)
/// et un faux marché inspectable par le test.
pub async fn setup() -> (AppState, Arc<FakeMarket>) {
    let conn = db::establish_connection("sqlite::memory:", 1).await.unwrap();
    db::create_schema(&conn).await.unwrap();

    let market = Arc::new(FakeMarket::new());
    let state = AppState {
        db: conn,
        market: market.clone(),
        jwt: JwtKeys::new(TEST_SECRET, Duration::minutes(15), Duration::days(7)),
        password_hash_iterations: 1_000,
    };

    (state, market)
}

/// Met les cryptos du faux marché au catalogue avec un timestamp frais.
pub async fn seed_catalog(state: &AppState, market: &FakeMarket) {
    let now = Utc::now();
    for coin in &market.coins {
        CatalogService::upsert_coin(&state.db, coin, now).await.unwrap();
    }
}

// ═══════════════════════════════════════════════════════════════════
// Helpers de requêtes
// ═══════════════════════════════════════════════════════════════════

pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub struct Session {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn register<S, B>(app: &S, username: &str) -> Session
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret123"
        }))
        .to_request();

    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    Session {
        user_id: body["data"]["user"]["id"].as_i64().unwrap(),
        access_token: body["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh_token: body["data"]["refreshToken"].as_str().unwrap().to_string(),
    }
}
