// Corps de requête et formes de réponse de l'API.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{coins, holdings, portfolios, users, watchlists};

/// Enveloppe standard : `{ success, message?, data? }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self { success: true, message: None, data: Some(data) }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: Some(message.into()), data: Some(data) }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()), data: None }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"))]
    pub username: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Preferences {
    pub currency: String,
    pub theme: String,
    pub notifications: bool,
}

/// Utilisateur vu par le client : ni hash, ni refresh token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub last_login: Option<DateTime<Utc>>,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for PublicUser {
    fn from(user: users::Model) -> Self {
        PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            last_login: user.last_login,
            preferences: Preferences {
                currency: user.preferred_currency,
                theme: user.theme,
                notifications: user.notifications_enabled,
            },
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: PublicUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

// ---------------------------------------------------------------------------
// Catalogue crypto
// ---------------------------------------------------------------------------

/// Query brute, parsée avec tolérance : `?limit=abc` retombe sur le défaut.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PricesQuery {
    pub ids: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize)]
pub struct TopCoinsPage {
    pub cryptos: Vec<coins::Model>,
    pub pagination: Pagination,
}

/// Résultat de recherche API remis au format du catalogue.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub coin_id: String,
    pub name: String,
    pub symbol: String,
    pub image: Option<String>,
    pub market_cap_rank: i32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Database,
    Api,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchResults {
    Local(Vec<coins::Model>),
    Remote(Vec<SearchHit>),
}

impl SearchResults {
    pub fn source(&self) -> SearchSource {
        match self {
            SearchResults::Local(_) => SearchSource::Database,
            SearchResults::Remote(_) => SearchSource::Api,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub data: SearchResults,
    pub source: SearchSource,
}

// ---------------------------------------------------------------------------
// Watchlist
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistView {
    pub id: i32,
    pub user: i32,
    pub coins: Vec<coins::Model>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchlistView {
    pub fn new(watchlist: watchlists::Model, coins: Vec<coins::Model>) -> Self {
        WatchlistView {
            id: watchlist.id,
            user: watchlist.user_id,
            coins,
            created_at: watchlist.created_at,
            updated_at: watchlist.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

/// Un champ absent devient `None` et est refusé par le service avec le
/// même message qu'une valeur non positive.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddHoldingRequest {
    pub quantity: Option<f64>,
    pub purchase_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateHoldingRequest {
    pub quantity: Option<f64>,
    pub operation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingOperation {
    Buy,
    Sell,
}

impl HoldingOperation {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some("buy") => Some(HoldingOperation::Buy),
            Some("sell") => Some(HoldingOperation::Sell),
            _ => None,
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            HoldingOperation::Buy => "bought",
            HoldingOperation::Sell => "sold",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingView {
    pub crypto: coins::Model,
    pub quantity: f64,
    pub average_buy_price: f64,
    // Réservé à un historique des transactions, toujours vide pour l'instant
    pub transactions: Vec<i32>,
}

impl HoldingView {
    pub fn new(holding: holdings::Model, coin: coins::Model) -> Self {
        HoldingView {
            crypto: coin,
            quantity: holding.quantity,
            average_buy_price: holding.average_buy_price,
            transactions: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioView {
    pub id: i32,
    pub user: i32,
    pub holdings: Vec<HoldingView>,
    pub total_value: f64,
    pub last_updated: DateTime<Utc>,
}

impl PortfolioView {
    pub fn new(portfolio: portfolios::Model, holdings: Vec<HoldingView>) -> Self {
        PortfolioView {
            id: portfolio.id,
            user: portfolio.user_id,
            holdings,
            total_value: portfolio.total_value,
            last_updated: portfolio.last_updated,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldingStats {
    pub name: String,
    pub symbol: String,
    pub quantity: f64,
    pub average_buy_price: f64,
    pub current_price: f64,
    pub current_value: f64,
    pub cost: f64,
    pub profit_loss: f64,
    pub profit_loss_percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStats {
    pub total_value: f64,
    pub total_cost: f64,
    pub profit_loss: f64,
    pub profit_loss_percentage: f64,
    pub holdings: Vec<HoldingStats>,
}
