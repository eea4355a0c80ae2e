use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::services::market_data::MarketDataProvider;
use crate::utils::jwt::JwtKeys;

/// Partagé par tous les workers, enregistré une fois en `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub market: Arc<dyn MarketDataProvider>,
    pub jwt: JwtKeys,
    pub password_hash_iterations: u32,
}

impl AppState {
    pub fn new(db: DatabaseConnection, market: Arc<dyn MarketDataProvider>, config: &Config) -> Self {
        Self {
            db,
            market,
            jwt: JwtKeys::from_settings(&config.auth),
            password_hash_iterations: config.auth.password_hash_iterations,
        }
    }
}
