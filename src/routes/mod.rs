pub mod health;
pub mod auth;
pub mod crypto;
pub mod watchlist;
pub mod portfolio;

use actix_web::{error, web};

use crate::error::ApiError;
use crate::state::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // /health aussi à la racine pour les sondes de liveness
    cfg.service(health::health_check).service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(crypto::crypto_routes)
            .configure(watchlist::watchlist_routes)
            .configure(portfolio::portfolio_routes),
    );
}

/// État partagé, gestion des erreurs body/query et toutes les routes.
/// Utilisé par `main` et par les tests d'intégration.
pub fn configure_app(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let message = match &err {
                    error::JsonPayloadError::ContentType => {
                        "Content-Type must be application/json".to_string()
                    }
                    other => format!("Invalid request body: {}", other),
                };
                ApiError::validation(message).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                ApiError::validation(format!("Invalid query string: {}", err)).into()
            }))
            .configure(configure_routes);
    }
}
