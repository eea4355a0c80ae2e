use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware::Logger, App, HttpServer};
use tracing::info;

use crypto_tracker::config::{Config, ServerConfig};
use crypto_tracker::services::coingecko::CoinGeckoClient;
use crypto_tracker::state::AppState;
use crypto_tracker::{db, error, logging, routes};

fn cors(server: &ServerConfig) -> Cors {
    let cors = if server.cors_origins.iter().any(|o| o == "*") {
        Cors::default().allow_any_origin()
    } else {
        server
            .cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .supports_credentials()
    };

    cors.allowed_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().map_err(io::Error::other)?;

    logging::init_logging(&config.logging);
    error::expose_internal_details(!config.is_production());

    info!(environment = %config.environment, "connecting to database");
    let db = db::establish_connection(&config.database.url, config.database.max_connections)
        .await
        .map_err(io::Error::other)?;
    db::create_schema(&db).await.map_err(io::Error::other)?;
    info!("database ready");

    let market = Arc::new(CoinGeckoClient::new(&config.market).map_err(io::Error::other)?);
    let state = AppState::new(db, market, &config);

    let server_config = config.server.clone();
    info!(host = %server_config.host, port = server_config.port, "starting HTTP server");

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&server_config))
            .wrap(Logger::default())
            .configure(routes::configure_app(state.clone()))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
