//! Configuration lue depuis l'environnement (et `.env` s'il existe).

use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthSettings,
    pub market: MarketConfig,
    pub logging: LoggingConfig,
    pub environment: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Signature des tokens et paramètres de hash des mots de passe.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub password_hash_iterations: u32,
}

#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_level: String,
    pub json_output: bool,
}

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construit la config depuis une fonction de lookup quelconque.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cors_origins = get("CORS_ORIGIN")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Config {
            server: ServerConfig {
                host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&get, "PORT", 5000)?,
                cors_origins,
            },
            database: DatabaseConfig {
                url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            auth: AuthSettings {
                jwt_secret: get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
                access_token_ttl_minutes: parse_or(&get, "ACCESS_TOKEN_TTL_MINUTES", 60)?,
                refresh_token_ttl_days: parse_or(&get, "REFRESH_TOKEN_TTL_DAYS", 7)?,
                password_hash_iterations: parse_or(&get, "PASSWORD_HASH_ITERATIONS", 260_000)?,
            },
            market: MarketConfig {
                base_url: get("COINGECKO_API_URL")
                    .unwrap_or_else(|| DEFAULT_COINGECKO_URL.to_string()),
                api_key: get("COINGECKO_API_KEY"),
            },
            logging: LoggingConfig {
                log_level: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
                json_output: get("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            },
            environment: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
