pub mod market_data;
pub mod coingecko;
pub mod catalog_service;
pub mod auth_service;
pub mod watchlist_service;
pub mod portfolio_service;
