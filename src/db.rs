// Connexion à la base et création du schéma

use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};

use crate::models::{coins, holdings, portfolios, users, watchlist_coins, watchlists};

pub async fn establish_connection(
    database_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);

    Database::connect(options).await
}

/// Crée les tables (et les index uniques composites) si absentes.
/// Les tables parentes passent en premier pour les clés étrangères.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, users::Entity).await?;
    create_table(db, coins::Entity).await?;
    create_table(db, watchlists::Entity).await?;
    create_table(db, watchlist_coins::Entity).await?;
    create_table(db, portfolios::Entity).await?;
    create_table(db, holdings::Entity).await?;

    create_index(
        db,
        Index::create()
            .name("idx_watchlist_coins_unique")
            .table(watchlist_coins::Entity)
            .col(watchlist_coins::Column::WatchlistId)
            .col(watchlist_coins::Column::CoinId)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    create_index(
        db,
        Index::create()
            .name("idx_holdings_unique")
            .table(holdings::Entity)
            .col(holdings::Column::PortfolioId)
            .col(holdings::Column::CoinId)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    create_index(
        db,
        Index::create()
            .name("idx_coins_market_cap_rank")
            .table(coins::Entity)
            .col(coins::Column::MarketCapRank)
            .if_not_exists()
            .to_owned(),
    )
    .await
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}

async fn create_index(db: &DatabaseConnection, statement: IndexCreateStatement) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}
