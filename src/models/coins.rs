use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dernier état de marché connu d'une crypto, indexé par l'id CoinGecko
/// ("bitcoin", "ethereum", ...).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coins")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub coin_id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<i32>,
    pub price_change_percentage24h: Option<f64>,
    // Sert au test de péremption ; None compte comme périmé
    pub last_updated: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::watchlist_coins::Entity")]
    WatchlistCoins,

    #[sea_orm(has_many = "super::holdings::Entity")]
    Holdings,
}

impl Related<super::watchlist_coins::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WatchlistCoins.def()
    }
}

impl Related<super::holdings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Holdings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
