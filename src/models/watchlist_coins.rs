use sea_orm::entity::prelude::*;

/// Une crypto dans une watchlist. L'ordre des ids est l'ordre d'insertion ;
/// `(watchlist_id, coin_id)` porte un index unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "watchlist_coins")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub watchlist_id: i32,
    pub coin_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::watchlists::Entity",
        from = "Column::WatchlistId",
        to = "super::watchlists::Column::Id"
    )]
    Watchlist,

    #[sea_orm(
        belongs_to = "super::coins::Entity",
        from = "Column::CoinId",
        to = "super::coins::Column::Id"
    )]
    Coin,
}

impl Related<super::watchlists::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Watchlist.def()
    }
}

impl Related<super::coins::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coin.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
