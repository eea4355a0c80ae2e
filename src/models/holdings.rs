use sea_orm::entity::prelude::*;

/// Position sur une crypto dans un portfolio.
///
/// - `quantity` ne passe jamais sous zéro ; une ligne qui tombe à zéro est supprimée.
/// - `average_buy_price` est le prix moyen pondéré. Il ne bouge qu'à l'ajout
///   d'une position ("add holding") ; une vente ne le modifie pas.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "holdings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub portfolio_id: i32,
    pub coin_id: i32,
    pub quantity: f64,
    pub average_buy_price: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portfolios::Entity",
        from = "Column::PortfolioId",
        to = "super::portfolios::Column::Id"
    )]
    Portfolio,

    #[sea_orm(
        belongs_to = "super::coins::Entity",
        from = "Column::CoinId",
        to = "super::coins::Column::Id"
    )]
    Coin,
}

impl Related<super::portfolios::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Portfolio.def()
    }
}

impl Related<super::coins::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coin.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
