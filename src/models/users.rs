use sea_orm::entity::prelude::*;

/// Compte utilisateur. Jamais sérialisé tel quel : les réponses passent par
/// `dto::PublicUser`, le hash et le refresh token restent côté serveur.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String, // Format: pbkdf2_sha256$iterations$salt$hash
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    // Un seul refresh token actif : remplacé au login/refresh, effacé au logout
    pub refresh_token: Option<String>,
    pub last_login: Option<DateTimeUtc>,
    pub preferred_currency: String,
    pub theme: String,
    pub notifications_enabled: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::watchlists::Entity")]
    Watchlist,

    #[sea_orm(has_one = "super::portfolios::Entity")]
    Portfolio,
}

impl Related<super::watchlists::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Watchlist.def()
    }
}

impl Related<super::portfolios::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Portfolio.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
