use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::dto::WatchlistView;
use crate::models::{coins, watchlist_coins, watchlists};
use crate::services::catalog_service::CatalogService;

pub struct WatchlistService;

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl WatchlistService {
    async fn find_watchlist(
        db: &DatabaseConnection,
        user_id: i32,
    ) -> Result<Option<watchlists::Model>, DbErr> {
        watchlists::Entity::find()
            .filter(watchlists::Column::UserId.eq(user_id))
            .one(db)
            .await
    }

    async fn find_or_create(
        db: &DatabaseConnection,
        user_id: i32,
    ) -> Result<watchlists::Model, DbErr> {
        if let Some(watchlist) = Self::find_watchlist(db, user_id).await? {
            return Ok(watchlist);
        }

        // Un premier accès concurrent a pu la créer entre-temps
        let now = Utc::now();
        watchlists::Entity::insert(watchlists::ActiveModel {
            user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(watchlists::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

        Self::find_watchlist(db, user_id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("watchlist of user {}", user_id)))
    }

    async fn coins_of(
        db: &DatabaseConnection,
        watchlist_id: i32,
    ) -> Result<Vec<coins::Model>, DbErr> {
        let rows = watchlist_coins::Entity::find()
            .filter(watchlist_coins::Column::WatchlistId.eq(watchlist_id))
            .order_by_asc(watchlist_coins::Column::Id)
            .find_also_related(coins::Entity)
            .all(db)
            .await?;

        Ok(rows.into_iter().filter_map(|(_, coin)| coin).collect())
    }

    async fn load_view(
        db: &DatabaseConnection,
        watchlist: watchlists::Model,
    ) -> Result<WatchlistView, DbErr> {
        let coins = Self::coins_of(db, watchlist.id).await?;
        Ok(WatchlistView::new(watchlist, coins))
    }

    async fn touch(
        db: &DatabaseConnection,
        watchlist: watchlists::Model,
    ) -> Result<watchlists::Model, DbErr> {
        let mut active: watchlists::ActiveModel = watchlist.into();
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    /// Watchlist de l'utilisateur, créée vide au premier accès.
    pub async fn get_watchlist(db: &DatabaseConnection, user_id: i32) -> ApiResult<WatchlistView> {
        let watchlist = Self::find_or_create(db, user_id).await?;
        Ok(Self::load_view(db, watchlist).await?)
    }

    /// Renvoie la watchlist et si la crypto a vraiment été ajoutée.
    /// Une crypto déjà suivie laisse la liste inchangée.
    pub async fn add_coin(
        db: &DatabaseConnection,
        user_id: i32,
        coin_id: &str,
    ) -> ApiResult<(WatchlistView, bool)> {
        let coin = CatalogService::require_coin(db, coin_id).await?;
        let watchlist = Self::find_or_create(db, user_id).await?;

        let already_tracked = watchlist_coins::Entity::find()
            .filter(watchlist_coins::Column::WatchlistId.eq(watchlist.id))
            .filter(watchlist_coins::Column::CoinId.eq(coin.id))
            .one(db)
            .await?
            .is_some();
        if already_tracked {
            return Ok((Self::load_view(db, watchlist).await?, false));
        }

        // L'index unique tranche un ajout concurrent de la même crypto
        let inserted = watchlist_coins::ActiveModel {
            watchlist_id: Set(watchlist.id),
            coin_id: Set(coin.id),
            ..Default::default()
        }
        .insert(db)
        .await;

        let added = match inserted {
            Ok(_) => true,
            Err(e) if is_unique_violation(&e) => false,
            Err(e) => return Err(e.into()),
        };

        let watchlist = if added {
            info!(user_id, coin_id, "coin added to watchlist");
            Self::touch(db, watchlist).await?
        } else {
            watchlist
        };

        Ok((Self::load_view(db, watchlist).await?, added))
    }

    /// Retirer une crypto absente de la liste est sans effet.
    pub async fn remove_coin(
        db: &DatabaseConnection,
        user_id: i32,
        coin_id: &str,
    ) -> ApiResult<WatchlistView> {
        let coin = CatalogService::require_coin(db, coin_id).await?;
        let watchlist = Self::find_watchlist(db, user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Watchlist not found"))?;

        let removed = watchlist_coins::Entity::delete_many()
            .filter(watchlist_coins::Column::WatchlistId.eq(watchlist.id))
            .filter(watchlist_coins::Column::CoinId.eq(coin.id))
            .exec(db)
            .await?;

        let watchlist = if removed.rows_affected > 0 {
            Self::touch(db, watchlist).await?
        } else {
            watchlist
        };

        Ok(Self::load_view(db, watchlist).await?)
    }
}
