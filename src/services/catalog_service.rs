use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use sea_orm::sea_query::{Expr, Func, LikeExpr, NullOrdering, OnConflict};
use sea_orm::*;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::coins;
use crate::models::dto::{Pagination, SearchHit, SearchResults, TopCoinsPage};
use crate::services::market_data::{CoinDetailSummary, MarketCoin, MarketDataProvider};

/// Au-delà, une page du catalogue est redemandée à l'API.
pub const STALE_AFTER_MINUTES: i64 = 15;
pub const DEFAULT_LIMIT: u64 = 100;
/// `/coins/markets` renvoie au plus 250 lignes par page.
pub const MAX_LIMIT: u64 = 250;
pub const DEFAULT_HISTORY_DAYS: u32 = 7;
pub const MIN_SEARCH_LENGTH: usize = 2;
pub const LOCAL_SEARCH_LIMIT: u64 = 20;

/// Passerelle des prix : synchronise la table `coins` avec l'API de marché
/// et sert les lectures depuis la base.
pub struct CatalogService;

/// Une page est périmée si elle est vide ou si sa *première* ligne date de
/// plus de 15 minutes (ou n'a jamais été rafraîchie). Les lignes suivantes
/// ne sont pas regardées : un refresh réécrit tout le top-N d'un coup.
pub fn is_stale(first: Option<&coins::Model>, now: DateTime<Utc>) -> bool {
    match first.and_then(|coin| coin.last_updated) {
        Some(updated) => updated < now - Duration::minutes(STALE_AFTER_MINUTES),
        None => true,
    }
}

/// Absent, illisible ou nul : on retombe sur la valeur par défaut.
pub fn parse_positive(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Nombre de lignes à sauter, ou `None` si l'offset ne tient pas dans un `i64`.
pub fn page_offset(page: u64, limit: u64) -> Option<u64> {
    page.saturating_sub(1)
        .checked_mul(limit)
        .filter(|skip| i64::try_from(*skip).is_ok())
}

fn paginate(cryptos: Vec<coins::Model>, page: u64, limit: u64, total: u64) -> TopCoinsPage {
    TopCoinsPage {
        cryptos,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: total.div_ceil(limit),
        },
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl CatalogService {
    pub async fn find_by_coin_id<C: ConnectionTrait>(
        db: &C,
        coin_id: &str,
    ) -> Result<Option<coins::Model>, DbErr> {
        coins::Entity::find()
            .filter(coins::Column::CoinId.eq(coin_id))
            .one(db)
            .await
    }

    /// Entrée du catalogue, sinon 404 "Cryptocurrency not found".
    pub async fn require_coin<C: ConnectionTrait>(
        db: &C,
        coin_id: &str,
    ) -> ApiResult<coins::Model> {
        Self::find_by_coin_id(db, coin_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Cryptocurrency not found"))
    }

    /// Insère ou écrase la ligne du catalogue pour une crypto.
    pub async fn upsert_coin<C: ConnectionTrait>(
        db: &C,
        coin: &MarketCoin,
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let model = coins::ActiveModel {
            coin_id: Set(coin.id.clone()),
            symbol: Set(coin.symbol.clone()),
            name: Set(coin.name.clone()),
            image: Set(coin.image.clone()),
            current_price: Set(coin.current_price),
            market_cap: Set(coin.market_cap),
            market_cap_rank: Set(coin.market_cap_rank),
            price_change_percentage24h: Set(coin.price_change_percentage_24h),
            last_updated: Set(Some(now)),
            ..Default::default()
        };

        coins::Entity::insert(model)
            .on_conflict(
                OnConflict::column(coins::Column::CoinId)
                    .update_columns([
                        coins::Column::Symbol,
                        coins::Column::Name,
                        coins::Column::Image,
                        coins::Column::CurrentPrice,
                        coins::Column::MarketCap,
                        coins::Column::MarketCapRank,
                        coins::Column::PriceChangePercentage24h,
                        coins::Column::LastUpdated,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;

        Ok(())
    }

    /// Récupère le top `limit` et fait tous les upserts en parallèle.
    /// La première erreur fait échouer l'appel.
    pub async fn refresh_top_coins(
        db: &DatabaseConnection,
        market: &dyn MarketDataProvider,
        limit: u64,
    ) -> ApiResult<usize> {
        let limit = limit.min(MAX_LIMIT);
        let coins = market.top_coins(limit).await?;
        let now = Utc::now();

        try_join_all(coins.iter().map(|coin| Self::upsert_coin(db, coin, now))).await?;

        info!(count = coins.len(), limit, "coin catalog refreshed");
        Ok(coins.len())
    }

    /// Les cryptos sans rang (mises en cache via les détails) passent en dernier.
    async fn read_page(
        db: &DatabaseConnection,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<coins::Model>, DbErr> {
        coins::Entity::find()
            .order_by_with_nulls(coins::Column::MarketCapRank, Order::Asc, NullOrdering::Last)
            .offset(skip)
            .limit(limit)
            .all(db)
            .await
    }

    /// Sert la page en cache, après l'avoir rafraîchie si elle est périmée.
    pub async fn top_coins_page(
        db: &DatabaseConnection,
        market: &dyn MarketDataProvider,
        page: u64,
        limit: u64,
    ) -> ApiResult<TopCoinsPage> {
        let limit = limit.clamp(1, MAX_LIMIT);
        let page = page.max(1);

        // Offset hors de portée d'un BIGINT : la page est forcément vide
        let Some(skip) = page_offset(page, limit) else {
            let total = coins::Entity::find().count(db).await?;
            return Ok(paginate(Vec::new(), page, limit, total));
        };

        let mut cryptos = Self::read_page(db, skip, limit).await?;

        if is_stale(cryptos.first(), Utc::now()) {
            debug!(page, limit, "catalog page stale, refreshing");
            Self::refresh_top_coins(db, market, limit).await?;
            cryptos = Self::read_page(db, skip, limit).await?;
        }

        let total = coins::Entity::find().count(db).await?;
        Ok(paginate(cryptos, page, limit, total))
    }

    /// Toujours demandé en direct. Une crypto inconnue est ajoutée au catalogue.
    pub async fn coin_details(
        db: &DatabaseConnection,
        market: &dyn MarketDataProvider,
        coin_id: &str,
    ) -> ApiResult<Value> {
        let cached = Self::find_by_coin_id(db, coin_id).await?;
        let payload = market.coin_details(coin_id).await?;

        if cached.is_none() {
            match CoinDetailSummary::from_payload(&payload) {
                Ok(summary) => {
                    Self::upsert_coin(db, &summary.into_market_coin(), Utc::now()).await?;
                }
                Err(e) => warn!(coin_id, error = %e, "coin detail payload not cacheable"),
            }
        }

        Ok(payload)
    }

    /// Historique relayé sans cache, seulement pour les cryptos du catalogue.
    pub async fn coin_history(
        db: &DatabaseConnection,
        market: &dyn MarketDataProvider,
        coin_id: &str,
        days: u32,
    ) -> ApiResult<Value> {
        Self::require_coin(db, coin_id).await?;
        market.coin_history(coin_id, days).await
    }

    /// Recherche insensible à la casse sur le nom ou le symbole. Sans résultat
    /// local, on interroge l'API (résultats non persistés).
    pub async fn search(
        db: &DatabaseConnection,
        market: &dyn MarketDataProvider,
        query: Option<&str>,
    ) -> ApiResult<SearchResults> {
        let query = query.unwrap_or_default();
        if query.chars().count() < MIN_SEARCH_LENGTH {
            return Err(ApiError::validation(
                "Search query must be at least 2 characters",
            ));
        }

        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let lower_like = |column: coins::Column| {
            Expr::expr(Func::lower(Expr::col(column)))
                .like(LikeExpr::new(pattern.clone()).escape('\\'))
        };

        let local = coins::Entity::find()
            .filter(
                Condition::any()
                    .add(lower_like(coins::Column::Name))
                    .add(lower_like(coins::Column::Symbol)),
            )
            .order_by_with_nulls(coins::Column::MarketCapRank, Order::Asc, NullOrdering::Last)
            .limit(LOCAL_SEARCH_LIMIT)
            .all(db)
            .await?;

        if !local.is_empty() {
            return Ok(SearchResults::Local(local));
        }

        let remote = market.search(query).await?;
        Ok(SearchResults::Remote(remote.into_iter().map(SearchHit::from).collect()))
    }

    /// Relais direct vers `/simple/price`.
    pub async fn prices(market: &dyn MarketDataProvider, ids: Option<&str>) -> ApiResult<Value> {
        let ids = ids.map(str::trim).filter(|ids| !ids.is_empty()).ok_or_else(|| {
            ApiError::validation("Please provide cryptocurrency IDs")
        })?;
        market.simple_prices(ids).await
    }
}
