use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::dto::{
    AddHoldingRequest, HoldingOperation, HoldingStats, HoldingView, PortfolioStats,
    PortfolioView, UpdateHoldingRequest,
};
use crate::models::{coins, holdings, portfolios};
use crate::services::catalog_service::CatalogService;

pub struct PortfolioService;

/// Prix moyen pondéré après l'achat de `added_qty` unités à `added_price`.
pub fn weighted_average(held_qty: f64, held_avg: f64, added_qty: f64, added_price: f64) -> f64 {
    let total_qty = held_qty + added_qty;
    if total_qty <= 0.0 {
        return 0.0;
    }
    (held_qty * held_avg + added_qty * added_price) / total_qty
}

/// Σ quantité × prix courant ; une crypto sans prix en cache compte pour 0.
pub fn total_value<I>(positions: I) -> f64
where
    I: IntoIterator<Item = (f64, Option<f64>)>,
{
    positions
        .into_iter()
        .map(|(quantity, price)| quantity * price.unwrap_or(0.0))
        .sum()
}

fn percentage(profit_loss: f64, cost: f64) -> f64 {
    if cost > 0.0 { profit_loss / cost * 100.0 } else { 0.0 }
}

pub fn holding_stats(holding: &holdings::Model, coin: &coins::Model) -> HoldingStats {
    let current_price = coin.current_price.unwrap_or(0.0);
    let current_value = holding.quantity * current_price;
    let cost = holding.quantity * holding.average_buy_price;
    let profit_loss = current_value - cost;

    HoldingStats {
        name: coin.name.clone(),
        symbol: coin.symbol.clone(),
        quantity: holding.quantity,
        average_buy_price: holding.average_buy_price,
        current_price,
        current_value,
        cost,
        profit_loss,
        profit_loss_percentage: percentage(profit_loss, cost),
    }
}

pub fn aggregate_stats(holdings: Vec<HoldingStats>) -> PortfolioStats {
    let total_value: f64 = holdings.iter().map(|h| h.current_value).sum();
    let total_cost: f64 = holdings.iter().map(|h| h.cost).sum();
    let profit_loss = total_value - total_cost;

    PortfolioStats {
        total_value,
        total_cost,
        profit_loss,
        profit_loss_percentage: percentage(profit_loss, total_cost),
        holdings,
    }
}

fn positive(value: Option<f64>, message: &str) -> ApiResult<f64> {
    value
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| ApiError::validation(message))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn concurrent_update() -> ApiError {
    ApiError::Conflict("Portfolio was modified concurrently, please retry".to_string())
}

impl PortfolioService {
    async fn find_portfolio<C: ConnectionTrait>(
        conn: &C,
        user_id: i32,
    ) -> Result<Option<portfolios::Model>, DbErr> {
        portfolios::Entity::find()
            .filter(portfolios::Column::UserId.eq(user_id))
            .one(conn)
            .await
    }

    async fn require_portfolio<C: ConnectionTrait>(
        conn: &C,
        user_id: i32,
    ) -> ApiResult<portfolios::Model> {
        Self::find_portfolio(conn, user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Portfolio not found"))
    }

    /// Crée un portfolio vide si l'utilisateur n'en a pas. Une création
    /// concurrente ne lève pas d'erreur : la transaction reste utilisable.
    async fn insert_if_absent<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<(), DbErr> {
        let portfolio = portfolios::ActiveModel {
            user_id: Set(user_id),
            total_value: Set(0.0),
            last_updated: Set(Utc::now()),
            ..Default::default()
        };

        portfolios::Entity::insert(portfolio)
            .on_conflict(
                OnConflict::column(portfolios::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }

    /// Portfolio de l'utilisateur, créé vide au premier accès.
    async fn find_or_create<C: ConnectionTrait>(
        conn: &C,
        user_id: i32,
    ) -> Result<portfolios::Model, DbErr> {
        if let Some(portfolio) = Self::find_portfolio(conn, user_id).await? {
            return Ok(portfolio);
        }

        Self::insert_if_absent(conn, user_id).await?;
        Self::find_portfolio(conn, user_id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("portfolio of user {}", user_id)))
    }

    async fn find_holding<C: ConnectionTrait>(
        conn: &C,
        portfolio_id: i32,
        coin_pk: i32,
    ) -> Result<Option<holdings::Model>, DbErr> {
        holdings::Entity::find()
            .filter(holdings::Column::PortfolioId.eq(portfolio_id))
            .filter(holdings::Column::CoinId.eq(coin_pk))
            .one(conn)
            .await
    }

    async fn holdings_with_coins<C: ConnectionTrait>(
        conn: &C,
        portfolio_id: i32,
    ) -> Result<Vec<(holdings::Model, coins::Model)>, DbErr> {
        let rows = holdings::Entity::find()
            .filter(holdings::Column::PortfolioId.eq(portfolio_id))
            .order_by_asc(holdings::Column::Id)
            .find_also_related(coins::Entity)
            .all(conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(holding, coin)| coin.map(|coin| (holding, coin)))
            .collect())
    }

    /// Revalorise chaque position au prix de sa propre crypto et stocke le total.
    async fn recompute_total<C: ConnectionTrait>(
        conn: &C,
        portfolio: portfolios::Model,
    ) -> Result<portfolios::Model, DbErr> {
        let rows = Self::holdings_with_coins(conn, portfolio.id).await?;
        let total = total_value(rows.iter().map(|(h, c)| (h.quantity, c.current_price)));

        let mut active: portfolios::ActiveModel = portfolio.into();
        active.total_value = Set(total);
        active.last_updated = Set(Utc::now());
        active.update(conn).await
    }

    async fn load_view<C: ConnectionTrait>(
        conn: &C,
        portfolio: portfolios::Model,
    ) -> Result<PortfolioView, DbErr> {
        let holdings = Self::holdings_with_coins(conn, portfolio.id)
            .await?
            .into_iter()
            .map(|(holding, coin)| HoldingView::new(holding, coin))
            .collect();

        Ok(PortfolioView::new(portfolio, holdings))
    }

    pub async fn get_portfolio(db: &DatabaseConnection, user_id: i32) -> ApiResult<PortfolioView> {
        let portfolio = Self::find_or_create(db, user_id).await?;
        Ok(Self::load_view(db, portfolio).await?)
    }

    /// Achat à `purchase_price`. Une position existante est fusionnée au prix
    /// moyen pondéré ; une nouvelle part du prix donné.
    pub async fn add_holding(
        db: &DatabaseConnection,
        user_id: i32,
        coin_id: &str,
        request: AddHoldingRequest,
    ) -> ApiResult<PortfolioView> {
        let quantity = positive(request.quantity, "Quantity must be greater than 0")?;
        let purchase_price =
            positive(request.purchase_price, "Purchase price must be greater than 0")?;

        let txn = db.begin().await?;

        let coin = CatalogService::require_coin(&txn, coin_id).await?;
        let portfolio = Self::find_or_create(&txn, user_id).await?;

        match Self::find_holding(&txn, portfolio.id, coin.id).await? {
            Some(holding) => {
                let new_quantity = holding.quantity + quantity;
                let new_average = weighted_average(
                    holding.quantity,
                    holding.average_buy_price,
                    quantity,
                    purchase_price,
                );

                // Ne s'applique que si la ligne n'a pas bougé depuis la lecture
                let result = holdings::Entity::update_many()
                    .col_expr(holdings::Column::Quantity, Expr::value(new_quantity))
                    .col_expr(holdings::Column::AverageBuyPrice, Expr::value(new_average))
                    .filter(holdings::Column::Id.eq(holding.id))
                    .filter(holdings::Column::Quantity.eq(holding.quantity))
                    .filter(holdings::Column::AverageBuyPrice.eq(holding.average_buy_price))
                    .exec(&txn)
                    .await?;

                if result.rows_affected == 0 {
                    return Err(concurrent_update());
                }
            }
            None => {
                let inserted = holdings::ActiveModel {
                    portfolio_id: Set(portfolio.id),
                    coin_id: Set(coin.id),
                    quantity: Set(quantity),
                    average_buy_price: Set(purchase_price),
                    ..Default::default()
                }
                .insert(&txn)
                .await;

                match inserted {
                    Ok(_) => {}
                    Err(e) if is_unique_violation(&e) => return Err(concurrent_update()),
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let portfolio = Self::recompute_total(&txn, portfolio).await?;
        txn.commit().await?;

        info!(user_id, coin_id, quantity, purchase_price, "holding added");
        Ok(Self::load_view(db, portfolio).await?)
    }

    /// Achat ou vente sur une position existante. Le prix moyen ne bouge pas.
    pub async fn update_holding(
        db: &DatabaseConnection,
        user_id: i32,
        coin_id: &str,
        request: UpdateHoldingRequest,
    ) -> ApiResult<(HoldingOperation, PortfolioView)> {
        let quantity = positive(request.quantity, "Quantity must be greater than 0")?;
        let operation = HoldingOperation::parse(request.operation.as_deref())
            .ok_or_else(|| ApiError::validation("Operation must be either \"buy\" or \"sell\""))?;

        let txn = db.begin().await?;

        let coin = CatalogService::require_coin(&txn, coin_id).await?;
        let portfolio = Self::require_portfolio(&txn, user_id).await?;
        let holding = Self::find_holding(&txn, portfolio.id, coin.id)
            .await?
            .ok_or_else(|| ApiError::not_found("This cryptocurrency is not in your portfolio"))?;

        match operation {
            HoldingOperation::Sell => {
                let insufficient = || ApiError::validation("Insufficient holding to sell");
                if holding.quantity < quantity {
                    return Err(insufficient());
                }

                let result = holdings::Entity::update_many()
                    .col_expr(
                        holdings::Column::Quantity,
                        Expr::col(holdings::Column::Quantity).sub(quantity),
                    )
                    .filter(holdings::Column::Id.eq(holding.id))
                    .filter(holdings::Column::Quantity.gte(quantity))
                    .exec(&txn)
                    .await?;

                if result.rows_affected == 0 {
                    return Err(insufficient());
                }

                // Une position vendue jusqu'à zéro disparaît
                holdings::Entity::delete_many()
                    .filter(holdings::Column::Id.eq(holding.id))
                    .filter(holdings::Column::Quantity.eq(0.0))
                    .exec(&txn)
                    .await?;
            }
            HoldingOperation::Buy => {
                holdings::Entity::update_many()
                    .col_expr(
                        holdings::Column::Quantity,
                        Expr::col(holdings::Column::Quantity).add(quantity),
                    )
                    .filter(holdings::Column::Id.eq(holding.id))
                    .exec(&txn)
                    .await?;
            }
        }

        let portfolio = Self::recompute_total(&txn, portfolio).await?;
        txn.commit().await?;

        info!(user_id, coin_id, quantity, operation = operation.past_tense(), "holding updated");
        Ok((operation, Self::load_view(db, portfolio).await?))
    }

    /// Supprime une position. Sans effet si la crypto n'est pas détenue.
    pub async fn remove_holding(
        db: &DatabaseConnection,
        user_id: i32,
        coin_id: &str,
    ) -> ApiResult<PortfolioView> {
        let txn = db.begin().await?;

        let coin = CatalogService::require_coin(&txn, coin_id).await?;
        let portfolio = Self::require_portfolio(&txn, user_id).await?;

        holdings::Entity::delete_many()
            .filter(holdings::Column::PortfolioId.eq(portfolio.id))
            .filter(holdings::Column::CoinId.eq(coin.id))
            .exec(&txn)
            .await?;

        let portfolio = Self::recompute_total(&txn, portfolio).await?;
        txn.commit().await?;

        Ok(Self::load_view(db, portfolio).await?)
    }

    pub async fn stats(db: &DatabaseConnection, user_id: i32) -> ApiResult<PortfolioStats> {
        let portfolio = Self::require_portfolio(db, user_id).await?;
        let holdings = Self::holdings_with_coins(db, portfolio.id)
            .await?
            .iter()
            .map(|(holding, coin)| holding_stats(holding, coin))
            .collect();

        Ok(aggregate_stats(holdings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn coin(price: Option<f64>) -> coins::Model {
        coins::Model {
            id: 1,
            coin_id: "ethereum".into(),
            symbol: "eth".into(),
            name: "Ethereum".into(),
            image: None,
            current_price: price,
            market_cap: None,
            market_cap_rank: Some(2),
            price_change_percentage24h: None,
            last_updated: None,
        }
    }

    fn holding(quantity: f64, average_buy_price: f64) -> holdings::Model {
        holdings::Model { id: 1, portfolio_id: 1, coin_id: 1, quantity, average_buy_price }
    }

    #[test]
    fn test_weighted_average() {
        // 2 @ 100 puis 3 @ 200 → (200 + 600) / 5
        assert!(approx(weighted_average(2.0, 100.0, 3.0, 200.0), 160.0));
        assert!(approx(weighted_average(0.5, 30_000.0, 0.5, 30_000.0), 30_000.0));
        assert!(approx(weighted_average(0.0, 0.0, 4.0, 12.5), 12.5));
    }

    #[test]
    fn test_total_value_ignores_missing_prices() {
        let total = total_value([(2.0, Some(10.0)), (5.0, None), (0.5, Some(100.0))]);
        assert!(approx(total, 70.0));
    }

    #[test]
    fn test_holding_stats() {
        let stats = holding_stats(&holding(2.0, 100.0), &coin(Some(150.0)));

        assert!(approx(stats.current_value, 300.0));
        assert!(approx(stats.cost, 200.0));
        assert!(approx(stats.profit_loss, 100.0));
        assert!(approx(stats.profit_loss_percentage, 50.0));
    }

    #[test]
    fn test_holding_stats_zero_cost() {
        let stats = holding_stats(&holding(1.0, 0.0), &coin(Some(10.0)));
        assert_eq!(stats.profit_loss_percentage, 0.0);
    }

    #[test]
    fn test_aggregate_stats() {
        let stats = aggregate_stats(vec![
            holding_stats(&holding(2.0, 100.0), &coin(Some(150.0))),
            holding_stats(&holding(1.0, 400.0), &coin(Some(300.0))),
        ]);

        assert!(approx(stats.total_value, 600.0));
        assert!(approx(stats.total_cost, 600.0));
        assert!(approx(stats.profit_loss, 0.0));
        assert!(approx(stats.profit_loss_percentage, 0.0));
        assert_eq!(stats.holdings.len(), 2);
    }

    #[test]
    fn test_aggregate_stats_empty() {
        let stats = aggregate_stats(Vec::new());
        assert_eq!(stats.total_value, 0.0);
        assert_eq!(stats.profit_loss_percentage, 0.0);
    }

    async fn database_with_user() -> (DatabaseConnection, i32) {
        let db = crate::db::establish_connection("sqlite::memory:", 1).await.unwrap();
        crate::db::create_schema(&db).await.unwrap();

        let now = Utc::now();
        let user = users::ActiveModel {
            username: Set("alice".into()),
            email: Set("alice@example.com".into()),
            password_hash: Set("pbkdf2_sha256$1$salt$hash".into()),
            role: Set("user".into()),
            preferred_currency: Set("usd".into()),
            theme: Set("light".into()),
            notifications_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        (db, user.id)
    }

    #[actix_web::test]
    async fn test_concurrent_create_keeps_transaction_usable() {
        let (db, user_id) = database_with_user().await;
        let txn = db.begin().await.unwrap();

        let first = PortfolioService::find_or_create(&txn, user_id).await.unwrap();
        // Une requête concurrente recrée le portfolio après notre SELECT
        PortfolioService::insert_if_absent(&txn, user_id).await.unwrap();
        let again = PortfolioService::find_or_create(&txn, user_id).await.unwrap();
        txn.commit().await.unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(portfolios::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[test]
    fn test_positive_validation() {
        assert!(positive(Some(1.5), "m").is_ok());
        assert!(matches!(positive(Some(0.0), "m"), Err(ApiError::Validation(_))));
        assert!(positive(Some(-3.0), "m").is_err());
        assert!(positive(Some(f64::NAN), "m").is_err());
        assert!(positive(None, "m").is_err());
    }
}
