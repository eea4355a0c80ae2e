use actix_web::{get, web, HttpResponse};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::{
    ApiResponse, HistoryQuery, PageQuery, PricesQuery, SearchQuery, SearchResponse,
};
use crate::services::catalog_service::{
    parse_positive, CatalogService, DEFAULT_HISTORY_DAYS, DEFAULT_LIMIT,
};
use crate::state::AppState;

/// GET /crypto/top?limit&page - liste paginée, rafraîchie si périmée
#[get("/top")]
pub async fn get_top(
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let limit = parse_positive(query.limit.as_deref(), DEFAULT_LIMIT);
    let page = parse_positive(query.page.as_deref(), 1);

    let page = CatalogService::top_coins_page(&state.db, state.market.as_ref(), page, limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(page)))
}

#[get("/details/{coin_id}")]
pub async fn get_details(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let details = CatalogService::coin_details(&state.db, state.market.as_ref(), &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(details)))
}

#[get("/history/{coin_id}")]
pub async fn get_history(
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let days = parse_positive(query.days.as_deref(), DEFAULT_HISTORY_DAYS.into());
    let days = u32::try_from(days).unwrap_or(DEFAULT_HISTORY_DAYS);

    let history =
        CatalogService::coin_history(&state.db, state.market.as_ref(), &path, days).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(history)))
}

/// GET /crypto/search?q - d'abord le catalogue local, sinon l'API
#[get("/search")]
pub async fn search(
    query: web::Query<SearchQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let results =
        CatalogService::search(&state.db, state.market.as_ref(), query.q.as_deref()).await?;

    Ok(HttpResponse::Ok().json(SearchResponse {
        success: true,
        source: results.source(),
        data: results,
    }))
}

#[get("/prices")]
pub async fn get_prices(
    query: web::Query<PricesQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let prices = CatalogService::prices(state.market.as_ref(), query.ids.as_deref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(prices)))
}

/// GET /crypto/refresh?limit - force le rafraîchissement (PROTÉGÉE)
#[get("/refresh")]
pub async fn refresh(
    _auth_user: AuthUser,
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let limit = parse_positive(query.limit.as_deref(), DEFAULT_LIMIT);
    CatalogService::refresh_top_coins(&state.db, state.market.as_ref(), limit).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message(
        "Cryptocurrency data refreshed successfully",
    )))
}

pub fn crypto_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/crypto")
            .service(get_top)
            .service(get_details)
            .service(get_history)
            .service(search)
            .service(get_prices)
            .service(refresh),
    );
}
