use actix_web::{delete, get, post, web, HttpResponse};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::ApiResponse;
use crate::services::watchlist_service::WatchlistService;
use crate::state::AppState;

#[get("")]
pub async fn get_watchlist(
    auth_user: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let watchlist = WatchlistService::get_watchlist(&state.db, auth_user.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(watchlist)))
}

#[post("/{coin_id}")]
pub async fn add_coin(
    auth_user: AuthUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (watchlist, added) = WatchlistService::add_coin(&state.db, auth_user.id(), &path).await?;

    let message = if added { "Coin added to watchlist" } else { "Coin already in watchlist" };
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(message, watchlist)))
}

#[delete("/{coin_id}")]
pub async fn remove_coin(
    auth_user: AuthUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let watchlist = WatchlistService::remove_coin(&state.db, auth_user.id(), &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("Coin removed from watchlist", watchlist)))
}

pub fn watchlist_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/watchlist")
            .service(get_watchlist)
            .service(add_coin)
            .service(remove_coin),
    );
}
