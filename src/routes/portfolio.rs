use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::{AddHoldingRequest, ApiResponse, UpdateHoldingRequest};
use crate::services::portfolio_service::PortfolioService;
use crate::state::AppState;

#[get("")]
pub async fn get_portfolio(
    auth_user: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let portfolio = PortfolioService::get_portfolio(&state.db, auth_user.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(portfolio)))
}

#[get("/stats")]
pub async fn get_stats(
    auth_user: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let stats = PortfolioService::stats(&state.db, auth_user.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(stats)))
}

#[post("/add/{coin_id}")]
pub async fn add_holding(
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<AddHoldingRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let portfolio =
        PortfolioService::add_holding(&state.db, auth_user.id(), &path, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        "Cryptocurrency added to portfolio",
        portfolio,
    )))
}

/// PUT /portfolio/update/{coin_id} - achat ou vente sur une position existante
#[put("/update/{coin_id}")]
pub async fn update_holding(
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<UpdateHoldingRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (operation, portfolio) =
        PortfolioService::update_holding(&state.db, auth_user.id(), &path, body.into_inner())
            .await?;

    let message = format!("Successfully {} cryptocurrency", operation.past_tense());
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(message, portfolio)))
}

#[delete("/remove/{coin_id}")]
pub async fn remove_holding(
    auth_user: AuthUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let portfolio = PortfolioService::remove_holding(&state.db, auth_user.id(), &path).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        "Cryptocurrency removed from portfolio",
        portfolio,
    )))
}

pub fn portfolio_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/portfolio")
            .service(get_portfolio)
            .service(get_stats)
            .service(add_holding)
            .service(update_holding)
            .service(remove_holding),
    );
}
