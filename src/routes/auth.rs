use actix_web::{get, post, web, HttpResponse};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::{
    ApiResponse, LoginRequest, PublicUser, RefreshTokenRequest, RegisterRequest,
};
use crate::services::auth_service::AuthService;
use crate::state::AppState;

/// POST /auth/register - Créer un compte (PUBLIC)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let payload = AuthService::register(
        &state.db,
        &state.jwt,
        state.password_hash_iterations,
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Created().json(ApiResponse::data(payload)))
}

/// POST /auth/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let payload = AuthService::login(&state.db, &state.jwt, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(payload)))
}

/// POST /auth/refresh-token - Nouvelle paire de tokens (PUBLIC)
#[post("/refresh-token")]
pub async fn refresh_token(
    body: web::Json<RefreshTokenRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let tokens = AuthService::refresh(&state.db, &state.jwt, body.into_inner().refresh_token).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(tokens)))
}

/// POST /auth/logout - Invalider le refresh token (PROTÉGÉE)
#[post("/logout")]
pub async fn logout(
    auth_user: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    AuthService::logout(&state.db, auth_user.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Logged out successfully")))
}

/// GET /auth/validate - Vérifier le token (PROTÉGÉE)
#[get("/validate")]
pub async fn validate(auth_user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::data(PublicUser::from(auth_user.user)))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(refresh_token)
            .service(logout)
            .service(validate),
    );
}
