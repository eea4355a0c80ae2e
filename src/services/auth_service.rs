use actix_web::web;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::{info, warn};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::dto::{AuthPayload, LoginRequest, PublicUser, RegisterRequest, TokenPair};
use crate::models::users;
use crate::utils::jwt::{JwtKeys, TokenKind};
use crate::utils::password;

pub struct AuthService;

const DUPLICATE_USER: &str = "User with this email or username already exists";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// PBKDF2 bloque le thread : on le sort de l'executor async
async fn hash_blocking(plain: String, iterations: u32) -> ApiResult<String> {
    web::block(move || password::hash_password(&plain, iterations))
        .await
        .map_err(|e| ApiError::internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
}

async fn verify_blocking(plain: String, stored: String) -> ApiResult<bool> {
    web::block(move || password::verify_password(&plain, &stored))
        .await
        .map_err(|e| ApiError::internal(format!("Verification task failed: {}", e)))?
        .map_err(|e| ApiError::internal(format!("Password verification error: {}", e)))
}

fn issue_pair(keys: &JwtKeys, user_id: i32) -> ApiResult<TokenPair> {
    let (access_token, refresh_token) = keys
        .generate_pair(user_id)
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))?;
    Ok(TokenPair { access_token, refresh_token })
}

impl AuthService {
    /// Crée le compte et connecte directement l'utilisateur.
    pub async fn register(
        db: &DatabaseConnection,
        keys: &JwtKeys,
        iterations: u32,
        request: RegisterRequest,
    ) -> ApiResult<AuthPayload> {
        request.validate()?;

        // 1. Refuser un username ou un email déjà pris
        let existing = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Email.eq(request.email.as_str()))
                    .add(users::Column::Username.eq(request.username.as_str())),
            )
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ApiError::Conflict(DUPLICATE_USER.to_string()));
        }

        // 2. Hash du mot de passe
        let password_hash = hash_blocking(request.password, iterations).await?;

        // 3. Création de l'utilisateur (l'index unique tranche en cas de course)
        let now = Utc::now();
        let created = users::ActiveModel {
            username: Set(request.username),
            email: Set(request.email),
            password_hash: Set(password_hash),
            first_name: Set(request.first_name),
            last_name: Set(request.last_name),
            role: Set("user".to_string()),
            refresh_token: Set(None),
            last_login: Set(None),
            preferred_currency: Set("usd".to_string()),
            theme: Set("light".to_string()),
            notifications_enabled: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await;

        let user = match created {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => {
                return Err(ApiError::Conflict(DUPLICATE_USER.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        // 4. Tokens + persistance du refresh token
        let tokens = issue_pair(keys, user.id)?;
        let mut active: users::ActiveModel = user.into();
        active.refresh_token = Set(Some(tokens.refresh_token.clone()));
        let user = active.update(db).await?;

        info!(user_id = user.id, "user registered");
        Ok(AuthPayload { user: PublicUser::from(user), tokens })
    }

    pub async fn login(
        db: &DatabaseConnection,
        keys: &JwtKeys,
        request: LoginRequest,
    ) -> ApiResult<AuthPayload> {
        request.validate()?;

        let user = users::Entity::find()
            .filter(users::Column::Email.eq(request.email.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

        if !verify_blocking(request.password, user.password_hash.clone()).await? {
            warn!(user_id = user.id, "login rejected: wrong password");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }

        let tokens = issue_pair(keys, user.id)?;
        let now = Utc::now();
        let mut active: users::ActiveModel = user.into();
        active.refresh_token = Set(Some(tokens.refresh_token.clone()));
        active.last_login = Set(Some(now));
        active.updated_at = Set(now);
        let user = active.update(db).await?;

        info!(user_id = user.id, "user logged in");
        Ok(AuthPayload { user: PublicUser::from(user), tokens })
    }

    /// Renouvelle la paire. Seul le dernier refresh token émis est accepté,
    /// un plus ancien échoue même si sa signature est valide.
    pub async fn refresh(
        db: &DatabaseConnection,
        keys: &JwtKeys,
        refresh_token: Option<String>,
    ) -> ApiResult<TokenPair> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::validation("Refresh token is required"))?;

        let claims = keys
            .verify_token(&token, TokenKind::Refresh)
            .map_err(|_| ApiError::unauthorized(INVALID_REFRESH_TOKEN))?;

        let user = users::Entity::find_by_id(claims.sub)
            .filter(users::Column::RefreshToken.eq(token.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| ApiError::unauthorized(INVALID_REFRESH_TOKEN))?;

        let tokens = issue_pair(keys, user.id)?;
        let rotated = users::Entity::update_many()
            .col_expr(
                users::Column::RefreshToken,
                Expr::value(tokens.refresh_token.clone()),
            )
            .filter(users::Column::Id.eq(user.id))
            .filter(users::Column::RefreshToken.eq(token.as_str()))
            .exec(db)
            .await?;

        // Un refresh concurrent a déjà consommé ce token
        if rotated.rows_affected == 0 {
            return Err(ApiError::unauthorized(INVALID_REFRESH_TOKEN));
        }

        Ok(tokens)
    }

    pub async fn logout(db: &DatabaseConnection, user_id: i32) -> ApiResult<()> {
        users::Entity::update_many()
            .col_expr(
                users::Column::RefreshToken,
                Expr::value(Option::<String>::None),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(db)
            .await?;

        info!(user_id, "user logged out");
        Ok(())
    }
}
