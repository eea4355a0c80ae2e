use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sea_orm::EntityTrait;

use crate::error::ApiError;
use crate::models::users;
use crate::state::AppState;
use crate::utils::jwt::{TokenError, TokenKind};

/// Utilisateur authentifié, chargé depuis la base à chaque requête.
/// À mettre en paramètre d'un handler pour rendre la route protégée.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: users::Model,
}

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }
}

/// Extrait le token du header `Authorization: Bearer <token>`
fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| ApiError::internal("AppState is not registered"))?;

            // 1. Header présent et au bon format
            let token = token.ok_or_else(|| ApiError::unauthorized("No token provided"))?;

            // 2. Signature + expiration : "expiré" et "invalide" sont distingués
            //    pour que le client sache s'il peut rafraîchir
            let claims = state
                .jwt
                .verify_token(&token, TokenKind::Access)
                .map_err(|e| match e {
                    TokenError::Expired => ApiError::TokenExpired,
                    TokenError::Invalid(_) => ApiError::unauthorized("Invalid token"),
                })?;

            // 3. L'utilisateur doit toujours exister
            let user = users::Entity::find_by_id(claims.sub)
                .one(&state.db)
                .await?
                .ok_or_else(|| ApiError::unauthorized("User not found"))?;

            Ok(AuthUser { user })
        })
    }
}
