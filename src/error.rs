//! Erreurs communes à tous les handlers.
//!
//! Chaque variante correspond à un statut HTTP et est rendue dans
//! l'enveloppe standard `{ success: false, message }`.

use std::sync::OnceLock;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use sea_orm::DbErr;
use serde_json::{Value, json};
use thiserror::Error;

static EXPOSE_DETAILS: OnceLock<bool> = OnceLock::new();

/// Active le champ `detail` des réponses 500. Appelé une fois au
/// démarrage, hors production.
pub fn expose_internal_details(enabled: bool) {
    let _ = EXPOSE_DETAILS.set(enabled);
}

fn details_exposed() -> bool {
    EXPOSE_DETAILS.get().copied().unwrap_or(false)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Échec de l'API de marché. Le message peut être montré au client.
    #[error("{0}")]
    Upstream(String),

    /// Tout le reste. `detail` n'est jamais envoyé en production.
    #[error("Internal server error")]
    Internal { detail: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Internal { detail: detail.into() }
    }
}

impl From<DbErr> for ApiError {
    fn from(e: DbErr) -> Self {
        ApiError::internal(format!("Database error: {}", e))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal { detail } = self {
            tracing::error!(%detail, "request failed");
        }

        HttpResponse::build(self.status_code()).json(self.body(details_exposed()))
    }
}

impl ApiError {
    /// Corps JSON de la réponse. `detail` n'apparaît que si `expose_detail`.
    pub fn body(&self, expose_detail: bool) -> Value {
        match self {
            ApiError::TokenExpired => json!({
                "success": false,
                "message": self.to_string(),
                "expired": true,
            }),
            ApiError::Internal { detail } if expose_detail => {
                json!({ "success": false, "message": self.to_string(), "detail": detail })
            }
            _ => json!({ "success": false, "message": self.to_string() }),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_of(err: ApiError) -> serde_json::Value {
        let bytes = to_bytes(err.error_response().into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Upstream("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::internal("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_expired_token_body_flags_refresh() {
        let body = body_of(ApiError::TokenExpired).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["expired"], true);
    }

    #[actix_web::test]
    async fn test_internal_error_hides_detail_by_default() {
        let body = body_of(ApiError::internal("connection refused on 10.0.0.3")).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("detail").is_none());
    }

    #[test]
    fn test_internal_error_exposes_detail_outside_production() {
        let err = ApiError::internal("connection refused on 10.0.0.3");

        let body = err.body(true);
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["detail"], "connection refused on 10.0.0.3");

        assert!(err.body(false).get("detail").is_none());
    }

    #[test]
    fn test_detail_only_applies_to_internal_errors() {
        let body = ApiError::not_found("Portfolio not found").body(true);
        assert_eq!(body["message"], "Portfolio not found");
        assert!(body.get("detail").is_none());
    }

    #[test]
    fn test_db_error_becomes_internal() {
        let err: ApiError = DbErr::Custom("boom".into()).into();
        assert!(matches!(err, ApiError::Internal { .. }));
    }
}
