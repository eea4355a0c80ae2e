use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,        // user_id
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,        // expiration timestamp
    pub jti: String,     // rend chaque token unique, même émis dans la même seconde
}

/// Pourquoi un token a été refusé : expiré (le client peut rafraîchir)
/// ou invalide (le client doit se reconnecter).
#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid(String),
}

/// Clés et durées de vie des tokens, construites depuis la config
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            &settings.jwt_secret,
            Duration::minutes(settings.access_token_ttl_minutes),
            Duration::days(settings.refresh_token_ttl_days),
        )
    }

    /// Génère une paire (access, refresh) pour un utilisateur
    pub fn generate_pair(&self, user_id: i32) -> Result<(String, String), String> {
        let access = self.generate_token(user_id, TokenKind::Access)?;
        let refresh = self.generate_token(user_id, TokenKind::Refresh)?;
        Ok((access, refresh))
    }

    pub fn generate_token(&self, user_id: i32, kind: TokenKind) -> Result<String, String> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(ttl)
            .ok_or("Failed to calculate expiration")?
            .timestamp();

        let claims = Claims {
            sub: user_id,
            kind,
            iat: now.timestamp(),
            exp: expiration,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| format!("Failed to generate token: {}", e))
    }

    /// Vérifie la signature, l'expiration et le type du token
    pub fn verify_token(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        if claims.kind != expected {
            return Err(TokenError::Invalid("Wrong token type".to_string()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret", Duration::hours(1), Duration::days(7))
    }

    #[test]
    fn test_generate_and_verify_token() {
        let keys = keys();
        let (access, refresh) = keys.generate_pair(123).unwrap();

        let claims = keys.verify_token(&access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, 123);
        assert_eq!(claims.kind, TokenKind::Access);

        let claims = keys.verify_token(&refresh, TokenKind::Refresh).unwrap();
        assert_eq!(claims.sub, 123);
        assert!(claims.exp > Utc::now().timestamp() + 6 * 24 * 3600);
    }

    #[test]
    fn test_invalid_token() {
        let result = keys().verify_token("invalid.token.here", TokenKind::Access);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_expired_token() {
        let keys = JwtKeys::new("test-secret", Duration::seconds(-30), Duration::days(7));
        let token = keys.generate_token(1, TokenKind::Access).unwrap();

        assert_eq!(keys.verify_token(&token, TokenKind::Access).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let keys = keys();
        let (access, refresh) = keys.generate_pair(7).unwrap();

        assert!(keys.verify_token(&refresh, TokenKind::Access).is_err());
        assert!(keys.verify_token(&access, TokenKind::Refresh).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = keys().generate_token(1, TokenKind::Access).unwrap();
        let other = JwtKeys::new("other-secret", Duration::hours(1), Duration::days(7));
        assert!(matches!(
            other.verify_token(&token, TokenKind::Access),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_tokens_are_unique() {
        let keys = keys();
        let a = keys.generate_token(1, TokenKind::Refresh).unwrap();
        let b = keys.generate_token(1, TokenKind::Refresh).unwrap();
        assert_ne!(a, b);
    }
}
