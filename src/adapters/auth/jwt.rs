//! JWT session validator.
//!
//! Validates HS256 tokens issued by the platform's auth service against the
//! shared secret from configuration. Expected claims: `sub` (user id),
//! `role`, `exp`; `iss`/`aud` are checked only when configured.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId, UserRole};
use crate::ports::SessionValidator;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    role: Option<UserRole>,
    #[allow(dead_code)]
    exp: usize,
}

pub struct JwtSessionValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(auth: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(auth.jwt_secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &auth.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &auth.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        Self { key, validation }
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data =
            decode::<Claims>(token, &self.key, &self.validation).map_err(|err| {
                match err.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                }
            })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::IncompleteClaims);
        }
        let role = data.claims.role.ok_or(AuthError::IncompleteClaims)?;

        Ok(AuthenticatedUser::new(UserId::new(data.claims.sub), role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use secrecy::SecretString;
    use serde_json::json;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: SecretString::new(SECRET.to_string()),
            ..Default::default()
        }
    }

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> i64 {
        chrono::Utc::now().timestamp() + 600
    }

    #[tokio::test]
    async fn valid_token_yields_user_and_role() {
        let validator = JwtSessionValidator::new(&config());
        let token = sign(
            &json!({ "sub": "doctor-1", "role": "doctor", "exp": future_exp() }),
            SECRET,
        );

        let user = validator.validate(&token).await.unwrap();
        assert_eq!(user.id, UserId::new("doctor-1"));
        assert_eq!(user.role, UserRole::Doctor);
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let validator = JwtSessionValidator::new(&config());
        let token = sign(
            &json!({ "sub": "doctor-1", "role": "doctor", "exp": chrono::Utc::now().timestamp() - 3600 }),
            SECRET,
        );

        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let validator = JwtSessionValidator::new(&config());
        let token = sign(
            &json!({ "sub": "doctor-1", "role": "doctor", "exp": future_exp() }),
            "another-secret-another-secret-xx",
        );

        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn missing_role_claim_is_incomplete() {
        let validator = JwtSessionValidator::new(&config());
        let token = sign(&json!({ "sub": "doctor-1", "exp": future_exp() }), SECRET);

        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::IncompleteClaims)
        ));
    }

    #[tokio::test]
    async fn empty_subject_is_incomplete() {
        let validator = JwtSessionValidator::new(&config());
        let token = sign(
            &json!({ "sub": "", "role": "patient", "exp": future_exp() }),
            SECRET,
        );

        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::IncompleteClaims)
        ));
    }

    #[tokio::test]
    async fn issuer_is_enforced_when_configured() {
        let auth = AuthConfig {
            issuer: Some("carelink".to_string()),
            ..config()
        };
        let validator = JwtSessionValidator::new(&auth);

        let good = sign(
            &json!({ "sub": "u", "role": "patient", "exp": future_exp(), "iss": "carelink" }),
            SECRET,
        );
        assert!(validator.validate(&good).await.is_ok());

        let bad = sign(
            &json!({ "sub": "u", "role": "patient", "exp": future_exp(), "iss": "intruder" }),
            SECRET,
        );
        assert!(matches!(
            validator.validate(&bad).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let validator = JwtSessionValidator::new(&config());
        assert!(matches!(
            validator.validate("not-a-jwt").await,
            Err(AuthError::InvalidToken)
        ));
    }
}
