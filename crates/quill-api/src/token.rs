//! Stateless session tokens: HS256 JWTs carrying the user id and a fixed
//! one-hour expiry. There is no revocation; a token is good until `exp`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use quill_types::api::Claims;

/// Token lifetime in seconds.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

fn ttl() -> Duration {
    Duration::seconds(TOKEN_TTL_SECS)
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("token expired")]
    Expired,
}

/// Signing and verification keys, built once from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + ttl()).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Expiry is checked here against `now` with no leeway, so the token is
    /// valid on `[iat, iat + 1h)`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips_user_id() {
        let keys = TokenKeys::new("test-secret");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    }

    #[test]
    fn accepted_until_one_hour_after_issue() {
        let keys = TokenKeys::new("test-secret");
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = keys.issue_at(Uuid::new_v4(), issued).unwrap();

        assert!(keys.verify_at(&token, issued).is_ok());
        assert!(keys.verify_at(&token, issued + Duration::minutes(30)).is_ok());
        assert!(keys.verify_at(&token, issued + ttl() - Duration::seconds(1)).is_ok());

        assert!(matches!(
            keys.verify_at(&token, issued + ttl()),
            Err(TokenError::Expired)
        ));
        assert!(matches!(
            keys.verify_at(&token, issued + Duration::days(1)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenKeys::new("secret-a").issue(Uuid::new_v4()).unwrap();
        let err = TokenKeys::new("secret-b").verify(&token).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = TokenKeys::new("test-secret");
        assert!(keys.verify("not.a.jwt").is_err());
        assert!(keys.verify("").is_err());
    }
}
