//! Extract and verify the Bearer JWT on gated routes.
//!
//! Token issuance belongs to whatever identity service shares the signing
//! secret; this backend only consults the verify result. `sign` exists for
//! operators and tests minting tokens against the same secret.

use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// HS256 key pair derived from the shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Principal identity (e.g. user id or email).
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn sign(
    keys: &JwtKeys,
    subject: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: subject.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
}

pub fn verify(keys: &JwtKeys, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &keys.decoding, &Validation::new(Algorithm::HS256))
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("invalid token: {}", e)))
}

/// Verified principal for a gated route. Extraction failure yields 401
/// before the handler body runs.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("expected a Bearer token".into()))?;
        let claims = verify(&state.jwt, token.trim())?;
        Ok(AuthenticatedUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_roundtrips_subject() {
        let keys = JwtKeys::from_secret("test-secret");
        let token = sign(&keys, "ada@example.com", Duration::minutes(10)).unwrap();
        let claims = verify(&keys, &token).unwrap();
        assert_eq!(claims.sub, "ada@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = JwtKeys::from_secret("test-secret");
        // Past the default validation leeway.
        let token = sign(&keys, "ada@example.com", Duration::minutes(-5)).unwrap();
        assert!(matches!(
            verify(&keys, &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn wrong_secret_and_garbage_are_rejected() {
        let keys = JwtKeys::from_secret("test-secret");
        let other = JwtKeys::from_secret("other-secret");
        let token = sign(&other, "ada@example.com", Duration::minutes(10)).unwrap();
        assert!(verify(&keys, &token).is_err());
        assert!(verify(&keys, "not-a-token").is_err());
    }
}
