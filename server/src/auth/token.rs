use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;
use crate::utils::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| AppError::AuthError(format!("Invalid token: {}", e)))
    }
}

pub fn issue_token(
    keys: &JwtKeys,
    user_id: Uuid,
    role: Role,
    ttl: Duration,
) -> Result<String, AppError> {
    let expires_at = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::ValidationError("Token lifetime is out of range".to_string()))?;

    let claims = Claims {
        sub: user_id,
        role,
        exp: expires_at.timestamp().max(0) as usize,
    };

    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .map_err(|e| AppError::InternalServerError(format!("Failed to encode token: {}", e)))
}

/// The authenticated user behind a request.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    Arc<JwtKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::AuthError("Missing authorization header".to_string()))?
            .to_str()
            .map_err(|_| AppError::AuthError("Malformed authorization header".to_string()))?;

        let token = header
            .strip_prefix(BEARER_PREFIX)
            .ok_or_else(|| AppError::AuthError("Expected a bearer token".to_string()))?;

        let keys = Arc::<JwtKeys>::from_ref(state);
        let claims = keys.verify(token.trim())?;

        Ok(Caller {
            id: claims.sub,
            role: claims.role,
        })
    }
}
