//! JWT authentication.
//!
//! Tokens are opaque capability checks for the rest of the service: handlers
//! receive an [`AuthIdentity`] extracted once per request and never touch the
//! token internals. A missing token is 401, an invalid one 403, matching the
//! boundary the checkout pipeline relies on.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "cliente")]
    Customer,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    /// Display name, used as the payer name at checkout.
    pub name: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Identity resolved from the bearer token; read-only input to order assembly.
#[derive(Clone, Debug)]
pub struct AuthIdentity {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

impl AuthIdentity {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Acesso restrito a administradores.".into()))
        }
    }
}

pub fn issue_token(
    secret: &str,
    id: i64,
    name: &str,
    role: Role,
    ttl_hours: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: id.to_string(),
        name: name.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::Internal(format!("Falha ao gerar token: {e}")))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Forbidden("Token inválido ou expirado.".into()))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::Internal("Falha ao processar a senha.".into()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Token de acesso ausente.".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Token de acesso ausente.".into()))?;

        let claims = verify_token(&state.config.jwt_secret, token)?;
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Forbidden("Token inválido ou expirado.".into()))?;
        Ok(Self { id, name: claims.name, role: claims.role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_keeps_identity_fields() {
        let token = issue_token("segredo", 7, "Maria", Role::Customer, 1).unwrap();
        let claims = verify_token("segredo", &token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.name, "Maria");
        assert_eq!(claims.role, Role::Customer);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("segredo", 7, "Maria", Role::Admin, 1).unwrap();
        assert!(verify_token("outro", &token).is_err());
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("confeiteira123").unwrap();
        assert!(verify_password("confeiteira123", &hash));
        assert!(!verify_password("outra-senha", &hash));
    }
}
