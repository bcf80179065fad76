use crate::entities::user::{Entity as UserEntity, Role};
use crate::middleware::logging::ApiError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|header| header.strip_prefix("Bearer ")) {
        Some(token) if !token.is_empty() => token,
        _ => return Err(ApiError::Unauthorized),
    };

    let claims = match validate_token(&state.db, &state.secret, token, state.role).await {
        Ok(claims) => claims,
        Err(AuthMiddlewareError::InsufficientRole) => {
            tracing::debug!(required = %state.role, "Authenticated caller lacks role");
            return Err(ApiError::Forbidden);
        }
        Err(AuthMiddlewareError::InternalServerError(detail)) => {
            return Err(ApiError::upstream("Internal server error", detail));
        }
        Err(err) => {
            tracing::debug!(error = %err, "Rejected bearer token");
            return Err(ApiError::Unauthorized);
        }
    };

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

#[derive(Clone, Debug)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub secret: Arc<str>,
    pub role: Role,
}

pub fn generate_token(
    user_id: Uuid,
    email: &str,
    role: Role,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, AuthMiddlewareError> {
    let exp = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or(AuthMiddlewareError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims {
        user_id,
        email: email.to_owned(),
        role,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthMiddlewareError::GenerationFail)
}

/// Decodes the token and re-reads the account, so a deleted user or a demoted
/// admin loses access before the token expires.
pub async fn validate_token(
    db: &DatabaseConnection,
    secret: &str,
    token: &str,
    req_role: Role,
) -> Result<Claims, AuthMiddlewareError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AuthMiddlewareError::ValidationFail)?;

    let mut claims = token_data.claims;

    let user = UserEntity::find_by_id(claims.user_id)
        .one(db)
        .await
        .map_err(|err| AuthMiddlewareError::InternalServerError(err.to_string()))?
        .ok_or(AuthMiddlewareError::InvalidUser)?;

    if !user.role.permits(req_role) {
        return Err(AuthMiddlewareError::InsufficientRole);
    }

    claims.role = user.role;
    claims.email = user.email;
    Ok(claims)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(password_hash)
}

#[derive(Error, Debug)]
pub enum AuthMiddlewareError {
    #[error("Unknown user")]
    InvalidUser,
    #[error("Role does not permit this route")]
    InsufficientRole,
    #[error("Failed to validate token")]
    ValidationFail,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_claims() {
        let id = Uuid::new_v4();
        let token = generate_token(id, "a@b.test", Role::User, "secret", 1).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims.user_id, id);
        assert_eq!(data.claims.role, Role::User);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token(Uuid::new_v4(), "a@b.test", Role::Admin, "one", 1).unwrap();
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"two"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }

    #[test]
    fn hashed_password_is_salted() {
        let first = hash_password("Secret15").unwrap();
        let second = hash_password("Secret15").unwrap();
        assert_ne!(first, second);
    }
}
