use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::entities::user::{self, normalize_email, Entity as UserEntity, Role};
use crate::middleware::{
    auth::{generate_token, hash_password},
    logging::{to_response, ApiError},
};
use crate::AppState;

pub fn auth_router(state: &AppState) -> Router {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login))
        .layer(Extension(state.db.clone()))
        .layer(Extension(state.config.clone()))
}

async fn register_user(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateUser>,
) -> Result<Response, ApiError> {
    payload.validate()?;

    let password = hash_password(&payload.password)
        .map_err(|err| ApiError::upstream("An internal server error occured", err))?;

    let id = Uuid::new_v4();
    let new_user = user::ActiveModel {
        id: Set(id),
        email: Set(normalize_email(&payload.email)),
        password: Set(password),
        role: Set(Role::User),
        created_at: Set(Utc::now()),
    };

    match UserEntity::insert(new_user).exec(&*db).await {
        Ok(_) => Ok(to_response(
            (
                StatusCode::CREATED,
                Json(json!({
                    "message": "User registered successfully",
                    "id": id
                })),
            ),
            Ok(()),
        )),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(ApiError::Conflict("Email already registered".to_owned()))
        }
        Err(err) => Err(err.into()),
    }
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Json(payload): Json<UserLogin>,
) -> Result<Response, ApiError> {
    let model = UserEntity::find()
        .filter(user::Column::Email.eq(normalize_email(&payload.email)))
        .one(&*db)
        .await?;

    // Same answer for unknown email and wrong password.
    let model = match model {
        Some(model) if model.check_hash(&payload.password).is_ok() => model,
        _ => return Err(ApiError::Unauthorized),
    };

    let token = generate_token(
        model.id,
        &model.email,
        model.role,
        &config.secret,
        config.token_ttl_hours,
    )
    .map_err(|err| ApiError::upstream("Internal server error", err))?;

    Ok(to_response(
        (StatusCode::OK, Json(json!({ "token": token }))),
        Ok(()),
    ))
}

#[derive(Deserialize, Validate, Debug)]
struct CreateUser {
    #[validate(email(message = "Email address is not valid"))]
    email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    password: String,
}

#[derive(Deserialize, Debug)]
struct UserLogin {
    email: String,
    password: String,
}
