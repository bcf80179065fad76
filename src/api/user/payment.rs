use axum::{
    extract::Extension, http::StatusCode, response::Response, routing::post, Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::checkout::issue_payment_intent;
use crate::config::Config;
use crate::middleware::{
    auth::Claims,
    logging::{to_response, ApiError},
};
use crate::payment::PaymentGateway;
use crate::AppState;

pub fn payment_router(state: &AppState) -> Router {
    Router::new()
        .route("/create-order", post(create_payment_intent))
        .layer(Extension(state.db.clone()))
        .layer(Extension(state.gateway.clone()))
        .layer(Extension(state.config.clone()))
}

async fn create_payment_intent(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(gateway): Extension<Arc<dyn PaymentGateway>>,
    Extension(config): Extension<Arc<Config>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateIntentPayload>,
) -> Result<Response, ApiError> {
    let amount = payload
        .amount
        .ok_or_else(|| ApiError::Validation("amount is required".to_owned()))?;
    let order_id = payload
        .order_id
        .ok_or_else(|| ApiError::Validation("orderId is required".to_owned()))?;

    let client_secret = issue_payment_intent(
        &db,
        gateway.as_ref(),
        &config.currency,
        claims.user_id,
        order_id,
        amount,
    )
    .await?;

    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({ "clientSecret": client_secret })),
        ),
        Ok(()),
    ))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateIntentPayload {
    amount: Option<Decimal>,
    order_id: Option<Uuid>,
}
