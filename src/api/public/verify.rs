use axum::{
    extract::Extension, http::StatusCode, response::Response, routing::post, Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::checkout::confirm_payment;
use crate::middleware::logging::{to_response, ApiError};
use crate::payment::{is_intent_id, PaymentGateway};
use crate::AppState;

/// No bearer token required: the gateway's own record is the proof of payment.
pub fn verify_router(state: &AppState) -> Router {
    Router::new()
        .route("/verify", post(verify_payment))
        .layer(Extension(state.db.clone()))
        .layer(Extension(state.gateway.clone()))
}

async fn verify_payment(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(gateway): Extension<Arc<dyn PaymentGateway>>,
    Json(payload): Json<VerifyPayment>,
) -> Result<Response, ApiError> {
    let payment_intent_id = payload.payment_intent_id.trim();
    if payment_intent_id.is_empty() {
        return Err(ApiError::Validation("paymentIntentId is required".to_owned()));
    }
    if !is_intent_id(payment_intent_id) {
        return Err(ApiError::Validation(
            "paymentIntentId is not a valid payment intent id".to_owned(),
        ));
    }
    let order_id = Uuid::parse_str(payload.order_id.trim())
        .map_err(|_| ApiError::Validation("orderId is not a valid id".to_owned()))?;

    confirm_payment(&db, gateway.as_ref(), payment_intent_id, order_id).await?;

    Ok(to_response(
        (StatusCode::OK, Json(json!({ "success": true }))),
        Ok(()),
    ))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VerifyPayment {
    payment_intent_id: String,
    order_id: String,
}
