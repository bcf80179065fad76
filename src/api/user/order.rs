use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::checkout::{create_order, CheckoutLine, NewOrder};
use crate::ledger::list_orders;
use crate::middleware::{
    auth::Claims,
    logging::{to_response, ApiError},
};
use crate::AppState;

pub fn order_router(state: &AppState) -> Router {
    Router::new()
        .route("/orders", get(get_orders).post(place_order))
        .layer(Extension(state.db.clone()))
}

async fn get_orders(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    let orders = list_orders(&db, Some(claims.user_id)).await?;

    Ok(to_response(
        (StatusCode::OK, Json(json!({ "orders": orders }))),
        Ok(()),
    ))
}

async fn place_order(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Json(mut payload): Json<CreateOrderPayload>,
) -> Result<Response, ApiError> {
    if payload.idempotency_key.is_none() {
        payload.idempotency_key = headers
            .get("Idempotency-Key")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
    }
    payload.validate()?;

    if payload.cart_items.is_empty() {
        return Err(ApiError::Validation("Cart is empty".to_owned()));
    }
    let total_amount = payload
        .total_amount
        .ok_or_else(|| ApiError::Validation("totalAmount is required".to_owned()))?;

    let lines = payload
        .cart_items
        .into_iter()
        .map(CartLinePayload::into_line)
        .collect::<Result<Vec<_>, _>>()?;

    let placed = create_order(
        &db,
        NewOrder {
            user_id: claims.user_id,
            lines,
            total_amount,
            idempotency_key: payload.idempotency_key,
        },
    )
    .await?;

    let status = if placed.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok(to_response(
        (
            status,
            Json(json!({
                "success": true,
                "orderId": placed.order_id,
                "replayed": placed.replayed
            })),
        ),
        Ok(()),
    ))
}

static IDEMPOTENCY_KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{8,64}$").unwrap());

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateOrderPayload {
    #[serde(default)]
    cart_items: Vec<CartLinePayload>,
    total_amount: Option<Decimal>,
    #[validate(regex(path = *IDEMPOTENCY_KEY_REGEX, message = "Idempotency key must be 8-64 letters, digits, '-' or '_'"))]
    idempotency_key: Option<String>,
}

/// One cart row as the client saw it. The price may come flat or inside the
/// embedded product, the way `GET /api/cart` returns it.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CartLinePayload {
    #[serde(alias = "product_id")]
    product_id: Uuid,
    quantity: i32,
    price: Option<Decimal>,
    product: Option<ProductSnapshot>,
}

#[derive(Deserialize, Debug)]
struct ProductSnapshot {
    price: Decimal,
}

impl CartLinePayload {
    fn into_line(self) -> Result<CheckoutLine, ApiError> {
        let price = self
            .price
            .or(self.product.map(|product| product.price))
            .ok_or_else(|| {
                ApiError::Validation(format!("Missing price for product {}", self.product_id))
            })?;

        Ok(CheckoutLine {
            product_id: self.product_id,
            quantity: self.quantity,
            price,
        })
    }
}
