use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::checkout::update_order_status;
use crate::entities::order::Status;
use crate::ledger::list_orders;
use crate::middleware::logging::{to_response, ApiError};
use crate::AppState;

pub fn admin_order_router(state: &AppState) -> Router {
    Router::new()
        .route("/order", get(get_all_orders))
        .route("/order/:id", patch(patch_order_status))
        .layer(Extension(state.db.clone()))
}

async fn get_all_orders(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let orders = list_orders(&db, None).await?;

    Ok(to_response(
        (StatusCode::OK, Json(json!({ "orders": orders }))),
        Ok(()),
    ))
}

async fn patch_order_status(
    Path(id): Path<Uuid>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchOrderStatus>,
) -> Result<Response, ApiError> {
    let order = update_order_status(&db, id, payload.status).await?;

    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Order status updated",
                "order": order
            })),
        ),
        Ok(()),
    ))
}

#[derive(Deserialize, Debug)]
struct PatchOrderStatus {
    status: Status,
}
