use axum::{extract::Extension, http::StatusCode, response::Response, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::ledger::stats;
use crate::middleware::logging::{to_response, ApiError};
use crate::AppState;

pub fn dashboard_router(state: &AppState) -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .layer(Extension(state.db.clone()))
}

/// Catalog size, order counts and revenue from paid orders.
async fn get_stats(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let stats = stats(&db).await?;

    Ok(to_response((StatusCode::OK, Json(stats)), Ok(())))
}
