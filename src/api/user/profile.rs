use axum::{extract::Extension, http::StatusCode, response::Response, routing::get, Json, Router};
use serde_json::json;

use crate::middleware::{auth::Claims, logging::to_response};

pub fn profile_router() -> Router {
    Router::new().route("/me", get(get_profile))
}

// The middleware already re-read the account, so the claims are current.
async fn get_profile(Extension(claims): Extension<Claims>) -> Response {
    to_response(
        (
            StatusCode::OK,
            Json(json!({
                "id": claims.user_id,
                "email": claims.email,
                "role": claims.role
            })),
        ),
        Ok(()),
    )
}
