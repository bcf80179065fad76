pub mod auth;
pub mod product;
pub mod verify;

use axum::Router;

use crate::AppState;
use auth::auth_router;
use product::product_router;
use verify::verify_router;

pub fn public_api_router(state: &AppState) -> Router {
    Router::new()
        .merge(auth_router(state))
        .merge(product_router(state))
        .merge(verify_router(state))
}
