pub mod admin;
pub mod public;
pub mod user;

use axum::Router;

use crate::AppState;
use public::public_api_router;
use user::user_api_router;
use admin::admin_api_router;

pub fn create_api_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(public_api_router(&state))
        .merge(user_api_router(&state))
        .nest("/admin", admin_api_router(&state));

    Router::new().nest("/api", api)
}
