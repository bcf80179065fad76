pub mod dashboard;
pub mod order;
pub mod product;

use axum::{middleware::from_fn_with_state, Router};

use crate::entities::user::Role;
use crate::middleware::auth::{auth_middleware, AuthState};
use crate::AppState;
use dashboard::dashboard_router;
use order::admin_order_router;
use product::admin_product_router;

pub fn admin_api_router(state: &AppState) -> Router {
    Router::new()
        .merge(admin_product_router(state))
        .merge(admin_order_router(state))
        .merge(dashboard_router(state))
        .layer(from_fn_with_state(
            AuthState {
                db: state.db.clone(),
                secret: state.config.secret.as_str().into(),
                role: Role::Admin,
            },
            auth_middleware,
        ))
}
