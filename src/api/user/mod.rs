pub mod cart;
pub mod order;
pub mod payment;
pub mod profile;

use axum::{middleware::from_fn_with_state, Router};

use crate::entities::user::Role;
use crate::middleware::auth::{auth_middleware, AuthState};
use crate::AppState;
use cart::cart_router;
use order::order_router;
use payment::payment_router;
use profile::profile_router;

pub fn user_api_router(state: &AppState) -> Router {
    Router::new()
        .merge(cart_router(state))
        .merge(order_router(state))
        .merge(payment_router(state))
        .merge(profile_router())
        .layer(from_fn_with_state(
            AuthState {
                db: state.db.clone(),
                secret: state.config.secret.as_str().into(),
                role: Role::User,
            },
            auth_middleware,
        ))
}
