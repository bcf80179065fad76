pub mod api;
pub mod checkout;
pub mod config;
pub mod entities;
pub mod ledger;
pub mod middleware;
pub mod payment;

use axum::{middleware::from_fn, Router};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::{sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::config::Config;
use crate::middleware::logging::logging_middleware;
use crate::payment::{GatewayError, MockGateway, PaymentGateway, StripeGateway};

/// Everything a handler may need, shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub config: Arc<Config>,
}

pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options.sqlx_logging(false);

    // Every pooled connection to `:memory:` would be its own empty database.
    if database_url.contains(":memory:") {
        let forever = Duration::from_secs(60 * 60 * 24 * 365);
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(forever)
            .max_lifetime(forever);
    }

    Database::connect(options).await
}

pub fn gateway_from_config(config: &Config) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
    match config.stripe_secret_key.as_deref() {
        Some(key) => Ok(Arc::new(StripeGateway::new(&config.stripe_api_base, key)?)),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, using the in-process mock payment gateway");
            Ok(Arc::new(MockGateway::new()))
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    create_api_router(state)
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}
