use std::{process::ExitCode, sync::Arc};
use tracing_subscriber::EnvFilter;

use cake_shop::config::Config;
use cake_shop::entities::{seed_admin, setup_schema};
use cake_shop::{connect, create_app, gateway_from_config, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let db = connect(&config.database_url).await?;
    setup_schema(&db).await?;
    if let Some(admin) = &config.admin {
        seed_admin(&db, admin).await?;
    }

    let state = AppState {
        db: Arc::new(db),
        gateway: gateway_from_config(&config)?,
        config: Arc::new(config),
    };
    let bind_addr = state.config.bind_addr;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(address = %bind_addr, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}
