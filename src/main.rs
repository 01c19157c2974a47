use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shipping_windows_api::{build_router, config::Config, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let store = db::create_store(&config)?;
    info!("Document store ready ({})", store.backend());

    match &config.cors_origin {
        Some(origin) => info!("CORS preflight enabled for {}", origin),
        None => info!("CORS_ORIGIN is empty, cross-origin requests are not handled"),
    }

    let state = AppState {
        store,
        config: config.clone(),
    };

    let app = build_router(state)?;

    let addr = format!("{}:{}", config.host, config.port);
    info!("Shipping windows API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
