use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_scoreapp_api::config::Config;
use rust_scoreapp_api::handlers::AppState;
use rust_scoreapp_api::routes::build_rate_limited_router;
use rust_scoreapp_api::store::{JsonFilePersistence, LeadStore};

/// Main entry point for the application.
///
/// Initializes logging, loads configuration and the persisted leads, then serves the
/// webhook and dashboard API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_scoreapp_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Load persisted leads (missing or unreadable file starts an empty store)
    let persistence = Arc::new(JsonFilePersistence::new(config.data_file.clone()));
    let store = LeadStore::open(persistence);

    let port = config.port;
    let app_state = Arc::new(AppState::new(store, config));
    let app = build_rate_limited_router(app_state)?;

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("ScoreApp webhook server listening on {}", addr);
    tracing::info!("Webhook URL: POST /webhook/scoreapp[/:scorecardId]");
    tracing::info!("Stats URL:   GET  /api/stats");
    tracing::info!("Leads URL:   GET  /api/leads");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
