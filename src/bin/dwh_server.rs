use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use dwh_agent::api::{create_dwh_agent_router, AppState};
use dwh_agent::database::DatabaseManager;
use dwh_agent::AgentToolkit;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("dwh_agent=info,tower_http=debug")
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Database connection
    let manager = DatabaseManager::connect_from_env()
        .await
        .context("Failed to connect to the warehouse")?;
    manager
        .test_connection()
        .await
        .context("Warehouse connectivity check failed")?;
    manager
        .verify_config_schema()
        .await
        .context("Configuration schema check failed")?;

    // Build toolkit and application state
    let store = Arc::new(manager.warehouse_store());
    let toolkit = Arc::new(AgentToolkit::new(store));
    let app_state = AppState { toolkit };

    let app = create_dwh_agent_router(app_state);

    // Determine port
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let addr = format!("0.0.0.0:{}", port);
    info!("Starting server on {}", addr);

    // Serve until interrupted, then tear the pool down
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        info!("Shutdown signal listener failed: {}", err);
    }
}
