//! RoomMate - home controller API server

use automation_engine::{AutomationConfig, AutomationEngine, Reconciler};
use device_link::HttpDeviceClient;
use home_core::{Home, HomeConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod alerts;
mod api;

use api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "roommate_api=debug,automation_engine=debug,home_core=debug,info".into()
            }),
        )
        .init();

    tracing::info!("Starting RoomMate controller");

    let home_config = HomeConfig::from_env();
    let automation_config = AutomationConfig::from_env();
    let listen_addr =
        std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

    tracing::info!(
        "Polling board at {} every {:?}",
        home_config.device_url,
        automation_config.poll_interval
    );
    let client = Arc::new(HttpDeviceClient::new(
        home_config.device_url.clone(),
        home_config.request_timeout,
    )?);

    let home = Home::open(&home_config, client).await;
    home.log.add("Controller started").await;

    let engine = Arc::new(AutomationEngine::new(home.clone(), automation_config));
    alerts::start_alert_listener(&engine);
    let reconciler = Reconciler::new(home.clone(), engine.clone()).spawn();

    let app = api::router(AppState { home });

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!("Listening on http://{}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reconciler.shutdown().await;
    tracing::info!("RoomMate controller stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
