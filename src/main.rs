use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sessiond::config::Config;
use sessiond::routes;
use sessiond::services::reaper::IdleReaper;
use sessiond::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    // Refuses to start without valid key material - every
    // encryption-dependent operation needs the keypair.
    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = Arc::new(IdleReaper::new(
        state.store.clone(),
        config.idle_threshold_secs,
        Duration::from_secs(config.reaper_interval_secs),
    ));
    let reaper_handle = reaper.spawn(shutdown_rx);
    tracing::info!(
        "✅ Idle reaper started (every {}s, {}s threshold)",
        config.reaper_interval_secs,
        config.idle_threshold_secs
    );

    let app = routes::router(state);

    tracing::info!("🚀 Server listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    let _ = reaper_handle.await;

    Ok(())
}
