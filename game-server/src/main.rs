use std::sync::Arc;

use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use tokio::signal;
use tracing::{error, info, warn};

use game_persistence::{DbRoomStore, RoomStore, connect_to_database};
use game_server::{config::Config, create_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting imposter party room server...");

    let config = Config::from_env().context("invalid server configuration")?;
    let addr = config.socket_addr()?;

    let db = connect_to_database(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to {}", config.database_url))?;
    Migrator::up(&db, None)
        .await
        .context("failed to run migrations")?;
    let store: Arc<dyn RoomStore> = Arc::new(DbRoomStore::new(db));

    // Stale room cleanup
    let cleanup_store = store.clone();
    let room_ttl = config.room_ttl();
    let mut interval = tokio::time::interval(config.cleanup_interval());
    tokio::spawn(async move {
        loop {
            interval.tick().await;
            match cleanup_store.delete_stale_rooms(room_ttl).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Deleted stale rooms"),
                Err(e) => warn!("Stale room cleanup failed: {}", e),
            }
        }
    });

    let routes = create_routes(store);
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, shutdown_signal())
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server started on {}. Press Ctrl+C to stop.", addr);
    server.await;
    info!("Server shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let (Ok(mut sigint), Ok(mut sigterm)) = (
            signal::unix::signal(signal::unix::SignalKind::interrupt()),
            signal::unix::signal(signal::unix::SignalKind::terminate()),
        ) else {
            error!("Failed to install signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            return std::future::pending().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
