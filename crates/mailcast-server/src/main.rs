//! Mailcast - HTTP server entry point

use anyhow::Result;
use mailcast_api::{create_router, AppState};
use mailcast_common::config::{Config, LoggingConfig};
use mailcast_core::{LettreTransport, Repositories, Services};
use mailcast_storage::{DatabasePool, MemoryStore};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config.logging);

    info!("Starting Mailcast server...");

    // Storage: PostgreSQL when a URL is configured, otherwise process memory
    let (repos, db_pool) = match config.database.url {
        Some(_) => {
            let db_pool = DatabasePool::new(&config.database).await?;
            db_pool.migrate().await?;
            (Repositories::postgres(db_pool.clone()), Some(db_pool))
        }
        None => {
            warn!("No database URL configured, data is kept in memory only");
            (Repositories::in_memory(MemoryStore::new()), None)
        }
    };

    let transport = Arc::new(LettreTransport::new(&config.mail)?);

    let services = Services::new(repos, transport, &config);
    if let (Some(email), Some(password)) = (&config.auth.admin_email, &config.auth.admin_password) {
        services.accounts.ensure_superuser(email, password).await?;
    }
    if config.cache.enabled {
        info!("Mailing list cache enabled");
    }

    let app = create_router(Arc::new(AppState::new(services, db_pool)));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Starting API server on {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Mailcast server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},mailcast=debug", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_level(true))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
