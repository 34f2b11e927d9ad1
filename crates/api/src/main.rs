use std::sync::Arc;

use anyhow::Context;
use content_rest_api::config::{AdminBootstrap, AppConfig};
use content_rest_api::state::AppState;
use content_rest_core::auth::{create_user, Registration};
use content_rest_core::events::{LivePoller, SubscriberRegistry};
use content_rest_core::permission::ADMINISTRATOR;
use content_rest_core::store::seed::Seed;
use content_rest_core::{MemoryStore, PgStore, Store, UserStore};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().context("Failed to load config")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!("Starting content REST API server");

    let store = open_store(&config).await?;

    if let Some(path) = &config.seed_path {
        let seed = Seed::from_file(path).await?;
        let inserted = seed.apply(store.as_ref()).await?;
        tracing::info!(path = %path.display(), inserted, "seed applied");
    }
    if let Some(admin) = &config.admin {
        ensure_admin(store.as_ref(), admin).await?;
    }

    let registry = Arc::new(SubscriberRegistry::new(config.live_subscriber_buffer));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = LivePoller::new(store.clone(), registry.clone(), config.live_poll_interval);
    let poller_handle = tokio::spawn(poller.run(shutdown_rx));

    let state = AppState::new(store, config.clone(), registry.clone());
    let app = content_rest_api::build_app(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {addr}");

    // Open SSE streams only finish once their subscriptions are gone.
    let shutdown = async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
        let closed = registry.disconnect_all();
        tracing::info!(closed, "live subscribers disconnected");
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    if let Err(err) = poller_handle.await {
        tracing::warn!(%err, "live poller ended abnormally");
    }

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Postgres when `DATABASE_URL` is set, otherwise an in-memory store.
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, content is kept in memory");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect(url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations applied");

    Ok(Arc::new(PgStore::new(pool)))
}

async fn ensure_admin(store: &dyn Store, admin: &AdminBootstrap) -> anyhow::Result<()> {
    if store.find_user_by_login(&admin.username).await?.is_some() {
        return Ok(());
    }
    let registration = Registration {
        username: admin.username.clone(),
        password: admin.password.clone(),
        ..Default::default()
    };
    create_user(store, &registration, vec![ADMINISTRATOR.to_string()])
        .await
        .context("Failed to create administrator")?;
    tracing::info!(username = %admin.username, "administrator created");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received Ctrl+C, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
