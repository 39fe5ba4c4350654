use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::app::{app, AppState};
use crate::config::AppConfig;
use crate::database::models::User;
use crate::database::{DatabaseManager, MemoryStore, PgStore};

pub async fn handle(mut config: AppConfig, port: Option<u16>, seed_user: Option<String>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    info!("Starting DevConnect API in {:?} mode", config.environment);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_state(config, seed_user).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

/// Postgres when DATABASE_URL is configured, otherwise the in-memory store.
pub async fn build_state(config: AppConfig, seed_user: Option<String>) -> anyhow::Result<AppState> {
    if config.database.url.is_some() {
        if seed_user.is_some() {
            warn!("--seed-user only applies to the in-memory store; ignoring");
        }
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;
        return Ok(AppState::new(config, Arc::new(PgStore::new(pool))));
    }

    warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(config, store.clone());

    if let Some(name) = seed_user {
        let email = format!("{}@localhost", name.to_lowercase().replace(' ', "."));
        let user = User::new(name, email, None);
        let token = state.verifier.issue(user.id)?;
        info!("Seeded user {} ({}), token: {}", user.name, user.id, token);
        store.insert_user(user).await;
    }

    Ok(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
