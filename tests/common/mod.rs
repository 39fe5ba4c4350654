#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use devconnect_api::{
    app,
    config::{AppConfig, AUTH_HEADER},
    database::{models::User, DatabaseManager, MemoryStore, PgStore},
    AppState,
};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;

pub const TEST_SECRET: &str = "integration-test-secret";

/// One server per test, served in-process on the test's own runtime.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development().with_secret(TEST_SECRET);
        config.server.host = "127.0.0.1".to_string();
        config.server.port = port;
        config.api.enable_request_logging = false;

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        let router = app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            port,
            base_url,
            state,
            store,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a user directly in the store and return it with a valid token.
    pub async fn seed_user(&self, name: &str) -> Result<(User, String)> {
        let user = User::new(name, format!("{}@example.com", name.to_lowercase()), None);
        let token = self.state.verifier.issue(user.id)?;
        self.store.insert_user(user.clone()).await;
        Ok((user, token))
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).header(AUTH_HEADER, token)
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).header(AUTH_HEADER, token)
    }

    pub fn put(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.put(self.url(path)).header(AUTH_HEADER, token)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).header(AUTH_HEADER, token)
    }
}

/// Send and decode, returning the status alongside the JSON body.
pub async fn send(request: RequestBuilder) -> Result<(StatusCode, Value)> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.json::<Value>().await?;
    Ok((status, body))
}

/// Postgres-backed store from `DATABASE_URL`, migrated. `None` when the
/// variable is unset so database tests can skip.
pub async fn pg_store() -> Result<Option<PgStore>> {
    let _ = dotenvy::dotenv();
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            eprintln!("DATABASE_URL not set, skipping Postgres test");
            return Ok(None);
        }
    };

    let mut config = AppConfig::development().database;
    config.url = Some(url);
    let pool = DatabaseManager::connect(&config).await?;
    DatabaseManager::migrate(&pool).await?;
    Ok(Some(PgStore::new(pool)))
}

/// Insert an identity row directly; the service itself never creates users.
pub async fn seed_pg_user(store: &PgStore, name: &str) -> Result<User> {
    let mut user = User::new(name, "", None);
    user.email = format!("{}-{}@example.com", name.to_lowercase(), user.id);
    sqlx::query("INSERT INTO users (id, name, email, avatar, date) VALUES ($1, $2, $3, $4, $5)")
        .bind(user.id.to_hex())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.avatar)
        .bind(user.date)
        .execute(store.pool())
        .await
        .context("failed to seed user")?;
    Ok(user)
}
