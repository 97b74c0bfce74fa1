#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

use backoffice_api::app::build_router;
use backoffice_api::auth::Claims;
use backoffice_api::config::AppConfig;
use backoffice_api::state::AppState;
use backoffice_api::store::MemoryStore;

pub const JWT_SECRET: &str = "integration-secret";
pub const CRON_SECRET: &str = "integration-cron";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestServer {
    async fn spawn(config: AppConfig) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(MemoryStore::new());
        let state = AppState::in_memory(config, store.clone());
        let app = build_router(state.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { port, base_url, state, store })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
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

    /// Signed session token for `user_id` as `role` in `tenant_id`.
    pub fn token(&self, user_id: &str, tenant_id: Option<&str>, role: &str) -> String {
        let claims = Claims::new(user_id, tenant_id.map(str::to_string), Some(role.to_string()), 1);
        self.state.jwt.issue_session(&claims).expect("failed to sign test token")
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = JWT_SECRET.to_string();
    config.security.allow_test_bypass = false;
    config.jobs.cron_secret = Some(CRON_SECRET.to_string());
    config
}

pub async fn ensure_server() -> Result<TestServer> {
    ensure_server_with(test_config()).await
}

pub async fn ensure_server_with(config: AppConfig) -> Result<TestServer> {
    let server = TestServer::spawn(config).await?;
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}
