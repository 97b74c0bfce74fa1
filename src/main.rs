use backoffice_api::{app::build_router, config::AppConfig, state::AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Starting Backoffice API in {:?} mode", config.environment);
    if config.jwt_secret_missing() {
        tracing::warn!("JWT_SECRET is not set; every session token will be rejected");
    }
    if config.jobs.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET is not set; scheduled endpoints will reject every call");
    }

    let port = config.api.port;
    let state = AppState::connect(config).await?;
    let app = build_router(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Backoffice API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
