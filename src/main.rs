//! 뽀모도로 동기화 서버

use anyhow::Context;
use pomodoro_sync::{config::Config, server, state::AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config));
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("🍅 Pomodoro sync server started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws/{{room_id}}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
