//! 主应用程序入口
//!
//! 加载配置、打开消息日志并启动 Axum Web 服务。

use std::sync::Arc;

use application::{ChatHub, Clock, ZonedClock};
use config::AppConfig;
use infrastructure::Infrastructure;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, Authenticator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，未设置 RUST_LOG 时默认 info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    tracing::info!(config = %config.sanitize(), "configuration loaded");

    let infrastructure = Infrastructure::connect(&config.database).await?;
    let clock: Arc<dyn Clock> = Arc::new(ZonedClock::from_offset_minutes(
        config.chat.utc_offset_minutes,
    )?);
    let hub = Arc::new(
        ChatHub::new(infrastructure.message_store, clock)
            .with_queue_capacity(config.chat.client_queue_capacity),
    );
    let authenticator = Arc::new(Authenticator::from_config(&config.auth));

    let app = router(AppState::new(hub, authenticator));
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("聊天服务器启动在 http://{}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
