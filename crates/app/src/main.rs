mod settings;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quoteboard_api::server::{AppState, start_server};
use quoteboard_core::common::time::{RealTimeProvider, TimeProvider};
use quoteboard_core::config::ServerConfig;
use quoteboard_feed::NaverFeedClient;
use quoteboard_market::{SessionRegistry, SnapshotAggregator};
use quoteboard_store::SqliteWatchlistStore;
use tracing::{error, info, warn};

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 API 层。
///
/// # Logic
/// 1. 加载配置并初始化全局日志。
/// 2. 实例化基础设施层（Feed、Store）。
/// 3. 实例化领域实现层（Aggregator、SessionRegistry）。
/// 4. 启动 HTTP 服务，收到退出信号后销毁全部会话。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置与日志
    let config = settings::load()?;
    let _log_guard = telemetry::init(&config.storage.log_dir);
    info!("quoteboard starting...");
    if config.server.jwt_secret == ServerConfig::default().jwt_secret {
        warn!("Using the built-in JWT secret; set QUOTEBOARD__SERVER__JWT_SECRET in production");
    }

    // 2. 基础设施层
    quoteboard_store::config::set_root_dir(PathBuf::from(&config.storage.data_dir));
    let watchlist = Arc::new(SqliteWatchlistStore::new().await?);
    let feed_client = Arc::new(NaverFeedClient::new(&config.upstream)?);

    // 3. 领域实现层
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let aggregator = Arc::new(SnapshotAggregator::new(
        feed_client.clone(),
        Duration::from_millis(config.upstream.feed_timeout_ms),
        clock.clone(),
    ));
    let sessions = SessionRegistry::new(
        aggregator.clone(),
        clock,
        Duration::from_secs(config.refresh.period_secs),
        Duration::from_secs(config.refresh.session_idle_secs),
    );

    // 4. API 层
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(
        feed_client,
        aggregator,
        sessions.clone(),
        watchlist,
        Arc::new(config),
    );
    start_server(state, &bind_addr, shutdown_signal()).await?;

    sessions.shutdown_all();
    info!("Shutdown complete");
    Ok(())
}

/// 等待 Ctrl-C。
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received. Exiting...");
}
