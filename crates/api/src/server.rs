//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 的 DI 容器持有并调用。

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use quoteboard_core::config::AppConfig;
use quoteboard_core::feed::port::FeedClient;
use quoteboard_core::market::port::SnapshotSource;
use quoteboard_core::store::port::WatchlistRepository;
use quoteboard_market::SessionRegistry;

use crate::routes::{auth, dashboard, proxy, sessions, watchlist};

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - 所有依赖在服务启动前由 DI 容器注入，生命周期与进程等同。
/// - 自选列表的读改写由 `watchlist_lock` 串行化。
#[derive(Clone)]
pub struct AppState {
    /// 上游客户端 (代理路由直接透传)
    pub feed_client: Arc<dyn FeedClient>,
    /// 快照来源 (看板路由按需构建)
    pub snapshot_source: Arc<dyn SnapshotSource>,
    /// 刷新会话注册表
    pub sessions: Arc<SessionRegistry>,
    /// 自选列表仓储
    pub watchlist: Arc<dyn WatchlistRepository>,
    /// 自选列表写锁
    pub watchlist_lock: Arc<Mutex<()>>,
    /// 应用配置 (JWT 密钥、登录凭据)
    pub app_config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        feed_client: Arc<dyn FeedClient>,
        snapshot_source: Arc<dyn SnapshotSource>,
        sessions: Arc<SessionRegistry>,
        watchlist: Arc<dyn WatchlistRepository>,
        app_config: Arc<AppConfig>,
    ) -> Self {
        Self {
            feed_client,
            snapshot_source,
            sessions,
            watchlist,
            watchlist_lock: Arc::new(Mutex::new(())),
            app_config,
        }
    }
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "quoteboard API",
        version = "0.1.0",
        description = "证券行情看板的 RESTful API 网关。提供上游代理、快照看板、刷新会话与自选列表功能。",
        license(name = "MIT")
    ),
    tags(
        (name = "鉴权 (Auth)", description = "静态凭据登录，获取 JWT"),
        (name = "代理 (Proxy)", description = "上游数据源透传"),
        (name = "看板 (Dashboard)", description = "按需构建快照并推导主行情"),
        (name = "会话 (Session)", description = "服务端刷新调度器"),
        (name = "自选股 (Watchlist)", description = "自选列表增删查")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// 为 OpenAPI 文档注入全局 Bearer JWT 鉴权方案。
///
/// 注册后，Swagger UI 页面顶部将显示 Authorize 按钮，
/// 填入 JWT Token 后即可调试标记了 `security` 的接口。
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        components.add_security_scheme(
            "bearer_jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some(
                        "在此处填入登录接口返回的 JWT Token（无需 'Bearer ' 前缀）",
                    ))
                    .build(),
            ),
        );
    }
}

// ============================================================
//  服务构建与启动
// ============================================================

/// 构建完整的 axum 应用路由树（含 Swagger UI 与 CORS）。
///
/// # Arguments
/// * `state` - 由外部 DI 容器注入的共享状态
///
/// # Returns
/// 可直接交给 `axum::serve` 的 Router。
pub fn build_router(state: AppState) -> Router {
    // 1. 无需鉴权的公开路由
    let public_router = OpenApiRouter::new()
        .routes(routes!(auth::login))
        .routes(routes!(proxy::proxy_feed))
        .routes(routes!(dashboard::get_dashboard));

    // 2. 需要合法 JWT 的路由
    let protected_router = OpenApiRouter::new()
        .routes(routes!(sessions::create_session))
        .routes(routes!(sessions::get_session, sessions::delete_session))
        .routes(routes!(sessions::select_instrument))
        .routes(routes!(watchlist::get_watchlist, watchlist::add_to_watchlist))
        .routes(routes!(watchlist::remove_from_watchlist))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    // 3. 合并所有路由与自动收集的 OpenAPI Doc
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(public_router)
        .merge(protected_router)
        .with_state(state)
        .split_for_parts();

    // 4. 配置 CORS (代理供浏览器直接调用，允许所有来源)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}

/// 绑定端口并启动 HTTP 服务，直到 `shutdown` 完成。
///
/// # Arguments
/// * `state` - 共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"0.0.0.0:8080"`
/// * `shutdown` - 优雅停机信号
///
/// # Returns
/// 绑定或服务失败时返回错误。
pub async fn start_server<F>(
    state: AppState,
    bind_addr: &str,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    tracing::info!("quoteboard API server listening on {}", bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
