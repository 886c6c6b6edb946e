//! # `quoteboard-api` - HTTP API 网关
//!
//! 本 crate 是 quoteboard 的 HTTP/REST 服务入口。
//! 使用 `axum` 构建路由与控制器，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - `/api/{feed}`：上游数据源透传代理，供浏览器绕过跨域限制
//! - `/api/v1/dashboard`：按需构建快照并返回主行情、指数看板与全部原始 JSON
//! - `/api/v1/sessions`：服务端持有的刷新会话（每个会话一个调度器）
//! - `/api/v1/watchlist`：自选列表增删查
//! - 静态凭据登录后以 JWT 保护会话与自选路由

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;
