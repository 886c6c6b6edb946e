//! # 看板路由
//!
//! 按需构建一次快照，返回首屏所需的全部数据，也用于整体导出原始 JSON。

use axum::Json;
use axum::extract::{Path, State};

use quoteboard_core::common::InstrumentCode;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiErrorResponse, ApiResponse, DashboardResponse};

/// 获取证券看板
///
/// 并发抓取全部数据源，返回主行情、指数看板与各数据源原文（不可用为 null）。
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/{code}",
    tag = "看板 (Dashboard)",
    params(
        ("code" = String, Path, description = "证券代码")
    ),
    responses(
        (status = 200, description = "获取成功", body = ApiResponse<DashboardResponse>),
        (status = 400, description = "非法的证券代码", body = ApiErrorResponse)
    )
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<DashboardResponse>>, ApiError> {
    let code = InstrumentCode::parse(&code)?;
    let snapshot = state.snapshot_source.build_snapshot(&code).await;
    Ok(Json(ApiResponse::ok(DashboardResponse::from(&snapshot))))
}
