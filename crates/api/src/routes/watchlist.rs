//! # 自选列表路由
//!
//! 列表整体读写：每次变更都先读出完整列表，修改后整体覆盖保存。

use axum::Json;
use axum::extract::{Path, State};

use quoteboard_core::common::InstrumentCode;
use quoteboard_core::store::error::StoreError;
use quoteboard_core::store::port::{WatchlistEntry, default_watchlist};

use crate::error::{ApiError, CODE_REQUIRED};
use crate::middleware::auth::CurrentUser;
use crate::server::AppState;
use crate::types::{AddWatchlistRequest, ApiErrorResponse, ApiResponse, WatchlistEntryResponse};

/// 读取列表；已存储的值损坏时回退到默认列表，下一次保存会覆盖它。
async fn load_entries(state: &AppState) -> Result<Vec<WatchlistEntry>, ApiError> {
    match state.watchlist.load().await {
        Ok(entries) => Ok(entries),
        Err(StoreError::Corrupted { key, reason }) => {
            tracing::warn!("Stored watchlist under {} is corrupted ({}), using defaults", key, reason);
            Ok(default_watchlist())
        }
        Err(e) => Err(e.into()),
    }
}

fn to_response(entries: Vec<WatchlistEntry>) -> Json<ApiResponse<Vec<WatchlistEntryResponse>>> {
    Json(ApiResponse::ok(entries.into_iter().map(Into::into).collect()))
}

/// 获取自选列表
///
/// 从未保存过时返回默认列表。
#[utoipa::path(
    get,
    path = "/api/v1/watchlist",
    tag = "自选股 (Watchlist)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "获取成功", body = ApiResponse<Vec<WatchlistEntryResponse>>),
        (status = 500, description = "服务器内部错误", body = ApiErrorResponse)
    )
)]
pub async fn get_watchlist(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<WatchlistEntryResponse>>>, ApiError> {
    Ok(to_response(load_entries(&state).await?))
}

/// 添加自选股
///
/// 名称与代码均不能为空，追加到列表末尾。
#[utoipa::path(
    post,
    path = "/api/v1/watchlist",
    tag = "自选股 (Watchlist)",
    security(("bearer_jwt" = [])),
    request_body = AddWatchlistRequest,
    responses(
        (status = 200, description = "添加成功，返回新列表", body = ApiResponse<Vec<WatchlistEntryResponse>>),
        (status = 400, description = "名称或代码不合法", body = ApiErrorResponse),
        (status = 500, description = "服务器内部错误", body = ApiErrorResponse)
    )
)]
pub async fn add_to_watchlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<AddWatchlistRequest>,
) -> Result<Json<ApiResponse<Vec<WatchlistEntryResponse>>>, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }
    if req.code.trim().is_empty() {
        return Err(ApiError::BadRequest(CODE_REQUIRED.into()));
    }
    let code = InstrumentCode::parse(&req.code)?;

    let _guard = state.watchlist_lock.lock().await;
    let mut entries = load_entries(&state).await?;
    entries.push(WatchlistEntry {
        name: name.to_string(),
        code,
    });
    state.watchlist.save(&entries).await?;
    tracing::info!("{} added {} to the watchlist", user, name);

    Ok(to_response(entries))
}

/// 删除自选股
///
/// 移除该代码的全部条目。
#[utoipa::path(
    delete,
    path = "/api/v1/watchlist/{code}",
    tag = "自选股 (Watchlist)",
    security(("bearer_jwt" = [])),
    params(
        ("code" = String, Path, description = "证券代码")
    ),
    responses(
        (status = 200, description = "删除成功，返回新列表", body = ApiResponse<Vec<WatchlistEntryResponse>>),
        (status = 400, description = "非法的证券代码", body = ApiErrorResponse),
        (status = 500, description = "服务器内部错误", body = ApiErrorResponse)
    )
)]
pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<Vec<WatchlistEntryResponse>>>, ApiError> {
    let code = InstrumentCode::parse(&code)?;

    let _guard = state.watchlist_lock.lock().await;
    let mut entries = load_entries(&state).await?;
    entries.retain(|e| e.code != code);
    state.watchlist.save(&entries).await?;
    tracing::info!("{} removed {} from the watchlist", user, code);

    Ok(to_response(entries))
}
