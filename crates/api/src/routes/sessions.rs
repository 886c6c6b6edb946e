//! # 刷新会话路由
//!
//! 每个会话对应一个服务端刷新调度器：选择证券后立即抓取，之后按周期刷新，
//! 删除会话即销毁调度器。

use axum::Json;
use axum::extract::{Path, State};

use quoteboard_core::common::InstrumentCode;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{
    ApiErrorResponse, ApiResponse, SelectInstrumentRequest, SessionCreatedResponse,
    SessionResponse,
};

fn session_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Session not found: {}", id))
}

/// 创建会话
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "会话 (Session)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "创建成功", body = ApiResponse<SessionCreatedResponse>),
        (status = 401, description = "未认证", body = ApiErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
) -> Json<ApiResponse<SessionCreatedResponse>> {
    let id = state.sessions.create();
    Json(ApiResponse::ok(SessionCreatedResponse { id }))
}

/// 获取会话状态
///
/// 返回调度器状态、当前证券、最近落定时间以及由最近快照推导的行情。
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "会话 (Session)",
    security(("bearer_jwt" = [])),
    params(
        ("id" = String, Path, description = "会话 ID")
    ),
    responses(
        (status = 200, description = "获取成功", body = ApiResponse<SessionResponse>),
        (status = 404, description = "会话不存在", body = ApiErrorResponse)
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let scheduler = state.sessions.get(&id).ok_or_else(|| session_not_found(&id))?;
    Ok(Json(ApiResponse::ok(SessionResponse::from_view(
        &id,
        scheduler.view(),
    ))))
}

/// 选择证券
///
/// 立即开始新一轮抓取，之前在途的结果被丢弃，刷新周期重新计时。
#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/instrument",
    tag = "会话 (Session)",
    security(("bearer_jwt" = [])),
    params(
        ("id" = String, Path, description = "会话 ID")
    ),
    request_body = SelectInstrumentRequest,
    responses(
        (status = 200, description = "已切换", body = ApiResponse<SessionResponse>),
        (status = 400, description = "非法的证券代码", body = ApiErrorResponse),
        (status = 404, description = "会话不存在", body = ApiErrorResponse)
    )
)]
pub async fn select_instrument(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SelectInstrumentRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let code = InstrumentCode::parse(&req.code)?;
    let scheduler = state.sessions.get(&id).ok_or_else(|| session_not_found(&id))?;
    if !scheduler.select_instrument(code) {
        return Err(session_not_found(&id));
    }
    Ok(Json(ApiResponse::ok(SessionResponse::from_view(
        &id,
        scheduler.view(),
    ))))
}

/// 销毁会话
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{id}",
    tag = "会话 (Session)",
    security(("bearer_jwt" = [])),
    params(
        ("id" = String, Path, description = "会话 ID")
    ),
    responses(
        (status = 200, description = "已销毁", body = ApiResponse<String>),
        (status = 404, description = "会话不存在", body = ApiErrorResponse)
    )
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    if !state.sessions.remove(&id) {
        return Err(session_not_found(&id));
    }
    Ok(Json(ApiResponse::ok("ok".to_string())))
}
