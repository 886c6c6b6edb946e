//! # 身份验证路由控制器
//!
//! 单一静态凭据登录，颁发 JWT Token。

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiResponse, Claims, LoginRequest, LoginResponse};

/// 用户登录
///
/// 与配置中的用户名和密码比对，一致则颁发 JWT Token。
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "鉴权 (Auth)",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = ApiResponse<LoginResponse>),
        (status = 401, description = "用户名或密码错误")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let auth = &state.app_config.auth;
    if req.username != auth.username || req.password != auth.password {
        tracing::warn!("Rejected login attempt for {}", req.username);
        return Err(ApiError::Unauthorized(
            "Invalid username or password".into(),
        ));
    }

    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    let claims = Claims {
        sub: req.username,
        exp: now.saturating_add(auth.token_ttl_secs),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.app_config.server.jwt_secret.as_ref()),
    )
    .map_err(|_| ApiError::Internal("Failed to generate token".into()))?;

    tracing::info!("User {} logged in", claims.sub);
    Ok(Json(ApiResponse::ok(LoginResponse {
        token,
        expires_in: auth.token_ttl_secs,
    })))
}
