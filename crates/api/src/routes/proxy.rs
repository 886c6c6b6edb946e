//! # 上游代理路由
//!
//! 浏览器无法直接跨域访问上游，由本路由按数据源短名转发并原样返回 JSON。

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use quoteboard_core::common::{IndexCodes, InstrumentCode};
use quoteboard_core::feed::entity::FeedKind;
use quoteboard_core::feed::port::FeedRequest;

use crate::error::{ApiError, CODE_REQUIRED};
use crate::server::AppState;
use crate::types::ApiErrorResponse;

/// 代理查询参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProxyQuery {
    /// 证券代码，指数以外的数据源必填
    pub code: Option<String>,
    /// 指数代码集合，逗号分隔，默认 `KOSPI,KOSDAQ,KPI200`
    #[serde(rename = "itemCodes")]
    pub item_codes: Option<String>,
}

/// 将查询参数转换为上游请求。
///
/// # Logic
/// 1. 指数数据源读取 `itemCodes`，缺省或空白时使用默认集合。
/// 2. 其余数据源要求 `code`，缺省或空白返回 400 `Code is required`。
fn build_request(kind: FeedKind, query: ProxyQuery) -> Result<FeedRequest, ApiError> {
    if !kind.is_per_instrument() {
        let codes = match query.item_codes.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => IndexCodes::parse(raw)?,
            _ => IndexCodes::default(),
        };
        return Ok(FeedRequest::index(codes));
    }

    let raw = query
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(CODE_REQUIRED.into()))?;
    let code = InstrumentCode::parse(&raw)?;
    Ok(FeedRequest::for_instrument(kind, &code))
}

/// 上游数据源代理
///
/// `feed` 取值：stock / hoga / tick / trend / trader / nxt / realtime / index。
/// 成功时原样返回上游 JSON，失败时返回 500 `{"error": "Failed to fetch data"}`。
#[utoipa::path(
    get,
    path = "/api/{feed}",
    tag = "代理 (Proxy)",
    params(
        ("feed" = String, Path, description = "数据源短名"),
        ProxyQuery
    ),
    responses(
        (status = 200, description = "上游原始 JSON", body = Object),
        (status = 400, description = "缺少或非法的证券代码", body = ApiErrorResponse),
        (status = 404, description = "未知数据源", body = ApiErrorResponse),
        (status = 500, description = "上游抓取失败", body = ApiErrorResponse)
    )
)]
pub async fn proxy_feed(
    State(state): State<AppState>,
    Path(feed): Path<String>,
    Query(query): Query<ProxyQuery>,
) -> Result<Json<Value>, ApiError> {
    let kind = FeedKind::from_slug(&feed)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown feed: {}", feed)))?;
    let request = build_request(kind, query)?;

    let body = state.feed_client.fetch_raw(&request).await?;
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quoteboard_core::feed::port::FeedTarget;

    fn query(code: Option<&str>, item_codes: Option<&str>) -> ProxyQuery {
        ProxyQuery {
            code: code.map(str::to_string),
            item_codes: item_codes.map(str::to_string),
        }
    }

    #[test]
    fn test_code_required_for_instrument_feeds() {
        for kind in FeedKind::ALL.into_iter().filter(|k| k.is_per_instrument()) {
            let err = build_request(kind, query(None, None)).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(ref m) if m == CODE_REQUIRED));
            let err = build_request(kind, query(Some("  "), None)).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
        let err = build_request(FeedKind::OrderBook, query(Some("../x"), None)).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_index_codes_default_and_override() {
        let req = build_request(FeedKind::MarketIndex, query(None, None)).unwrap();
        assert_eq!(req.target, FeedTarget::Index(IndexCodes::default()));

        let req = build_request(FeedKind::MarketIndex, query(None, Some("KOSPI"))).unwrap();
        assert_eq!(req.target, FeedTarget::Index(IndexCodes::parse("KOSPI").unwrap()));
    }
}
