//! # DTO (Data Transfer Object) 层
//!
//! 将内部领域模型转化为面向前端 JSON 输出的轻量结构体。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 Swagger 文档。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use quoteboard_core::feed::entity::Snapshot;
use quoteboard_core::market::entity::{IndexQuote, PriceDirection, RefreshState, ResolvedQuote};
use quoteboard_core::store::port::WatchlistEntry;
use quoteboard_market::SchedulerView;
use quoteboard_market::resolver::{resolve_indices, resolve_quote};

// ============================================================
//  行情相关 DTO
// ============================================================

/// 主行情 DTO - 对应看板顶部的价格卡片
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteResponse {
    /// 证券代码
    #[schema(example = "005930")]
    pub code: String,
    /// 展示名称
    #[schema(example = "삼성전자")]
    pub name: String,
    /// 最新价
    #[schema(example = 72100.0)]
    pub last_price: f64,
    /// 较前收盘变动
    #[schema(example = 400.0)]
    pub change: f64,
    /// 涨跌幅 (%)
    #[schema(example = 0.55)]
    pub change_ratio: f64,
    /// 涨跌方向
    pub direction: PriceDirection,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    /// 累计成交量
    pub volume: f64,
    /// 累计成交额，非正值时为 null
    pub trading_value: Option<f64>,
    /// 以百万为单位的成交额
    pub trading_value_millions: Option<f64>,
    /// 是否采用 NXT 盘前盘后数据
    pub used_extended_hours: bool,
}

/// 指数看板 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IndexQuoteResponse {
    #[schema(example = "KOSPI")]
    pub code: String,
    #[schema(example = 2650.12)]
    pub close: f64,
    pub change: f64,
    pub change_ratio: f64,
    pub direction: PriceDirection,
}

/// 看板导出 DTO：主行情、指数与全部数据源原文
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    /// 证券代码
    #[schema(example = "005930")]
    pub code: String,
    /// 快照采集时间 (ISO 8601)
    #[schema(example = "2026-03-01T10:00:00Z")]
    pub retrieved_at: String,
    /// 主行情，无可用行情数据时为 null
    pub quote: Option<QuoteResponse>,
    /// KOSPI / KOSDAQ 看板
    pub indices: Vec<IndexQuoteResponse>,
    /// 各数据源原始 JSON，不可用时为 null
    #[schema(value_type = Object)]
    pub feeds: BTreeMap<String, Value>,
}

// ============================================================
//  会话相关 DTO
// ============================================================

/// 新建会话响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionCreatedResponse {
    /// 会话 ID
    #[schema(example = "3f1c2a9e-8d4b-4c7e-9a51-0b6f2e7d1c3a")]
    pub id: String,
}

/// 选择证券请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SelectInstrumentRequest {
    #[schema(example = "005930")]
    pub code: String,
}

/// 会话状态 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// 会话 ID
    pub id: String,
    /// 调度器状态
    pub state: RefreshState,
    /// 当前证券
    pub code: Option<String>,
    /// 最近一次落定时间 (ISO 8601)
    pub settled_at: Option<String>,
    /// 由最近快照推导的主行情
    pub quote: Option<QuoteResponse>,
    /// 指数看板
    pub indices: Vec<IndexQuoteResponse>,
    /// 最近快照的各数据源原文，尚无快照时为 null
    #[schema(value_type = Option<Object>)]
    pub feeds: Option<BTreeMap<String, Value>>,
}

// ============================================================
//  自选列表 DTO
// ============================================================

/// 自选条目
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WatchlistEntryResponse {
    #[schema(example = "삼성전자")]
    pub name: String,
    #[schema(example = "005930")]
    pub code: String,
}

/// 添加自选请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddWatchlistRequest {
    /// 显示名称
    #[schema(example = "삼성전자")]
    pub name: String,
    /// 证券代码
    #[schema(example = "005930")]
    pub code: String,
}

// ============================================================
//  通用响应包装
// ============================================================

/// 统一成功响应包装
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 固定为 true
    pub success: bool,
    /// 业务数据
    pub data: Option<T>,
    /// 固定为 null
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// 失败响应体，与上游代理的错误格式保持一致
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 错误描述信息
    #[schema(example = "Code is required")]
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误信息构建
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

// ============================================================
//  鉴权 DTO
// ============================================================

/// 登录请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// 用户名
    #[schema(example = "admin")]
    pub username: String,
    /// 密码
    #[schema(example = "admin")]
    pub password: String,
}

/// 登录成功返回的 Token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// JWT Bearer Token
    #[schema(example = "eyJhbGciOiJIUzI1NiIs...")]
    pub token: String,
    /// Token 过期时间 (秒)
    #[schema(example = 604800)]
    pub expires_in: u64,
}

/// JWT Claims 内容 (内部使用，不暴露到 Swagger)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 登录用户名
    pub sub: String,
    /// Token 过期时间 (Unix 时间戳)
    pub exp: u64,
}

// ============================================================
//  领域模型 → DTO 惯用转换 (impl From<T>)
// ============================================================

impl From<ResolvedQuote> for QuoteResponse {
    fn from(q: ResolvedQuote) -> Self {
        Self {
            direction: q.direction(),
            trading_value_millions: q.trading_value_millions(),
            code: q.code.to_string(),
            name: q.name,
            last_price: q.last_price,
            change: q.change,
            change_ratio: q.change_ratio,
            open: q.open,
            high: q.high,
            low: q.low,
            volume: q.volume,
            trading_value: q.trading_value,
            used_extended_hours: q.used_extended_hours,
        }
    }
}

impl From<IndexQuote> for IndexQuoteResponse {
    fn from(i: IndexQuote) -> Self {
        Self {
            direction: i.direction(),
            code: i.code,
            close: i.close,
            change: i.change,
            change_ratio: i.change_ratio,
        }
    }
}

impl From<WatchlistEntry> for WatchlistEntryResponse {
    fn from(e: WatchlistEntry) -> Self {
        Self {
            name: e.name,
            code: e.code.to_string(),
        }
    }
}

/// 按数据源名称展开快照，不可用的数据源输出 null。
pub fn feeds_json(snapshot: &Snapshot) -> BTreeMap<String, Value> {
    snapshot
        .iter()
        .map(|(kind, result)| {
            (
                kind.to_string(),
                result.as_value().cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

impl From<&Snapshot> for DashboardResponse {
    fn from(s: &Snapshot) -> Self {
        Self {
            code: s.code().to_string(),
            retrieved_at: s.captured_at().to_rfc3339(),
            quote: resolve_quote(s).map(Into::into),
            indices: resolve_indices(s).into_iter().map(Into::into).collect(),
            feeds: feeds_json(s),
        }
    }
}

impl SessionResponse {
    /// 由会话 ID 与调度器视图构建
    pub fn from_view(id: &str, view: SchedulerView) -> Self {
        let snapshot = view.snapshot.as_deref();
        Self {
            id: id.to_string(),
            state: view.state,
            code: view.code.map(|c| c.to_string()),
            settled_at: view.settled_at.map(|t| t.to_rfc3339()),
            quote: snapshot.and_then(resolve_quote).map(Into::into),
            indices: snapshot
                .map(|s| resolve_indices(s).into_iter().map(Into::into).collect())
                .unwrap_or_default(),
            feeds: snapshot.map(feeds_json),
        }
    }
}
