use crate::common::{IndexCodes, InstrumentCode};
use crate::feed::entity::{FeedKind, FeedResult};
use crate::feed::error::FeedError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

/// # Summary
/// 单个数据源请求的目标参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedTarget {
    // 单个证券
    Instrument(InstrumentCode),
    // 指数代码集合
    Index(IndexCodes),
}

/// # Summary
/// 一次上游请求的完整描述。
///
/// # Invariants
/// - 指数数据源总是携带 `FeedTarget::Index`，其余数据源携带 `FeedTarget::Instrument`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub kind: FeedKind,
    pub target: FeedTarget,
}

impl FeedRequest {
    /// # Summary
    /// 构造聚合路径使用的请求。
    ///
    /// # Logic
    /// 指数数据源忽略证券代码，改用默认指数集合。
    ///
    /// # Arguments
    /// * `kind`: 数据源种类。
    /// * `code`: 当前证券代码。
    ///
    /// # Returns
    /// 请求描述。
    pub fn for_instrument(kind: FeedKind, code: &InstrumentCode) -> Self {
        let target = if kind.is_per_instrument() {
            FeedTarget::Instrument(code.clone())
        } else {
            FeedTarget::Index(IndexCodes::default())
        };
        Self { kind, target }
    }

    pub fn index(codes: IndexCodes) -> Self {
        Self {
            kind: FeedKind::MarketIndex,
            target: FeedTarget::Index(codes),
        }
    }
}

/// # Summary
/// 上游数据源客户端接口。
///
/// # Invariants
/// - `fetch_raw` 每次调用只发起一次出站请求，不缓存、不重试。
/// - `fetch_feed` 永不返回错误，失败一律编码为 `FeedResult::Unavailable`。
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// # Summary
    /// 抓取原始 JSON 响应。
    ///
    /// # Logic
    /// 1. 根据数据源目录渲染 URL。
    /// 2. 附带固定标识头发起 GET 请求。
    /// 3. 校验状态码并解析 JSON。
    ///
    /// # Arguments
    /// * `request`: 请求描述。
    ///
    /// # Returns
    /// 成功返回上游 JSON，失败返回 FeedError。
    async fn fetch_raw(&self, request: &FeedRequest) -> Result<Value, FeedError>;

    /// # Summary
    /// 抓取单个数据源并吞掉失败。
    ///
    /// # Logic
    /// 1. 以证券代码构造请求并调用 `fetch_raw`。
    /// 2. 失败记录告警日志并返回 `Unavailable`。
    ///
    /// # Arguments
    /// * `kind`: 数据源种类。
    /// * `code`: 证券代码。
    ///
    /// # Returns
    /// JSON 或不可用标记。
    async fn fetch_feed(&self, kind: FeedKind, code: &InstrumentCode) -> FeedResult {
        match self.fetch_raw(&FeedRequest::for_instrument(kind, code)).await {
            Ok(value) => FeedResult::Available(value),
            Err(e) => {
                warn!("Feed {} for {} unavailable: {}", kind, code, e);
                FeedResult::Unavailable
            }
        }
    }
}
