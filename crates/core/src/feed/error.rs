use thiserror::Error;

/// # Summary
/// 上游数据源错误枚举。
///
/// # Invariants
/// - 只在代理层与原始抓取接口中出现；聚合路径上一律降级为 `FeedResult::Unavailable`。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 上游返回非 2xx 状态码
    #[error("Upstream responded with HTTP {0}")]
    Status(u16),
    // 响应体不是合法 JSON
    #[error("Parse error: {0}")]
    Parse(String),
    // 单个数据源请求超时
    #[error("Request timed out")]
    Timeout,
    // 证券代码为空或包含非法字符
    #[error("Invalid instrument code: {0:?}")]
    InvalidCode(String),
}
