use crate::catalog::FeedCatalog;
use async_trait::async_trait;
use quoteboard_core::config::UpstreamConfig;
use quoteboard_core::feed::error::FeedError;
use quoteboard_core::feed::port::{FeedClient, FeedRequest};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// # Summary
/// Naver 证券数据源客户端实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端，所有请求携带固定 User-Agent。
/// - 客户端级超时与单数据源超时一致，不缓存、不重试。
#[derive(Clone)]
pub struct NaverFeedClient {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 端点目录
    catalog: FeedCatalog,
}

impl NaverFeedClient {
    /// # Summary
    /// 根据上游配置创建客户端。
    ///
    /// # Logic
    /// 1. 确保进程级 TLS 加密提供者已安装。
    /// 2. 设置浏览器 User-Agent 以减少被拦截风险。
    /// 3. 配置请求超时并构建 reqwest 客户端。
    ///
    /// # Arguments
    /// * `config`: 上游配置。
    ///
    /// # Returns
    /// 成功返回客户端，请求头非法或客户端构建失败时返回 `FeedError::Network`。
    pub fn new(config: &UpstreamConfig) -> Result<Self, FeedError> {
        install_crypto_provider();

        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| FeedError::Network(format!("invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);

        let client = Client::builder()
            .timeout(Duration::from_millis(config.feed_timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| FeedError::Network(e.to_string()))?;

        Ok(Self {
            client,
            catalog: FeedCatalog::from_config(config),
        })
    }
}

/// # Summary
/// 安装 ring 作为 rustls 的进程级加密提供者。
///
/// # Logic
/// 重复安装会返回错误，此时说明已有提供者，直接忽略。
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

#[async_trait]
impl FeedClient for NaverFeedClient {
    /// # Summary
    /// 从 Naver 抓取单个数据源的原始 JSON。
    ///
    /// # Logic
    /// 1. 通过目录渲染 URL 与查询参数。
    /// 2. 发起 GET 请求，超时映射为 `Timeout`，其余传输错误映射为 `Network`。
    /// 3. 非 2xx 状态码返回 `Status`。
    /// 4. 读取响应体并解析为 JSON，失败返回 `Parse`。
    ///
    /// # Arguments
    /// * `request`: 请求描述。
    ///
    /// # Returns
    /// 成功返回上游 JSON。
    async fn fetch_raw(&self, request: &FeedRequest) -> Result<Value, FeedError> {
        let endpoint = self.catalog.endpoint(request)?;
        debug!("GET {} {:?}", endpoint.url, endpoint.query);

        let resp = self
            .client
            .get(&endpoint.url)
            .query(&endpoint.query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FeedError::Timeout
                } else {
                    FeedError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout
            } else {
                FeedError::Network(e.to_string())
            }
        })?;

        serde_json::from_slice(&body).map_err(|e| FeedError::Parse(e.to_string()))
    }
}
