use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub refresh: RefreshConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
}

/// 上游数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    // stock.naver.com 根地址
    pub stock_base_url: String,
    // polling.finance.naver.com 根地址
    pub polling_base_url: String,
    // 固定标识请求头
    pub user_agent: String,
    // 单个数据源请求超时（毫秒）
    pub feed_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    // 刷新周期（秒）
    pub period_secs: u64,
    // 会话闲置多久后回收（秒）
    pub session_idle_secs: u64,
}

/// 静态登录凭据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub log_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "YOUR_SUPER_SECRET_KEY".to_string(), // Default for dev, should be overwritten by config
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            stock_base_url: "https://stock.naver.com".to_string(),
            polling_base_url: "https://polling.finance.naver.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            feed_timeout_ms: 5_000,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            period_secs: 10,
            session_idle_secs: 300,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
            token_ttl_secs: 86400 * 7,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}
