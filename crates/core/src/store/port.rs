use super::error::StoreError;
use crate::common::{InstrumentCode, KNOWN_INSTRUMENTS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 自选列表在存储中使用的固定键。
pub const WATCHLIST_STORAGE_KEY: &str = "naver_stocks_v2";

/// # Summary
/// 自选列表条目：名称 + 证券代码。
///
/// # Invariants
/// - `name` 非空；`code` 已通过证券代码校验。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    // 用户自定义的显示名称
    pub name: String,
    // 证券代码
    pub code: InstrumentCode,
}

/// # Summary
/// 默认自选列表，尚无持久化数据时返回。
pub fn default_watchlist() -> Vec<WatchlistEntry> {
    KNOWN_INSTRUMENTS
        .iter()
        .filter_map(|(name, code)| {
            InstrumentCode::parse(code).ok().map(|code| WatchlistEntry {
                name: (*name).to_string(),
                code,
            })
        })
        .collect()
}

/// # Summary
/// 自选列表仓储接口，整表读写。
///
/// # Invariants
/// - `save` 总是覆盖写入完整列表。
/// - 从未保存过时 `load` 返回默认列表。
#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    /// # Summary
    /// 读取完整自选列表。
    ///
    /// # Returns
    /// 成功返回条目列表，失败返回 `StoreError`。
    async fn load(&self) -> Result<Vec<WatchlistEntry>, StoreError>;

    /// # Summary
    /// 覆盖保存完整自选列表。
    ///
    /// # Arguments
    /// * `entries`: 待保存的条目。
    ///
    /// # Returns
    /// 成功返回 Ok，失败返回 `StoreError`。
    async fn save(&self, entries: &[WatchlistEntry]) -> Result<(), StoreError>;
}
