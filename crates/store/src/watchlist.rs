use async_trait::async_trait;
use chrono::Utc;
use quoteboard_core::store::error::StoreError;
use quoteboard_core::store::port::{
    WATCHLIST_STORAGE_KEY, WatchlistEntry, WatchlistRepository, default_watchlist,
};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::fs;
use std::path::Path;
use tracing::debug;

/// 默认数据库文件名
const DEFAULT_DB_FILE: &str = "quoteboard.db";

/// WatchlistRepository 的 SQLite 实现。
///
/// # Summary
/// 整个自选列表以一个 JSON 数组存放在键值表 `kv_store` 的固定键下，
/// 与浏览器本地存储的布局一致。
///
/// # Invariants
/// * 表结构在存储实例创建时初始化。
/// * 每次保存都整体覆盖该键的值。
pub struct SqliteWatchlistStore {
    pool: SqlitePool,
}

impl SqliteWatchlistStore {
    /// 在已配置的数据根目录下打开存储。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或初始化错误。
    pub async fn new() -> Result<Self, StoreError> {
        let root = crate::config::get_root_dir();
        Self::open(&root).await
    }

    /// 在指定目录下打开存储并初始化表结构。
    ///
    /// # Logic
    /// 1. 确保目录存在。
    /// 2. 以 `create_if_missing` 连接数据库文件。
    /// 3. 执行 DDL 创建键值表。
    ///
    /// # Arguments
    /// * `root` - 数据目录。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>`
    pub async fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root).map_err(|e| StoreError::InitError(e.to_string()))?;

        let options = SqliteConnectOptions::new()
            .filename(root.join(DEFAULT_DB_FILE))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

        Ok(Self { pool })
    }

    /// 写入原始值（仅供测试构造损坏数据）。
    #[doc(hidden)]
    pub async fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(value)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl WatchlistRepository for SqliteWatchlistStore {
    /// # Summary
    /// 读取自选列表。
    ///
    /// # Logic
    /// 1. 查询固定键。
    /// 2. 键不存在时返回默认列表。
    /// 3. 值无法解析时返回 `Corrupted`。
    ///
    /// # Returns
    /// * `Result<Vec<WatchlistEntry>, StoreError>`
    async fn load(&self) -> Result<Vec<WatchlistEntry>, StoreError> {
        let row = sqlx::query_as::<_, (String,)>("SELECT value FROM kv_store WHERE key = ?")
            .bind(WATCHLIST_STORAGE_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match row {
            None => {
                debug!("No persisted watchlist, using defaults");
                Ok(default_watchlist())
            }
            Some((raw,)) => serde_json::from_str(&raw).map_err(|e| StoreError::Corrupted {
                key: WATCHLIST_STORAGE_KEY.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// # Summary
    /// 覆盖保存自选列表。
    ///
    /// # Arguments
    /// * `entries` - 完整列表。
    ///
    /// # Returns
    /// * `Result<(), StoreError>`
    async fn save(&self, entries: &[WatchlistEntry]) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(entries).map_err(|e| StoreError::Database(e.to_string()))?;
        self.put_raw(WATCHLIST_STORAGE_KEY, &raw).await?;
        debug!("Watchlist saved ({} entries)", entries.len());
        Ok(())
    }
}
