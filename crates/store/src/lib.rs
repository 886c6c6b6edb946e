//! # `quoteboard-store` - 持久化适配层
//!
//! 以 SQLite 键值表实现 `WatchlistRepository`。

pub mod config;
pub mod watchlist;

pub use watchlist::SqliteWatchlistStore;
