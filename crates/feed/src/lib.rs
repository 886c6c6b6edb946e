//! # `quoteboard-feed` - 上游数据源适配层
//!
//! 实现 `quoteboard_core::feed::port::FeedClient`，
//! 将 8 个固定数据源映射到 Naver 证券的 HTTP 端点。

pub mod catalog;
pub mod naver;

pub use naver::NaverFeedClient;
