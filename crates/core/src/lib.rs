//! # `quoteboard-core` - 领域核心
//!
//! 定义证券代码、数据源目录、快照与主行情等实体，
//! 以及上游客户端、快照来源、自选仓储等端口 (trait)。
//! 本 crate 不包含任何 I/O 实现。

pub mod common;
pub mod config;
pub mod feed;
pub mod market;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
