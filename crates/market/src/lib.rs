//! # `quoteboard-market` - 聚合与刷新
//!
//! - `aggregator`：对全部数据源并发扇出，合并为快照。
//! - `resolver`：从快照推导主行情与指数看板。
//! - `scheduler`：单会话刷新调度器（后选者胜、定时刷新、可销毁）。
//! - `session`：会话注册表。

pub mod aggregator;
pub mod resolver;
pub mod scheduler;
pub mod session;

pub use aggregator::SnapshotAggregator;
pub use scheduler::{RefreshScheduler, SchedulerView};
pub use session::SessionRegistry;
