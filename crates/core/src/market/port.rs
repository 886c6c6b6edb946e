use crate::common::InstrumentCode;
use crate::feed::entity::Snapshot;
use async_trait::async_trait;

/// # Summary
/// 快照来源接口，刷新调度器只依赖此抽象。
///
/// # Invariants
/// - 每次调用恰好产出一个键集完整的快照，不向调用方暴露错误。
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// # Summary
    /// 为指定证券构建一份新快照。
    ///
    /// # Arguments
    /// * `code`: 证券代码。
    ///
    /// # Returns
    /// 新快照。
    async fn build_snapshot(&self, code: &InstrumentCode) -> Snapshot;
}
