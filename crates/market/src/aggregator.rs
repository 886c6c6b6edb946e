use async_trait::async_trait;
use futures::future::join_all;
use quoteboard_core::common::InstrumentCode;
use quoteboard_core::common::time::TimeProvider;
use quoteboard_core::feed::entity::{FeedKind, FeedResult, Snapshot};
use quoteboard_core::feed::port::FeedClient;
use quoteboard_core::market::port::SnapshotSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// # Summary
/// 快照聚合器：对全部数据源并发扇出，再合并为一个快照。
///
/// # Invariants
/// - 每次构建为目录中的每个数据源恰好发起一次请求。
/// - 单个数据源受独立超时约束，超时记为 `Unavailable`，不影响其他数据源。
/// - 不重试、不缓存，也不向调用方暴露任何错误。
pub struct SnapshotAggregator {
    // 上游客户端
    client: Arc<dyn FeedClient>,
    // 单数据源超时
    feed_timeout: Duration,
    // 采集时间来源
    clock: Arc<dyn TimeProvider>,
}

impl SnapshotAggregator {
    pub fn new(
        client: Arc<dyn FeedClient>,
        feed_timeout: Duration,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            client,
            feed_timeout,
            clock,
        }
    }

    /// # Summary
    /// 在超时约束下抓取单个数据源。
    ///
    /// # Arguments
    /// * `kind`: 数据源种类。
    /// * `code`: 证券代码。
    ///
    /// # Returns
    /// 数据源种类与其结果。
    async fn fetch_bounded(&self, kind: FeedKind, code: &InstrumentCode) -> (FeedKind, FeedResult) {
        match tokio::time::timeout(self.feed_timeout, self.client.fetch_feed(kind, code)).await {
            Ok(result) => (kind, result),
            Err(_) => {
                warn!(
                    "Feed {} for {} timed out after {:?}",
                    kind, code, self.feed_timeout
                );
                (kind, FeedResult::Unavailable)
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for SnapshotAggregator {
    /// # Summary
    /// 为指定证券构建快照。
    ///
    /// # Logic
    /// 1. 为目录中每个数据源创建带超时的抓取 Future。
    /// 2. `join_all` 并发等待全部落定，耗时取决于最慢的单个数据源。
    /// 3. 以当前时钟时间组装键集完整的快照。
    ///
    /// # Arguments
    /// * `code`: 证券代码。
    ///
    /// # Returns
    /// 新快照。
    async fn build_snapshot(&self, code: &InstrumentCode) -> Snapshot {
        let pending = FeedKind::ALL
            .into_iter()
            .map(|kind| self.fetch_bounded(kind, code));
        let results = join_all(pending).await;

        let snapshot = Snapshot::assemble(code.clone(), self.clock.now(), results);
        debug!(
            "Snapshot for {} built: {}/{} feeds available",
            code,
            snapshot.available_count(),
            snapshot.len()
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use quoteboard_core::common::time::FakeClockProvider;
    use quoteboard_core::feed::error::FeedError;
    use quoteboard_core::test_utils::{ScriptedFeedClient, ScriptedReply};
    use serde_json::json;

    fn code() -> InstrumentCode {
        InstrumentCode::parse("005930").unwrap()
    }

    fn clock() -> Arc<FakeClockProvider> {
        Arc::new(FakeClockProvider::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_every_key() {
        let client = ScriptedFeedClient::new()
            .reply(FeedKind::QuoteBasic, ScriptedReply::Json(json!({"datas": []})))
            .reply(
                FeedKind::OrderBook,
                ScriptedReply::Fail(FeedError::Network("reset".into())),
            )
            .reply(FeedKind::TickTrades, ScriptedReply::Json(json!([])));
        let aggregator =
            SnapshotAggregator::new(Arc::new(client), Duration::from_secs(5), clock());

        let snapshot = aggregator.build_snapshot(&code()).await;
        assert_eq!(snapshot.len(), FeedKind::ALL.len());
        assert_eq!(snapshot.available_count(), 2);
        assert!(!snapshot.get(FeedKind::OrderBook).is_available());
        assert!(!snapshot.get(FeedKind::RealtimeQuote).is_available());
    }

    #[tokio::test]
    async fn test_every_kind_requested_once() {
        let client = Arc::new(ScriptedFeedClient::new());
        let aggregator = SnapshotAggregator::new(client.clone(), Duration::from_secs(5), clock());

        let snapshot = aggregator.build_snapshot(&code()).await;
        assert_eq!(snapshot.available_count(), 0);

        let mut kinds: Vec<FeedKind> = client.calls().iter().map(|r| r.kind).collect();
        kinds.sort();
        assert_eq!(kinds, FeedKind::ALL.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_feed_is_bounded_by_timeout() {
        let client = ScriptedFeedClient::new()
            .reply(FeedKind::QuoteBasic, ScriptedReply::Json(json!({"itemCode": "005930"})))
            .reply(FeedKind::InvestorFlows, ScriptedReply::Hang)
            .reply(
                FeedKind::TrendSeries,
                ScriptedReply::Delayed(Duration::from_millis(1_500), json!({})),
            );
        let aggregator =
            SnapshotAggregator::new(Arc::new(client), Duration::from_secs(2), clock());

        let started = tokio::time::Instant::now();
        let snapshot = aggregator.build_snapshot(&code()).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
        assert!(snapshot.get(FeedKind::QuoteBasic).is_available());
        assert!(snapshot.get(FeedKind::TrendSeries).is_available());
        assert!(!snapshot.get(FeedKind::InvestorFlows).is_available());
    }

    #[tokio::test]
    async fn test_identical_responses_yield_equal_snapshots() {
        let clock = clock();
        let client = ScriptedFeedClient::new()
            .reply(FeedKind::QuoteBasic, ScriptedReply::Json(json!({"closePrice": "1,234"})))
            .reply(FeedKind::MarketIndex, ScriptedReply::Json(json!({"datas": []})));
        let aggregator = SnapshotAggregator::new(Arc::new(client), Duration::from_secs(5), clock.clone());

        let first = aggregator.build_snapshot(&code()).await;
        clock.advance(chrono::Duration::seconds(10));
        let second = aggregator.build_snapshot(&code()).await;

        assert_ne!(first.captured_at(), second.captured_at());
        assert!(first.same_feeds(&second));
    }
}
