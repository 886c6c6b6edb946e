//! 供各 crate 测试复用的内存替身实现。

use crate::common::InstrumentCode;
use crate::common::time::{RealTimeProvider, TimeProvider};
use crate::feed::entity::{FeedKind, FeedResult, Snapshot};
use crate::feed::error::FeedError;
use crate::feed::port::{FeedClient, FeedRequest};
use crate::market::port::SnapshotSource;
use crate::store::error::StoreError;
use crate::store::port::{WatchlistEntry, WatchlistRepository, default_watchlist};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 单个数据源的预设响应。
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Json(Value),
    Fail(FeedError),
    // 先等待再返回 JSON
    Delayed(Duration, Value),
    // 永不返回
    Hang,
}

/// # Summary
/// 按数据源种类返回预设响应的客户端，并记录调用次数。
#[derive(Default)]
pub struct ScriptedFeedClient {
    replies: Mutex<HashMap<FeedKind, ScriptedReply>>,
    calls: Mutex<Vec<FeedRequest>>,
}

impl ScriptedFeedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, kind: FeedKind, reply: ScriptedReply) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, reply);
        self
    }

    pub fn calls(&self) -> Vec<FeedRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl FeedClient for ScriptedFeedClient {
    async fn fetch_raw(&self, request: &FeedRequest) -> Result<Value, FeedError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&request.kind)
            .cloned();

        match reply {
            Some(ScriptedReply::Json(v)) => Ok(v),
            Some(ScriptedReply::Fail(e)) => Err(e),
            Some(ScriptedReply::Delayed(d, v)) => {
                tokio::time::sleep(d).await;
                Ok(v)
            }
            Some(ScriptedReply::Hang) => {
                std::future::pending::<()>().await;
                Err(FeedError::Timeout)
            }
            None => Err(FeedError::Status(404)),
        }
    }
}

/// # Summary
/// 可为不同证券设置延迟的快照来源，记录每次构建请求。
///
/// # Invariants
/// - 产出的快照在 quote-basic 槽位写入 `{"itemCode": code}`，便于断言快照归属。
pub struct ScriptedSnapshotSource {
    delays: Mutex<HashMap<InstrumentCode, Duration>>,
    calls: Mutex<Vec<InstrumentCode>>,
    clock: Arc<dyn TimeProvider>,
}

impl Default for ScriptedSnapshotSource {
    fn default() -> Self {
        Self {
            delays: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            clock: Arc::new(RealTimeProvider),
        }
    }
}

impl ScriptedSnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(self, code: &InstrumentCode, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(code.clone(), delay);
        self
    }

    pub fn calls(&self) -> Vec<InstrumentCode> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self, code: &InstrumentCode) -> usize {
        self.calls().iter().filter(|c| *c == code).count()
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSnapshotSource {
    async fn build_snapshot(&self, code: &InstrumentCode) -> Snapshot {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(code.clone());
        let delay = self
            .delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(code)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Snapshot::assemble(
            code.clone(),
            self.clock.now(),
            [(
                FeedKind::QuoteBasic,
                FeedResult::Available(json!({ "itemCode": code.as_str() })),
            )],
        )
    }
}

/// # Summary
/// 基于内存的自选列表仓储。
#[derive(Default)]
pub struct MemWatchlistRepository {
    stored: Mutex<Option<Vec<WatchlistEntry>>>,
}

impl MemWatchlistRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatchlistRepository for MemWatchlistRepository {
    async fn load(&self) -> Result<Vec<WatchlistEntry>, StoreError> {
        Ok(self
            .stored
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(default_watchlist))
    }

    async fn save(&self, entries: &[WatchlistEntry]) -> Result<(), StoreError> {
        *self.stored.lock().unwrap_or_else(|e| e.into_inner()) = Some(entries.to_vec());
        Ok(())
    }
}
