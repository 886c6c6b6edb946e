use crate::scheduler::RefreshScheduler;
use dashmap::DashMap;
use quoteboard_core::common::InstrumentCode;
use quoteboard_core::common::time::TimeProvider;
use quoteboard_core::market::port::SnapshotSource;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;
use uuid::Uuid;

/// 默认闲置回收时长。
pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(300);

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// 注册表中的单个会话。
struct Session {
    scheduler: Arc<RefreshScheduler>,
    // 最近一次被读取或选择的时间
    last_access: Instant,
}

/// # Summary
/// 会话注册表：每个 UI 会话持有一个独立的刷新调度器。
///
/// # Invariants
/// - Key 为会话 ID (UUID v4)，Value 为该会话独占的调度器。
/// - 移除会话即销毁其调度器。
/// - 超过 `idle_ttl` 未被访问的会话由后台清扫任务移除，客户端离开后不会继续轮询上游。
pub struct SessionRegistry {
    source: Arc<dyn SnapshotSource>,
    clock: Arc<dyn TimeProvider>,
    period: Duration,
    idle_ttl: Duration,
    sessions: DashMap<String, Session>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl SessionRegistry {
    /// # Summary
    /// 创建注册表并启动闲置清扫任务，须在 tokio 运行时内调用。
    ///
    /// # Arguments
    /// * `source`: 快照来源。
    /// * `clock`: 时钟。
    /// * `period`: 每个调度器的刷新周期。
    /// * `idle_ttl`: 会话闲置多久后被回收。
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        clock: Arc<dyn TimeProvider>,
        period: Duration,
        idle_ttl: Duration,
    ) -> Arc<Self> {
        let registry = Arc::new(Self {
            source,
            clock,
            period,
            idle_ttl,
            sessions: DashMap::new(),
            sweeper: Mutex::new(None),
        });

        let every = (idle_ttl / 4).max(MIN_SWEEP_INTERVAL);
        let handle = tokio::spawn(sweep_idle(Arc::downgrade(&registry), every));
        *registry.sweeper.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        registry
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// # Summary
    /// 创建新会话，调度器处于 Idle 状态。
    ///
    /// # Returns
    /// 新会话 ID。
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let scheduler = RefreshScheduler::new(self.source.clone(), self.clock.clone(), self.period);
        self.sessions.insert(
            id.clone(),
            Session {
                scheduler: Arc::new(scheduler),
                last_access: Instant::now(),
            },
        );
        info!("Session {} created", id);
        id
    }

    /// 获取会话调度器，并刷新其最近访问时间。
    pub fn get(&self, id: &str) -> Option<Arc<RefreshScheduler>> {
        self.sessions.get_mut(id).map(|mut session| {
            session.last_access = Instant::now();
            session.scheduler.clone()
        })
    }

    /// # Summary
    /// 为会话选择证券。
    ///
    /// # Returns
    /// 会话不存在时返回 false。
    pub fn select(&self, id: &str, code: InstrumentCode) -> bool {
        match self.get(id) {
            Some(scheduler) => scheduler.select_instrument(code),
            None => false,
        }
    }

    /// # Summary
    /// 移除并销毁会话。
    ///
    /// # Returns
    /// 会话存在时返回 true。
    pub fn remove(&self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some((_, session)) => {
                session.scheduler.shutdown();
                info!("Session {} disposed", id);
                true
            }
            None => false,
        }
    }

    /// # Summary
    /// 回收闲置超时的会话。
    ///
    /// # Logic
    /// 先收集候选，再以 `remove_if` 复核，避免误删刚被访问的会话。
    ///
    /// # Returns
    /// 被回收的会话数。
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let is_idle = |session: &Session| now.duration_since(session.last_access) >= self.idle_ttl;
        let candidates: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| is_idle(e.value()))
            .map(|e| e.key().clone())
            .collect();

        let mut evicted = 0;
        for id in candidates {
            if let Some((_, session)) = self.sessions.remove_if(&id, |_, s| is_idle(s)) {
                session.scheduler.shutdown();
                info!("Session {} expired after {:?} idle", id, self.idle_ttl);
                evicted += 1;
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 销毁全部会话并停止清扫，进程退出前调用。
    pub fn shutdown_all(&self) {
        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.remove(&id);
        }
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

/// 周期性回收闲置会话；注册表释放后退出。
async fn sweep_idle(registry: Weak<SessionRegistry>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(registry) = registry.upgrade() else {
            break;
        };
        registry.evict_idle();
    }
}
