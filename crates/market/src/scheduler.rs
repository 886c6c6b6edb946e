use chrono::{DateTime, Utc};
use quoteboard_core::common::InstrumentCode;
use quoteboard_core::common::time::TimeProvider;
use quoteboard_core::feed::entity::Snapshot;
use quoteboard_core::market::entity::RefreshState;
use quoteboard_core::market::port::SnapshotSource;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// 默认刷新周期。
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(10);

const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(100);

/// # Summary
/// 调度器对外可见的状态视图。
#[derive(Debug, Clone)]
pub struct SchedulerView {
    pub state: RefreshState,
    // 当前选中的证券
    pub code: Option<InstrumentCode>,
    // 最近一次落定的快照
    pub snapshot: Option<Arc<Snapshot>>,
    // 最近一次落定时间
    pub settled_at: Option<DateTime<Utc>>,
    // 产生该视图的选择代次
    pub generation: u64,
}

impl Default for SchedulerView {
    fn default() -> Self {
        Self {
            state: RefreshState::Idle,
            code: None,
            snapshot: None,
            settled_at: None,
            generation: 0,
        }
    }
}

/// 调度器与其后台循环共享的状态。
struct Shared {
    generation: AtomicU64,
    view: watch::Sender<SchedulerView>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn mark_fetching(&self, generation: u64) {
        self.view.send_if_modified(|view| {
            if view.generation != generation || view.state == RefreshState::Fetching {
                return false;
            }
            view.state = RefreshState::Fetching;
            true
        });
    }

    /// 写入落定结果；代次已过期时丢弃并返回 false。
    fn settle(&self, generation: u64, snapshot: Snapshot, at: DateTime<Utc>) -> bool {
        self.view.send_if_modified(|view| {
            if view.generation != generation || !self.is_current(generation) {
                return false;
            }
            view.state = RefreshState::Settled;
            view.snapshot = Some(Arc::new(snapshot));
            view.settled_at = Some(at);
            true
        })
    }
}

/// # Summary
/// 单个 UI 会话的刷新调度器。
///
/// # Invariants
/// - 任一时刻至多一个后台循环在运行，循环内部的周期从不重叠。
/// - 每次选择递增代次，旧代次的结果即使晚到也不会被写入（后选者胜）。
/// - 切换证券时清空旧快照，同一证券重复选择时保留旧快照直至新结果落定。
/// - `shutdown` 之后不再发起任何聚合，析构时自动执行。
pub struct RefreshScheduler {
    // 快照来源
    source: Arc<dyn SnapshotSource>,
    // 落定时间来源
    clock: Arc<dyn TimeProvider>,
    // 刷新周期
    period: Duration,
    shared: Arc<Shared>,
    // 当前后台循环句柄
    task: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl RefreshScheduler {
    /// # Summary
    /// 创建处于 Idle 状态的调度器。
    ///
    /// # Arguments
    /// * `source`: 快照来源。
    /// * `clock`: 时钟。
    /// * `period`: 刷新周期，过小的值会被抬升到下限。
    ///
    /// # Returns
    /// 调度器实例。
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        clock: Arc<dyn TimeProvider>,
        period: Duration,
    ) -> Self {
        let (view, _) = watch::channel(SchedulerView::default());
        Self {
            source,
            clock,
            period: period.max(MIN_REFRESH_PERIOD),
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                view,
            }),
            task: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// # Summary
    /// 选择证券并立即开始一个聚合周期。
    ///
    /// # Logic
    /// 1. 递增代次，使在途周期的结果失效。
    /// 2. 中止旧的后台循环，挂起的定时也随之取消。
    /// 3. 视图切到 Fetching；证券变化时清空旧快照。
    /// 4. 启动新循环：立即执行一次，随后每个周期执行一次。
    ///
    /// # Arguments
    /// * `code`: 新选择的证券。
    ///
    /// # Returns
    /// 调度器已销毁时返回 false。
    pub fn select_instrument(&self, code: InstrumentCode) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            debug!("Ignoring selection of {} on a disposed scheduler", code);
            return false;
        }

        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = task.take() {
            previous.abort();
        }

        self.shared.view.send_modify(|view| {
            if view.code.as_ref() != Some(&code) {
                view.snapshot = None;
                view.settled_at = None;
            }
            view.code = Some(code.clone());
            view.state = RefreshState::Fetching;
            view.generation = generation;
        });
        info!("Refresh scheduler selected {} (generation {})", code, generation);

        *task = Some(tokio::spawn(run_cycles(
            self.shared.clone(),
            self.source.clone(),
            self.clock.clone(),
            self.period,
            code,
            generation,
        )));
        true
    }

    /// # Summary
    /// 销毁调度器：取消定时并使在途结果失效。
    ///
    /// # Logic
    /// 幂等；视图回到 Idle，保留最后一次落定的快照供读取。
    pub fn shutdown(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(handle) = task.take() {
            handle.abort();
        }
        self.shared.view.send_modify(|view| {
            view.state = RefreshState::Idle;
            view.generation = generation;
        });
        debug!("Refresh scheduler disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// 当前视图的拷贝。
    pub fn view(&self) -> SchedulerView {
        self.shared.view.borrow().clone()
    }

    /// 订阅视图变化。
    pub fn subscribe(&self) -> watch::Receiver<SchedulerView> {
        self.shared.view.subscribe()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// # Summary
/// 后台刷新循环。
///
/// # Logic
/// 1. `interval` 首个 tick 立即触发，之后按周期触发；前一周期未完成时顺延。
/// 2. 每次 tick 前确认代次仍然有效，否则退出。
/// 3. 构建快照后按代次写入，写入被拒绝说明已被新选择取代，退出循环。
async fn run_cycles(
    shared: Arc<Shared>,
    source: Arc<dyn SnapshotSource>,
    clock: Arc<dyn TimeProvider>,
    period: Duration,
    code: InstrumentCode,
    generation: u64,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !shared.is_current(generation) {
            break;
        }
        shared.mark_fetching(generation);

        let snapshot = source.build_snapshot(&code).await;
        if !shared.settle(generation, snapshot, clock.now()) {
            debug!("Discarding stale snapshot for {} (generation {})", code, generation);
            break;
        }
        debug!("Snapshot for {} settled (generation {})", code, generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quoteboard_core::common::time::RealTimeProvider;
    use quoteboard_core::feed::entity::FeedKind;
    use quoteboard_core::test_utils::ScriptedSnapshotSource;

    fn code(raw: &str) -> InstrumentCode {
        InstrumentCode::parse(raw).unwrap()
    }

    fn scheduler(source: Arc<ScriptedSnapshotSource>) -> RefreshScheduler {
        RefreshScheduler::new(source, Arc::new(RealTimeProvider), DEFAULT_REFRESH_PERIOD)
    }

    fn snapshot_code(view: &SchedulerView) -> Option<String> {
        view.snapshot.as_ref().and_then(|s| {
            s.get(FeedKind::QuoteBasic)
                .as_value()
                .and_then(|v| v["itemCode"].as_str().map(str::to_string))
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_to_fetching_to_settled() {
        let a = code("005930");
        let source = Arc::new(ScriptedSnapshotSource::new().with_delay(&a, Duration::from_millis(200)));
        let scheduler = scheduler(source.clone());
        assert_eq!(scheduler.view().state, RefreshState::Idle);

        assert!(scheduler.select_instrument(a.clone()));
        assert_eq!(scheduler.view().state, RefreshState::Fetching);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let view = scheduler.view();
        assert_eq!(view.state, RefreshState::Settled);
        assert_eq!(snapshot_code(&view).as_deref(), Some("005930"));
        assert!(view.settled_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_selected_wins() {
        let a = code("005930");
        let b = code("000270");
        let source = Arc::new(
            ScriptedSnapshotSource::new()
                .with_delay(&a, Duration::from_millis(500))
                .with_delay(&b, Duration::from_millis(50)),
        );
        let scheduler = scheduler(source.clone());

        scheduler.select_instrument(a.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        scheduler.select_instrument(b.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        let view = scheduler.view();
        assert_eq!(view.code, Some(b.clone()));
        assert_eq!(snapshot_code(&view).as_deref(), Some("000270"));
        assert_eq!(source.call_count(&a), 1);
        assert_eq!(source.call_count(&b), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_clears_snapshot_but_reselect_keeps_it() {
        let a = code("005930");
        let b = code("000270");
        let source = Arc::new(ScriptedSnapshotSource::new().with_delay(&b, Duration::from_millis(100)));
        let scheduler = scheduler(source.clone());

        scheduler.select_instrument(a.clone());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(scheduler.view().snapshot.is_some());

        scheduler.select_instrument(a.clone());
        assert!(scheduler.view().snapshot.is_some());

        scheduler.select_instrument(b.clone());
        let view = scheduler.view();
        assert_eq!(view.state, RefreshState::Fetching);
        assert!(view.snapshot.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_cycle_per_period() {
        let a = code("005930");
        let b = code("000270");
        let source = Arc::new(ScriptedSnapshotSource::new());
        let scheduler = scheduler(source.clone());

        scheduler.select_instrument(a.clone());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(source.call_count(&a), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.call_count(&a), 2);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(source.call_count(&a), 4);

        // 切换后旧证券不再刷新，新证券的周期重新计时
        tokio::time::sleep(Duration::from_secs(5)).await;
        scheduler.select_instrument(b.clone());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(source.call_count(&b), 1);

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(source.call_count(&b), 1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.call_count(&b), 2);
        assert_eq!(source.call_count(&a), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_in_flight_and_stops_timer() {
        let a = code("005930");
        let source = Arc::new(ScriptedSnapshotSource::new().with_delay(&a, Duration::from_millis(500)));
        let scheduler = scheduler(source.clone());

        scheduler.select_instrument(a.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.shutdown();

        tokio::time::sleep(Duration::from_secs(60)).await;
        let view = scheduler.view();
        assert_eq!(view.state, RefreshState::Idle);
        assert!(view.snapshot.is_none());
        assert_eq!(source.call_count(&a), 1);
        assert!(!scheduler.select_instrument(a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_timer() {
        let a = code("005930");
        let source = Arc::new(ScriptedSnapshotSource::new());
        {
            let scheduler = scheduler(source.clone());
            scheduler.select_instrument(a.clone());
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.call_count(&a), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_observe_settlement() {
        let a = code("005930");
        let source = Arc::new(ScriptedSnapshotSource::new());
        let scheduler = scheduler(source);
        let mut rx = scheduler.subscribe();

        scheduler.select_instrument(a);
        let settled = rx
            .wait_for(|view| view.state == RefreshState::Settled)
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot_code(&settled).as_deref(), Some("005930"));
    }
}
