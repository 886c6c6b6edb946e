use crate::common::InstrumentCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// # Summary
/// 涨跌方向，由较前收盘价的变动值决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PriceDirection {
    Rise,
    Fall,
    Flat,
}

impl PriceDirection {
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            PriceDirection::Rise
        } else if change < 0.0 {
            PriceDirection::Fall
        } else {
            PriceDirection::Flat
        }
    }
}

/// # Summary
/// 刷新调度器的状态。
///
/// # Invariants
/// - `Idle`：尚未选择证券或已销毁。
/// - `Fetching`：当前证券的一个聚合周期在途。
/// - `Settled`：最近一次周期已落定，快照可用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RefreshState {
    Idle,
    Fetching,
    Settled,
}

/// # Summary
/// 由快照推导出的主行情，不抓取、不持久化，每个新快照重新计算。
///
/// # Invariants
/// - 所有数值字段均已完成宽松解析，畸形输入已退化为 0。
/// - `trading_value` 仅在解析值严格大于 0 时为 Some。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuote {
    // 证券代码
    pub code: InstrumentCode,
    // 展示名称
    pub name: String,
    // 最新价
    pub last_price: f64,
    // 较前收盘变动
    pub change: f64,
    // 涨跌幅 (%)
    pub change_ratio: f64,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 累计成交量
    pub volume: f64,
    // 累计成交额，非正值不展示
    pub trading_value: Option<f64>,
    // 是否采用了 NXT 盘前盘后数据源
    pub used_extended_hours: bool,
}

impl ResolvedQuote {
    pub fn direction(&self) -> PriceDirection {
        PriceDirection::from_change(self.change)
    }

    pub fn is_trading_value_displayable(&self) -> bool {
        self.trading_value.is_some()
    }

    /// 以百万为单位、四舍五入后的成交额。
    pub fn trading_value_millions(&self) -> Option<f64> {
        self.trading_value.map(|v| (v / 1_000_000.0).round())
    }
}

/// # Summary
/// 指数看板中的单个指数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexQuote {
    // 指数代码 (KOSPI / KOSDAQ)
    pub code: String,
    pub close: f64,
    pub change: f64,
    pub change_ratio: f64,
}

impl IndexQuote {
    pub fn direction(&self) -> PriceDirection {
        PriceDirection::from_change(self.change)
    }
}
