use crate::common::InstrumentCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// # Summary
/// 上游数据源种类，封闭集合，不支持运行时注册。
///
/// # Invariants
/// - `ALL` 恰好包含全部 8 个变体，快照以此为键集。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    // 基础行情 (polling/stock)
    QuoteBasic,
    // 盘口 (hoga)
    OrderBook,
    // 逐笔成交 (siseTick)
    TickTrades,
    // 日线趋势 (trend)
    TrendSeries,
    // 投资者买卖动向 (traderInfo)
    InvestorFlows,
    // NXT 盘前盘后行情
    ExtendedHoursQuote,
    // 实时行情 (polling.finance)
    RealtimeQuote,
    // 市场指数 (KOSPI/KOSDAQ/KPI200)
    MarketIndex,
}

impl FeedKind {
    pub const ALL: [FeedKind; 8] = [
        FeedKind::QuoteBasic,
        FeedKind::OrderBook,
        FeedKind::TickTrades,
        FeedKind::TrendSeries,
        FeedKind::InvestorFlows,
        FeedKind::ExtendedHoursQuote,
        FeedKind::RealtimeQuote,
        FeedKind::MarketIndex,
    ];

    /// 对外代理路由使用的短名 (`/api/{slug}`)。
    pub fn slug(self) -> &'static str {
        match self {
            FeedKind::QuoteBasic => "stock",
            FeedKind::OrderBook => "hoga",
            FeedKind::TickTrades => "tick",
            FeedKind::TrendSeries => "trend",
            FeedKind::InvestorFlows => "trader",
            FeedKind::ExtendedHoursQuote => "nxt",
            FeedKind::RealtimeQuote => "realtime",
            FeedKind::MarketIndex => "index",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == slug)
    }

    /// 除指数外，所有数据源都以单个证券代码为参数。
    pub fn is_per_instrument(self) -> bool {
        !matches!(self, FeedKind::MarketIndex)
    }

    /// 响应体为 polling 行情结构（`datas` 记录容器或裸记录）的数据源。
    pub fn carries_quote(self) -> bool {
        matches!(
            self,
            FeedKind::QuoteBasic
                | FeedKind::ExtendedHoursQuote
                | FeedKind::RealtimeQuote
                | FeedKind::MarketIndex
        )
    }

    fn name(self) -> &'static str {
        match self {
            FeedKind::QuoteBasic => "quote-basic",
            FeedKind::OrderBook => "order-book",
            FeedKind::TickTrades => "tick-trades",
            FeedKind::TrendSeries => "trend-series",
            FeedKind::InvestorFlows => "investor-flows",
            FeedKind::ExtendedHoursQuote => "extended-hours-quote",
            FeedKind::RealtimeQuote => "realtime-quote",
            FeedKind::MarketIndex => "market-index",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == lower || k.slug() == lower)
            .ok_or_else(|| format!("Unknown FeedKind: {}", s))
    }
}

/// # Summary
/// 单个数据源的抓取结果。
///
/// # Invariants
/// - 失败统一编码为 `Unavailable`，不会以错误形式越过上游客户端边界。
/// - 序列化时 `Unavailable` 输出为 `null`，`Available` 原样输出上游 JSON。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeedResult {
    Available(Value),
    Unavailable,
}

static UNAVAILABLE: FeedResult = FeedResult::Unavailable;

impl FeedResult {
    pub fn is_available(&self) -> bool {
        matches!(self, FeedResult::Available(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FeedResult::Available(v) => Some(v),
            FeedResult::Unavailable => None,
        }
    }

    /// # Summary
    /// 按数据源种类给出强类型视图。
    ///
    /// # Logic
    /// 1. 行情类数据源尝试解析为 `QuoteEnvelope`。
    /// 2. 其余数据源保持原始 JSON 文档透传。
    ///
    /// # Arguments
    /// * `kind`: 该结果所属的数据源。
    ///
    /// # Returns
    /// 不可用或结构不符时返回 None。
    pub fn payload(&self, kind: FeedKind) -> Option<FeedPayload<'_>> {
        let value = self.as_value()?;
        if kind.carries_quote() {
            QuoteEnvelope::from_value(value).map(FeedPayload::Quote)
        } else {
            Some(FeedPayload::Document(value))
        }
    }
}

/// # Summary
/// 数据源载荷的强类型视图。
#[derive(Debug, Clone, PartialEq)]
pub enum FeedPayload<'a> {
    // polling 行情结构
    Quote(QuoteEnvelope),
    // 由前端自行渲染的原始文档（盘口、逐笔、趋势、投资者动向）
    Document(&'a Value),
}

/// # Summary
/// 一次聚合周期的合并结果。
///
/// # Invariants
/// - 每个 `FeedKind` 恰有一个条目，失败的数据源为 `Unavailable`，绝不缺键。
/// - 构造后不可变，新的刷新周期产生新的快照。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    // 快照对应的证券
    code: InstrumentCode,
    // 采集完成时间
    captured_at: DateTime<Utc>,
    // 按数据源种类排列的结果
    feeds: BTreeMap<FeedKind, FeedResult>,
}

impl Snapshot {
    /// # Summary
    /// 由各数据源结果组装快照。
    ///
    /// # Logic
    /// 1. 先以 `Unavailable` 填满全部种类。
    /// 2. 再用传入结果覆盖对应槽位，重复种类以后者为准。
    ///
    /// # Arguments
    /// * `code`: 证券代码。
    /// * `captured_at`: 采集时间。
    /// * `results`: 数据源结果迭代器，允许缺项。
    ///
    /// # Returns
    /// 键集完整的快照。
    pub fn assemble(
        code: InstrumentCode,
        captured_at: DateTime<Utc>,
        results: impl IntoIterator<Item = (FeedKind, FeedResult)>,
    ) -> Self {
        let mut feeds: BTreeMap<FeedKind, FeedResult> = FeedKind::ALL
            .into_iter()
            .map(|k| (k, FeedResult::Unavailable))
            .collect();
        feeds.extend(results);
        Self {
            code,
            captured_at,
            feeds,
        }
    }

    pub fn code(&self) -> &InstrumentCode {
        &self.code
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn get(&self, kind: FeedKind) -> &FeedResult {
        self.feeds.get(&kind).unwrap_or(&UNAVAILABLE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeedKind, &FeedResult)> {
        self.feeds.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.feeds.values().filter(|r| r.is_available()).count()
    }

    /// 忽略采集时间的结构相等比较。
    pub fn same_feeds(&self, other: &Snapshot) -> bool {
        self.code == other.code && self.feeds == other.feeds
    }

    /// 行情类数据源的强类型视图。
    pub fn quote(&self, kind: FeedKind) -> Option<QuoteEnvelope> {
        match self.get(kind).payload(kind)? {
            FeedPayload::Quote(envelope) => Some(envelope),
            FeedPayload::Document(_) => None,
        }
    }
}

/// # Summary
/// 宽松数值：上游以千分位字符串或数字下发价格与成交量。
///
/// # Invariants
/// - 反序列化永不失败，任意 JSON 都可落入某个变体。
/// - 取值时无法解析的内容一律视为 0。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl LooseNumber {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map(LooseNumber::Number).unwrap_or_default(),
            Value::String(s) => LooseNumber::Text(s.clone()),
            _ => LooseNumber::Missing,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            LooseNumber::Number(n) if n.is_finite() => *n,
            LooseNumber::Number(_) => 0.0,
            LooseNumber::Text(s) => parse_locale_number(s),
            LooseNumber::Missing => 0.0,
        }
    }
}

impl<'de> Deserialize<'de> for LooseNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(LooseNumber::from_value(&value))
    }
}

/// # Summary
/// 解析带千分位分隔符的数字字符串。
///
/// # Logic
/// 1. 去掉所有逗号与首尾空白。
/// 2. 解析为 f64，失败或非有限值返回 0。
///
/// # Arguments
/// * `raw`: 形如 `"1,234"` 的字符串。
///
/// # Returns
/// 解析出的数值，容错为 0。
pub fn parse_locale_number(raw: &str) -> f64 {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// # Summary
/// polling 行情记录，字段全部可选。
///
/// # Invariants
/// - 任意 JSON 对象都能解析成功，缺失或畸形字段退化为 None / 0。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub item_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub stock_name: Option<String>,
    pub close_price: LooseNumber,
    pub compare_to_previous_close_price: LooseNumber,
    pub fluctuations_ratio: LooseNumber,
    pub open_price: LooseNumber,
    pub high_price: LooseNumber,
    pub low_price: LooseNumber,
    pub accumulated_trading_volume: LooseNumber,
    pub accumulated_trading_value: LooseNumber,
}

impl QuoteRecord {
    /// 非对象值返回 None。
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        QuoteRecord::deserialize(value).ok()
    }
}

/// # Summary
/// polling 行情响应：可能是 `{ "datas": [...] }` 容器，也可能是裸记录。
///
/// # Invariants
/// - 仅当 `datas` 为数组时视为记录容器；`null` 或其他类型的 `datas` 按裸记录处理。
/// - 容器保持上游的位置顺序，非对象元素占位为 None，不会让后续记录前移。
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteEnvelope {
    // 根对象按记录解析的结果
    root: QuoteRecord,
    // `datas` 容器中的记录，按位置对齐
    records: Option<Vec<Option<QuoteRecord>>>,
}

impl QuoteEnvelope {
    /// # Summary
    /// 从原始 JSON 解析行情响应。
    ///
    /// # Logic
    /// 1. 非对象直接判定不可用。
    /// 2. `datas` 为数组时按记录容器处理，逐位解析。
    /// 3. 其余情况根对象本身即记录。
    ///
    /// # Arguments
    /// * `value`: 上游原始 JSON。
    ///
    /// # Returns
    /// 可解析时返回 QuoteEnvelope。
    pub fn from_value(value: &Value) -> Option<Self> {
        let root = QuoteRecord::from_value(value)?;
        let records = value
            .get("datas")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(QuoteRecord::from_value).collect());
        Some(Self { root, records })
    }

    /// 容器中的位置数（含无法解析的位置），裸记录为 0。
    pub fn record_count(&self) -> usize {
        self.records.as_ref().map_or(0, Vec::len)
    }

    /// 容器首位的记录；首位不是对象或容器为空时为 None。
    pub fn first_record(&self) -> Option<&QuoteRecord> {
        self.records.as_ref()?.first()?.as_ref()
    }

    pub fn is_wrapped(&self) -> bool {
        self.records.is_some()
    }

    /// 记录容器的首位，或未包装时的根对象。
    pub fn primary(&self) -> Option<&QuoteRecord> {
        match &self.records {
            Some(_) => self.first_record(),
            None => Some(&self.root),
        }
    }

    /// 根对象上的名称优先，其次是首条记录上的名称。
    pub fn display_name(&self) -> Option<&str> {
        self.root
            .stock_name
            .as_deref()
            .or_else(|| self.primary().and_then(|r| r.stock_name.as_deref()))
    }

    pub fn find(&self, item_code: &str) -> Option<&QuoteRecord> {
        self.records
            .iter()
            .flatten()
            .flatten()
            .find(|r| r.item_code.as_deref() == Some(item_code))
    }
}
