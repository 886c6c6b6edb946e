use quoteboard_core::common::known_name;
use quoteboard_core::feed::entity::{FeedKind, QuoteRecord, Snapshot};
use quoteboard_core::market::entity::{IndexQuote, ResolvedQuote};

/// 指数看板展示的指数代码。
pub const BOARD_INDICES: [&str; 2] = ["KOSPI", "KOSDAQ"];

/// # Summary
/// 从快照推导主行情。
///
/// # Logic
/// 1. NXT 数据源为记录容器且首位是可用记录时，以该记录为价格来源。
/// 2. 否则使用基础行情：记录容器取首条，裸记录取根对象。
/// 3. 两者都不可用时返回 None，由调用方展示加载态。
/// 4. 名称依次取基础行情内嵌名称、本地名称表、证券代码。
///
/// # Arguments
/// * `snapshot`: 最近一次落定的快照。
///
/// # Returns
/// 主行情或 None。
pub fn resolve_quote(snapshot: &Snapshot) -> Option<ResolvedQuote> {
    let basic = snapshot.quote(FeedKind::QuoteBasic);
    let extended = snapshot
        .quote(FeedKind::ExtendedHoursQuote)
        .and_then(|nxt| nxt.first_record().cloned());

    let (record, used_extended_hours) = match extended {
        Some(record) => (record, true),
        None => (basic.as_ref()?.primary()?.clone(), false),
    };

    let code = snapshot.code();
    let name = basic
        .as_ref()
        .and_then(|b| b.display_name())
        .or_else(|| known_name(code))
        .map(str::to_string)
        .unwrap_or_else(|| code.to_string());

    Some(build_quote(snapshot, name, &record, used_extended_hours))
}

fn build_quote(
    snapshot: &Snapshot,
    name: String,
    record: &QuoteRecord,
    used_extended_hours: bool,
) -> ResolvedQuote {
    let trading_value = record.accumulated_trading_value.value();
    ResolvedQuote {
        code: snapshot.code().clone(),
        name,
        last_price: record.close_price.value(),
        change: record.compare_to_previous_close_price.value(),
        change_ratio: record.fluctuations_ratio.value(),
        open: record.open_price.value(),
        high: record.high_price.value(),
        low: record.low_price.value(),
        volume: record.accumulated_trading_volume.value(),
        trading_value: (trading_value > 0.0).then_some(trading_value),
        used_extended_hours,
    }
}

/// # Summary
/// 从指数数据源提取 KOSPI 与 KOSDAQ 看板。
///
/// # Logic
/// 按 `itemCode` 在记录容器中查找，缺失的指数直接跳过。
///
/// # Arguments
/// * `snapshot`: 快照。
///
/// # Returns
/// 按看板顺序排列的指数列表，指数数据源不可用时为空。
pub fn resolve_indices(snapshot: &Snapshot) -> Vec<IndexQuote> {
    let Some(envelope) = snapshot.quote(FeedKind::MarketIndex) else {
        return Vec::new();
    };
    BOARD_INDICES
        .iter()
        .filter_map(|code| {
            envelope.find(code).map(|r| IndexQuote {
                code: (*code).to_string(),
                close: r.close_price.value(),
                change: r.compare_to_previous_close_price.value(),
                change_ratio: r.fluctuations_ratio.value(),
            })
        })
        .collect()
}
