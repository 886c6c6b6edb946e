pub mod time;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::feed::error::FeedError;

/// # Summary
/// 上游证券代码，作为请求参数直接拼接进 URL 路径。
///
/// # Invariants
/// - 非空，且只包含 ASCII 字母与数字（例如 `005930`、`0126Z0`）。
/// - 构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentCode(String);

impl InstrumentCode {
    /// # Summary
    /// 校验并构造证券代码。
    ///
    /// # Logic
    /// 1. 去除首尾空白。
    /// 2. 拒绝空串及任何非字母数字字符，避免路径注入。
    ///
    /// # Arguments
    /// * `raw`: 原始输入。
    ///
    /// # Returns
    /// 合法时返回 InstrumentCode，否则返回 `FeedError::InvalidCode`。
    pub fn parse(raw: &str) -> Result<Self, FeedError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FeedError::InvalidCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for InstrumentCode {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InstrumentCode {
    type Error = FeedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InstrumentCode> for String {
    fn from(code: InstrumentCode) -> Self {
        code.0
    }
}

impl fmt::Display for InstrumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// # Summary
/// 指数行情请求使用的代码集合，上游以逗号拼接。
///
/// # Invariants
/// - 至少包含一个代码，每个代码均为字母数字。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCodes(Vec<String>);

/// 默认订阅的指数集合。
pub const DEFAULT_INDEX_CODES: [&str; 3] = ["KOSPI", "KOSDAQ", "KPI200"];

impl IndexCodes {
    /// # Summary
    /// 解析逗号分隔的指数代码串。
    ///
    /// # Logic
    /// 1. 按逗号切分并去除空白，忽略空段。
    /// 2. 任一段含非字母数字字符即判定非法。
    ///
    /// # Arguments
    /// * `raw`: 形如 `KOSPI,KOSDAQ` 的字符串。
    ///
    /// # Returns
    /// 成功返回 IndexCodes，失败返回 `FeedError::InvalidCode`。
    pub fn parse(raw: &str) -> Result<Self, FeedError> {
        let codes: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if codes.is_empty()
            || codes
                .iter()
                .any(|c| !c.chars().all(|ch| ch.is_ascii_alphanumeric()))
        {
            return Err(FeedError::InvalidCode(raw.to_string()));
        }
        Ok(Self(codes))
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    /// 以逗号拼接，作为上游 `itemCodes` 参数值。
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl Default for IndexCodes {
    fn default() -> Self {
        Self(DEFAULT_INDEX_CODES.iter().map(|s| s.to_string()).collect())
    }
}

/// 本地已知的证券名称表，同时作为默认自选列表。
pub const KNOWN_INSTRUMENTS: [(&str, &str); 11] = [
    ("하나금융지주", "086790"),
    ("SK텔레콤", "017670"),
    ("삼성전자", "005930"),
    ("포스코홀딩스", "005490"),
    ("현대차", "005380"),
    ("한국전력", "015760"),
    ("기아", "000270"),
    ("현대로템", "064350"),
    ("LS", "006260"),
    ("오리온", "271560"),
    ("한국항공우주", "047810"),
];

/// 按代码查找本地名称。
pub fn known_name(code: &InstrumentCode) -> Option<&'static str> {
    KNOWN_INSTRUMENTS
        .iter()
        .find(|(_, c)| *c == code.as_str())
        .map(|(name, _)| *name)
}
