use quoteboard_core::common::IndexCodes;
use quoteboard_core::config::UpstreamConfig;
use quoteboard_core::feed::entity::FeedKind;
use quoteboard_core::feed::error::FeedError;
use quoteboard_core::feed::port::{FeedRequest, FeedTarget};

/// # Summary
/// 渲染完成的上游端点：路径 + 查询参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub query: Vec<(&'static str, String)>,
}

/// # Summary
/// 数据源目录，将每个 `FeedKind` 映射到固定的端点模板。
///
/// # Invariants
/// - 根地址不以 `/` 结尾。
#[derive(Debug, Clone)]
pub struct FeedCatalog {
    // stock.naver.com
    stock_base: String,
    // polling.finance.naver.com
    polling_base: String,
}

impl FeedCatalog {
    pub fn new(stock_base: &str, polling_base: &str) -> Self {
        Self {
            stock_base: stock_base.trim_end_matches('/').to_string(),
            polling_base: polling_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(&config.stock_base_url, &config.polling_base_url)
    }

    /// # Summary
    /// 将请求渲染为具体端点。
    ///
    /// # Logic
    /// 1. 指数数据源只接受指数代码集合，缺省时使用默认集合。
    /// 2. 其余数据源只接受单个证券代码，代码拼入路径或 `itemCodes` 参数。
    ///
    /// # Arguments
    /// * `request`: 请求描述。
    ///
    /// # Returns
    /// 成功返回端点，目标类型与数据源不匹配时返回 `FeedError::InvalidCode`。
    pub fn endpoint(&self, request: &FeedRequest) -> Result<Endpoint, FeedError> {
        let code = match (&request.target, request.kind) {
            (FeedTarget::Index(codes), FeedKind::MarketIndex) => {
                return Ok(self.index_endpoint(codes));
            }
            (FeedTarget::Instrument(_), FeedKind::MarketIndex) => {
                return Ok(self.index_endpoint(&IndexCodes::default()));
            }
            (FeedTarget::Instrument(code), _) => code.as_str(),
            (FeedTarget::Index(codes), kind) => {
                return Err(FeedError::InvalidCode(format!(
                    "{} expects a single instrument, got {}",
                    kind,
                    codes.joined()
                )));
            }
        };

        let stock = &self.stock_base;
        let detail = format!("{stock}/api/domestic/detail/{code}");
        let endpoint = match request.kind {
            FeedKind::QuoteBasic => Endpoint {
                url: format!("{stock}/api/polling/domestic/stock"),
                query: vec![("itemCodes", code.to_string())],
            },
            FeedKind::OrderBook => Endpoint {
                url: format!("{detail}/hoga"),
                query: vec![],
            },
            FeedKind::TickTrades => Endpoint {
                url: format!("{detail}/siseTick"),
                query: vec![("startIdx", "0".into()), ("pageSize", "20".into())],
            },
            FeedKind::TrendSeries => Endpoint {
                url: format!("{detail}/trend"),
                query: vec![
                    ("tradeType", "KRX".into()),
                    ("startIdx", "0".into()),
                    ("pageSize", "50".into()),
                ],
            },
            FeedKind::InvestorFlows => Endpoint {
                url: format!("{detail}/traderInfo"),
                query: vec![],
            },
            FeedKind::ExtendedHoursQuote => Endpoint {
                url: format!("{stock}/api/polling/domestic/NXT/stock"),
                query: vec![("itemCodes", code.to_string())],
            },
            FeedKind::RealtimeQuote => Endpoint {
                url: format!("{}/api/realtime/domestic/stock/{code}", self.polling_base),
                query: vec![],
            },
            FeedKind::MarketIndex => self.index_endpoint(&IndexCodes::default()),
        };
        Ok(endpoint)
    }

    fn index_endpoint(&self, codes: &IndexCodes) -> Endpoint {
        Endpoint {
            url: format!("{}/api/polling/domestic/index", self.stock_base),
            query: vec![("itemCodes", codes.joined())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quoteboard_core::common::InstrumentCode;

    fn catalog() -> FeedCatalog {
        FeedCatalog::new("https://stock.naver.com/", "https://polling.finance.naver.com")
    }

    fn samsung() -> InstrumentCode {
        InstrumentCode::parse("005930").unwrap()
    }

    #[test]
    fn test_every_kind_renders_for_an_instrument() {
        let catalog = catalog();
        for kind in FeedKind::ALL {
            let endpoint = catalog
                .endpoint(&FeedRequest::for_instrument(kind, &samsung()))
                .unwrap();
            assert!(endpoint.url.starts_with("https://"), "{kind}: {}", endpoint.url);
            assert!(!endpoint.url.contains("//api"), "{kind}: {}", endpoint.url);
        }
    }

    #[test]
    fn test_templates() {
        let catalog = catalog();
        let hoga = catalog
            .endpoint(&FeedRequest::for_instrument(FeedKind::OrderBook, &samsung()))
            .unwrap();
        assert_eq!(hoga.url, "https://stock.naver.com/api/domestic/detail/005930/hoga");
        assert!(hoga.query.is_empty());

        let trend = catalog
            .endpoint(&FeedRequest::for_instrument(FeedKind::TrendSeries, &samsung()))
            .unwrap();
        assert_eq!(trend.query[0], ("tradeType", "KRX".to_string()));

        let realtime = catalog
            .endpoint(&FeedRequest::for_instrument(FeedKind::RealtimeQuote, &samsung()))
            .unwrap();
        assert_eq!(
            realtime.url,
            "https://polling.finance.naver.com/api/realtime/domestic/stock/005930"
        );

        let index = catalog
            .endpoint(&FeedRequest::for_instrument(FeedKind::MarketIndex, &samsung()))
            .unwrap();
        assert_eq!(index.query, vec![("itemCodes", "KOSPI,KOSDAQ,KPI200".to_string())]);
    }

    #[test]
    fn test_custom_index_codes_and_mismatch() {
        let catalog = catalog();
        let codes = IndexCodes::parse("KOSPI").unwrap();
        let index = catalog.endpoint(&FeedRequest::index(codes.clone())).unwrap();
        assert_eq!(index.query, vec![("itemCodes", "KOSPI".to_string())]);

        let mismatched = FeedRequest {
            kind: FeedKind::OrderBook,
            target: FeedTarget::Index(codes),
        };
        assert!(matches!(
            catalog.endpoint(&mismatched),
            Err(FeedError::InvalidCode(_))
        ));
    }
}
