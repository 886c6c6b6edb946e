use axum::Router;
use axum::extract::{Path, Query};
use axum::http::StatusCode as UpstreamStatus;
use axum::routing::get;
use quoteboard_api::server::{AppState, build_router};
use quoteboard_api::types::{
    ApiResponse, DashboardResponse, LoginRequest, LoginResponse, SessionCreatedResponse,
    SessionResponse, WatchlistEntryResponse,
};
use quoteboard_core::common::time::RealTimeProvider;
use quoteboard_core::config::{AppConfig, UpstreamConfig};
use quoteboard_core::market::entity::RefreshState;
use quoteboard_feed::NaverFeedClient;
use quoteboard_feed::naver::install_crypto_provider;
use quoteboard_market::{SessionRegistry, SnapshotAggregator};
use quoteboard_store::SqliteWatchlistStore;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn polling_stock(Query(params): Query<HashMap<String, String>>) -> (UpstreamStatus, String) {
    let code = params.get("itemCodes").cloned().unwrap_or_default();
    if code == "000000" {
        return (UpstreamStatus::BAD_GATEWAY, "upstream down".into());
    }
    let body = json!({
        "datas": [{
            "itemCode": code,
            "stockName": "삼성전자",
            "closePrice": "72,100",
            "compareToPreviousClosePrice": "-400",
            "fluctuationsRatio": "-0.55",
            "accumulatedTradingValue": "0"
        }]
    });
    (UpstreamStatus::OK, body.to_string())
}

async fn polling_nxt() -> axum::Json<Value> {
    axum::Json(json!({ "datas": [] }))
}

async fn polling_index(Query(params): Query<HashMap<String, String>>) -> axum::Json<Value> {
    let requested = params.get("itemCodes").cloned().unwrap_or_default();
    axum::Json(json!({
        "requested": requested,
        "datas": [
            {"itemCode": "KOSPI", "closePrice": "2,650.12", "compareToPreviousClosePrice": "12.5", "fluctuationsRatio": "0.47"},
            {"itemCode": "KOSDAQ", "closePrice": "870.55", "compareToPreviousClosePrice": "-3.20", "fluctuationsRatio": "-0.37"}
        ]
    }))
}

async fn detail_hoga(Path(code): Path<String>) -> axum::Json<Value> {
    axum::Json(json!({ "code": code, "asks": [{"price": "72,200"}] }))
}

async fn spawn_mock_upstream() -> anyhow::Result<String> {
    let app = Router::new()
        .route("/api/polling/domestic/stock", get(polling_stock))
        .route("/api/polling/domestic/NXT/stock", get(polling_nxt))
        .route("/api/polling/domestic/index", get(polling_index))
        .route("/api/domestic/detail/{code}/hoga", get(detail_hoga));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", addr))
}

struct TestServer {
    addr: String,
    client: reqwest::Client,
    _tmp_dir: tempfile::TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    async fn login(&self) -> anyhow::Result<String> {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&LoginRequest {
                username: "admin".into(),
                password: "admin".into(),
            })
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: ApiResponse<LoginResponse> = resp.json().await?;
        let data = body.data.ok_or_else(|| anyhow::anyhow!("missing token"))?;
        Ok(data.token)
    }
}

// 帮助函数：在随机端口启动测试服务器，上游指向本地模拟服务
async fn spawn_test_server() -> anyhow::Result<TestServer> {
    install_crypto_provider();
    let upstream = spawn_mock_upstream().await?;
    let tmp_dir = tempfile::tempdir()?;

    let mut config = AppConfig::default();
    config.upstream = UpstreamConfig {
        stock_base_url: upstream.clone(),
        polling_base_url: upstream,
        feed_timeout_ms: 2_000,
        ..UpstreamConfig::default()
    };
    config.server.jwt_secret = "test-secret".into();

    let clock = Arc::new(RealTimeProvider);
    let feed_client = Arc::new(NaverFeedClient::new(&config.upstream)?);
    let aggregator = Arc::new(SnapshotAggregator::new(
        feed_client.clone(),
        Duration::from_millis(config.upstream.feed_timeout_ms),
        clock.clone(),
    ));
    let sessions = SessionRegistry::new(
        aggregator.clone(),
        clock,
        Duration::from_secs(10),
        Duration::from_secs(300),
    );
    let watchlist = Arc::new(SqliteWatchlistStore::open(tmp_dir.path()).await?);

    let state = AppState::new(
        feed_client,
        aggregator,
        sessions,
        watchlist,
        Arc::new(config),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = format!("http://{}", listener.local_addr()?);
    let app = build_router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        addr,
        client: reqwest::Client::new(),
        _tmp_dir: tmp_dir,
    })
}

#[tokio::test]
async fn test_proxy_contract() -> anyhow::Result<()> {
    let server = spawn_test_server().await?;

    // 1. 缺少代码
    let resp = server.client.get(server.url("/api/stock")).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await?;
    assert_eq!(body, json!({"error": "Code is required"}));

    // 2. 原样透传
    let resp = server
        .client
        .get(server.url("/api/hoga?code=005930"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body, json!({"code": "005930", "asks": [{"price": "72,200"}]}));

    // 3. 指数默认集合与自定义集合
    let body: Value = server
        .client
        .get(server.url("/api/index"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["requested"], "KOSPI,KOSDAQ,KPI200");
    let body: Value = server
        .client
        .get(server.url("/api/index?itemCodes=KOSPI"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["requested"], "KOSPI");

    // 4. 上游失败
    for path in ["/api/stock?code=000000", "/api/trader?code=005930"] {
        let resp = server.client.get(server.url(path)).send().await?;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", path);
        let body: Value = resp.json().await?;
        assert_eq!(body, json!({"error": "Failed to fetch data"}));
    }

    // 5. 未知数据源
    let resp = server.client.get(server.url("/api/unknown?code=005930")).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_dashboard_resolves_quote_and_exports_feeds() -> anyhow::Result<()> {
    let server = spawn_test_server().await?;

    let resp = server
        .client
        .get(server.url("/api/v1/dashboard/005930"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: ApiResponse<DashboardResponse> = resp.json().await?;
    let dashboard = body.data.ok_or_else(|| anyhow::anyhow!("missing data"))?;

    assert_eq!(dashboard.code, "005930");
    assert_eq!(dashboard.feeds.len(), 8);
    assert!(dashboard.feeds["trend-series"].is_null());
    assert!(!dashboard.feeds["order-book"].is_null());

    let quote = dashboard.quote.ok_or_else(|| anyhow::anyhow!("missing quote"))?;
    assert_eq!(quote.name, "삼성전자");
    assert_eq!(quote.last_price, 72100.0);
    assert!(!quote.used_extended_hours);
    assert_eq!(quote.trading_value, None);

    assert_eq!(dashboard.indices.len(), 2);
    assert_eq!(dashboard.indices[1].code, "KOSDAQ");

    let resp = server
        .client
        .get(server.url("/api/v1/dashboard/bad%20code"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_login_gate() -> anyhow::Result<()> {
    let server = spawn_test_server().await?;

    let resp = server
        .client
        .post(server.url("/api/v1/auth/login"))
        .json(&LoginRequest {
            username: "admin".into(),
            password: "wrong".into(),
        })
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server.client.get(server.url("/api/v1/watchlist")).send().await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .client
        .post(server.url("/api/v1/sessions"))
        .bearer_auth("not-a-token")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_watchlist_workflow() -> anyhow::Result<()> {
    let server = spawn_test_server().await?;
    let token = server.login().await?;

    // 1. 默认列表
    let body: ApiResponse<Vec<WatchlistEntryResponse>> = server
        .client
        .get(server.url("/api/v1/watchlist"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    let entries = body.data.unwrap_or_default();
    assert_eq!(entries.len(), 11);
    assert_eq!(entries[0].name, "하나금융지주");

    // 2. 添加：名称为空被拒绝
    let resp = server
        .client
        .post(server.url("/api/v1/watchlist"))
        .bearer_auth(&token)
        .json(&json!({"name": " ", "code": "123456"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ApiResponse<Vec<WatchlistEntryResponse>> = server
        .client
        .post(server.url("/api/v1/watchlist"))
        .bearer_auth(&token)
        .json(&json!({"name": "My pick", "code": "123456"}))
        .send()
        .await?
        .json()
        .await?;
    let entries = body.data.unwrap_or_default();
    assert_eq!(entries.len(), 12);
    assert_eq!(entries[11].code, "123456");

    // 3. 删除同一代码的全部条目
    let body: ApiResponse<Vec<WatchlistEntryResponse>> = server
        .client
        .delete(server.url("/api/v1/watchlist/005930"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    let entries = body.data.unwrap_or_default();
    assert_eq!(entries.len(), 11);
    assert!(entries.iter().all(|e| e.code != "005930"));

    // 4. 持久化
    let body: ApiResponse<Vec<WatchlistEntryResponse>> = server
        .client
        .get(server.url("/api/v1/watchlist"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body.data.unwrap_or_default().len(), 11);
    Ok(())
}

#[tokio::test]
async fn test_session_workflow() -> anyhow::Result<()> {
    let server = spawn_test_server().await?;
    let token = server.login().await?;

    let body: ApiResponse<SessionCreatedResponse> = server
        .client
        .post(server.url("/api/v1/sessions"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    let id = body.data.ok_or_else(|| anyhow::anyhow!("missing id"))?.id;
    let session_url = server.url(&format!("/api/v1/sessions/{}", id));

    let body: ApiResponse<SessionResponse> = server
        .client
        .get(&session_url)
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    let view = body.data.ok_or_else(|| anyhow::anyhow!("missing view"))?;
    assert_eq!(view.state, RefreshState::Idle);

    let resp = server
        .client
        .put(format!("{}/instrument", session_url))
        .bearer_auth(&token)
        .json(&json!({"code": "005930"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // 等待首轮抓取落定
    let mut settled = None;
    for _ in 0..50 {
        let body: ApiResponse<SessionResponse> = server
            .client
            .get(&session_url)
            .bearer_auth(&token)
            .send()
            .await?
            .json()
            .await?;
        if let Some(view) = body.data.filter(|v| v.state == RefreshState::Settled) {
            settled = Some(view);
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let view = settled.ok_or_else(|| anyhow::anyhow!("session never settled"))?;
    assert_eq!(view.code.as_deref(), Some("005930"));
    assert!(view.settled_at.is_some());
    assert_eq!(view.quote.map(|q| q.last_price), Some(72100.0));
    assert_eq!(view.feeds.map(|f| f.len()), Some(8));

    let resp = server
        .client
        .delete(&session_url)
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server
        .client
        .get(&session_url)
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}
