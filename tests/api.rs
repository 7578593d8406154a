use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use page_extractor::app::{AppContext, Result};
use page_extractor::config::Config;
use page_extractor::domain::{FetchRequest, StrategyId};
use page_extractor::fetcher::{FetchBackend, FetchEscalator, RawPage};
use page_extractor::server::router;

type Responder = Box<dyn Fn(&str) -> RawPage + Send + Sync>;

struct StubBackend {
    id: StrategyId,
    respond: Responder,
}

impl StubBackend {
    fn new(id: StrategyId, respond: impl Fn(&str) -> RawPage + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            id,
            respond: Box::new(respond),
        })
    }
}

#[async_trait]
impl FetchBackend for StubBackend {
    fn id(&self) -> StrategyId {
        self.id
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch(&self, request: &FetchRequest, _budget: Duration) -> Result<RawPage> {
        Ok((self.respond)(&request.url))
    }
}

fn article(title: &str) -> String {
    let body = vec!["readable"; 120].join(" ");
    format!(
        "<html><head><title>{}</title><meta name=\"description\" content=\"about {}\">\
         <style>p {{ color: red }}</style></head><body><p>{}</p></body></html>",
        title, title, body
    )
}

fn captcha() -> String {
    "<html><head><title>Please verify you are human</title></head><body></body></html>".to_string()
}

fn app(backends: Vec<Arc<StubBackend>>) -> Router {
    let config = Config::default();
    let escalator = backends
        .into_iter()
        .fold(FetchEscalator::new(&config.escalation), |e, b| {
            e.with_backend(b)
        });
    router(Arc::new(AppContext::from_parts(config, escalator)))
}

fn default_app() -> Router {
    app(vec![
        StubBackend::new(StrategyId::Request, |url| {
            if url.contains("protected") {
                RawPage::Html(captcha())
            } else if url.contains("down") {
                RawPage::Failed("503:Service Unavailable".into())
            } else {
                RawPage::Html(article("Plain"))
            }
        }),
        StubBackend::new(StrategyId::Browser, |_| RawPage::Html(article("Rendered"))),
    ])
}

async fn post_extract(app: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/extract")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_ping() {
    let response = default_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "ping": "pong" }));
}

#[tokio::test]
async fn test_extract_single_url() {
    let (status, body) = post_extract(default_app(), json!({ "url": "https://example.com" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "success");
    assert!(body["time"].as_f64().unwrap() >= 0.0);

    let data = &body["data"];
    assert_eq!(data["url"], "https://example.com");
    assert_eq!(data["title"], "Plain");
    assert_eq!(data["description"], "about Plain");
    assert_eq!(data["adapter"], "request");
    assert_eq!(data["success"], true);
    assert_eq!(data["reason"], "");
    assert!(!data["html"].as_str().unwrap().contains("<style"));
}

#[tokio::test]
async fn test_extract_escalates_past_captcha() {
    let (status, body) = post_extract(
        default_app(),
        json!({ "url": "https://protected.example.com", "adapters": ["browser", "request"] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["adapter"], "browser");
    assert_eq!(body["data"]["title"], "Rendered");
}

#[tokio::test]
async fn test_extract_keeps_style_when_asked() {
    let (_, body) = post_extract(
        default_app(),
        json!({ "url": "https://example.com", "clean": { "style": false } }),
    )
    .await;

    assert!(body["data"]["html"].as_str().unwrap().contains("<style>"));
}

#[tokio::test]
async fn test_failed_extraction_reports_failed() {
    let (status, body) = post_extract(default_app(), json!({ "url": "https://down.example.com" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "failed");
    assert_eq!(body["data"]["success"], false);
    assert_eq!(body["data"]["reason"], "503:Service Unavailable");
}

#[tokio::test]
async fn test_batch_keeps_input_order() {
    let (status, body) = post_extract(
        default_app(),
        json!({ "urls": ["https://b.example.com", "https://down.example.com", "https://a.example.com"] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "failed");
    let urls: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["url"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://b.example.com",
            "https://down.example.com",
            "https://a.example.com"
        ]
    );
}

#[tokio::test]
async fn test_race_policy_per_request() {
    let (_, body) = post_extract(
        default_app(),
        json!({
            "url": "https://example.com",
            "adapters": ["request", "browser"],
            "policy": "race"
        }),
    )
    .await;

    // "Rendered" is the longer title
    assert_eq!(body["data"]["adapter"], "browser");
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let (status, body) = post_extract(default_app(), json!({ "xhr": true })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("url"));
}

#[tokio::test]
async fn test_unregistered_strategy_is_bad_request() {
    let (status, body) = post_extract(
        default_app(),
        json!({ "url": "https://example.com", "adapters": ["stealth"] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("stealth"));
}

#[tokio::test]
async fn test_unknown_adapter_name_is_rejected() {
    let (status, _) = post_extract(
        default_app(),
        json!({ "url": "https://example.com", "adapters": ["selenium"] }),
    )
    .await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_legacy_adapter_name_accepted() {
    let (status, body) = post_extract(
        default_app(),
        json!({ "url": "https://protected.example.com", "adapters": ["request", "playwright"] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["adapter"], "browser");
}
