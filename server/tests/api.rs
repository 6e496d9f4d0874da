use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use config::Config;
use errors::SourceFetchError;
use feed::{FetchOutcome, Item, Source, SourceClient};
use freshcve::AppState;
use freshcve::routes::create_router;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct NoopClient;

#[async_trait]
impl SourceClient for NoopClient {
    async fn fetch(&self, _source: &Source) -> Result<FetchOutcome, SourceFetchError> {
        Ok(FetchOutcome::default())
    }
}

fn item(id: &str) -> Item {
    Item {
        id: id.to_string(),
        source: "http://cve.circl.lu/api/last/2".to_string(),
        published: json!("2024-01-01"),
        references: json!(["http://x"]),
        description: json!({"text": id})
    }
}

fn state(config: Config) -> Arc<AppState> {
    Arc::new(AppState::with_client(config, Arc::new(NoopClient)).unwrap())
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_empty_snapshot_before_first_cycle() {
    let (status, body) = get(state(Config::default()), "/api/v1/cves").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_items_served_sorted_by_id() {
    let state = state(Config::default());
    state.cache.begin_cycle().unwrap();
    state
        .cache
        .append(vec![item("CVE-2024-2"), item("CVE-2024-1")])
        .unwrap();
    state.cache.end_cycle().unwrap();

    let (status, body) = get(state, "/api/v1/cves").await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], "CVE-2024-1");
    assert_eq!(items[1]["id"], "CVE-2024-2");
    assert_eq!(items[0]["description"], json!({"text": "CVE-2024-1"}));
    assert_eq!(items[0]["source"], "http://cve.circl.lu/api/last/2");
}

#[tokio::test]
async fn test_staged_items_not_served() {
    let state = state(Config::default());
    state.cache.begin_cycle().unwrap();
    state.cache.append(vec![item("CVE-2024-1")]).unwrap();
    state.cache.end_cycle().unwrap();

    state.cache.begin_cycle().unwrap();
    state.cache.append(vec![item("CVE-2024-9")]).unwrap();

    let (_, body) = get(Arc::clone(&state), "/api/v1/cves").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "CVE-2024-1");
}

#[tokio::test]
async fn test_custom_endpoint() {
    let mut config = Config::default();
    config.server.endpoint = "/cves".to_string();
    let state = state(config);

    let (status, _) = get(Arc::clone(&state), "/cves").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(state, "/api/v1/cves").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_snapshot() {
    let state = state(Config::default());
    let (status, body) = get(Arc::clone(&state), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "starting");
    assert_eq!(body["generation"], 0);
    assert_eq!(body["published_at"], Value::Null);

    state.scheduler.run_cycle().await.unwrap();

    let (_, body) = get(state, "/health").await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["generation"], 1);
    assert_eq!(body["items"], 0);
    assert!(body["published_at"].is_string());
    assert_eq!(body["last_cycle"]["published"], true);
}

#[tokio::test]
async fn test_metrics_unavailable_without_recorder() {
    let (status, body) = get(state(Config::default()), "/metrics").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "UNAVAILABLE");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let response = create_router(state(Config::default()))
        .oneshot(
            Request::builder()
                .uri("/api/v1/cves")
                .header(header::ORIGIN, "http://example.com")
                .body(Body::empty())
                .unwrap()
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
