use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use error_handling_rs::GENERIC_FAULT_DETAIL;
use feature_votes::store::{
    Feature, FeatureChanges, FeatureQuery, FeatureStore, InMemoryFeatureStore, NewFeature,
    StoreError, Vote,
};
use feature_votes::{create_router, AppState, RouterSettings};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const PROBLEM_JSON: &str = "application/problem+json";

const ALLOWED_ORIGIN: &str = "http://localhost:3000";

fn app_with(settings: RouterSettings) -> Router {
    let state = AppState::new(Arc::new(InMemoryFeatureStore::new()), "feature-votes-test");
    create_router(state, &settings)
}

/// Store whose every operation panics
struct BrokenStore;

fn store_down() -> ! {
    panic!("store connection lost")
}

#[async_trait::async_trait]
impl FeatureStore for BrokenStore {
    async fn list(&self, _query: FeatureQuery) -> Vec<Feature> {
        store_down()
    }

    async fn top(&self, _limit: usize) -> Vec<Feature> {
        store_down()
    }

    async fn get(&self, _id: u64) -> Result<Feature, StoreError> {
        store_down()
    }

    async fn create(&self, _feature: NewFeature) -> Feature {
        store_down()
    }

    async fn update(&self, _id: u64, _changes: FeatureChanges) -> Result<Feature, StoreError> {
        store_down()
    }

    async fn delete(&self, _id: u64) -> Result<(), StoreError> {
        store_down()
    }

    async fn record_vote(&self, _user_id: u64, _feature_id: u64, _value: i64) -> Result<Vote, StoreError> {
        store_down()
    }
}

fn app() -> Router {
    app_with(RouterSettings::default())
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn assert_hardened(&self) {
        assert_eq!(self.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(self.header("x-frame-options"), Some("DENY"));
        assert_eq!(self.header("referrer-policy"), Some("strict-origin-when-cross-origin"));
        assert!(self.header("content-security-policy").is_some());
        assert!(self.header("permissions-policy").is_some());
        let id = self.header("x-correlation-id").expect("correlation header");
        assert!(Uuid::parse_str(id).is_ok());
    }

    fn assert_problem(&self, status: StatusCode, category: &str) {
        assert_eq!(self.status, status, "body: {}", self.body);
        assert_eq!(self.header("content-type"), Some(PROBLEM_JSON));
        assert!(
            self.body["type"].as_str().unwrap().ends_with(category),
            "unexpected type {}",
            self.body["type"]
        );
        assert_eq!(self.body["status"], status.as_u16());
        assert_eq!(
            self.body["correlation_id"].as_str(),
            self.header("x-correlation-id")
        );
    }
}

async fn send_request(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    TestResponse { status, headers, body }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send_request(app, request).await
}

async fn create(app: &Router, title: &str) -> Value {
    let response = send(app, Method::POST, "/features", Some(json!({ "title": title }))).await;
    assert_eq!(response.status, StatusCode::CREATED);
    response.body
}

#[tokio::test]
async fn health_reports_service_and_hardening_headers() {
    let app = app();
    let response = send(&app, Method::GET, "/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["service"], "feature-votes-test");

    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    assert!(response.header("content-security-policy").is_some());
    assert!(response.header("strict-transport-security").is_none());

    let id = response.header("x-correlation-id").unwrap();
    assert!(Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn correlation_ids_are_fresh_per_request() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header("x-correlation-id", "client-chosen")
        .body(Body::empty())
        .unwrap();

    let first = send_request(&app, request).await;
    let second = send(&app, Method::GET, "/health", None).await;

    let first_id = first.header("x-correlation-id").unwrap();
    assert_ne!(first_id, "client-chosen");
    assert_ne!(Some(first_id), second.header("x-correlation-id"));
}

#[tokio::test]
async fn hsts_only_behind_https() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap();

    let response = send_request(&app, request).await;
    assert_eq!(
        response.header("strict-transport-security"),
        Some("max-age=31536000; includeSubDomains")
    );
}

#[tokio::test]
async fn feature_lifecycle() {
    let app = app();
    let created = send(
        &app,
        Method::POST,
        "/features",
        Some(json!({ "title": "Export to CSV", "link": "https://example.com/csv", "price_estimate": 250.0 })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["id"], 1);
    assert_eq!(created.body["votes"], 0);

    let fetched = send(&app, Method::GET, "/features/1", None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["title"], "Export to CSV");

    let updated = send(&app, Method::PUT, "/features/1", Some(json!({ "price_estimate": 300.0 }))).await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["title"], "Export to CSV");
    assert_eq!(updated.body["price_estimate"], 300.0);

    let deleted = send(&app, Method::DELETE, "/features/1", None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "feature deleted successfully");

    send(&app, Method::GET, "/features/1", None)
        .await
        .assert_problem(StatusCode::NOT_FOUND, "not_found");
}

#[tokio::test]
async fn list_filters_by_price_and_paginates() {
    let app = app();
    for (title, price) in [("cheap", 10.0), ("mid", 50.0), ("dear", 90.0)] {
        let response = send(
            &app,
            Method::POST,
            "/features",
            Some(json!({ "title": title, "price_estimate": price })),
        )
        .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let below = send(&app, Method::GET, "/features?price_lt=60", None).await;
    let titles: Vec<_> = below.body.as_array().unwrap().iter().map(|f| f["title"].clone()).collect();
    assert_eq!(titles, vec![json!("cheap"), json!("mid")]);

    let page = send(&app, Method::GET, "/features?skip=1&limit=1", None).await;
    assert_eq!(page.body.as_array().unwrap().len(), 1);
    assert_eq!(page.body[0]["title"], "mid");

    send(&app, Method::GET, "/features?limit=lots", None)
        .await
        .assert_problem(StatusCode::UNPROCESSABLE_ENTITY, "validation-error");
}

#[tokio::test]
async fn empty_title_is_a_validation_problem() {
    let app = app();
    let response = send(&app, Method::POST, "/features", Some(json!({ "title": "" }))).await;

    response.assert_problem(StatusCode::UNPROCESSABLE_ENTITY, "validation-error");
    response.assert_hardened();
    assert_eq!(response.body["title"], "Validation Failed");
    let detail = response.body["detail"].as_str().unwrap();
    assert!(detail.contains("validation"));
    assert!(detail.contains("title"));
    assert_eq!(response.body["instance"], "/features");
    assert!(Uuid::parse_str(response.body["correlation_id"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn malformed_body_is_a_validation_problem() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/features")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();

    let response = send_request(&app, request).await;
    response.assert_problem(StatusCode::UNPROCESSABLE_ENTITY, "validation-error");
    assert!(response.body["detail"].as_str().unwrap().contains("body"));
}

#[tokio::test]
async fn missing_feature_is_not_found() {
    let app = app();
    let response = send(&app, Method::GET, "/features/42", None).await;

    response.assert_problem(StatusCode::NOT_FOUND, "not_found");
    assert_eq!(response.body["title"], "API Error");
    assert_eq!(response.body["detail"], "Feature not found");
    assert_eq!(response.body["instance"], "/features/42");
}

#[tokio::test]
async fn second_vote_by_same_user_is_rejected() {
    let app = app();
    create(&app, "Keyboard shortcuts").await;

    let vote = send(&app, Method::POST, "/features/1/vote", Some(json!({ "user_id": 7 }))).await;
    assert_eq!(vote.status, StatusCode::OK);
    assert_eq!(vote.body["value"], 1);
    assert_eq!(vote.body["feature_id"], 1);

    send(&app, Method::POST, "/features/1/vote", Some(json!({ "user_id": 7, "value": -1 })))
        .await
        .assert_problem(StatusCode::BAD_REQUEST, "duplicate_vote");

    let feature = send(&app, Method::GET, "/features/1", None).await;
    assert_eq!(feature.body["votes"], 1);
}

#[tokio::test]
async fn vote_value_must_be_plus_or_minus_one() {
    let app = app();
    create(&app, "Offline mode").await;

    send(&app, Method::POST, "/features/1/vote", Some(json!({ "user_id": 1, "value": 3 })))
        .await
        .assert_problem(StatusCode::BAD_REQUEST, "invalid_vote_value");

    send(&app, Method::POST, "/features/9/vote", Some(json!({ "user_id": 1, "value": 1 })))
        .await
        .assert_problem(StatusCode::NOT_FOUND, "not_found");
}

#[tokio::test]
async fn top_orders_by_tally() {
    let app = app();
    create(&app, "first").await;
    create(&app, "second").await;
    create(&app, "third").await;

    for user_id in 1..=2 {
        let response = send(&app, Method::POST, "/features/3/vote", Some(json!({ "user_id": user_id }))).await;
        assert_eq!(response.status, StatusCode::OK);
    }
    let response = send(&app, Method::POST, "/features/1/vote", Some(json!({ "user_id": 1, "value": -1 }))).await;
    assert_eq!(response.status, StatusCode::OK);

    let top = send(&app, Method::GET, "/features/top?limit=2", None).await;
    let titles: Vec<_> = top.body.as_array().unwrap().iter().map(|f| f["title"].clone()).collect();
    assert_eq!(titles, vec![json!("third"), json!("second")]);
}

#[tokio::test]
async fn markup_in_responses_is_encoded() {
    let app = app();
    let created = create(&app, "<script>alert('x')</script>").await;

    let title = created["title"].as_str().unwrap();
    assert!(!title.contains('<'));
    assert_eq!(title, "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;");
}

#[tokio::test]
async fn unknown_route_is_a_problem() {
    let app = app();
    let response = send(&app, Method::GET, "/nope", None).await;

    response.assert_problem(StatusCode::NOT_FOUND, "not_found");
    assert_eq!(response.header("x-frame-options"), Some("DENY"));
}

#[tokio::test]
async fn wrong_method_becomes_http_error_problem() {
    let app = app();
    let response = send(&app, Method::DELETE, "/features", None).await;

    response.assert_problem(StatusCode::METHOD_NOT_ALLOWED, "http-error");
    assert_eq!(response.body["title"], "HTTP Error");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = app_with(RouterSettings {
        max_body_bytes: 64,
        ..RouterSettings::default()
    });
    let body = json!({ "title": "x".repeat(200) }).to_string();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/features")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();

    let response = send_request(&app, request).await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.header("content-type"), Some(PROBLEM_JSON));
}

#[tokio::test]
async fn recreated_feature_starts_without_votes() {
    let app = app();
    create(&app, "kept").await;
    create(&app, "dropped").await;

    let vote = send(&app, Method::POST, "/features/2/vote", Some(json!({ "user_id": 7 }))).await;
    assert_eq!(vote.status, StatusCode::OK);
    let deleted = send(&app, Method::DELETE, "/features/2", None).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let recreated = create(&app, "replacement").await;
    assert_eq!(recreated["id"], 2);
    assert_eq!(recreated["votes"], 0);

    let vote = send(&app, Method::POST, "/features/2/vote", Some(json!({ "user_id": 7 }))).await;
    assert_eq!(vote.status, StatusCode::OK, "body: {}", vote.body);
    let feature = send(&app, Method::GET, "/features/2", None).await;
    assert_eq!(feature.body["votes"], 1);
}

#[tokio::test]
async fn vote_beyond_tally_range_is_a_conflict() {
    let app = app();
    let created = send(
        &app,
        Method::POST,
        "/features",
        Some(json!({ "title": "maxed", "votes": i64::MAX })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);

    send(&app, Method::POST, "/features/1/vote", Some(json!({ "user_id": 1, "value": 1 })))
        .await
        .assert_problem(StatusCode::CONFLICT, "vote_tally_overflow");

    let feature = send(&app, Method::GET, "/features/1", None).await;
    assert_eq!(feature.body["votes"], i64::MAX);

    let vote = send(&app, Method::POST, "/features/1/vote", Some(json!({ "user_id": 1, "value": -1 }))).await;
    assert_eq!(vote.status, StatusCode::OK, "body: {}", vote.body);
}

#[tokio::test]
async fn cors_preflight_carries_pipeline_headers() {
    let app = app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/features")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = send_request(&app, request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("access-control-allow-origin"), Some(ALLOWED_ORIGIN));
    response.assert_hardened();
}

#[tokio::test]
async fn problem_responses_keep_cors_headers() {
    let app = app();
    let request = Request::builder()
        .uri("/features/42")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .body(Body::empty())
        .unwrap();

    let response = send_request(&app, request).await;
    response.assert_problem(StatusCode::NOT_FOUND, "not_found");
    assert_eq!(response.header("access-control-allow-origin"), Some(ALLOWED_ORIGIN));
}

#[tokio::test]
async fn handler_panic_becomes_internal_error() {
    let state = AppState::new(Arc::new(BrokenStore), "feature-votes-test");
    let app = create_router(state, &RouterSettings::default());

    let response = send(&app, Method::GET, "/features", None).await;

    response.assert_problem(StatusCode::INTERNAL_SERVER_ERROR, "internal-error");
    response.assert_hardened();
    assert_eq!(response.body["title"], "Internal Server Error");
    assert_eq!(response.body["detail"], GENERIC_FAULT_DETAIL);
    assert!(!response.body.to_string().contains("store connection lost"));
}
