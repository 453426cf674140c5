//! Router tests driven through `tower::ServiceExt::oneshot`.

use aicp_core::{AccessContext, ServerConfig};
use aicp_runtime::{
    GenerationRequest, NumericSummarizer, QueryExecutor, QueryPipeline, QueryResult, SqlGenerator,
    StaticAccessResolver,
};
use aicp_server::{AppState, HealthCheck, create_router};
use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

/// Treats the question as the generated SQL.
struct EchoGenerator;

#[async_trait]
impl SqlGenerator for EchoGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> anyhow::Result<String> {
        Ok(request.question.to_string())
    }
}

#[derive(Default)]
struct CountingExecutor {
    calls: AtomicUsize,
}

#[async_trait]
impl QueryExecutor for CountingExecutor {
    async fn execute(&self, _sql: &str, _row_cap: usize) -> anyhow::Result<QueryResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(QueryResult::new(
            vec!["patient_count".to_string()],
            vec![vec![json!(3)]],
        ))
    }
}

struct Healthy(bool);

#[async_trait]
impl HealthCheck for Healthy {
    async fn database_ok(&self) -> bool {
        self.0
    }
}

fn app_with(executor: Arc<CountingExecutor>, server: ServerConfig, healthy: bool) -> Router {
    let pipeline = QueryPipeline::new(
        Arc::new(EchoGenerator),
        executor,
        "Table dbo.patients(id integer, family_dr_id integer, pharmacy_id integer)",
    )
    .with_summarizer(Arc::new(NumericSummarizer));
    let resolver = StaticAccessResolver::new()
        .with_user("doc-key", AccessContext::doctor(1, "Dr Five", 5))
        .with_user("pharm-key", AccessContext::pharmacy(2, "Corner Pharmacy", 2))
        .with_user(
            "broken-key",
            AccessContext {
                pharmacy_id: None,
                ..AccessContext::pharmacy(3, "No Scope", 0)
            },
        );
    create_router(AppState::new(
        Arc::new(pipeline),
        Arc::new(resolver),
        Arc::new(Healthy(healthy)),
        server,
    ))
}

fn app() -> Router {
    app_with(Arc::default(), ServerConfig::default(), true)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, key: &str) -> String {
    let (status, body) = send(app, post_json("/api/auth/login", None, json!({ "api_key": key }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_checks() {
    let (status, body) = send(&app(), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let down = app_with(Arc::default(), ServerConfig::default(), false);
    let (status, body) = send(&down, get("/health", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["database"], false);
}

#[tokio::test]
async fn login_validates_keys() {
    let app = app();

    let (status, body) = send(&app, post_json("/api/auth/login", None, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "api_key is required");

    let (status, _) = send(&app, post_json("/api/auth/login", None, json!({ "api_key": "nope" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, post_json("/api/auth/login", None, json!({ "api_key": "broken-key" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("pharmacy_id"));

    let (status, body) = send(&app, post_json("/api/auth/login", None, json!({ "api_key": "pharm-key" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "pharmacy");
    assert_eq!(body["policy"]["role"], "pharmacy");
    assert!(body["policy"]["scope_filter_hint"].as_str().unwrap().contains("pharmacy_id = 2"));
}

#[tokio::test]
async fn doctor_query_returns_rows() {
    let executor = Arc::new(CountingExecutor::default());
    let app = app_with(executor.clone(), ServerConfig::default(), true);
    let token = login(&app, "doc-key").await;

    let sql = "SELECT COUNT(*) as patient_count FROM dbo.patients WHERE family_dr_id = 5";
    let (status, body) = send(&app, post_json("/api/query", Some(&token), json!({ "question": sql }))).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["row_count"], 1);
    assert_eq!(body["truncated"], false);
    assert_eq!(body["columns"], json!(["patient_count"]));
    assert_eq!(body["data"], json!([{ "patient_count": 3 }]));
    assert_eq!(body["sql"], sql);
    assert!(body["analysis"]["numeric_summary"].as_str().unwrap().contains("patient_count"));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pharmacy_query_without_filter_is_forbidden() {
    let executor = Arc::new(CountingExecutor::default());
    let app = app_with(executor.clone(), ServerConfig::default(), true);
    let token = login(&app, "pharm-key").await;

    let (status, body) = send(
        &app,
        post_json("/api/query", Some(&token), json!({ "question": "SELECT COUNT(*) FROM dbo.patients" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Query validation failed");
    assert_eq!(body["reason"], "missing_scope_filter");
    assert_eq!(body["stage"], "scope_checking");
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sql_can_be_omitted_and_question_is_required() {
    let app = app();
    let token = login(&app, "doc-key").await;

    let (status, body) = send(&app, post_json("/api/query", Some(&token), json!({ "question": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "question is required");

    let (status, body) = send(
        &app,
        post_json(
            "/api/query",
            Some(&token),
            json!({ "question": "SELECT name FROM dbo.drugs", "include_sql": false, "max_rows": -3 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("sql").is_none());
}

#[tokio::test]
async fn protected_routes_need_a_live_session() {
    let app = app();

    let (status, body) = send(&app, get("/api/schema", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication token is missing");

    let token = login(&app, "doc-key").await;
    let (status, body) = send(&app, get("/api/schema", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "doctor");
    assert!(body["schema"].as_str().unwrap().starts_with("Table dbo.patients"));

    let (status, body) = send(&app, get("/api/user/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["doctor_id"], 5);

    let (status, _) = send(&app, post_json("/api/auth/logout", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/api/schema", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Session not found. Please login again.");
}

#[tokio::test]
async fn sessions_listing_is_opt_in() {
    let (status, _) = send(&app(), get("/api/sessions", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let exposed = app_with(
        Arc::default(),
        ServerConfig {
            expose_sessions: true,
            ..ServerConfig::default()
        },
        true,
    );
    login(&exposed, "doc-key").await;
    let (status, body) = send(&exposed, get("/api/sessions", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_sessions"], 1);
    assert_eq!(body["sessions"][0]["role"], "doctor");
}

#[tokio::test]
async fn unknown_routes_are_json_404() {
    let (status, body) = send(&app(), get("/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Endpoint not found");
}
