//! HTTP routes over scripted ports.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chatdb::agent::Agent;
use chatdb::config::AgentConfig;
use chatdb::server::{router, AppState};
use common::{school_schema, ScriptedDb, ScriptedModel};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(model: ScriptedModel, db: ScriptedDb) -> Router {
    let agent = Agent::new(Arc::new(model), Arc::new(db), AgentConfig::default());
    router(AppState {
        agent: Arc::new(agent),
    })
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = app(ScriptedModel::new(&[]), ScriptedDb::new(school_schema()));
    let (status, body) = send(app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_query_success() {
    let model = ScriptedModel::new(&["plan", "SELECT name FROM students;", "Three names."]);
    let app = app(model, ScriptedDb::new(school_schema()));

    let (status, body) = send(app, "POST", "/api/query", Some(json!({"question": "names?"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["sql"], "SELECT name FROM students;");
    assert_eq!(body["results"]["row_count"], 3);
    assert!(body.get("error").is_none());
    assert!(body["reasoning"].as_array().unwrap().len() >= 5);
}

#[tokio::test]
async fn test_reported_failure_is_ok_status() {
    let model = ScriptedModel::new(&["plan", "DELETE FROM students;"]);
    let app = app(model, ScriptedDb::new(school_schema()));

    let (status, body) = send(app, "POST", "/api/query", Some(json!({"question": "wipe"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["answer"].is_null());
    assert!(body.get("results").is_none());
    assert_eq!(body["error"], "Only read-only queries are allowed in readonly mode");
}

#[tokio::test]
async fn test_fatal_error_is_500() {
    let app = app(ScriptedModel::new(&[]), ScriptedDb::new(school_schema()));

    let (status, body) = send(app, "POST", "/api/query", Some(json!({"question": "names?"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("failed to generate plan"));
}

#[tokio::test]
async fn test_empty_question_rejected() {
    let app = app(ScriptedModel::new(&[]), ScriptedDb::new(school_schema()));
    let (status, body) = send(app, "POST", "/api/query", Some(json!({"question": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "question must not be empty");
}

#[tokio::test]
async fn test_schema_and_tables() {
    let model = ScriptedModel::new(&[]);
    let db = ScriptedDb::new(school_schema());
    let agent = Arc::new(Agent::new(Arc::new(model), Arc::new(db), AgentConfig::default()));
    let app = router(AppState { agent });

    let (status, body) = send(app.clone(), "GET", "/api/schema", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tables"].as_array().unwrap().len(), 2);
    assert!(body["summary"].as_str().unwrap().contains("Table: students (3 rows)"));

    let (_, body) = send(app.clone(), "GET", "/api/tables", None).await;
    assert_eq!(body["tables"], json!(["students", "schools"]));

    let (status, body) = send(app.clone(), "GET", "/api/tables/schools", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"][1]["name"], "city");

    let (status, body) = send(app.clone(), "GET", "/api/tables/teachers", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("teachers"));

    let (status, _) = send(app, "POST", "/api/schema/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_history_routes() {
    let model = ScriptedModel::new(&["plan", "SELECT name FROM students;", "Three names."]);
    let agent = Arc::new(Agent::new(
        Arc::new(model),
        Arc::new(ScriptedDb::new(school_schema())),
        AgentConfig::default(),
    ));
    let app = router(AppState { agent });

    send(app.clone(), "POST", "/api/query", Some(json!({"question": "names?"}))).await;

    let (_, body) = send(app.clone(), "GET", "/api/history", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["role"], "user");

    let (status, body) = send(app.clone(), "POST", "/api/history/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cleared");

    let (_, body) = send(app, "GET", "/api/history", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_schema_unavailable_is_500() {
    let app = app(ScriptedModel::new(&[]), ScriptedDb::unavailable());
    let (status, body) = send(app, "GET", "/api/tables", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Schema unavailable"));
}
