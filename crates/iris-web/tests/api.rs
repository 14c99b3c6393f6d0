//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use iris_common::EngineConfig;
use iris_ingestion::LlmClaimExtractor;
use iris_llm::backend::ScriptedBackend;
use iris_llm::LlmBackend;
use iris_synthesis::{InMemorySessionStore, JobRegistry, SynthesisEngine};
use iris_web::router::build_router;
use iris_web::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn scripted() -> ScriptedBackend {
    ScriptedBackend::new(|req| {
        let prompt = req.user_text();
        let reply = if prompt.contains("95%") {
            r#"{"text": "Method X achieves 95% accuracy", "confidence": 0.9, "methods": ["X"], "metrics": ["accuracy"]}"#
        } else if prompt.contains("94%") {
            r#"{"text": "Method X achieves 94% accuracy", "confidence": 0.85, "methods": ["X"], "metrics": ["accuracy"]}"#
        } else {
            "no claim here"
        };
        Ok(reply.to_string())
    })
}

fn app() -> (Router, Arc<SynthesisEngine>) {
    app_with(Arc::new(scripted()), EngineConfig::default(), Arc::new(InMemorySessionStore::new()))
}

fn app_with(
    backend: Arc<dyn LlmBackend>,
    config: EngineConfig,
    store: Arc<InMemorySessionStore>,
) -> (Router, Arc<SynthesisEngine>) {
    let extractor = Arc::new(LlmClaimExtractor::new(backend, config.extraction.clone()));
    let jobs = Arc::new(JobRegistry::new(&config.jobs));
    let engine = Arc::new(SynthesisEngine::new(store, extractor, config));
    let state = AppState::new(engine.clone(), jobs, "scripted");
    (build_router(state), engine)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send(app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

async fn wait_job(app: &Router, accepted: &Value) -> Value {
    let url = format!("{}?wait=true", accepted["status_url"].as_str().unwrap());
    let (status, body) = send(app, "GET", &url, None).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn analyze_text(app: &Router, session: &str, paper_id: &str, text: &str) -> Value {
    let (status, accepted) = send(
        app,
        "POST",
        "/api/analyze",
        Some(json!({ "session_id": session, "paper_id": paper_id, "text": text })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(accepted["status"], "pending");
    wait_job(app, &accepted).await
}

#[tokio::test]
async fn health_reports_model() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["llm_model"], "scripted");
}

#[tokio::test]
async fn session_lifecycle() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/api/sessions", Some(json!({ "user_id": "u1" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let session = body["session_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{session}/papers"),
        Some(json!({ "paper_id": "A", "title": "Paper A", "text": "Method X achieves 95% accuracy." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["paper_id"], "A");
    assert_eq!(body["analyzed"], false);

    let (status, body) = send(&app, "GET", &format!("/api/sessions/{session}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["papers"].as_array().unwrap().len(), 1);
    assert!(body["synthesis"].is_null());
}

#[tokio::test]
async fn unknown_session_is_404_with_error_body() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/api/sessions/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "not_found");
    assert!(body["error"]["message"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn analyze_then_synthesize_then_evaluate() {
    let (app, _) = app();
    let session = new_session(&app).await;

    let a = analyze_text(&app, &session, "A", "We show that Method X achieves 95% accuracy.").await;
    assert_eq!(a["status"], "completed");
    assert_eq!(a["subject"], "A");
    assert_eq!(a["result"]["claims"].as_array().unwrap().len(), 1);
    analyze_text(&app, &session, "B", "In our runs Method X achieves 94% accuracy.").await;

    let (status, accepted) = send(
        &app,
        "POST",
        "/api/synthesize",
        Some(json!({ "session_id": session, "paper_ids": ["A", "B"] })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let done = wait_job(&app, &accepted).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["result"]["consensus"].as_array().unwrap().len(), 1);

    let (status, report) = send(&app, "GET", &format!("/api/evaluation/{session}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["summary"]["total_papers"], 2);
    assert_eq!(report["synthesis"]["num_consensus"], 1);
}

#[tokio::test]
async fn reanalysis_with_new_text_keeps_title_and_replaces_claims() {
    let (app, engine) = app();
    let session = new_session(&app).await;
    let (_, accepted) = send(
        &app,
        "POST",
        "/api/analyze",
        Some(json!({ "session_id": session, "paper_id": "A", "title": "Paper A", "text": "Method X achieves 95% accuracy." })),
    )
    .await;
    wait_job(&app, &accepted).await;

    let done = analyze_text(&app, &session, "A", "Method X achieves 94% accuracy.").await;
    assert_eq!(done["status"], "completed");

    let paper = engine.get_paper(&session, "A").await.unwrap();
    assert_eq!(paper.title.as_deref(), Some("Paper A"));
    assert!(paper.text.contains("94%"));
    assert_eq!(paper.claims()[0].text, "Method X achieves 94% accuracy");
}

#[tokio::test]
async fn timed_out_reanalysis_keeps_previous_claims() {
    let store = Arc::new(InMemorySessionStore::new());
    let (fast_app, _) = app_with(Arc::new(scripted()), EngineConfig::default(), store.clone());
    let session = new_session(&fast_app).await;
    analyze_text(&fast_app, &session, "A", "Method X achieves 95% accuracy.").await;

    let mut config = EngineConfig::default();
    config.jobs.request_timeout_secs = 1;
    let slow = ScriptedBackend::always(r#"{"text": "late claim"}"#).with_delay(Duration::from_secs(5));
    let (app, engine) = app_with(Arc::new(slow), config, store);

    let (status, accepted) = send(
        &app,
        "POST",
        "/api/analyze",
        Some(json!({ "session_id": session, "paper_id": "A", "text": "Slow new text." })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let during = engine.get_paper(&session, "A").await.unwrap();
    assert!(during.is_analyzed());
    assert!(during.text.contains("95%"));

    let done = wait_job(&app, &accepted).await;
    assert_eq!(done["status"], "failed");
    assert_eq!(done["error"]["kind"], "timeout");

    let after = engine.get_paper(&session, "A").await.unwrap();
    assert!(after.is_analyzed());
    assert!(after.text.contains("95%"));
    assert_eq!(after.claims().len(), 1);
}

#[tokio::test]
async fn analyze_rejects_empty_text_immediately() {
    let (app, _) = app();
    let session = new_session(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/analyze",
        Some(json!({ "session_id": session, "paper_id": "A", "text": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");
}

#[tokio::test]
async fn analyze_unknown_session_is_404() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/analyze",
        Some(json!({ "session_id": "nope", "paper_id": "A", "text": "Method X achieves 95% accuracy." })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "not_found");
}

#[tokio::test]
async fn synthesize_single_paper_is_rejected_immediately() {
    let (app, _) = app();
    let session = new_session(&app).await;
    analyze_text(&app, &session, "A", "Method X achieves 95% accuracy.").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/synthesize",
        Some(json!({ "session_id": session, "paper_ids": ["A"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "insufficient_papers");
}

#[tokio::test]
async fn synthesize_unanalyzed_paper_is_rejected() {
    let (app, _) = app();
    let session = new_session(&app).await;
    analyze_text(&app, &session, "A", "Method X achieves 95% accuracy.").await;
    send(
        &app,
        "POST",
        &format!("/api/sessions/{session}/papers"),
        Some(json!({ "paper_id": "B", "text": "Method X achieves 94% accuracy." })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/synthesize",
        Some(json!({ "session_id": session, "paper_ids": ["A", "B"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "not_analyzed");
}

#[tokio::test]
async fn concurrent_synthesis_is_409() {
    let (app, engine) = app();
    let session = new_session(&app).await;
    analyze_text(&app, &session, "A", "Method X achieves 95% accuracy.").await;
    analyze_text(&app, &session, "B", "Method X achieves 94% accuracy.").await;

    let papers = vec!["A".to_string(), "B".to_string()];
    let _ticket = engine.reserve_synthesis(&session, &papers).await.unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/synthesize",
        Some(json!({ "session_id": session, "paper_ids": papers })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "conflict");
}

#[tokio::test]
async fn evaluation_without_analysis_returns_empty_report() {
    let (app, _) = app();
    let session = new_session(&app).await;

    let (status, body) = send(&app, "GET", &format!("/api/evaluation/{session}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "no_data");
    assert_eq!(body["report"]["session_id"], session.as_str());
    assert!(body["report"]["analyses"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn analyze_requires_paper_or_text() {
    let (app, _) = app();
    let session = new_session(&app).await;

    let (status, body) = send(&app, "POST", "/api/analyze", Some(json!({ "session_id": session }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");

    let (status, _) = send(
        &app,
        "POST",
        "/api/analyze",
        Some(json!({ "session_id": session, "paper_id": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn job_lookup_errors() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/api/jobs/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");

    let (status, _) = send(&app, "GET", &format!("/api/jobs/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_count_stage_calls() {
    let (app, _) = app();
    let session = new_session(&app).await;
    analyze_text(&app, &session, "A", "Method X achieves 95% accuracy.").await;

    let (status, body) = send(&app, "GET", "/api/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs_tracked"], 1);
    let stages = body["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 4);
    let analysis = stages.iter().find(|s| s["stage"] == "analysis").unwrap();
    assert_eq!(analysis["calls"], 1);
}
