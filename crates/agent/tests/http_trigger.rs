//! HTTP trigger: routing, response shape, and background run execution.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tokio_util::task::TaskTracker;
use tower::ServiceExt;

use common::*;
use td_agent::api;
use td_agent::runtime::{self, RunLockMap, TriggerSource};
use td_agent::state::AppState;
use td_domain::config::{Config, TriggerConfig, TriggerMode};
use td_history::MemoryHistoryStore;

fn app_state(provider: Arc<ScriptedProvider>, store: Arc<MemoryHistoryStore>) -> AppState {
    app_state_with_tools(provider, store, email_registry(Arc::new(RecordingSink::default())))
}

fn app_state_with_tools(
    provider: Arc<ScriptedProvider>,
    store: Arc<MemoryHistoryStore>,
    tools: Arc<td_tools::ToolRegistry>,
) -> AppState {
    let mut config = Config::default();
    config.trigger = TriggerConfig {
        mode: TriggerMode::Fixed,
        fixed_text: "SEND_MORNING".into(),
        ..TriggerConfig::default()
    };
    let trigger = TriggerSource::from_config(&config.trigger, &config.agent).unwrap();

    AppState {
        config: Arc::new(config),
        driver: Arc::new(driver(provider, store, tools, 25)),
        trigger: Arc::new(trigger),
        run_locks: Arc::new(RunLockMap::new()),
        runs: TaskTracker::new(),
    }
}

async fn get_json(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let app = api::router(state).with_state(state.clone());
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn wait_for_records(store: &MemoryHistoryStore, n: usize) {
    for _ in 0..200 {
        if store.records().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {n} records, found {}", store.records().len());
}

#[tokio::test]
async fn health_reports_ok() {
    let state = app_state(ScriptedProvider::new(vec![]), Arc::new(MemoryHistoryStore::new("mem")));
    let (status, body) = get_json(&state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let state = app_state(ScriptedProvider::new(vec![]), Arc::new(MemoryHistoryStore::new("mem")));
    let app = api::router(&state).with_state(state.clone());
    let response = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn trigger_answers_working_and_runs_in_background() {
    let store = Arc::new(MemoryHistoryStore::new("mem"));
    let provider = ScriptedProvider::new(vec![email_call("Morning", "Hello"), text("sent")]);
    let state = app_state(provider.clone(), store.clone());

    let (status, body) = get_json(&state, "/trigger").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "message": "Working" }));

    wait_for_records(&store, 4).await;
    let records = store.records();
    assert_eq!(records[0].turn, td_domain::record::Turn::User { text: "SEND_MORNING".into() });
    assert_eq!(records[3].kind(), "model");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn trigger_answers_working_even_when_the_run_fails() {
    let store = Arc::new(MemoryHistoryStore::new("mem"));
    let provider = ScriptedProvider::new(vec![Err(td_domain::error::Error::Http(
        "connection refused".into(),
    ))]);
    let state = app_state(provider.clone(), store.clone());

    let (status, body) = get_json(&state, "/trigger").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Working");

    wait_for_records(&store, 1).await;
    for _ in 0..200 {
        if provider.calls() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(provider.calls(), 1);
    assert_eq!(store.records().len(), 1);
}

#[tokio::test]
async fn run_once_uses_the_configured_trigger_text() {
    let store = Arc::new(MemoryHistoryStore::new("mem"));
    let state = app_state(ScriptedProvider::new(vec![text("good morning")]), store.clone());

    let outcome = runtime::run_once(&state, None).await.unwrap();
    assert_eq!(outcome.reply, "good morning");
    assert_eq!(store.records()[0].turn, td_domain::record::Turn::User { text: "SEND_MORNING".into() });
}

#[tokio::test]
async fn run_once_message_overrides_the_trigger() {
    let store = Arc::new(MemoryHistoryStore::new("mem"));
    let state = app_state(ScriptedProvider::new(vec![text("noted")]), store.clone());

    runtime::run_once(&state, Some("remind me at noon".into())).await.unwrap();
    assert_eq!(
        store.records()[0].turn,
        td_domain::record::Turn::User { text: "remind me at noon".into() }
    );
}

#[tokio::test]
async fn runs_on_one_store_never_interleave() {
    let store = Arc::new(MemoryHistoryStore::new("mem"));
    let provider = ScriptedProvider::new(vec![
        email_call("A", "a"),
        text("first"),
        email_call("B", "b"),
        text("second"),
    ]);
    let state = app_state(provider, store.clone());

    let (a, b) = tokio::join!(
        runtime::run_once(&state, Some("one".into())),
        runtime::run_once(&state, Some("two".into())),
    );
    a.unwrap();
    b.unwrap();

    let kinds: Vec<&str> = store.records().iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "user", "function", "function_response", "model",
            "user", "function", "function_response", "model",
        ]
    );
    assert_paired(&store.records());
}

#[tokio::test]
async fn shutdown_waits_for_a_run_inside_a_slow_tool_call() {
    let store = Arc::new(MemoryHistoryStore::new("mem"));
    let provider = ScriptedProvider::new(vec![email_call("Morning", "Hello"), text("sent")]);
    let sink = SlowSink::new(Duration::from_millis(300));
    let state = app_state_with_tools(provider, store.clone(), email_registry(sink.clone()));

    let (status, _) = get_json(&state, "/trigger").await;
    assert_eq!(status, StatusCode::OK);

    // The run is now inside the tool call.
    wait_for_records(&store, 2).await;
    assert_eq!(store.records().len(), 2);

    runtime::drain_runs(&state).await;

    let records = store.records();
    let kinds: Vec<&str> = records.iter().map(|r| r.kind()).collect();
    assert_eq!(kinds, vec!["user", "function", "function_response", "model"]);
    assert_paired(&records);
    assert_eq!(sink.sent.lock().len(), 1);
}
