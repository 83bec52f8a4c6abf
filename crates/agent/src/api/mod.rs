//! HTTP trigger surface.
//!
//! `GET {server.endpoint}` starts one run in the background and answers
//! immediately; `GET /health` is a liveness probe.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use td_domain::error::Error;

use crate::runtime;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(&state.config.server.endpoint, get(trigger))
        .route("/health", get(health))
}

pub async fn trigger(State(state): State<AppState>) -> Json<Value> {
    let runs = state.runs.clone();
    runs.spawn(async move {
        match runtime::run_once(&state, None).await {
            Ok(outcome) => tracing::info!(
                tool_rounds = outcome.tool_rounds,
                appended = outcome.appended,
                "triggered run finished"
            ),
            Err(Error::RunBusy { store }) => {
                tracing::warn!(store = %store, "trigger dropped, a run is already queued")
            }
            Err(e) => tracing::error!(error = %e, "triggered run failed"),
        }
    });
    Json(json!({ "message": "Working" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
