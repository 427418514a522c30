//! HTTP request handlers for the front door.
//!
//! Submission is validated here and answered immediately with a job id;
//! the RPC to the worker runs in a background task that feeds its outcome
//! back into the job table. Pollers never wait on the worker.

use arcana_core::{JobStore, JobView, Mode, ReadingRequest, RpcClient, RpcResponse, WebConfig};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared state handed to every handler.
pub struct AppState {
    pub jobs: JobStore,
    pub rpc: RpcClient,
}

/// Incoming submission body. Every field defaults so validation, not
/// deserialization, decides what to reject.
#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub information: String,
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// POST /api/submit
///
/// Parses and validates the body, creates a pending job, spawns the RPC
/// task, and replies with the job id without waiting for the worker.
pub async fn handle_submit(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    // Parse by hand so a malformed body gets the same error shape as a
    // failed validation instead of a framework rejection page.
    let submit: SubmitBody = match serde_json::from_slice(&body) {
        Ok(submit) => submit,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": format!("invalid json: {}", e) })),
            );
        }
    };

    let request = match validate_submit(&submit) {
        Ok(request) => request,
        Err(message) => {
            debug!("Rejected submission: {}", message);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": message })),
            );
        }
    };

    let job_id = state.jobs.create(request);
    info!("Job {} accepted ({} queued)", job_id, state.jobs.len());

    tokio::spawn(run_job(state.clone(), job_id.clone()));

    (
        StatusCode::OK,
        Json(json!({ "ok": true, "job_id": job_id })),
    )
}

/// GET /api/job/:id
pub async fn handle_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.jobs.view(id.trim()) {
        Some(view) => (StatusCode::OK, Json(job_view_json(&view))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "ok": false, "error": "job not found" })),
        ),
    }
}

fn job_view_json(view: &JobView) -> serde_json::Value {
    serde_json::to_value(view).unwrap_or_else(|_| json!({ "ok": false, "error": "internal" }))
}

/// Check one submission against the mode list and length bounds.
///
/// Returns the trimmed wire request on success, or the rejection text the
/// client sees on failure.
pub fn validate_submit(submit: &SubmitBody) -> Result<ReadingRequest, String> {
    let request = ReadingRequest::new(
        submit.mode.as_str(),
        submit.question.as_str(),
        submit.information.as_str(),
    )
    .trimmed();

    if Mode::from_str(&request.mode).is_none() {
        return Err("mode must be one of: general/love/career/money".to_string());
    }
    if request.question.chars().count() < WebConfig::QUESTION_MIN_CHARS {
        return Err("question too short".to_string());
    }
    if request.question.chars().count() > WebConfig::QUESTION_MAX_CHARS
        || request.information.chars().count() > WebConfig::INFORMATION_MAX_CHARS
    {
        return Err("text too long".to_string());
    }

    Ok(request)
}

/// Background task for one job: drive the RPC and record the outcome.
///
/// Every exit path lands the job in `done`. An RPC error becomes a failure
/// result so pollers read the reason instead of polling forever.
pub async fn run_job(state: Arc<AppState>, job_id: String) {
    let Some(job) = state.jobs.get(&job_id) else {
        warn!("Job {} vanished before its task started", job_id);
        return;
    };

    if !state.jobs.transition_running(&job_id) {
        debug!("Job {} already left pending, skipping", job_id);
        return;
    }

    let result = match state.rpc.call(&job.payload).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Job {} RPC failed: {}", job_id, e);
            // Every synthesized failure carries the "rpc failed:" prefix,
            // whatever the underlying error variant.
            let text = e.to_string();
            if text.starts_with("rpc failed:") {
                RpcResponse::failure(text)
            } else {
                RpcResponse::failure(format!("rpc failed: {}", text))
            }
        }
    };

    if !state.jobs.complete(&job_id, result) {
        warn!("Job {} could not record its result", job_id);
        return;
    }
    info!("Job {} finished", job_id);
}
