//! HTTP surface: submission and retrieval endpoints.
//!
//! Submission validates kind-specific payload fields synchronously and
//! returns a job id; results are polled from the retrieval endpoint.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::engine::job::{JobClass, JobKind, JobOutcome, ResultPayload};
use crate::engine::{JobEngine, JobStatus};
use crate::error::SubmissionError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<JobEngine>,
}

/// Build the router over a constructed engine.
pub fn routes(engine: Arc<JobEngine>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/media/remove-person", post(submit_remove_person))
        .route("/api/v1/media/scene-blend", post(submit_scene_blend))
        .route("/api/v1/media/generate-image", post(submit_generate_image))
        .route("/api/v1/media/recommend-music", post(submit_recommend_music))
        .route("/api/v1/jobs/{id}", get(get_job))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "windowscape"
    }))
}

// ── Submission ──────────────────────────────────────────────────────────

async fn submit_remove_person(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    if let Err(resp) = check_media_fields(&payload) {
        return resp;
    }
    accept(&state, JobClass::Normal, JobKind::RemovePerson, payload).await
}

async fn submit_scene_blend(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    if let Err(resp) = check_media_fields(&payload) {
        return resp;
    }
    if let Some(scene) = payload.get("sceneType")
        && !scene.is_string()
    {
        return reject(SubmissionError::InvalidField {
            field: "sceneType",
            reason: "must be a string".to_string(),
        });
    }
    accept(&state, JobClass::Normal, JobKind::SceneBlend, payload).await
}

async fn submit_generate_image(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    if let Err(resp) = check_str_field(&payload, "prompt") {
        return resp;
    }
    accept(&state, JobClass::Normal, JobKind::GenerateImage, payload).await
}

async fn submit_recommend_music(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    if let Err(resp) = check_str_field(&payload, "downloadUrl") {
        return resp;
    }
    accept(&state, JobClass::Priority, JobKind::RecommendMusic, payload).await
}

async fn accept(
    state: &AppState,
    class: JobClass,
    kind: JobKind,
    payload: serde_json::Value,
) -> Response {
    match state.engine.submit(class, kind, payload).await {
        Ok(id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "jobId": id })),
        )
            .into_response(),
        Err(e) => reject(e),
    }
}

/// Required fields shared by the image edit kinds.
fn check_media_fields(payload: &serde_json::Value) -> Result<(), Response> {
    for field in ["downloadUrl", "targetAIS3Key"] {
        check_str_field(payload, field)?;
    }
    match payload.get("mediaId") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(()),
        Some(serde_json::Value::Number(_)) => Ok(()),
        _ => Err(reject(SubmissionError::MissingField("mediaId"))),
    }
}

fn check_str_field(payload: &serde_json::Value, field: &'static str) -> Result<(), Response> {
    match payload.get(field).and_then(|v| v.as_str()) {
        Some(s) if !s.is_empty() => Ok(()),
        _ => Err(reject(SubmissionError::MissingField(field))),
    }
}

fn reject(err: SubmissionError) -> Response {
    tracing::debug!(error = %err, "Rejected submission");
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "success": false, "error": err.to_string() })),
    )
        .into_response()
}

// ── Retrieval ───────────────────────────────────────────────────────────

async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<Uuid>() else {
        return not_found();
    };

    match state.engine.lookup(id).await {
        JobStatus::Unknown => not_found(),
        JobStatus::Pending => Json(serde_json::json!({ "status": "pending" })).into_response(),
        JobStatus::Done(outcome) => render_outcome(outcome),
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "job not found" })),
    )
        .into_response()
}

/// A recorded failure is a structured payload, not a protocol error.
fn render_outcome(outcome: JobOutcome) -> Response {
    match outcome {
        JobOutcome::Success(ResultPayload::Json(result)) => Json(serde_json::json!({
            "status": "done",
            "result": result,
        }))
        .into_response(),
        JobOutcome::Success(ResultPayload::Stream {
            bytes,
            content_type,
        }) => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
        JobOutcome::Failure { message, detail } => {
            let mut body = serde_json::json!({
                "status": "done",
                "success": false,
                "error": message,
            });
            if let Some(detail) = detail {
                body["detail"] = serde_json::Value::String(detail);
            }
            Json(body).into_response()
        }
    }
}
