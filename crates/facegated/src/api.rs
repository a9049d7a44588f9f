//! HTTP surface of the gateway.

use crate::error::{ApiError, ApiResult};
use crate::service::{self, EnrollOutcome, RecognitionReport};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, Deserialize)]
pub struct AddFaceRequest {
    pub name: String,
    /// Base64-encoded image bytes.
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteFaceRequest {
    pub name: String,
}

/// Build the router with all routes.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/recognize", post(recognize))
        .route("/admin/add_face", post(add_face))
        .route("/admin/delete_face", post(delete_face))
        .route("/admin/known_faces", get(known_faces))
        .route("/status", get(status))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn recognize(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<RecognitionReport>> {
    if body.is_empty() {
        return Err(ApiError::Decode("empty request body".into()));
    }
    Ok(Json(service::recognize(&state, body.to_vec()).await?))
}

async fn add_face(
    State(state): State<AppState>,
    Json(req): Json<AddFaceRequest>,
) -> ApiResult<Json<Value>> {
    let image = base64::engine::general_purpose::STANDARD
        .decode(req.image.trim())
        .map_err(|e| ApiError::InvalidRequest(format!("image is not valid base64: {e}")))?;

    let body = match service::add_identity(&state, req.name.clone(), image).await? {
        EnrollOutcome::Enrolled { count } => json!({
            "status": "success",
            "name": req.name.trim(),
            "count": count,
        }),
        EnrollOutcome::NoFaceFound { count } => json!({
            "status": "no_face_found",
            "message": "no face found in image; try a clearer photo",
            "count": count,
        }),
    };
    Ok(Json(body))
}

async fn delete_face(
    State(state): State<AppState>,
    Json(req): Json<DeleteFaceRequest>,
) -> ApiResult<Json<Value>> {
    let removed = service::delete_identity(&state, req.name.clone()).await?;
    let count = state.known_names()?.len();
    Ok(Json(json!({
        "status": "success",
        "name": req.name,
        "removed": removed,
        "count": count,
    })))
}

async fn known_faces(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let names = state.known_names()?;
    Ok(Json(json!({
        "count": names.len(),
        "names": names,
    })))
}

async fn status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "identities": state.known_names()?.len(),
        "threshold": state.threshold,
        "engineWorkers": state.engine.workers(),
        "deviceConfigured": state.device_addr.is_some(),
    })))
}
