//! Stand-in for the door controller: accepts the gateway's access commands
//! and logs what a real actuator would do.

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct FaceCommand {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Default)]
struct Counters {
    granted: AtomicU64,
    intruders: AtomicU64,
}

#[derive(Clone, Default)]
pub struct SimState {
    counters: Arc<Counters>,
}

pub fn router(state: SimState) -> Router {
    Router::new()
        .route("/face_command", get(face_command))
        .route("/status", get(status))
        .with_state(state)
}

pub async fn serve(bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(addr = bind, "device simulator listening");

    axum::serve(listener, router(SimState::default()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("device simulator error")
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn face_command(
    State(state): State<SimState>,
    Query(cmd): Query<FaceCommand>,
) -> (StatusCode, Json<Value>) {
    match cmd.kind.as_deref() {
        Some("known") => {
            state.counters.granted.fetch_add(1, Ordering::Relaxed);
            tracing::info!(at = %timestamp(), "known face: access granted");
            (StatusCode::OK, Json(json!({ "status": "success", "action": "access_granted" })))
        }
        Some("unknown") => {
            state.counters.intruders.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(at = %timestamp(), "unknown face: intruder alert");
            (StatusCode::OK, Json(json!({ "status": "success", "action": "intruder_alert" })))
        }
        other => {
            tracing::warn!(kind = ?other, "rejected face command");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "error", "error": "type must be 'known' or 'unknown'" })),
            )
        }
    }
}

async fn status(State(state): State<SimState>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "granted": state.counters.granted.load(Ordering::Relaxed),
        "intruders": state.counters.intruders.load(Ordering::Relaxed),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_known_and_unknown_commands() {
        let app = router(SimState::default());

        let (status, body) = get_json(&app, "/face_command?type=known").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "access_granted");

        let (_, body) = get_json(&app, "/face_command?type=unknown").await;
        assert_eq!(body["action"], "intruder_alert");
        let (_, _) = get_json(&app, "/face_command?type=unknown").await;

        let (status, body) = get_json(&app, "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "online");
        assert_eq!(body["granted"], 1);
        assert_eq!(body["intruders"], 2);
    }

    #[tokio::test]
    async fn test_bad_command_rejected() {
        let app = router(SimState::default());
        let (status, _) = get_json(&app, "/face_command?type=maybe").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get_json(&app, "/face_command").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = get_json(&app, "/status").await;
        assert_eq!(body["granted"], 0);
        assert_eq!(body["intruders"], 0);
    }
}
