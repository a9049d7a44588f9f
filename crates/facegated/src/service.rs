//! Recognition and admin flows, independent of HTTP framing.

use crate::debug;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use facegate_core::{
    EuclideanMatcher, ExtractMode, FaceLocation, FrameVerdict, MatchResult, Matcher, OverallType,
};
use serde::Serialize;

/// Verdict for one face, as reported to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceReport {
    #[serde(flatten)]
    pub result: MatchResult,
    pub location: FaceLocation,
}

/// Full outcome of one recognition request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionReport {
    #[serde(flatten)]
    pub verdict: FrameVerdict,
    pub per_face: Vec<FaceReport>,
    /// Whether the actuator acknowledged the command.
    pub dispatched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled { count: usize },
    NoFaceFound { count: usize },
}

/// image → faces → per-face match → frame verdict → dispatch.
pub async fn recognize(state: &AppState, image: Vec<u8>) -> ApiResult<RecognitionReport> {
    let debug_copy = state.debug_dir.as_ref().map(|_| image.clone());
    let faces = state.engine.extract(image, ExtractMode::All).await?;
    let gallery = state.snapshot()?;

    let per_face: Vec<FaceReport> = faces
        .iter()
        .map(|face| FaceReport {
            result: EuclideanMatcher.compare(&face.embedding, &gallery, state.threshold),
            location: face.location,
        })
        .collect();
    let verdict = FrameVerdict::aggregate(per_face.iter().map(|f| &f.result));

    match verdict.overall_type {
        OverallType::Known => {
            let names: Vec<&str> = per_face
                .iter()
                .filter_map(|f| f.result.identity_name.as_deref())
                .collect();
            tracing::info!(faces = verdict.faces_detected, ?names, "known face, access granted");
        }
        OverallType::Unknown => {
            tracing::warn!(faces = verdict.faces_detected, "unknown face, intruder");
        }
        OverallType::NoFace => {
            tracing::debug!("no face in frame");
        }
    }

    let dispatched = match (&state.device_addr, verdict.overall_type) {
        (_, OverallType::NoFace) | (None, _) => false,
        (Some(addr), overall) => state.dispatcher.dispatch(overall, addr).await,
    };

    if let (Some(dir), Some(bytes)) = (&state.debug_dir, debug_copy) {
        let marks = per_face.iter().map(|f| (f.location, f.result.is_known())).collect();
        debug::spawn_render(bytes, marks, dir.clone());
    }

    Ok(RecognitionReport {
        verdict,
        per_face,
        dispatched,
    })
}

/// Enroll the most prominent face in `image` under `name`.
///
/// An image without a usable face is not an error: the store is left alone
/// and the caller is told to retry with a clearer photo.
pub async fn add_identity(state: &AppState, name: String, image: Vec<u8>) -> ApiResult<EnrollOutcome> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::InvalidRequest("name must not be empty".into()));
    }

    let faces = state.engine.extract(image, ExtractMode::Single).await?;
    let Some(face) = faces.into_iter().next() else {
        let count = state.known_names()?.len();
        tracing::info!(name = %name, "no face found in enrollment image; store unchanged");
        return Ok(EnrollOutcome::NoFaceFound { count });
    };

    state
        .mutate_store(move |store| {
            store.append(&name, face.embedding)?;
            tracing::info!(name = %name, total = store.len(), "identity enrolled");
            Ok(EnrollOutcome::Enrolled { count: store.len() })
        })
        .await
}

/// Remove every identity called `name`. Returns the number removed.
pub async fn delete_identity(state: &AppState, name: String) -> ApiResult<usize> {
    let target = name.clone();
    let removed = state
        .mutate_store(move |store| Ok(store.delete_by_name(&target)?))
        .await?;

    if removed == 0 {
        return Err(ApiError::NotFound(format!("identity '{name}'")));
    }
    tracing::info!(name = %name, removed, "identity deleted");
    Ok(removed)
}
