//! facegate-core: Face identity matching engine.
//!
//! Extracts faces with SCRFD + ArcFace over ONNX Runtime, matches them
//! against a persistent store of named encodings by Euclidean distance.

pub mod alignment;
pub mod detector;
pub mod extractor;
pub mod recognizer;
pub mod store;
pub mod types;

use std::path::PathBuf;

pub use detector::FaceDetector;
pub use extractor::{decode_image, ExtractError, ExtractMode, FaceExtractor, ModelLoadError, OnnxExtractor};
pub use recognizer::{FaceRecognizer, ARCFACE_EMBEDDING_DIM};
pub use store::{EncodingStore, StoreError};
pub use types::{
    BoundingBox, DetectedFace, Embedding, EuclideanMatcher, FaceLocation, FrameVerdict, Identity,
    MatchLabel, MatchResult, Matcher, OverallType,
};

/// Default acceptance threshold in normalized embedding distance.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// `$XDG_DATA_HOME/facegate`, falling back to `~/.local/share/facegate`.
pub fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facegate")
}

/// Directory searched for `det_10g.onnx` and `w600k_r50.onnx`.
pub fn default_model_dir() -> PathBuf {
    default_data_dir().join("models")
}
