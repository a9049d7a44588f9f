//! Image bytes → detected faces with embeddings.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{DetectedFace, FaceLocation};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has zero width or height")]
    EmptyImage,
}

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer: {0}")]
    Recognizer(#[from] RecognizerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Every face in the image.
    All,
    /// Only the most confident face (enrollment).
    Single,
}

/// Turns raw image bytes into zero or more faces.
///
/// Decoding failure is the only error. Detection or embedding problems
/// shrink the result instead, and a face without an embedding is never
/// returned. Implementations keep no state between calls; `&mut self` only
/// grants exclusive use of the underlying inference sessions.
pub trait FaceExtractor: Send {
    fn extract(&mut self, image: &[u8], mode: ExtractMode) -> Result<Vec<DetectedFace>, ExtractError>;
}

/// Decode image bytes into an RGB pixel grid.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ExtractError> {
    let image = image::load_from_memory(bytes)?.into_rgb8();
    if image.width() == 0 || image.height() == 0 {
        return Err(ExtractError::EmptyImage);
    }
    Ok(image)
}

/// SCRFD detection followed by ArcFace embedding.
pub struct OnnxExtractor {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxExtractor {
    pub fn load(scrfd_path: &Path, arcface_path: &Path) -> Result<Self, ModelLoadError> {
        Ok(Self {
            detector: FaceDetector::load(scrfd_path)?,
            recognizer: FaceRecognizer::load(arcface_path)?,
        })
    }
}

impl FaceExtractor for OnnxExtractor {
    fn extract(&mut self, image: &[u8], mode: ExtractMode) -> Result<Vec<DetectedFace>, ExtractError> {
        let image = decode_image(image)?;

        let mut boxes = match self.detector.detect(&image) {
            Ok(boxes) => boxes,
            Err(e) => {
                tracing::warn!(error = %e, "face detection failed; treating frame as empty");
                return Ok(Vec::new());
            }
        };
        if mode == ExtractMode::Single {
            boxes.truncate(1);
        }

        let mut faces = Vec::with_capacity(boxes.len());
        for bbox in &boxes {
            match self.recognizer.extract(&image, bbox) {
                Ok(embedding) => faces.push(DetectedFace {
                    location: FaceLocation::from_bbox(bbox, image.width(), image.height()),
                    embedding,
                }),
                Err(e) => {
                    tracing::debug!(error = %e, confidence = bbox.confidence, "dropping face without embedding");
                }
            }
        }

        tracing::debug!(
            detected = boxes.len(),
            embedded = faces.len(),
            width = image.width(),
            height = image.height(),
            "extraction complete"
        );

        Ok(faces)
    }
}
