use serde::{Deserialize, Serialize};

/// Raw detector output for one face, in source-image pixel space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face location in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceLocation {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceLocation {
    /// Convert a detector box to integer (top, right, bottom, left), clamped
    /// to an image of the given size.
    pub fn from_bbox(bbox: &BoundingBox, width: u32, height: u32) -> Self {
        let clamp = |v: f32, max: u32| -> u32 {
            if v.is_nan() {
                return 0;
            }
            v.round().clamp(0.0, max.saturating_sub(1) as f32) as u32
        };

        Self {
            top: clamp(bbox.y, height),
            right: clamp(bbox.x + bbox.width, width),
            bottom: clamp(bbox.y + bbox.height, height),
            left: clamp(bbox.x, width),
        }
    }
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance between two embeddings.
    ///
    /// Vectors of different length live in different spaces and are
    /// infinitely far apart.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return f32::INFINITY;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Return a unit-length copy. Zero vectors are returned unchanged.
    pub fn l2_normalized(mut self) -> Self {
        let norm: f32 = self.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in self.values.iter_mut() {
                *v /= norm;
            }
        }
        self
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// One enrolled person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub encoding: Embedding,
}

/// A face found in one image. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub location: FaceLocation,
    pub embedding: Embedding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLabel {
    Known,
    Unknown,
}

/// Verdict for one detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub label: MatchLabel,
    /// Set only when `label` is `Known`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_name: Option<String>,
    /// Distance to the closest enrolled encoding; `None` for an empty store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl MatchResult {
    pub fn unknown(distance: Option<f32>) -> Self {
        Self {
            label: MatchLabel::Unknown,
            identity_name: None,
            distance,
        }
    }

    pub fn is_known(&self) -> bool {
        self.label == MatchLabel::Known
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallType {
    NoFace,
    Known,
    Unknown,
}

impl OverallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallType::NoFace => "no_face",
            OverallType::Known => "known",
            OverallType::Unknown => "unknown",
        }
    }
}

/// Aggregate verdict for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameVerdict {
    pub faces_detected: usize,
    pub overall_type: OverallType,
}

impl FrameVerdict {
    /// `no_face` for zero faces, `known` if any face is known, else `unknown`.
    pub fn aggregate<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a MatchResult>,
    {
        let mut faces_detected = 0;
        let mut any_known = false;
        for result in results {
            faces_detected += 1;
            any_known |= result.is_known();
        }

        let overall_type = match (faces_detected, any_known) {
            (0, _) => OverallType::NoFace,
            (_, true) => OverallType::Known,
            (_, false) => OverallType::Unknown,
        };

        Self {
            faces_detected,
            overall_type,
        }
    }
}

/// Strategy for comparing a probe embedding against the enrolled identities.
pub trait Matcher {
    fn compare(&self, probe: &Embedding, gallery: &[Identity], threshold: f32) -> MatchResult;
}

/// Nearest-neighbour matcher over Euclidean distance.
///
/// Ties resolve to the earliest gallery entry, so the result depends only on
/// the probe and the gallery order.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(&self, probe: &Embedding, gallery: &[Identity], threshold: f32) -> MatchResult {
        let mut best: Option<(usize, f32)> = None;

        for (i, identity) in gallery.iter().enumerate() {
            let dist = probe.euclidean_distance(&identity.encoding);
            // Strict `<` keeps the first of equal distances.
            let closer = match best {
                None => !dist.is_nan(),
                Some((_, best_dist)) => dist < best_dist,
            };
            if closer {
                best = Some((i, dist));
            }
        }

        match best {
            Some((idx, dist)) if dist <= threshold => MatchResult {
                label: MatchLabel::Known,
                identity_name: Some(gallery[idx].name.clone()),
                distance: Some(dist),
            },
            Some((_, dist)) if dist.is_finite() => MatchResult::unknown(Some(dist)),
            _ => MatchResult::unknown(None),
        }
    }
}
