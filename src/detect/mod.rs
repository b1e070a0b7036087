//! Object detection
//!
//! The detector itself is an external model reached through the `Detector`
//! trait. This module turns its per-frame output into stable answers:
//! single-shot sightings for "what is in my hand" and windowed surveys for
//! "describe my surroundings".

mod aggregate;
mod http;
mod scan;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use aggregate::{
    AggregateResult, AllowList, DetectionWindow, FrameCounts, Reducer, Sighting, pick_prominent,
};
pub use http::{HttpDetector, parse_detections};
pub use scan::{Aggregator, SingleShot, Survey};

use crate::Result;
use crate::vision::Frame;

/// Axis-aligned box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One object reported by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label, normalized to lowercase
    pub label: String,

    /// Confidence in [0, 1]
    pub confidence: f32,

    /// Location, when the detector reports one
    #[serde(default, rename = "box", skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    /// Create a detection, normalizing the label and clamping confidence
    pub fn new(label: impl AsRef<str>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            label: label.as_ref().trim().to_lowercase(),
            confidence,
            bbox: None,
        }
    }

    /// Attach a bounding box
    #[must_use]
    pub const fn with_box(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// External object detector
///
/// Inference is the slow path; callers invoke it at most once per frame.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Backend identifier
    fn name(&self) -> &str;

    /// Run detection on one frame
    ///
    /// # Errors
    ///
    /// Returns `Error::Detection` if inference fails
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_normalization() {
        let d = Detection::new("  Cell Phone ", 1.7);
        assert_eq!(d.label, "cell phone");
        assert!((d.confidence - 1.0).abs() < f32::EPSILON);

        let d = Detection::new("cup", f32::NAN);
        assert!(d.confidence.abs() < f32::EPSILON);
    }
}
