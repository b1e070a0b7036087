//! HTTP inference server client
//!
//! Posts each frame as a JPEG to a detection server (for example a YOLO model
//! behind a small REST wrapper) and parses the JSON detections it returns.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{BoundingBox, Detection, Detector};
use crate::vision::Frame;
use crate::{Error, Result};

/// Detection server response: a bare list or `{"detections": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum DetectResponse {
    List(Vec<WireDetection>),
    Wrapped { detections: Vec<WireDetection> },
}

#[derive(Deserialize)]
struct WireDetection {
    #[serde(alias = "name", alias = "class")]
    label: String,
    #[serde(alias = "conf", alias = "score")]
    confidence: f32,
    #[serde(default, rename = "box", alias = "bbox")]
    bbox: Option<BoundingBox>,
}

impl From<WireDetection> for Detection {
    fn from(wire: WireDetection) -> Self {
        let detection = Self::new(&wire.label, wire.confidence);
        match wire.bbox {
            Some(bbox) => detection.with_box(bbox),
            None => detection,
        }
    }
}

/// Detector backed by a remote inference endpoint
pub struct HttpDetector {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDetector {
    /// Create a detector for the given endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is empty or the HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(Error::Config("detection endpoint required".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        tracing::debug!(endpoint, "http detector initialized");
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Detector for HttpDetector {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let jpeg = frame.to_jpeg()?;
        tracing::trace!(sequence = frame.sequence(), bytes = jpeg.len(), "sending frame");

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(jpeg)
                .file_name(format!("frame-{}.jpg", frame.sequence()))
                .mime_str("image/jpeg")
                .map_err(|e| Error::Detection(e.to_string()))?,
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Detection(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Detection(format!("detector error {status}: {body}")));
        }

        let body = response.text().await?;
        let detections = parse_detections(&body)?;
        tracing::debug!(
            sequence = frame.sequence(),
            count = detections.len(),
            "detections received"
        );
        Ok(detections)
    }
}

/// Parse a detection server response body
///
/// # Errors
///
/// Returns error if the body is not a recognized detection payload
pub fn parse_detections(body: &str) -> Result<Vec<Detection>> {
    let response: DetectResponse = serde_json::from_str(body)?;
    let wire = match response {
        DetectResponse::List(list) | DetectResponse::Wrapped { detections: list } => list,
    };
    Ok(wire.into_iter().map(Detection::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_list() {
        let detections = parse_detections(
            r#"[
                {"label": "Bottle", "confidence": 0.91, "box": {"x1": 1.0, "y1": 2.0, "x2": 30.0, "y2": 60.0}},
                {"name": "chair", "conf": 0.4}
            ]"#,
        )
        .unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "bottle");
        assert!(detections[0].bbox.is_some());
        assert_eq!(detections[1].label, "chair");
        assert!(detections[1].bbox.is_none());
    }

    #[test]
    fn test_parse_wrapped() {
        let detections =
            parse_detections(r#"{"detections": [{"class": "pen", "score": 0.8}]}"#).unwrap();
        assert_eq!(detections[0].label, "pen");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_detections("not json").is_err());
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        assert!(HttpDetector::new("", Duration::from_secs(1)).is_err());
    }
}
