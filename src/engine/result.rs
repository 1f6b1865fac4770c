use serde::{Deserialize, Serialize};

/// Result of running detection on one frame.
///
/// The bridge forwards this verbatim; it never inspects or reorders the
/// detections an engine produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
    /// Redundant with `detections.len()`, kept in the wire form because
    /// host callers read it without deserializing the list.
    pub count: usize,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        let count = detections.len();
        Self { detections, count }
    }

    /// Serialized boundary form handed to host callers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One detected object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    #[serde(rename = "class_name")]
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Corner-format bounding box, coordinates normalized to 0..1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}
