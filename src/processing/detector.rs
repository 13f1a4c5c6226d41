use crate::models::{BoundingBox, DetectedRegion, FieldLabel};
use crate::utils::{call_bounded, KycError};
use image::RgbImage;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Region detector over a whole image.
///
/// Implementations return regions in the pixel coordinates of the image they
/// were given, already filtered to `confidence >= confidence_floor`.
pub trait FieldDetector: Send + Sync {
    fn detect(&self, image: &RgbImage, confidence_floor: f32) -> Result<Vec<DetectedRegion>, KycError>;
}

/// The three detection passes a card goes through.
#[derive(Clone)]
pub struct DetectorSet {
    /// Finds the card itself (`idCard`).
    pub document: Arc<dyn FieldDetector>,
    /// Finds name, address, serial and national ID zones on a card.
    pub fields: Arc<dyn FieldDetector>,
    /// Finds single digit glyphs inside the national ID zone.
    pub digits: Arc<dyn FieldDetector>,
}

/// Run `detector`, bounded by `limit` when set.
pub fn detect_bounded(
    detector: &Arc<dyn FieldDetector>,
    image: &RgbImage,
    confidence_floor: f32,
    stage: &'static str,
    limit: Option<Duration>,
) -> Result<Vec<DetectedRegion>, KycError> {
    if limit.is_none() {
        return detector.detect(image, confidence_floor);
    }
    let detector = Arc::clone(detector);
    let image = image.clone();
    call_bounded(stage, limit, KycError::Detector, move || detector.detect(&image, confidence_floor))
}

#[derive(Debug, Clone, Deserialize)]
struct RecordedDetection {
    label: FieldLabel,
    confidence: f32,
    #[serde(rename = "box")]
    bbox: [f32; 4],
}

/// Replays detections captured from an external model run.
///
/// Each call returns the recorded regions that clear the confidence floor,
/// clipped to the image handed in.
#[derive(Debug, Clone, Default)]
pub struct RecordedDetector {
    detections: Vec<RecordedDetection>,
}

impl RecordedDetector {
    pub fn from_json(json: &str) -> Result<Self, KycError> {
        let detections = serde_json::from_str(json)
            .map_err(|e| KycError::Detector(format!("Invalid recorded detections: {}", e)))?;
        Ok(RecordedDetector { detections })
    }

    pub fn from_regions(regions: &[DetectedRegion]) -> Self {
        RecordedDetector {
            detections: regions
                .iter()
                .map(|r| RecordedDetection {
                    label: r.label,
                    confidence: r.confidence,
                    bbox: [r.bbox.x1 as f32, r.bbox.y1 as f32, r.bbox.x2 as f32, r.bbox.y2 as f32],
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

impl FieldDetector for RecordedDetector {
    fn detect(&self, image: &RgbImage, confidence_floor: f32) -> Result<Vec<DetectedRegion>, KycError> {
        let (width, height) = image.dimensions();
        Ok(self
            .detections
            .iter()
            .filter(|d| d.confidence >= confidence_floor)
            .filter_map(|d| {
                let [x1, y1, x2, y2] = d.bbox;
                BoundingBox::clipped(x1, y1, x2, y2, width, height)
                    .map(|bbox| DetectedRegion::new(d.label, d.confidence, bbox))
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct RecordedPasses {
    #[serde(default)]
    document: Vec<RecordedDetection>,
    #[serde(default)]
    fields: Vec<RecordedDetection>,
    #[serde(default)]
    digits: Vec<RecordedDetection>,
}

impl DetectorSet {
    /// Load `{"document": [...], "fields": [...], "digits": [...]}` where
    /// each entry is `{"label": "nid", "confidence": 0.9, "box": [x1, y1, x2, y2]}`.
    pub fn from_recorded_file<P: AsRef<Path>>(path: P) -> Result<Self, KycError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_recorded_json(&json)
    }

    pub fn from_recorded_json(json: &str) -> Result<Self, KycError> {
        let passes: RecordedPasses = serde_json::from_str(json)
            .map_err(|e| KycError::Detector(format!("Invalid recorded detections: {}", e)))?;
        Ok(DetectorSet {
            document: Arc::new(RecordedDetector {
                detections: passes.document,
            }),
            fields: Arc::new(RecordedDetector {
                detections: passes.fields,
            }),
            digits: Arc::new(RecordedDetector {
                detections: passes.digits,
            }),
        })
    }
}
