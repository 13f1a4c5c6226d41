use crate::models::{DetectedRegion, FieldLabel, QualityLevel, QualityMetrics};
use crate::decoding::national_id::NATIONAL_ID_LENGTH;
use serde::Serialize;

/// Everything the gate looks at for one frame.
#[derive(Debug, Clone, Copy)]
pub struct CaptureSignals<'a> {
    pub quality: &'a QualityMetrics,
    pub regions: &'a [DetectedRegion],
    pub digit_count: usize,
    pub photo_present: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDecision {
    pub ready: bool,
    pub hint: String,
    pub missing: Vec<FieldLabel>,
}

/// Decides whether a single frame is good enough to capture, and what to
/// tell the user otherwise. Holds no state between frames.
#[derive(Debug, Clone)]
pub struct CaptureQualityGate {
    min_mean_confidence: f32,
}

impl Default for CaptureQualityGate {
    fn default() -> Self {
        CaptureQualityGate {
            min_mean_confidence: 0.4,
        }
    }
}

impl CaptureQualityGate {
    pub fn new(min_mean_confidence: f32) -> Self {
        CaptureQualityGate { min_mean_confidence }
    }

    pub fn evaluate(&self, signals: &CaptureSignals) -> CaptureDecision {
        let fields: Vec<&DetectedRegion> =
            signals.regions.iter().filter(|r| r.label.is_field()).collect();
        let missing: Vec<FieldLabel> = FieldLabel::REQUIRED_FOR_CAPTURE
            .iter()
            .copied()
            .filter(|label| !fields.iter().any(|r| r.label == *label))
            .collect();
        let mean_confidence = if fields.is_empty() {
            0.0
        } else {
            fields.iter().map(|r| r.confidence).sum::<f32>() / fields.len() as f32
        };
        let quality = signals.quality;
        let quality_ok = matches!(quality.quality_level, QualityLevel::Good | QualityLevel::Medium);

        let ready = !fields.is_empty()
            && missing.is_empty()
            && signals.digit_count == NATIONAL_ID_LENGTH
            && signals.photo_present
            && mean_confidence > self.min_mean_confidence
            && quality_ok
            && !quality.is_blurry;

        // Quality hints win over the ready message; readiness itself is
        // unaffected by lighting.
        let hint = if fields.is_empty() {
            "No ID card detected. Please show your ID card to the camera.".to_string()
        } else if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(|l| l.display_name()).collect();
            format!("Missing fields: {}. Make sure the whole card is visible.", names.join(", "))
        } else if signals.digit_count != NATIONAL_ID_LENGTH {
            format!(
                "Adjust angle to read the ID number ({}/{} digits).",
                signals.digit_count, NATIONAL_ID_LENGTH
            )
        } else if !signals.photo_present {
            "Adjust angle to show the photo.".to_string()
        } else if quality.is_blurry {
            "Hold steady, the image is blurry.".to_string()
        } else if quality.is_too_dark {
            "Find better lighting.".to_string()
        } else if quality.is_too_bright {
            "Reduce glare, the image is too bright.".to_string()
        } else if ready {
            "Perfect! Hold still.".to_string()
        } else {
            "Improve image quality and try again.".to_string()
        };

        CaptureDecision {
            ready,
            hint,
            missing,
        }
    }
}
