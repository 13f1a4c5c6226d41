use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Class vocabulary shared by the document, field and digit detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldLabel {
    DocumentBoundary,
    FirstName,
    LastName,
    Address,
    Serial,
    NationalIdZone,
    Digit(u8),
}

impl FieldLabel {
    /// Fields that must all be visible before a frame is captured.
    /// First name is left out, the detector misses it too often.
    pub const REQUIRED_FOR_CAPTURE: [FieldLabel; 4] = [
        FieldLabel::LastName,
        FieldLabel::NationalIdZone,
        FieldLabel::Address,
        FieldLabel::Serial,
    ];

    /// Fields counted when scoring a candidate orientation.
    pub const ORIENTATION_FIELDS: [FieldLabel; 5] = [
        FieldLabel::FirstName,
        FieldLabel::LastName,
        FieldLabel::Address,
        FieldLabel::Serial,
        FieldLabel::NationalIdZone,
    ];

    pub fn is_field(&self) -> bool {
        Self::ORIENTATION_FIELDS.contains(self)
    }

    pub fn digit_value(&self) -> Option<u8> {
        match self {
            FieldLabel::Digit(d) => Some(*d),
            _ => None,
        }
    }

    /// Name shown to a person in capture hints.
    pub fn display_name(&self) -> String {
        match self {
            FieldLabel::DocumentBoundary => "ID Card".to_string(),
            FieldLabel::FirstName => "First Name".to_string(),
            FieldLabel::LastName => "Last Name".to_string(),
            FieldLabel::Address => "Address".to_string(),
            FieldLabel::Serial => "Serial".to_string(),
            FieldLabel::NationalIdZone => "National ID".to_string(),
            FieldLabel::Digit(d) => format!("Digit {}", d),
        }
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldLabel::DocumentBoundary => write!(f, "idCard"),
            FieldLabel::FirstName => write!(f, "firstName"),
            FieldLabel::LastName => write!(f, "lastName"),
            FieldLabel::Address => write!(f, "address"),
            FieldLabel::Serial => write!(f, "serial"),
            FieldLabel::NationalIdZone => write!(f, "nid"),
            FieldLabel::Digit(d) => write!(f, "{}", d),
        }
    }
}

impl TryFrom<String> for FieldLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "idCard" | "id_card" | "document" => Ok(FieldLabel::DocumentBoundary),
            "firstName" => Ok(FieldLabel::FirstName),
            "lastName" | "secondName" => Ok(FieldLabel::LastName),
            "address" => Ok(FieldLabel::Address),
            "serial" => Ok(FieldLabel::Serial),
            "nid" => Ok(FieldLabel::NationalIdZone),
            other => match other.parse::<u8>() {
                Ok(d) if d <= 9 => Ok(FieldLabel::Digit(d)),
                _ => Err(format!("unknown field label '{}'", other)),
            },
        }
    }
}

impl From<FieldLabel> for String {
    fn from(label: FieldLabel) -> Self {
        label.to_string()
    }
}

/// Axis-aligned box in pixel coordinates, `x1 < x2` and `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        BoundingBox { x1, y1, x2, y2 }
    }

    /// Build from possibly out-of-range float coordinates, clipping to the
    /// image. Returns `None` when nothing of the box is left.
    pub fn clipped(x1: f32, y1: f32, x2: f32, y2: f32, width: u32, height: u32) -> Option<Self> {
        let clip = |v: f32, max: u32| -> u32 {
            if v.is_nan() || v <= 0.0 {
                0
            } else {
                (v as u32).min(max)
            }
        };
        let bbox = BoundingBox {
            x1: clip(x1.min(x2), width),
            y1: clip(y1.min(y2), height),
            x2: clip(x1.max(x2), width),
            y2: clip(y1.max(y2), height),
        };
        if bbox.x1 < bbox.x2 && bbox.y1 < bbox.y2 {
            Some(bbox)
        } else {
            None
        }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Scale the height about the vertical centre, keeping the horizontal
    /// extent, clamped to `image_height`.
    pub fn expand_height(&self, scale: f32, image_height: u32) -> Self {
        let center_y = self.y1 + self.height() / 2;
        let half = ((self.height() as f32 * scale) as u32) / 2;
        BoundingBox {
            x1: self.x1,
            y1: center_y.saturating_sub(half),
            x2: self.x2,
            y2: (center_y + half).min(image_height).max(center_y + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    pub label: FieldLabel,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl DetectedRegion {
    pub fn new(label: FieldLabel, confidence: f32, bbox: BoundingBox) -> Self {
        DetectedRegion {
            label,
            confidence,
            bbox,
        }
    }
}

/// Highest-confidence region carrying `label`, if any.
pub fn best_region(regions: &[DetectedRegion], label: FieldLabel) -> Option<&DetectedRegion> {
    regions
        .iter()
        .filter(|r| r.label == label)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Good,
    Medium,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub blur_score: f32,
    pub brightness: f32,
    pub is_blurry: bool,
    pub is_too_dark: bool,
    pub is_too_bright: bool,
    pub size_ok: bool,
    pub width: u32,
    pub height: u32,
    pub quality_score: u8,
    pub quality_level: QualityLevel,
}

/// Everything learned from one camera frame or upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFrame {
    pub regions: Vec<DetectedRegion>,
    pub field_summary: BTreeMap<String, usize>,
    pub quality: QualityMetrics,
    pub digit_count: usize,
    pub digits: String,
    pub photo_present: bool,
    pub ready_for_capture: bool,
    pub hint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_names_round_trip_through_serde() {
        let labels = vec![
            FieldLabel::DocumentBoundary,
            FieldLabel::NationalIdZone,
            FieldLabel::Digit(7),
        ];
        let json = serde_json::to_string(&labels).unwrap();
        assert_eq!(json, r#"["idCard","nid","7"]"#);
        let back: Vec<FieldLabel> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, labels);
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        assert!(FieldLabel::try_from("photo".to_string()).is_err());
        assert!(FieldLabel::try_from("12".to_string()).is_err());
    }

    #[test]
    fn test_clipped_box_stays_inside_image() {
        let bbox = BoundingBox::clipped(-5.0, 10.0, 120.0, 40.0, 100, 50).unwrap();
        assert_eq!(bbox, BoundingBox::new(0, 10, 100, 40));
        assert!(BoundingBox::clipped(150.0, 0.0, 200.0, 10.0, 100, 50).is_none());
    }

    #[test]
    fn test_expand_height_keeps_center_and_clamps() {
        let bbox = BoundingBox::new(10, 40, 90, 60);
        let expanded = bbox.expand_height(1.5, 200);
        assert_eq!(expanded, BoundingBox::new(10, 35, 90, 65));

        let near_edge = BoundingBox::new(0, 0, 50, 20).expand_height(1.5, 18);
        assert_eq!(near_edge.y1, 0);
        assert_eq!(near_edge.y2, 18);
    }

    #[test]
    fn test_best_region_picks_highest_confidence() {
        let regions = vec![
            DetectedRegion::new(FieldLabel::Serial, 0.4, BoundingBox::new(0, 0, 10, 10)),
            DetectedRegion::new(FieldLabel::Serial, 0.8, BoundingBox::new(5, 5, 20, 20)),
            DetectedRegion::new(FieldLabel::Address, 0.9, BoundingBox::new(0, 0, 10, 10)),
        ];
        let best = best_region(&regions, FieldLabel::Serial).unwrap();
        assert_eq!(best.confidence, 0.8);
        assert!(best_region(&regions, FieldLabel::FirstName).is_none());
    }
}
