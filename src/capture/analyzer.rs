use crate::capture::gate::{CaptureQualityGate, CaptureSignals};
use crate::config::PipelineConfig;
use crate::models::{best_region, DetectedRegion, DetectionFrame, FieldLabel};
use crate::processing::detector::{detect_bounded, DetectorSet};
use crate::processing::digits::DigitReader;
use crate::processing::image::ImageProcessor;
use crate::processing::quality;
use image::{GrayImage, RgbImage};
use log::{info, warn};
use std::collections::BTreeMap;

/// Builds a [`DetectionFrame`] for live camera guidance.
pub struct CaptureAnalyzer {
    detectors: DetectorSet,
    config: PipelineConfig,
    gate: CaptureQualityGate,
}

impl CaptureAnalyzer {
    pub fn new(detectors: DetectorSet, config: PipelineConfig) -> Self {
        let gate = CaptureQualityGate::new(config.quality.min_mean_confidence);
        CaptureAnalyzer {
            detectors,
            config,
            gate,
        }
    }

    /// Never fails: an unreadable frame comes back not ready, with a hint.
    pub fn analyze_bytes(&self, bytes: &[u8]) -> DetectionFrame {
        match ImageProcessor::decode(bytes) {
            Ok(image) => self.analyze(&image),
            Err(e) => {
                warn!("Capture frame could not be decoded: {}", e);
                let empty = GrayImage::new(0, 0);
                DetectionFrame {
                    regions: Vec::new(),
                    field_summary: BTreeMap::new(),
                    quality: quality::assess(&empty, &self.config.quality),
                    digit_count: 0,
                    digits: String::new(),
                    photo_present: false,
                    ready_for_capture: false,
                    hint: "Could not read the camera frame. Please try again.".to_string(),
                }
            }
        }
    }

    pub fn analyze(&self, image: &RgbImage) -> DetectionFrame {
        let gray = ImageProcessor::to_gray(image);
        let quality = quality::assess(&gray, &self.config.quality);
        let photo_present = quality::photo_present(&gray, &self.config.quality);
        let timeout = self.config.stage_timeout();

        let mut regions: Vec<DetectedRegion> = match detect_bounded(
            &self.detectors.fields,
            image,
            self.config.field_confidence,
            "capture fields",
            timeout,
        ) {
            Ok(regions) => regions,
            Err(e) => {
                warn!("Field detection failed on capture frame: {}", e);
                Vec::new()
            }
        };

        let mut digits = String::new();
        if let Some(zone) = best_region(&regions, FieldLabel::NationalIdZone).map(|r| r.bbox) {
            let reader = DigitReader::new(
                self.detectors.digits.clone(),
                self.config.nid_zone_scale,
                self.config.digit_confidence,
            )
            .with_timeout(timeout);
            match reader.read(image, &zone) {
                Ok(reading) => {
                    digits = reading.digits;
                    regions.extend(reading.regions);
                }
                Err(e) => warn!("Digit detection failed on capture frame: {}", e),
            }
        }

        let mut field_summary = BTreeMap::new();
        for region in regions.iter().filter(|r| r.label.is_field()) {
            *field_summary.entry(region.label.to_string()).or_insert(0) += 1;
        }

        let decision = self.gate.evaluate(&CaptureSignals {
            quality: &quality,
            regions: &regions,
            digit_count: digits.chars().count(),
            photo_present,
        });
        info!(
            "Capture frame: {} fields, {} digits, photo {}, ready {}",
            field_summary.len(),
            digits.len(),
            photo_present,
            decision.ready
        );

        DetectionFrame {
            regions,
            field_summary,
            quality,
            digit_count: digits.chars().count(),
            digits,
            photo_present,
            ready_for_capture: decision.ready,
            hint: decision.hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;
    use crate::processing::detector::RecordedDetector;
    use crate::processing::FieldDetector;
    use image::Rgb;
    use std::sync::Arc;

    /// Sharp, evenly lit card with a textured photo band on the left.
    fn card() -> RgbImage {
        RgbImage::from_fn(640, 400, |x, y| {
            let v = if (x / 4 + y / 4) % 2 == 0 { 70 } else { 190 };
            Rgb([v, v, v])
        })
    }

    fn region(label: FieldLabel, bbox: BoundingBox) -> DetectedRegion {
        DetectedRegion::new(label, 0.85, bbox)
    }

    fn detectors(digit_count: u32) -> DetectorSet {
        let fields = RecordedDetector::from_regions(&[
            region(FieldLabel::LastName, BoundingBox::new(300, 100, 600, 140)),
            region(FieldLabel::Address, BoundingBox::new(300, 160, 600, 220)),
            region(FieldLabel::Serial, BoundingBox::new(20, 350, 200, 380)),
            region(FieldLabel::NationalIdZone, BoundingBox::new(300, 300, 620, 340)),
        ]);
        let glyphs: Vec<DetectedRegion> = (0..digit_count)
            .map(|i| region(FieldLabel::Digit((i % 10) as u8), BoundingBox::new(i * 20, 5, i * 20 + 15, 40)))
            .collect();
        let digits = RecordedDetector::from_regions(&glyphs);
        let document: Arc<dyn FieldDetector> = Arc::new(RecordedDetector::default());
        DetectorSet {
            document,
            fields: Arc::new(fields),
            digits: Arc::new(digits),
        }
    }

    #[test]
    fn test_complete_card_is_ready() {
        let analyzer = CaptureAnalyzer::new(detectors(14), PipelineConfig::default());
        let frame = analyzer.analyze(&card());
        assert_eq!(frame.digit_count, 14);
        assert_eq!(frame.digits, "01234567890123");
        assert!(frame.photo_present);
        assert_eq!(frame.field_summary.get("nid"), Some(&1));
        assert!(frame.ready_for_capture, "hint: {}", frame.hint);
    }

    #[test]
    fn test_short_digit_run_asks_for_angle() {
        let analyzer = CaptureAnalyzer::new(detectors(11), PipelineConfig::default());
        let frame = analyzer.analyze(&card());
        assert!(!frame.ready_for_capture);
        assert!(frame.hint.contains("11/14"));
    }

    #[test]
    fn test_undecodable_frame_still_has_hint() {
        let analyzer = CaptureAnalyzer::new(detectors(14), PipelineConfig::default());
        let frame = analyzer.analyze_bytes(b"\x00\x01garbage");
        assert!(!frame.ready_for_capture);
        assert!(!frame.hint.is_empty());
        assert_eq!(frame.digit_count, 0);
    }
}
