use crate::models::{BoundingBox, DetectedRegion};
use crate::processing::detector::{detect_bounded, FieldDetector};
use crate::processing::image::ImageProcessor;
use crate::utils::KycError;
use image::RgbImage;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// Digits read out of the national ID zone, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitReading {
    pub digits: String,
    /// Digit glyphs in the coordinates of the image the zone came from.
    pub regions: Vec<DetectedRegion>,
    /// The zone after vertical expansion.
    pub zone: BoundingBox,
}

/// Reads the national ID number glyph by glyph.
///
/// The zone is stretched vertically by `scale` first, since the zone box
/// tends to clip the tops and bottoms of the digits.
pub struct DigitReader {
    detector: Arc<dyn FieldDetector>,
    scale: f32,
    confidence_floor: f32,
    timeout: Option<Duration>,
}

impl DigitReader {
    pub fn new(detector: Arc<dyn FieldDetector>, scale: f32, confidence_floor: f32) -> Self {
        DigitReader {
            detector,
            scale,
            confidence_floor,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn read(&self, image: &RgbImage, zone: &BoundingBox) -> Result<DigitReading, KycError> {
        let zone = zone.expand_height(self.scale, image.height());
        let crop = ImageProcessor::crop(image, &zone);
        let mut regions: Vec<DetectedRegion> = detect_bounded(
            &self.detector,
            &crop,
            self.confidence_floor,
            "digits",
            self.timeout,
        )?
        .into_iter()
        .filter(|r| r.label.digit_value().is_some())
        .map(|r| {
            let bbox = BoundingBox::new(
                r.bbox.x1 + zone.x1,
                r.bbox.y1 + zone.y1,
                r.bbox.x2 + zone.x1,
                r.bbox.y2 + zone.y1,
            );
            DetectedRegion::new(r.label, r.confidence, bbox)
        })
        .collect();
        regions.sort_by_key(|r| r.bbox.x1);

        let digits: String = regions
            .iter()
            .filter_map(|r| r.label.digit_value())
            .map(|d| char::from(b'0' + d))
            .collect();
        debug!("Read {} digits from national ID zone: {}", digits.len(), digits);

        Ok(DigitReading {
            digits,
            regions,
            zone,
        })
    }
}
