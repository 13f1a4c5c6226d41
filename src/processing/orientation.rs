use crate::models::{DetectedRegion, FieldLabel};
use crate::processing::detector::{detect_bounded, FieldDetector};
use crate::processing::image::ImageProcessor;
use crate::utils::KycError;
use image::RgbImage;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Candidate angles, counter-clockwise, in evaluation order.
pub const CANDIDATE_ANGLES: [u32; 4] = [0, 90, 180, 270];

#[derive(Debug, Clone)]
pub struct OrientedImage {
    pub image: RgbImage,
    pub degrees: u32,
    pub score: f32,
}

/// Picks the rotation under which the field detector sees the most card
/// fields.
pub struct OrientationSelector {
    detector: Arc<dyn FieldDetector>,
    confidence_floor: f32,
    timeout: Option<Duration>,
}

impl OrientationSelector {
    pub fn new(detector: Arc<dyn FieldDetector>, confidence_floor: f32) -> Self {
        OrientationSelector {
            detector,
            confidence_floor,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn select_best_orientation(&self, image: &RgbImage) -> RgbImage {
        self.select(image).image
    }

    /// Never fails: any detector error falls back to the unrotated image.
    pub fn select(&self, image: &RgbImage) -> OrientedImage {
        match self.search(image) {
            Ok(best) => best,
            Err(e) => {
                warn!("Orientation search failed, keeping original: {}", e);
                OrientedImage {
                    image: image.clone(),
                    degrees: 0,
                    score: 0.0,
                }
            }
        }
    }

    fn search(&self, image: &RgbImage) -> Result<OrientedImage, KycError> {
        let mut best: Option<OrientedImage> = None;
        for degrees in CANDIDATE_ANGLES {
            let rotated = ImageProcessor::rotate_replicate(image, degrees as f32);
            let regions = detect_bounded(
                &self.detector,
                &rotated,
                self.confidence_floor,
                "orientation",
                self.timeout,
            )?;
            let score = orientation_score(&regions);
            debug!("Orientation {} degrees scored {:.3}", degrees, score);

            // Strictly greater: earlier angles win ties.
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(OrientedImage {
                    image: rotated,
                    degrees,
                    score,
                });
            }
        }

        let best = best.ok_or_else(|| KycError::Detector("no orientation evaluated".to_string()))?;
        info!("Selected orientation {} degrees (score {:.3})", best.degrees, best.score);
        Ok(best)
    }
}

/// Distinct card fields seen plus their mean confidence; zero when none.
pub fn orientation_score(regions: &[DetectedRegion]) -> f32 {
    let relevant: Vec<&DetectedRegion> = regions
        .iter()
        .filter(|r| FieldLabel::ORIENTATION_FIELDS.contains(&r.label))
        .collect();
    if relevant.is_empty() {
        return 0.0;
    }
    let distinct: BTreeSet<FieldLabel> = relevant.iter().map(|r| r.label).collect();
    let mean = relevant.iter().map(|r| r.confidence).sum::<f32>() / relevant.len() as f32;
    distinct.len() as f32 + mean
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::BoundingBox;
    use image::Rgb;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Hands out queued responses, one per call, then empty results.
    pub(crate) struct QueuedDetector {
        responses: Mutex<VecDeque<Result<Vec<DetectedRegion>, KycError>>>,
    }

    impl QueuedDetector {
        pub(crate) fn new(responses: Vec<Result<Vec<DetectedRegion>, KycError>>) -> Self {
            QueuedDetector {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    impl FieldDetector for QueuedDetector {
        fn detect(&self, _image: &RgbImage, _floor: f32) -> Result<Vec<DetectedRegion>, KycError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    pub(crate) fn region(label: FieldLabel, confidence: f32) -> DetectedRegion {
        DetectedRegion::new(label, confidence, BoundingBox::new(1, 1, 5, 5))
    }

    fn asymmetric() -> RgbImage {
        RgbImage::from_fn(9, 9, |x, y| Rgb([x as u8 * 20, y as u8 * 20, 0]))
    }

    #[test]
    fn test_quarter_turn_wins_when_it_finds_fields() {
        let detector = QueuedDetector::new(vec![
            Ok(vec![]),
            Ok(vec![region(FieldLabel::LastName, 0.9), region(FieldLabel::Serial, 0.9)]),
            Ok(vec![]),
            Ok(vec![]),
        ]);
        let selector = OrientationSelector::new(Arc::new(detector), 0.3);
        let image = asymmetric();
        let best = selector.select(&image);
        assert_eq!(best.degrees, 90);
        assert!((best.score - 2.9).abs() < 1e-5);
        assert_eq!(best.image, ImageProcessor::rotate_replicate(&image, 90.0));
    }

    #[test]
    fn test_ties_keep_earlier_angle() {
        let same = vec![region(FieldLabel::Address, 0.7)];
        let detector = QueuedDetector::new(vec![Ok(same.clone()), Ok(same), Ok(vec![]), Ok(vec![])]);
        let selector = OrientationSelector::new(Arc::new(detector), 0.3);
        let image = asymmetric();
        assert_eq!(selector.select_best_orientation(&image), image);
    }

    #[test]
    fn test_nothing_detected_keeps_original() {
        let selector = OrientationSelector::new(Arc::new(QueuedDetector::new(vec![])), 0.3);
        let image = asymmetric();
        let best = selector.select(&image);
        assert_eq!(best.degrees, 0);
        assert_eq!(best.score, 0.0);
        assert_eq!(best.image, image);
    }

    #[test]
    fn test_detector_error_returns_original() {
        let detector = QueuedDetector::new(vec![
            Ok(vec![]),
            Ok(vec![region(FieldLabel::LastName, 0.9)]),
            Err(KycError::Detector("model unavailable".to_string())),
        ]);
        let selector = OrientationSelector::new(Arc::new(detector), 0.3);
        let image = asymmetric();
        let best = selector.select(&image);
        assert_eq!(best.degrees, 0);
        assert_eq!(best.image, image);
    }

    #[test]
    fn test_score_counts_distinct_fields_only() {
        assert_eq!(orientation_score(&[]), 0.0);
        assert_eq!(orientation_score(&[region(FieldLabel::Digit(4), 0.9)]), 0.0);
        let score = orientation_score(&[
            region(FieldLabel::LastName, 0.8),
            region(FieldLabel::LastName, 0.6),
            region(FieldLabel::NationalIdZone, 0.4),
            region(FieldLabel::DocumentBoundary, 1.0),
        ]);
        assert!((score - 2.6).abs() < 1e-5);
    }
}
