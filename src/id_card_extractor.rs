use crate::config::PipelineConfig;
use crate::decoding::NationalIdDecoder;
use crate::models::*;
use crate::processing::detector::{detect_bounded, DetectorSet};
use crate::processing::digits::DigitReader;
use crate::processing::image::ImageProcessor;
use crate::processing::ocr::{recognize_bounded, LanguageHint, TextRecognizer};
use crate::processing::orientation::OrientationSelector;
use crate::utils::KycError;
use image::{DynamicImage, RgbImage};
use log::{info, warn};
use std::sync::Arc;

/// Text fields read off the card, with the script each one is printed in.
const TEXT_FIELDS: [(FieldLabel, LanguageHint); 4] = [
    (FieldLabel::FirstName, LanguageHint::Arabic),
    (FieldLabel::LastName, LanguageHint::Arabic),
    (FieldLabel::Address, LanguageHint::Arabic),
    (FieldLabel::Serial, LanguageHint::Latin),
];

/// Reads an Egyptian national ID card photo end to end.
///
/// Orientation, card crop, field detection, per-field recognition and
/// national ID decoding run in sequence. A stage that fails or finds nothing
/// leaves its fields empty and records a [`Diagnostic`]; only an image that
/// cannot be decoded at all is an error.
pub struct IdCardExtractor {
    detectors: DetectorSet,
    recognizer: Arc<dyn TextRecognizer>,
    config: PipelineConfig,
}

impl IdCardExtractor {
    pub fn new(detectors: DetectorSet, recognizer: Arc<dyn TextRecognizer>, config: PipelineConfig) -> Self {
        IdCardExtractor {
            detectors,
            recognizer,
            config,
        }
    }

    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<IdCardExtraction, KycError> {
        let image = ImageProcessor::decode(bytes)?;
        Ok(self.extract(&image))
    }

    pub fn extract(&self, image: &RgbImage) -> IdCardExtraction {
        let timeout = self.config.stage_timeout();
        let mut result = IdCardExtraction::default();

        // Step 1: orientation
        let oriented = OrientationSelector::new(self.detectors.fields.clone(), self.config.field_confidence)
            .with_timeout(timeout)
            .select(image);
        result.rotation_degrees = oriented.degrees;

        // Step 2: card crop
        let card = self.crop_card(&oriented.image, &mut result.diagnostics);

        // Step 3: field detection on the card
        let regions = match detect_bounded(
            &self.detectors.fields,
            &card,
            self.config.field_confidence,
            "fields",
            timeout,
        ) {
            Ok(regions) => regions,
            Err(e) => {
                warn!("Field detection failed: {}", e);
                result.diagnostics.push(Diagnostic::failure("fields", e.kind(), e.to_string()));
                Vec::new()
            }
        };
        let card_gray = ImageProcessor::to_gray(&card);

        // Step 4: text fields
        for (label, hint) in TEXT_FIELDS {
            let text = match best_region(&regions, label) {
                Some(region) => {
                    let crop = ImageProcessor::crop_gray(&card_gray, &region.bbox);
                    match recognize_bounded(&self.recognizer, &crop, hint, "recognize", timeout) {
                        Ok(recognized) => recognized.text.trim().to_string(),
                        Err(e) => {
                            warn!("Recognition of {} failed: {}", label, e);
                            result.diagnostics.push(Diagnostic::failure(
                                "recognize",
                                e.kind(),
                                format!("{}: {}", label, e),
                            ));
                            String::new()
                        }
                    }
                }
                None => {
                    result
                        .diagnostics
                        .push(Diagnostic::note("fields", format!("{} not detected", label)));
                    String::new()
                }
            };
            match label {
                FieldLabel::FirstName => result.first_name = text,
                FieldLabel::LastName => result.last_name = text,
                FieldLabel::Address => result.address = text,
                _ => result.serial = text,
            }
        }
        result.full_name = [result.first_name.as_str(), result.last_name.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        // Step 5: national ID digits and decoding
        let mut detected = regions.clone();
        match best_region(&regions, FieldLabel::NationalIdZone) {
            Some(zone) => {
                let reader = DigitReader::new(
                    self.detectors.digits.clone(),
                    self.config.nid_zone_scale,
                    self.config.digit_confidence,
                )
                .with_timeout(timeout);
                match reader.read(&card, &zone.bbox) {
                    Ok(reading) => {
                        detected.extend(reading.regions.iter().copied());
                        result.national_id = reading.digits;
                        self.decode_national_id(&mut result);
                    }
                    Err(e) => {
                        warn!("Digit detection failed: {}", e);
                        result.diagnostics.push(Diagnostic::failure("digits", e.kind(), e.to_string()));
                    }
                }
            }
            None => result
                .diagnostics
                .push(Diagnostic::note("digits", "national ID zone not detected")),
        }
        result.detected_fields = detected;

        // Step 6: debug artifacts
        if self.config.debug_artifacts {
            let overlay = ImageProcessor::draw_overlay(&card, &result.detected_fields);
            result.debug.overlay_png = self.encode_artifact(overlay, &mut result.diagnostics);
            result.debug.card_crop_png = self.encode_artifact(card, &mut result.diagnostics);
        }

        info!(
            "ID card extraction finished: national ID {} digits, {} diagnostics",
            result.national_id.len(),
            result.diagnostics.len()
        );
        result
    }

    fn crop_card(&self, image: &RgbImage, diagnostics: &mut Vec<Diagnostic>) -> RgbImage {
        let regions = match detect_bounded(
            &self.detectors.document,
            image,
            self.config.document_confidence,
            "document",
            self.config.stage_timeout(),
        ) {
            Ok(regions) => regions,
            Err(e) => {
                warn!("Document detection failed: {}", e);
                diagnostics.push(Diagnostic::failure("document", e.kind(), e.to_string()));
                return image.clone();
            }
        };

        let boundary = best_region(&regions, FieldLabel::DocumentBoundary)
            .filter(|r| r.confidence > self.config.document_confidence);
        match boundary {
            Some(region) => {
                let padded = pad_document(&region.bbox, image.width(), image.height());
                info!(
                    "Card boundary at ({}, {}) size {}x{} (confidence {:.2})",
                    padded.x1,
                    padded.y1,
                    padded.width(),
                    padded.height(),
                    region.confidence
                );
                ImageProcessor::crop(image, &padded)
            }
            None => {
                diagnostics.push(Diagnostic::note(
                    "document",
                    "card boundary not detected, using full image",
                ));
                image.clone()
            }
        }
    }

    fn decode_national_id(&self, result: &mut IdCardExtraction) {
        match NationalIdDecoder::decode(&result.national_id) {
            Ok(record) => {
                result.birth_date = record.birth_date;
                result.governorate = record.governorate;
                result.gender = record.gender.to_string();
            }
            Err(e) => {
                warn!("National ID '{}' not decodable: {}", result.national_id, e);
                result
                    .diagnostics
                    .push(Diagnostic::failure("decode", e.kind(), e.to_string()));
            }
        }
    }

    fn encode_artifact(&self, image: RgbImage, diagnostics: &mut Vec<Diagnostic>) -> Option<Vec<u8>> {
        match ImageProcessor::encode_png(&DynamicImage::ImageRgb8(image)) {
            Ok(png) => Some(png),
            Err(e) => {
                diagnostics.push(Diagnostic::failure("debug", e.kind(), e.to_string()));
                None
            }
        }
    }
}

/// Extra room around the detected card: the name line sits close to the
/// bottom edge and is easily clipped.
pub fn pad_document(bbox: &BoundingBox, width: u32, height: u32) -> BoundingBox {
    let top = 20.max((bbox.height() as f32 * 0.10) as u32);
    let sides = 10.max((bbox.width() as f32 * 0.05) as u32);
    let bottom = 50.max((bbox.height() as f32 * 0.15) as u32);
    BoundingBox::new(
        bbox.x1.saturating_sub(sides),
        bbox.y1.saturating_sub(top),
        (bbox.x2 + sides).min(width),
        (bbox.y2 + bottom).min(height),
    )
}
