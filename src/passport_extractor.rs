use crate::config::PipelineConfig;
use crate::decoding::{classify_format, FieldGrammar, MrzDecoder};
use crate::models::{CountryTable, Diagnostic, MrzFormatInfo, PassportExtraction};
use crate::processing::image::ImageProcessor;
use crate::processing::mrz_locator::MrzLocator;
use crate::processing::ocr::{clean_mrz_text, recognize_bounded, LanguageHint, TextRecognizer};
use crate::utils::{ErrorKind, KycError};
use image::{DynamicImage, RgbImage};
use log::{debug, info, warn};
use std::sync::Arc;

/// Reads a passport photo: locate the MRZ, recognise it, decode it.
pub struct PassportExtractor {
    recognizer: Arc<dyn TextRecognizer>,
    locator: MrzLocator,
    decoder: MrzDecoder,
    grammar: Option<FieldGrammar>,
    config: PipelineConfig,
}

impl PassportExtractor {
    /// Loads the country table override named in `config`, if any.
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: PipelineConfig) -> Result<Self, KycError> {
        let countries = match &config.country_table {
            Some(path) => Arc::new(CountryTable::from_file(path)?),
            None => CountryTable::builtin(),
        };
        let grammar = if config.correct_passport_number {
            Some(FieldGrammar::passport_number()?)
        } else {
            None
        };
        Ok(PassportExtractor {
            recognizer,
            locator: MrzLocator::new(config.mrz.clone()),
            decoder: MrzDecoder::new(countries),
            grammar,
            config,
        })
    }

    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<PassportExtraction, KycError> {
        let image = ImageProcessor::decode(bytes)?;
        Ok(self.extract(&image))
    }

    pub fn extract(&self, image: &RgbImage) -> PassportExtraction {
        let Some(region) = self.locator.locate(image) else {
            warn!("No MRZ region found");
            return PassportExtraction {
                error: Some("MRZ region not detected".to_string()),
                diagnostics: vec![Diagnostic::note(
                    "locate",
                    "no full-width text block near the bottom of the page",
                )],
                ..PassportExtraction::default()
            };
        };

        let (ocr_width, ocr_height) = self.config.mrz.ocr_size;
        let resized = ImageProcessor::resize_gray(&region.crop, ocr_width, ocr_height);
        let recognized = recognize_bounded(
            &self.recognizer,
            &resized,
            LanguageHint::Mrz,
            "mrz",
            self.config.stage_timeout(),
        );

        let mut result = match recognized {
            Ok(text) => self.decode_text(&text.text),
            Err(e) => {
                warn!("MRZ recognition failed: {}", e);
                PassportExtraction {
                    error: Some(e.to_string()),
                    error_kind: Some(e.kind()),
                    ..PassportExtraction::default()
                }
            }
        };
        result.mrz_detected = true;
        result.mrz_box = Some(region.bbox);

        if self.config.debug_artifacts {
            match ImageProcessor::encode_png(&DynamicImage::ImageLuma8(region.crop)) {
                Ok(png) => result.debug.mrz_crop_png = Some(png),
                Err(e) => result
                    .diagnostics
                    .push(Diagnostic::failure("debug", e.kind(), e.to_string())),
            }
        }
        result
    }

    /// Decode recognised MRZ text. Text that came back as fewer than two
    /// lines is re-split by its length.
    pub fn decode_text(&self, text: &str) -> PassportExtraction {
        let mut lines = clean_mrz_text(text);
        let stream: String = lines.concat();
        let info: MrzFormatInfo = classify_format(&stream);
        debug!("MRZ text classified as {}", info.description);
        if lines.len() < 2 {
            lines = info.lines.clone();
        }

        let mut result = PassportExtraction {
            mrz_info: Some(info),
            ..PassportExtraction::default()
        };

        match self.decoder.decode(&lines) {
            Ok(mut record) => {
                if let Some(grammar) = &self.grammar {
                    if !grammar.matches(&record.passport_number) {
                        match grammar.correct(&record.passport_number, self.config.max_correction_edits) {
                            Some(fixed) => {
                                result.diagnostics.push(Diagnostic::note(
                                    "correct",
                                    format!(
                                        "{} corrected from {} ({} edits)",
                                        grammar.name(),
                                        record.passport_number,
                                        fixed.edits
                                    ),
                                ));
                                record.passport_number = fixed.value;
                            }
                            None => result.diagnostics.push(Diagnostic::note(
                                "correct",
                                format!("{} {} does not fit the expected shape", grammar.name(), record.passport_number),
                            )),
                        }
                    }
                }
                info!("MRZ decoded for passport {}", record.passport_number);
                result.success = true;
                result.data = Some(record);
            }
            Err(e) => {
                warn!("MRZ decode failed: {}", e);
                result.error = Some(e.to_string());
                result.error_kind = Some(e.kind());
            }
        }
        result
    }
}

impl PassportExtraction {
    pub fn failed_with(&self, kind: ErrorKind) -> bool {
        self.error_kind == Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MrzFormat;
    use crate::processing::mrz_locator::tests::page;
    use crate::processing::ocr::RecognizedText;
    use image::GrayImage;
    use std::time::Duration;

    const LINE1: &str = "P<EGYDOE<<JOHN<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<";
    const LINE2: &str = "A123456789EGY9001019M3001011<<<<<<<<<<<<<<08";

    struct Fixed {
        text: &'static str,
        delay: Option<Duration>,
    }

    impl TextRecognizer for Fixed {
        fn recognize(&self, region: &GrayImage, hint: LanguageHint) -> Result<RecognizedText, KycError> {
            assert_eq!(hint, LanguageHint::Mrz);
            assert_eq!(region.dimensions(), (1110, 140));
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            Ok(RecognizedText::new(self.text))
        }
    }

    fn extractor(text: &'static str, config: PipelineConfig) -> PassportExtractor {
        PassportExtractor::new(Arc::new(Fixed { text, delay: None }), config).unwrap()
    }

    fn passport_page() -> RgbImage {
        page(600, 400, &[(320, 335), (345, 360)], 20, 580)
    }

    #[test]
    fn test_full_passport_extraction() {
        let text: &'static str = "P<EGYDOE<<JOHN<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<\nA123456789EGY9001019M3001011<<<<<<<<<<<<<<08\n";
        let config = PipelineConfig {
            debug_artifacts: true,
            ..PipelineConfig::default()
        };
        let result = extractor(text, config).extract(&passport_page());
        assert!(result.success, "{:?}", result.error);
        assert!(result.mrz_detected);
        assert!(result.mrz_box.is_some());
        let data = result.data.unwrap();
        assert_eq!(data.surname, "DOE");
        assert_eq!(data.given_names, "JOHN");
        assert_eq!(data.passport_number, "A12345678");
        assert_eq!(data.nationality, "EGYPT");
        assert_eq!(result.mrz_info.unwrap().format, MrzFormat::Td3);
        assert!(result.debug.mrz_crop_png.is_some());
    }

    #[test]
    fn test_blank_page_reports_missing_mrz() {
        let blank = RgbImage::from_pixel(500, 350, image::Rgb([250, 250, 250]));
        let result = extractor("", PipelineConfig::default()).extract(&blank);
        assert!(!result.success);
        assert!(!result.mrz_detected);
        assert_eq!(result.error.as_deref(), Some("MRZ region not detected"));
    }

    #[test]
    fn test_single_stream_is_split_by_length() {
        let result = extractor("", PipelineConfig::default()).decode_text(&format!("{}{}", LINE1, LINE2));
        assert!(result.success);
        let info = result.mrz_info.unwrap();
        assert_eq!(info.line_count, 2);
        assert_eq!(result.data.unwrap().surname, "DOE");
    }

    #[test]
    fn test_empty_text_is_insufficient_data() {
        let result = extractor("", PipelineConfig::default()).decode_text("  \n ");
        assert!(!result.success);
        assert!(result.failed_with(ErrorKind::InsufficientMrzData));
    }

    #[test]
    fn test_passport_number_is_corrected_to_grammar() {
        let text = format!("{}\nA1234S678<EGY9001019M3001011<<<<<<<<<<<<<<08", LINE1);
        let result = extractor("", PipelineConfig::default()).decode_text(&text);
        assert_eq!(result.data.unwrap().passport_number, "A12345678");
        assert!(result.diagnostics.iter().any(|d| d.message.contains("A1234S678")));

        let config = PipelineConfig {
            correct_passport_number: false,
            ..PipelineConfig::default()
        };
        let result = extractor("", config).decode_text(&text);
        assert_eq!(result.data.unwrap().passport_number, "A1234S678");
    }

    #[test]
    fn test_recognizer_timeout_is_recoverable() {
        let config = PipelineConfig {
            stage_timeout_ms: Some(20),
            ..PipelineConfig::default()
        };
        let slow = Fixed {
            text: "",
            delay: Some(Duration::from_millis(500)),
        };
        let result = PassportExtractor::new(Arc::new(slow), config)
            .unwrap()
            .extract(&passport_page());
        assert!(!result.success);
        assert!(result.mrz_detected);
        assert!(result.failed_with(ErrorKind::Timeout));
    }

    #[test]
    fn test_country_table_override() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"name": "Arab Republic of Egypt", "alpha-3": "EGY"}}]"#).unwrap();
        let config = PipelineConfig {
            country_table: Some(file.path().to_path_buf()),
            ..PipelineConfig::default()
        };
        let result = extractor("", config).decode_text(&format!("{}\n{}", LINE1, LINE2));
        assert_eq!(result.data.unwrap().issuing_country, "ARAB REPUBLIC OF EGYPT");
    }
}
