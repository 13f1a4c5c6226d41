use crate::utils::{call_bounded, KycError};
use image::GrayImage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const MRZ_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789<";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LanguageHint {
    /// Arabic script: names and address on the national ID card.
    Arabic,
    /// Latin letters and digits: the card serial.
    Latin,
    /// OCR-B machine readable zone alphabet.
    Mrz,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: Option<f32>,
}

impl RecognizedText {
    pub fn new(text: impl Into<String>) -> Self {
        RecognizedText {
            text: text.into(),
            confidence: None,
        }
    }
}

/// Turns a cropped grayscale region into text.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, region: &GrayImage, hint: LanguageHint) -> Result<RecognizedText, KycError>;
}

pub fn recognize_bounded(
    recognizer: &Arc<dyn TextRecognizer>,
    region: &GrayImage,
    hint: LanguageHint,
    stage: &'static str,
    limit: Option<Duration>,
) -> Result<RecognizedText, KycError> {
    if limit.is_none() {
        return recognizer.recognize(region, hint);
    }
    let recognizer = Arc::clone(recognizer);
    let region = region.clone();
    call_bounded(stage, limit, KycError::Recognizer, move || recognizer.recognize(&region, hint))
}

/// Keep only MRZ characters, one entry per non-empty line.
pub fn clean_mrz_text(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.to_uppercase()
                .chars()
                .filter(|c| MRZ_ALPHABET.contains(*c))
                .collect::<String>()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(feature = "tesseract")]
pub use self::engine::TesseractRecognizer;

#[cfg(feature = "tesseract")]
mod engine {
    use super::{LanguageHint, RecognizedText, TextRecognizer, MRZ_ALPHABET};
    use crate::processing::image::ImageProcessor;
    use crate::utils::KycError;
    use image::{DynamicImage, GrayImage};
    use log::debug;
    use std::io::Write;
    use tesseract::{PageSegMode, Tesseract};

    /// Tesseract-backed recognizer. Each call gets its own engine instance and
    /// its own temporary image file.
    #[derive(Debug, Clone, Default)]
    pub struct TesseractRecognizer {
        datapath: Option<String>,
    }

    impl TesseractRecognizer {
        pub fn new(datapath: Option<String>) -> Self {
            TesseractRecognizer { datapath }
        }
    }

    fn language(hint: LanguageHint) -> &'static str {
        match hint {
            LanguageHint::Arabic => "ara",
            LanguageHint::Latin | LanguageHint::Mrz => "eng",
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn recognize(&self, region: &GrayImage, hint: LanguageHint) -> Result<RecognizedText, KycError> {
            let png = ImageProcessor::encode_png(&DynamicImage::ImageLuma8(region.clone()))?;
            let mut temp_file = tempfile::Builder::new().suffix(".png").tempfile()?;
            temp_file.write_all(&png)?;
            let path_str = temp_file
                .path()
                .to_str()
                .ok_or_else(|| KycError::Recognizer("Could not convert path to string".to_string()))?;

            let mut tess = Tesseract::new(self.datapath.as_deref(), Some(language(hint)))
                .map_err(|e| KycError::Recognizer(format!("Failed to initialize Tesseract: {}", e)))?;
            if hint == LanguageHint::Mrz {
                tess = tess
                    .set_variable("tessedit_char_whitelist", MRZ_ALPHABET)
                    .map_err(|e| KycError::Recognizer(format!("Failed to set Tesseract variable: {}", e)))?;
                tess.set_page_seg_mode(PageSegMode::PsmSingleBlock);
            }
            tess = tess
                .set_image(path_str)
                .map_err(|e| KycError::Recognizer(format!("Failed to set image: {}", e)))?;

            let text = tess
                .get_text()
                .map_err(|e| KycError::Recognizer(format!("Failed to extract text: {}", e)))?;
            let confidence = tess.mean_text_conf();
            debug!("Tesseract ({:?}) read {:?} at {}%", hint, text.trim(), confidence);

            Ok(RecognizedText {
                text: text.trim().to_string(),
                confidence: Some(confidence.clamp(0, 100) as f32 / 100.0),
            })
        }
    }
}
