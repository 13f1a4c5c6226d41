use crate::utils::KycError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Thresholds behind [`crate::models::QualityMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QualityThresholds {
    /// Laplacian variance below which a frame is blurry.
    pub blur_variance: f32,
    /// Laplacian variance that maps to a blur score of 1.0.
    pub sharp_variance: f32,
    pub min_brightness: f32,
    pub max_brightness: f32,
    pub min_width: u32,
    pub min_height: u32,
    pub good_score: u8,
    pub medium_score: u8,
    /// Variance of the left photo band above which a photo is assumed.
    pub photo_variance: f32,
    pub photo_band_ratio: f32,
    /// Mean field confidence a frame must beat to be captured.
    pub min_mean_confidence: f32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        QualityThresholds {
            blur_variance: 100.0,
            sharp_variance: 500.0,
            min_brightness: 50.0,
            max_brightness: 220.0,
            min_width: 480,
            min_height: 300,
            good_score: 70,
            medium_score: 50,
            photo_variance: 100.0,
            photo_band_ratio: 0.3,
            min_mean_confidence: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MrzLocatorConfig {
    pub blur_sigma: f32,
    pub rect_kernel: (u32, u32),
    pub square_kernel: (u32, u32),
    pub erosions: u32,
    pub min_width_ratio: f32,
    pub min_height_ratio: f32,
    pub pad_ratio: f32,
    /// Size the MRZ crop is resized to before recognition.
    pub ocr_size: (u32, u32),
}

impl Default for MrzLocatorConfig {
    fn default() -> Self {
        MrzLocatorConfig {
            blur_sigma: 0.8,
            rect_kernel: (25, 7),
            square_kernel: (21, 21),
            erosions: 2,
            min_width_ratio: 0.80,
            min_height_ratio: 0.04,
            pad_ratio: 0.03,
            ocr_size: (1110, 140),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    pub field_confidence: f32,
    pub document_confidence: f32,
    pub digit_confidence: f32,
    /// Vertical scale applied to the national ID zone before digit detection.
    pub nid_zone_scale: f32,
    pub stage_timeout_ms: Option<u64>,
    pub quality: QualityThresholds,
    pub mrz: MrzLocatorConfig,
    pub country_table: Option<PathBuf>,
    pub correct_passport_number: bool,
    pub max_correction_edits: usize,
    pub debug_artifacts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            field_confidence: 0.3,
            document_confidence: 0.5,
            digit_confidence: 0.25,
            nid_zone_scale: 1.5,
            stage_timeout_ms: None,
            quality: QualityThresholds::default(),
            mrz: MrzLocatorConfig::default(),
            country_table: None,
            correct_passport_number: true,
            max_correction_edits: 2,
            debug_artifacts: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KycError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, KycError> {
        let config: PipelineConfig = serde_json::from_str(json)
            .map_err(|e| KycError::Config(format!("Invalid pipeline config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), KycError> {
        let floors = [
            ("fieldConfidence", self.field_confidence),
            ("documentConfidence", self.document_confidence),
            ("digitConfidence", self.digit_confidence),
            ("quality.minMeanConfidence", self.quality.min_mean_confidence),
            ("quality.photoBandRatio", self.quality.photo_band_ratio),
        ];
        for (name, value) in floors {
            if !(0.0..=1.0).contains(&value) {
                return Err(KycError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.nid_zone_scale < 1.0 {
            return Err(KycError::Config(format!(
                "nidZoneScale must be at least 1.0, got {}",
                self.nid_zone_scale
            )));
        }
        if self.stage_timeout_ms == Some(0) {
            return Err(KycError::Config("stageTimeoutMs must be positive".to_string()));
        }

        let q = &self.quality;
        if q.min_brightness >= q.max_brightness {
            return Err(KycError::Config(
                "quality.minBrightness must be below quality.maxBrightness".to_string(),
            ));
        }
        if q.sharp_variance <= 0.0 {
            return Err(KycError::Config("quality.sharpVariance must be positive".to_string()));
        }
        if q.medium_score > q.good_score || q.good_score > 100 {
            return Err(KycError::Config(
                "quality scores must satisfy mediumScore <= goodScore <= 100".to_string(),
            ));
        }

        let m = &self.mrz;
        let kernels = [m.rect_kernel, m.square_kernel, m.ocr_size];
        if kernels.iter().any(|&(w, h)| w == 0 || h == 0) {
            return Err(KycError::Config("MRZ kernels and OCR size must be non-zero".to_string()));
        }
        let ratios = [m.min_width_ratio, m.min_height_ratio, m.pad_ratio];
        if ratios.iter().any(|r| !(0.0..=1.0).contains(r)) {
            return Err(KycError::Config("MRZ ratios must be within [0, 1]".to_string()));
        }
        Ok(())
    }
}
