use crate::config::QualityThresholds;
use crate::models::{QualityLevel, QualityMetrics};
use image::GrayImage;

/// Frame quality: sharpness, exposure and resolution folded into one score.
pub fn assess(gray: &GrayImage, thresholds: &QualityThresholds) -> QualityMetrics {
    let (width, height) = gray.dimensions();
    let variance = laplacian_variance(gray);
    let brightness = mean_intensity(gray);

    let is_blurry = variance < thresholds.blur_variance;
    let is_too_dark = brightness < thresholds.min_brightness;
    let is_too_bright = brightness > thresholds.max_brightness;
    let size_ok = width >= thresholds.min_width && height >= thresholds.min_height;

    let mut score: i32 = 100;
    if is_blurry {
        score -= 40;
    }
    if is_too_dark || is_too_bright {
        score -= 30;
    }
    if !size_ok {
        score -= 20;
    }
    let quality_score = score.clamp(0, 100) as u8;

    let quality_level = if quality_score >= thresholds.good_score {
        QualityLevel::Good
    } else if quality_score >= thresholds.medium_score {
        QualityLevel::Medium
    } else {
        QualityLevel::Poor
    };

    QualityMetrics {
        blur_score: (variance / thresholds.sharp_variance).min(1.0),
        brightness,
        is_blurry,
        is_too_dark,
        is_too_bright,
        size_ok,
        width,
        height,
        quality_score,
        quality_level,
    }
}

/// The card photo sits in the left band; a flat band means it is covered or
/// out of frame.
pub fn photo_present(gray: &GrayImage, thresholds: &QualityThresholds) -> bool {
    let band = (gray.width() as f32 * thresholds.photo_band_ratio) as u32;
    if band == 0 || gray.height() == 0 {
        return false;
    }
    let values = (0..gray.height())
        .flat_map(|y| (0..band).map(move |x| (x, y)))
        .map(|(x, y)| gray.get_pixel(x, y)[0] as f64);
    variance(values) > thresholds.photo_variance as f64
}

/// Variance of the 4-neighbour Laplacian; higher is sharper.
pub fn laplacian_variance(gray: &GrayImage) -> f32 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let px = |x: u32, y: u32| gray.get_pixel(x, y)[0] as f64;
    let responses = (1..h - 1).flat_map(|y| (1..w - 1).map(move |x| (x, y))).map(|(x, y)| {
        px(x, y - 1) + px(x, y + 1) + px(x - 1, y) + px(x + 1, y) - 4.0 * px(x, y)
    });
    variance(responses) as f32
}

fn mean_intensity(gray: &GrayImage) -> f32 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    (sum as f64 / count as f64) as f32
}

fn variance(values: impl Iterator<Item = f64>) -> f64 {
    let (mut sum, mut sum_sq, mut count) = (0.0f64, 0.0f64, 0u64);
    for v in values {
        sum += v;
        sum_sq += v * v;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    (sum_sq / count as f64 - mean * mean).max(0.0)
}
