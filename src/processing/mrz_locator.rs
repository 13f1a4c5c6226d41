use crate::config::MrzLocatorConfig;
use crate::models::BoundingBox;
use crate::processing::image::ImageProcessor;
use crate::processing::morphology;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::horizontal_scharr;
use imageproc::morphology::erode as erode_binary;
use log::{debug, info};

/// L-infinity radius 1, a 3x3 square.
const EROSION_RADIUS: u8 = 1;

/// Located machine readable zone: padded box in source coordinates and the
/// grayscale crop under it.
#[derive(Debug, Clone)]
pub struct MrzRegion {
    pub bbox: BoundingBox,
    pub crop: GrayImage,
}

/// Finds the MRZ block with morphological text-line isolation.
///
/// Dark horizontal strokes are enhanced with a blackhat filter, turned into
/// a horizontal gradient map, then closed, thresholded and closed again so
/// the MRZ lines fuse into a single blob. The bottom-most blob that spans
/// most of the page width is taken as the MRZ.
pub struct MrzLocator {
    config: MrzLocatorConfig,
}

impl Default for MrzLocator {
    fn default() -> Self {
        Self::new(MrzLocatorConfig::default())
    }
}

impl MrzLocator {
    pub fn new(config: MrzLocatorConfig) -> Self {
        MrzLocator { config }
    }

    pub fn locate(&self, img: &RgbImage) -> Option<MrzRegion> {
        let gray = ImageProcessor::to_gray(img);
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let mask = self.text_line_mask(&gray);
        let mut candidates: Vec<BoundingBox> = find_contours::<u32>(&mask)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|c| {
                let xs = c.points.iter().map(|p| p.x);
                let ys = c.points.iter().map(|p| p.y);
                let (x1, x2) = (xs.clone().min()?, xs.max()?);
                let (y1, y2) = (ys.clone().min()?, ys.max()?);
                Some(BoundingBox::new(x1, y1, x2 + 1, y2 + 1))
            })
            .collect();
        debug!("MRZ locator found {} external contours", candidates.len());

        // Bottom-most first.
        candidates.sort_by(|a, b| b.y1.cmp(&a.y1));

        let found = candidates.into_iter().find(|bbox| {
            let width_ratio = bbox.width() as f32 / width as f32;
            let height_ratio = bbox.height() as f32 / height as f32;
            width_ratio > self.config.min_width_ratio && height_ratio > self.config.min_height_ratio
        })?;

        let bbox = pad_box(&found, self.config.pad_ratio, width, height);
        info!(
            "MRZ region located at ({}, {}) size {}x{}",
            bbox.x1,
            bbox.y1,
            bbox.width(),
            bbox.height()
        );

        Some(MrzRegion {
            crop: ImageProcessor::crop_gray(&gray, &bbox),
            bbox,
        })
    }

    fn text_line_mask(&self, gray: &GrayImage) -> GrayImage {
        let cfg = &self.config;
        let blurred = gaussian_blur_f32(gray, cfg.blur_sigma);
        let blackhat = morphology::blackhat(&blurred, cfg.rect_kernel);
        let gradient = scaled_gradient(&blackhat);
        let closed = morphology::close(&gradient, cfg.rect_kernel);
        let level = otsu_level(&closed);
        let binary = threshold(&closed, level);
        let mut fused = morphology::close(&binary, cfg.square_kernel);
        for _ in 0..cfg.erosions {
            fused = erode_binary(&fused, Norm::LInf, EROSION_RADIUS);
        }
        fused
    }
}

/// Grow `found` by `ratio` of its own width and height on every side,
/// clamped to a `width` x `height` page.
fn pad_box(found: &BoundingBox, ratio: f32, width: u32, height: u32) -> BoundingBox {
    let pad_x = (found.width() as f32 * ratio) as u32;
    let pad_y = (found.height() as f32 * ratio) as u32;
    BoundingBox::new(
        found.x1.saturating_sub(pad_x),
        found.y1.saturating_sub(pad_y),
        (found.x2 + pad_x).min(width),
        (found.y2 + pad_y).min(height),
    )
}

/// Absolute horizontal Scharr response min-max scaled to 0..=255.
fn scaled_gradient(img: &GrayImage) -> GrayImage {
    let raw = horizontal_scharr(img);
    let magnitudes: Vec<u32> = raw.pixels().map(|p| p[0].unsigned_abs() as u32).collect();
    let min = magnitudes.iter().copied().min().unwrap_or(0);
    let max = magnitudes.iter().copied().max().unwrap_or(0);
    let span = max - min;

    let mut out = GrayImage::new(img.width(), img.height());
    for (pixel, &m) in out.pixels_mut().zip(magnitudes.iter()) {
        let v = if span == 0 {
            m.min(255)
        } else {
            (m - min) * 255 / span
        };
        *pixel = Luma([v as u8]);
    }
    out
}
