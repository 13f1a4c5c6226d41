use crate::models::{BoundingBox, DetectedRegion, FieldLabel};
use crate::utils::KycError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageOutputFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;

/// Image helpers shared by the pipelines.
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn decode(bytes: &[u8]) -> Result<RgbImage, KycError> {
        if bytes.is_empty() {
            return Err(KycError::ImageDecodeFailure("empty image buffer".to_string()));
        }
        let img = image::load_from_memory(bytes)
            .map_err(|e| KycError::ImageDecodeFailure(format!("Failed to decode image: {}", e)))?;
        Ok(img.to_rgb8())
    }

    pub fn crop(img: &RgbImage, bbox: &BoundingBox) -> RgbImage {
        imageops::crop_imm(img, bbox.x1, bbox.y1, bbox.width(), bbox.height()).to_image()
    }

    pub fn crop_gray(img: &GrayImage, bbox: &BoundingBox) -> GrayImage {
        imageops::crop_imm(img, bbox.x1, bbox.y1, bbox.width(), bbox.height()).to_image()
    }

    pub fn to_gray(img: &RgbImage) -> GrayImage {
        imageops::grayscale(img)
    }

    pub fn resize_gray(img: &GrayImage, width: u32, height: u32) -> GrayImage {
        imageops::resize(img, width, height, FilterType::Triangle)
    }

    /// Rotate counter-clockwise about the integer image centre, keeping the
    /// original canvas size. Pixels that fall outside the source take the
    /// nearest edge pixel.
    pub fn rotate_replicate(img: &RgbImage, degrees: f32) -> RgbImage {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 || degrees.rem_euclid(360.0) == 0.0 {
            return img.clone();
        }

        let theta = degrees.to_radians();
        let (alpha, beta) = (theta.cos(), theta.sin());
        let (cx, cy) = ((w / 2) as f32, (h / 2) as f32);
        let (max_x, max_y) = ((w - 1) as f32, (h - 1) as f32);

        RgbImage::from_fn(w, h, |dx, dy| {
            let (rx, ry) = (dx as f32 - cx, dy as f32 - cy);
            let sx = (alpha * rx - beta * ry + cx).round().clamp(0.0, max_x);
            let sy = (beta * rx + alpha * ry + cy).round().clamp(0.0, max_y);
            *img.get_pixel(sx as u32, sy as u32)
        })
    }

    pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, KycError> {
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| KycError::ImageEncode(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Detection overlay: boundary in blue, fields in green, digits in red.
    pub fn draw_overlay(img: &RgbImage, regions: &[DetectedRegion]) -> RgbImage {
        let mut canvas = img.clone();
        for region in regions {
            let color = match region.label {
                FieldLabel::DocumentBoundary => Rgb([0, 0, 255]),
                FieldLabel::Digit(_) => Rgb([255, 0, 0]),
                _ => Rgb([0, 200, 0]),
            };
            let bbox = &region.bbox;
            if bbox.width() == 0 || bbox.height() == 0 {
                continue;
            }
            let rect = Rect::at(bbox.x1 as i32, bbox.y1 as i32).of_size(bbox.width(), bbox.height());
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        let img = numbered(5, 3);
        assert_eq!(ImageProcessor::rotate_replicate(&img, 0.0), img);
        assert_eq!(ImageProcessor::rotate_replicate(&img, 360.0), img);
    }

    #[test]
    fn test_half_turn_mirrors_odd_square() {
        let img = numbered(5, 5);
        let rotated = ImageProcessor::rotate_replicate(&img, 180.0);
        assert_eq!(rotated.dimensions(), (5, 5));
        assert_eq!(*rotated.get_pixel(0, 0), Rgb([4, 4, 0]));
        assert_eq!(*rotated.get_pixel(4, 4), Rgb([0, 0, 0]));
        assert_eq!(*rotated.get_pixel(2, 2), Rgb([2, 2, 0]));
    }

    #[test]
    fn test_quarter_turn_is_counter_clockwise() {
        let img = numbered(5, 5);
        let rotated = ImageProcessor::rotate_replicate(&img, 90.0);
        // The top-right corner lands top-left.
        assert_eq!(*rotated.get_pixel(0, 0), Rgb([4, 0, 0]));
        assert_eq!(*rotated.get_pixel(0, 4), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_rotation_keeps_canvas_size() {
        let img = numbered(8, 4);
        let rotated = ImageProcessor::rotate_replicate(&img, 90.0);
        assert_eq!(rotated.dimensions(), (8, 4));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = ImageProcessor::decode(b"not an image").unwrap_err();
        assert_eq!(err.kind(), crate::utils::ErrorKind::ImageDecodeFailure);
        assert!(ImageProcessor::decode(&[]).is_err());
    }

    #[test]
    fn test_png_round_trip_through_decode() {
        let img = numbered(6, 4);
        let png = ImageProcessor::encode_png(&DynamicImage::ImageRgb8(img.clone())).unwrap();
        assert_eq!(ImageProcessor::decode(&png).unwrap(), img);
    }

    #[test]
    fn test_crop_and_overlay() {
        let img = numbered(10, 10);
        let bbox = BoundingBox::new(2, 3, 6, 8);
        let crop = ImageProcessor::crop(&img, &bbox);
        assert_eq!(crop.dimensions(), (4, 5));
        assert_eq!(*crop.get_pixel(0, 0), Rgb([2, 3, 0]));

        let region = DetectedRegion::new(FieldLabel::Serial, 0.9, bbox);
        let overlay = ImageProcessor::draw_overlay(&img, &[region]);
        assert_eq!(*overlay.get_pixel(2, 3), Rgb([0, 200, 0]));
        assert_eq!(*overlay.get_pixel(4, 5), *img.get_pixel(4, 5));
    }
}
