// Grayscale morphology with rectangular structuring elements.
//
// Rectangles are separable, so every operation runs as a horizontal pass
// followed by a vertical one. Pixels outside the image are ignored, which
// matches treating the border as neutral for both min and max.

use image::GrayImage;

#[derive(Clone, Copy)]
enum Extremum {
    Min,
    Max,
}

impl Extremum {
    fn pick(self, a: u8, b: u8) -> u8 {
        match self {
            Extremum::Min => a.min(b),
            Extremum::Max => a.max(b),
        }
    }
}

fn pass(img: &GrayImage, kernel: u32, horizontal: bool, op: Extremum) -> GrayImage {
    let (w, h) = img.dimensions();
    if kernel <= 1 || w == 0 || h == 0 {
        return img.clone();
    }
    let before = (kernel / 2) as i64;
    let after = ((kernel - 1) / 2) as i64;
    let len = if horizontal { w } else { h } as i64;

    GrayImage::from_fn(w, h, |x, y| {
        let at = if horizontal { x } else { y } as i64;
        let lo = (at - before).max(0);
        let hi = (at + after).min(len - 1);
        let mut acc = img.get_pixel(x, y)[0];
        for i in lo..=hi {
            let v = if horizontal {
                img.get_pixel(i as u32, y)[0]
            } else {
                img.get_pixel(x, i as u32)[0]
            };
            acc = op.pick(acc, v);
        }
        image::Luma([acc])
    })
}

fn apply(img: &GrayImage, kernel: (u32, u32), op: Extremum) -> GrayImage {
    let rows = pass(img, kernel.0, true, op);
    pass(&rows, kernel.1, false, op)
}

/// Minimum over a `width x height` window centred on each pixel.
pub fn erode(img: &GrayImage, kernel: (u32, u32)) -> GrayImage {
    apply(img, kernel, Extremum::Min)
}

/// Maximum over a `width x height` window centred on each pixel.
pub fn dilate(img: &GrayImage, kernel: (u32, u32)) -> GrayImage {
    apply(img, kernel, Extremum::Max)
}

pub fn close(img: &GrayImage, kernel: (u32, u32)) -> GrayImage {
    erode(&dilate(img, kernel), kernel)
}

/// Closing minus the input: bright where dark strokes are narrower than the
/// kernel.
pub fn blackhat(img: &GrayImage, kernel: (u32, u32)) -> GrayImage {
    let closed = close(img, kernel);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        image::Luma([closed.get_pixel(x, y)[0].saturating_sub(img.get_pixel(x, y)[0])])
    })
}
