use std::fmt;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage, imageops};
use serde::{Deserialize, Serialize};

/// Multiplier used by both the sharpness and contrast passes of the gray method.
pub const ENHANCE_FACTOR: f32 = 2.0;

/// Enhancement strategy that produced a candidate image.
///
/// Declaration order is processing order: `Gray` wins ties against `Hsv`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Gray,
    Hsv,
}

impl Method {
    pub const ALL: [Method; 2] = [Method::Gray, Method::Hsv];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Gray => "GRAY",
            Method::Hsv => "HSV",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A derived bitmap plus the strategy that produced it.
#[derive(Clone, Debug)]
pub struct EnhancementVariant {
    pub method: Method,
    pub image: DynamicImage,
}

/// Inclusive hue/saturation/value window matching one in-game text color.
///
/// Hue is in degrees (0–360), saturation and value in percent (0–100).
/// Bounds are inclusive and compared in double precision, so colors landing
/// exactly on an edge (e.g. hue 80°) are kept.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorWindow {
    pub name: &'static str,
    pub hue: (f64, f64),
    pub saturation: (f64, f64),
    pub value: (f64, f64),
}

impl ColorWindow {
    const fn new(
        name: &'static str,
        hue: (f64, f64),
        saturation: (f64, f64),
        value: (f64, f64),
    ) -> Self {
        Self {
            name,
            hue,
            saturation,
            value,
        }
    }

    pub fn contains(&self, h: f64, s: f64, v: f64) -> bool {
        in_range(h, self.hue) && in_range(s, self.saturation) && in_range(v, self.value)
    }
}

fn in_range(x: f64, (lo, hi): (f64, f64)) -> bool {
    x >= lo && x <= hi
}

/// Text color classes of the drop log. Red is split in two to cover the
/// hue wraparound at 0°/360°.
pub const TEXT_COLOR_WINDOWS: &[ColorWindow] = &[
    ColorWindow::new("red-low", (0.0, 10.0), (50.0, 100.0), (30.0, 100.0)),
    ColorWindow::new("red-high", (340.0, 360.0), (50.0, 100.0), (30.0, 100.0)),
    ColorWindow::new("green", (80.0, 150.0), (30.0, 100.0), (30.0, 100.0)),
    ColorWindow::new("blue", (180.0, 260.0), (30.0, 100.0), (30.0, 100.0)),
    ColorWindow::new("violet", (260.0, 320.0), (30.0, 100.0), (30.0, 100.0)),
    ColorWindow::new("yellow", (30.0, 70.0), (30.0, 100.0), (30.0, 100.0)),
    ColorWindow::new("gray-white", (0.0, 360.0), (0.0, 20.0), (40.0, 100.0)),
];

/// Converts an 8-bit RGB triple to (hue°, saturation%, value%).
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max;
    if max == min {
        return (0.0, 0.0, v * 100.0);
    }

    let delta = max - min;
    let s = delta / max;
    let rc = (max - r) / delta;
    let gc = (max - g) / delta;
    let bc = (max - b) / delta;

    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    let h = (h / 6.0).rem_euclid(1.0);

    (h * 360.0, s * 100.0, v * 100.0)
}

/// Returns true if the pixel falls inside any window of the table.
pub fn is_text_color(pixel: &Rgb<u8>, windows: &[ColorWindow]) -> bool {
    let (h, s, v) = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
    windows.iter().any(|w| w.contains(h, s, v))
}

/// Builds the boolean text mask for an RGB image (true = text).
pub fn text_mask(img: &RgbImage, windows: &[ColorWindow]) -> GrayImage {
    let (width, height) = img.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        if is_text_color(img.get_pixel(x, y), windows) {
            Luma([1u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Converts to 8-bit luminance with ITU-R 601 weights (299/587/114), in
/// 16-bit fixed point with rounding.
pub fn to_luma(img: &RgbImage) -> GrayImage {
    let (width, height) = img.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let l = (u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16;
        Luma([l as u8])
    })
}

/// Gray method: luminance → autocontrast → invert → sharpen → contrast boost.
///
/// Light-on-dark game text comes out dark-on-light, which is what Tesseract
/// is tuned for.
pub fn enhance_gray(image: &DynamicImage) -> EnhancementVariant {
    tracing::debug!("Applying GRAY enhancement");

    let rgb = image.to_rgb8();
    let mut gray = to_luma(&rgb);
    autocontrast(&mut gray);
    imageops::invert(&mut gray);
    let gray = sharpen(&gray, ENHANCE_FACTOR);
    let gray = boost_contrast(&gray, ENHANCE_FACTOR);

    EnhancementVariant {
        method: Method::Gray,
        image: DynamicImage::ImageLuma8(gray),
    }
}

/// HSV method: keep only pixels whose color matches a known text class.
///
/// Matching pixels become black (0,0,0), everything else white (255,255,255).
/// This recovers colored rarity-tier names that the gray method washes out.
pub fn enhance_hsv(image: &DynamicImage) -> EnhancementVariant {
    enhance_hsv_with(image, TEXT_COLOR_WINDOWS)
}

/// HSV method against a caller-supplied window table.
pub fn enhance_hsv_with(image: &DynamicImage, windows: &[ColorWindow]) -> EnhancementVariant {
    let names: Vec<&str> = windows.iter().map(|w| w.name).collect();
    tracing::debug!("Applying HSV enhancement (windows: {})", names.join(", "));

    let rgb = image.to_rgb8();
    let mask = text_mask(&rgb, windows);
    let (width, height) = rgb.dimensions();

    let output = RgbImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] != 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });

    EnhancementVariant {
        method: Method::Hsv,
        image: DynamicImage::ImageRgb8(output),
    }
}

/// Stretches the darkest pixel value to 0 and the lightest to 255.
///
/// A flat image (single value) is left unchanged.
pub fn autocontrast(img: &mut GrayImage) {
    let mut histogram = [0u64; 256];
    for pixel in img.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let lo = histogram.iter().position(|&c| c > 0);
    let hi = histogram.iter().rposition(|&c| c > 0);
    let (lo, hi) = match (lo, hi) {
        (Some(lo), Some(hi)) if hi > lo => (lo, hi),
        _ => return,
    };

    let lut: Vec<u8> = (0..256usize)
        .map(|ix| (ix.saturating_sub(lo) * 255 / (hi - lo)).min(255) as u8)
        .collect();

    for pixel in img.pixels_mut() {
        pixel[0] = lut[pixel[0] as usize];
    }
}

/// Sharpens by extrapolating away from a 3×3 smoothed copy.
///
/// The smoothing kernel is `[1 1 1; 1 5 1; 1 1 1] / 13`; border pixels are
/// not smoothed, so they pass through unchanged.
pub fn sharpen(img: &GrayImage, factor: f32) -> GrayImage {
    let smoothed = smooth(img);
    blend(&smoothed, img, factor)
}

/// Scales every pixel's distance from the mean gray level by `factor`.
pub fn boost_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let count = img.width() as f64 * img.height() as f64;
    if count == 0.0 {
        return img.clone();
    }
    let sum: f64 = img.pixels().map(|p| p[0] as f64).sum();
    let mean = (sum / count + 0.5) as u8;

    let degenerate = GrayImage::from_pixel(img.width(), img.height(), Luma([mean]));
    blend(&degenerate, img, factor)
}

fn smooth(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    if width < 3 || height < 3 {
        return img.clone();
    }

    let mut output = img.clone();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut sum = 0u32;
            for dy in 0..3 {
                for dx in 0..3 {
                    let weight = if dx == 1 && dy == 1 { 5 } else { 1 };
                    sum += weight * img.get_pixel(x + dx - 1, y + dy - 1)[0] as u32;
                }
            }
            let value = (sum as f32 / 13.0 + 0.5) as u8;
            output.put_pixel(x, y, Luma([value]));
        }
    }
    output
}

/// `base + factor * (img - base)`, clamped to 0..=255.
fn blend(base: &GrayImage, img: &GrayImage, factor: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let b = base.get_pixel(x, y)[0] as f32;
        let i = img.get_pixel(x, y)[0] as f32;
        Luma([(b + factor * (i - b)).clamp(0.0, 255.0) as u8])
    })
}
