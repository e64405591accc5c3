//! Quality metrics for enhanced images
//!
//! Four scalar scores per image: Shannon entropy, mean local contrast,
//! Sobel edge sharpness, and Michelson contrast. All are pure functions
//! of the pixel data; gradients and variances are accumulated in f64 to
//! avoid premature rounding of 8-bit intensities.

use crate::decoders::GrayImage;
use crate::error::{Error, Result};
use crate::models::QualityMetrics;

/// Side length of the box kernel used for local contrast
pub const LOCAL_CONTRAST_KERNEL: usize = 3;

/// Epsilon guarding the Michelson denominator on fully-black images
const MICHELSON_EPS: f64 = 1e-10;

/// Compute the full metric set for an image.
///
/// Fails with `InvalidImage` if the image is empty; the individual
/// metrics are total on valid input.
pub fn compute_metrics(image: &GrayImage) -> Result<QualityMetrics> {
    if image.is_empty() {
        return Err(Error::InvalidImage("empty image".to_string()));
    }

    Ok(QualityMetrics {
        entropy: entropy(image),
        local_contrast: local_contrast(image, LOCAL_CONTRAST_KERNEL),
        edge_sharpness: edge_sharpness(image),
        michelson_contrast: michelson_contrast(image),
    })
}

/// Shannon entropy of the 256-bin intensity histogram, base 2.
///
/// Zero-probability bins are dropped before summing, so a constant image
/// scores exactly 0 and the maximum for 8-bit input is 8 bits.
pub fn entropy(image: &GrayImage) -> f64 {
    let mut histogram = [0u64; 256];
    for &value in &image.data {
        histogram[value as usize] += 1;
    }

    let total = image.pixel_count() as f64;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Mean local standard deviation under a `kernel` x `kernel` box filter.
///
/// Local variance is the box-filtered squared deviation from the local
/// mean; border pixels use replicate padding for both passes so the
/// result does not depend on traversal order.
pub fn local_contrast(image: &GrayImage, kernel: usize) -> f64 {
    debug_assert!(kernel % 2 == 1, "kernel side must be odd");

    let local_mean = box_filter(image, |img, x, y| img.get_clamped(x, y) as f64, kernel);

    let width = image.width as usize;
    let sq_dev = |img: &GrayImage, x: i64, y: i64| {
        let xc = x.clamp(0, img.width as i64 - 1);
        let yc = y.clamp(0, img.height as i64 - 1);
        let mean = local_mean[yc as usize * width + xc as usize];
        let d = img.get_clamped(x, y) as f64 - mean;
        d * d
    };
    let local_var = box_filter(image, sq_dev, kernel);

    let sum: f64 = local_var.iter().map(|&v| v.max(0.0).sqrt()).sum();
    sum / image.pixel_count() as f64
}

/// Mean Sobel gradient magnitude over the image
pub fn edge_sharpness(image: &GrayImage) -> f64 {
    let mut sum = 0.0f64;
    for y in 0..image.height as i64 {
        for x in 0..image.width as i64 {
            let p = |dx: i64, dy: i64| image.get_clamped(x + dx, y + dy) as f64;

            let gx = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1))
                - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
            let gy = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1))
                - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));

            sum += (gx * gx + gy * gy).sqrt();
        }
    }
    sum / image.pixel_count() as f64
}

/// Michelson contrast `(max - min) / (max + min)`, epsilon-guarded so a
/// fully-black image scores 0 instead of dividing by zero
pub fn michelson_contrast(image: &GrayImage) -> f64 {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for &value in &image.data {
        min = min.min(value);
        max = max.max(value);
    }

    let (min, max) = (min as f64, max as f64);
    (max - min) / (max + min + MICHELSON_EPS)
}

/// Box-filter an arbitrary per-pixel quantity with replicate padding
fn box_filter<F>(image: &GrayImage, value_at: F, kernel: usize) -> Vec<f64>
where
    F: Fn(&GrayImage, i64, i64) -> f64,
{
    let radius = (kernel / 2) as i64;
    let norm = (kernel * kernel) as f64;
    let mut out = vec![0.0f64; image.pixel_count()];

    for y in 0..image.height as i64 {
        for x in 0..image.width as i64 {
            let mut acc = 0.0f64;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    acc += value_at(image, x + dx, y + dy);
                }
            }
            out[y as usize * image.width as usize + x as usize] = acc / norm;
        }
    }
    out
}
