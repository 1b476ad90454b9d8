//! Gaussian mask feathering.

use crate::types::ImageSize;

/// Soften mask edges with a separable Gaussian blur.
///
/// A radius below 1 returns an unchanged copy. Sampling past the image
/// edge clamps to the nearest valid row/column, so solid regions stay
/// solid at the border instead of darkening.
pub fn feather(mask: &[u8], size: ImageSize, radius: f32) -> Vec<u8> {
    if radius < 1.0 {
        return mask.to_vec();
    }

    let r = radius.round() as i32;
    let kernel = gaussian_kernel(r);
    let (w, h) = (size.width as i32, size.height as i32);

    // Horizontal pass
    let mut temp = vec![0.0f32; mask.len()];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x + k as i32 - r).clamp(0, w - 1);
                sum += mask[(y * w + sx) as usize] as f32 * weight;
            }
            temp[(y * w + x) as usize] = sum;
        }
    }

    // Vertical pass
    let mut out = vec![0u8; mask.len()];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y + k as i32 - r).clamp(0, h - 1);
                sum += temp[(sy * w + x) as usize] * weight;
            }
            out[(y * w + x) as usize] = sum.round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

/// Normalized 1-D Gaussian of half-width r, sigma = r/3.
fn gaussian_kernel(r: i32) -> Vec<f32> {
    let sigma = r as f32 / 3.0;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-r..=r)
        .map(|i| (-(i * i) as f32 / denom).exp())
        .collect();
    let total: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= total;
    }
    kernel
}
