//! Brush stamping with radial falloff.

use crate::types::{BrushConfig, BrushMode, ImageSize};

/// Paint a sequence of stroke points onto a mask.
///
/// The input is never mutated; a freshly allocated buffer is returned.
/// Each kernel cell blends the current value toward an absolute target
/// (255 for add, 0 for remove) by the cell's falloff strength, so
/// overlapping points converge on the target instead of accumulating
/// past it. An empty point list returns an unchanged copy.
pub fn brush_stroke(
    mask: &[u8],
    size: ImageSize,
    points: &[(f32, f32)],
    config: &BrushConfig,
) -> Vec<u8> {
    let mut out = mask.to_vec();
    if points.is_empty() {
        return out;
    }

    let r = (config.radius.round() as i32).max(1);
    let side = (2 * r + 1) as usize;
    let kernel = falloff_kernel(r, config.hardness);

    let target: f32 = match config.mode {
        BrushMode::Add => 255.0,
        BrushMode::Remove => 0.0,
    };

    let (w, h) = (size.width as i32, size.height as i32);

    for &(px, py) in points {
        let cx = px.round() as i32;
        let cy = py.round() as i32;

        for ky in 0..side {
            let y = cy + ky as i32 - r;
            if y < 0 || y >= h {
                continue;
            }
            for kx in 0..side {
                let x = cx + kx as i32 - r;
                if x < 0 || x >= w {
                    continue;
                }
                let strength = kernel[ky * side + kx];
                if strength <= 0.0 {
                    continue;
                }
                let idx = (y * w + x) as usize;
                let current = out[idx] as f32;
                out[idx] = (current + (target - current) * strength).round() as u8;
            }
        }
    }

    out
}

/// Square kernel of side 2r+1 holding per-cell blend strength.
fn falloff_kernel(r: i32, hardness: f32) -> Vec<f32> {
    let side = (2 * r + 1) as usize;
    let mut kernel = vec![0.0f32; side * side];

    for ky in 0..side {
        let dy = ky as i32 - r;
        for kx in 0..side {
            let dx = kx as i32 - r;
            let dist = ((dx * dx + dy * dy) as f32).sqrt();
            if dist > r as f32 {
                continue;
            }
            kernel[ky * side + kx] = if hardness >= 1.0 {
                1.0
            } else {
                let exponent = 1.0 / (1.0 - hardness + 0.01);
                (1.0 - (dist / r as f32).powf(exponent)).clamp(0.0, 1.0)
            };
        }
    }

    kernel
}
