//! Morphological boundary adjustment with a circular structuring element.
//!
//! Border policy: dilation skips out-of-bounds neighbors (the edge
//! never blocks growth); erosion requires every neighbor in-bounds and
//! foreground, so foreground touching the image edge erodes away.
//! Inputs are binarized at 128 before the scan so grey values cannot
//! leak through repeated dilate/erode chains.

use crate::types::ImageSize;

/// Grow the foreground by `radius` pixels.
pub fn dilate(mask: &[u8], size: ImageSize, radius: f32) -> Vec<u8> {
    morphology(mask, size, radius, Op::Dilate)
}

/// Shrink the foreground by `radius` pixels.
pub fn erode(mask: &[u8], size: ImageSize, radius: f32) -> Vec<u8> {
    morphology(mask, size, radius, Op::Erode)
}

/// Expand (`amount > 0`) or contract (`amount < 0`) the mask boundary.
///
/// `amount == 0` returns a value-equal copy with a distinct allocation.
pub fn adjust_boundary(mask: &[u8], size: ImageSize, amount: i32) -> Vec<u8> {
    match amount {
        a if a > 0 => dilate(mask, size, a as f32),
        a if a < 0 => erode(mask, size, (-a) as f32),
        _ => mask.to_vec(),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Op {
    Dilate,
    Erode,
}

fn morphology(mask: &[u8], size: ImageSize, radius: f32, op: Op) -> Vec<u8> {
    if radius <= 0.0 {
        return mask.to_vec();
    }

    let binary: Vec<bool> = mask.iter().map(|&v| v >= 128).collect();
    let offsets = circular_offsets(radius.round() as i32);
    let (w, h) = (size.width as i32, size.height as i32);

    let mut out = vec![0u8; mask.len()];
    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            let keep = match op {
                Op::Dilate => offsets.iter().any(|&(dx, dy)| {
                    let (nx, ny) = (x + dx, y + dy);
                    nx >= 0 && nx < w && ny >= 0 && ny < h && binary[(ny * w + nx) as usize]
                }),
                Op::Erode => offsets.iter().all(|&(dx, dy)| {
                    let (nx, ny) = (x + dx, y + dy);
                    nx >= 0 && nx < w && ny >= 0 && ny < h && binary[(ny * w + nx) as usize]
                }),
            };
            if keep {
                out[idx] = 255;
            }
        }
    }

    out
}

/// Integer offsets (dx, dy) with dx^2 + dy^2 <= r^2.
fn circular_offsets(r: i32) -> Vec<(i32, i32)> {
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}
