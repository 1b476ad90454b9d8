//! Numeric conversions between pixel buffers and model tensors.
//!
//! Everything here is a pure function: same inputs, same outputs, no
//! state. Coordinate mapping and normalization must match the model
//! contract exactly; an off-by-one or scale error here silently
//! corrupts masks downstream.

use crate::runtime::Tensor;
use crate::types::{ImageSize, PointLabel, PointPrompt};
use ndarray::Array4;

/// Side of the square canvas the encoder consumes.
pub const MODEL_INPUT_SIZE: u32 = 1024;

/// ImageNet channel means (RGB).
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations (RGB).
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Default probability threshold for mask binarization.
pub const MASK_THRESHOLD: f32 = 0.5;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Convert an RGBA image into the encoder's normalized NCHW tensor.
///
/// The image is scaled by `min(1024/w, 1024/h)` with nearest-neighbor
/// sampling into the top-left of a zero-filled 1024x1024 canvas, and
/// each channel is ImageNet-normalized. Returns the [1,3,1024,1024]
/// tensor together with the resized dimensions, which `point_tensors`
/// needs for prompt coordinate scaling.
pub fn preprocess(rgba: &[u8], size: ImageSize) -> (Tensor, ImageSize) {
    let _span = tracing::debug_span!("preprocess").entered();

    let canvas = MODEL_INPUT_SIZE as usize;
    let scale = f32::min(
        MODEL_INPUT_SIZE as f32 / size.width as f32,
        MODEL_INPUT_SIZE as f32 / size.height as f32,
    );
    let resized = ImageSize::new(
        (size.width as f32 * scale).round() as u32,
        (size.height as f32 * scale).round() as u32,
    );

    let mut tensor = Array4::<f32>::zeros((1, 3, canvas, canvas));

    for y in 0..resized.height.min(MODEL_INPUT_SIZE) {
        // Nearest-neighbor source row, clamped to the last valid row
        let src_y = ((y as f32 / scale).floor() as u32).min(size.height - 1);
        for x in 0..resized.width.min(MODEL_INPUT_SIZE) {
            let src_x = ((x as f32 / scale).floor() as u32).min(size.width - 1);
            let src = ((src_y * size.width + src_x) * 4) as usize;

            for c in 0..3 {
                let v = rgba[src + c] as f32 / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (v - MEAN[c]) / STD[c];
            }
        }
    }

    let tensor = Tensor::new(tensor.into_raw_vec(), vec![1, 3, canvas, canvas]);
    (tensor, resized)
}

/// Build the decoder's point-coordinate and point-label tensors.
///
/// Prompt coordinates arrive in original-image pixels and are scaled
/// linearly into the resized (model) space. Labels map to 1.0 for
/// foreground and 0.0 for background.
pub fn point_tensors(
    points: &[PointPrompt],
    original: ImageSize,
    resized: ImageSize,
) -> (Tensor, Tensor) {
    let n = points.len();
    let mut coords = Vec::with_capacity(n * 2);
    let mut labels = Vec::with_capacity(n);

    let sx = resized.width as f32 / original.width as f32;
    let sy = resized.height as f32 / original.height as f32;

    for point in points {
        coords.push(point.x * sx);
        coords.push(point.y * sy);
        labels.push(match point.label {
            PointLabel::Positive => 1.0,
            PointLabel::Negative => 0.0,
        });
    }

    (
        Tensor::new(coords, vec![1, n, 2]),
        Tensor::new(labels, vec![1, n]),
    )
}

/// Binarize decoder logits into a byte mask at original resolution.
///
/// The logit grid is upsampled with nearest-neighbor sampling, run
/// through a sigmoid, and thresholded. The threshold comparison is
/// inclusive, so a logit of exactly 0.0 lands on the foreground side
/// of the default 0.5 threshold.
pub fn postprocess_mask(
    logits: &[f32],
    logit_size: ImageSize,
    original: ImageSize,
    threshold: f32,
) -> Vec<u8> {
    let _span = tracing::debug_span!("postprocess").entered();

    let mut mask = vec![0u8; original.pixel_count()];

    for y in 0..original.height {
        let src_y = (y as u64 * logit_size.height as u64 / original.height as u64)
            .min(logit_size.height as u64 - 1) as u32;
        for x in 0..original.width {
            let src_x = (x as u64 * logit_size.width as u64 / original.width as u64)
                .min(logit_size.width as u64 - 1) as u32;
            let logit = logits[(src_y * logit_size.width + src_x) as usize];
            if sigmoid(logit) >= threshold {
                mask[(y * original.width + x) as usize] = 255;
            }
        }
    }

    mask
}

/// Heuristic mask confidence from raw logits.
///
/// Used only when the decoder does not supply its own score tensor.
/// Large-magnitude logits mean the model was decisive; the mean
/// absolute logit is squashed through a shifted sigmoid.
pub fn confidence(logits: &[f32]) -> f64 {
    if logits.is_empty() {
        return 0.0;
    }
    let mean_abs: f32 = logits.iter().map(|l| l.abs()).sum::<f32>() / logits.len() as f32;
    sigmoid(mean_abs - 3.0) as f64
}
