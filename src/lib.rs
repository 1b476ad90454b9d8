//! Interactive click-driven image segmentation.
//!
//! A [`SegmentationProvider`] wraps a two-stage ONNX pipeline: a vision
//! encoder runs once per image and its embedding is cached, then a
//! lightweight prompt decoder turns each set of foreground/background
//! clicks into a [`Mask`] at original image resolution. The [`refine`]
//! module holds pure pixel algorithms (brush, feather, morphology,
//! contour) for manual touch-up, and [`command`] wraps them in
//! eager-snapshot undo/redo commands.
//!
//! The ML runtime is an injected capability ([`runtime::InferenceRuntime`]);
//! [`runtime::OrtRuntime`] is the ONNX Runtime backend, and tests run
//! against in-memory fakes.

pub mod command;
pub mod refine;
pub mod runtime;
pub mod segmentation;
mod types;

pub use command::{AdjustBoundaryCommand, BrushStrokeCommand, FeatherCommand, MaskEditCommand};
pub use segmentation::SegmentationProvider;
pub use types::{
    BrushConfig, BrushMode, ImageSize, Mask, PointLabel, PointPrompt, Result, SegmentError,
};
