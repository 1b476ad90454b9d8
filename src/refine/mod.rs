//! Pure pixel algorithms for manual mask refinement.
//!
//! Every function takes the mask by reference and returns a freshly
//! allocated buffer of the same pixel count; inputs are never mutated
//! and degenerate parameters (empty stroke, radius below 1, zero
//! amount) return well-defined copies rather than errors. These are
//! CPU-bound O(width * height * kernel-area) loops; callers with large
//! images or radii should run them off the interaction thread.

mod brush;
mod contour;
mod feather;
mod morphology;

pub use brush::brush_stroke;
pub use contour::{extract_contour, AntsPhase};
pub use feather::feather;
pub use morphology::{adjust_boundary, dilate, erode};
