//! Undo/redo commands wrapping mask refinement.
//!
//! Each command snapshots the mask and computes the refined result
//! eagerly at construction, so `execute`/`undo` are plain O(n) buffer
//! copies. Construct a command only when committing an edit; a
//! discarded command has already paid the full algorithmic cost.

use crate::refine;
use crate::types::{BrushConfig, BrushMode, Mask};

/// Contract consumed by the external undo-stack collaborator.
///
/// The undo stack owns the document and passes the live mask in; a
/// command only ever touches the buffer it was constructed from.
pub trait MaskEditCommand {
    /// Apply the refined buffer to the live mask.
    fn execute(&self, mask: &mut Mask);
    /// Restore the pre-edit buffer.
    fn undo(&self, mask: &mut Mask);
    /// Human-readable label for the undo history.
    fn description(&self) -> &str;
}

/// Eager before/after snapshot pair shared by all command variants.
struct Snapshot {
    old_data: Vec<u8>,
    new_data: Vec<u8>,
    description: String,
}

impl Snapshot {
    fn apply(&self, mask: &mut Mask, data: &[u8]) {
        if mask.data.len() != data.len() {
            tracing::warn!(
                "Skipping '{}': mask length {} does not match snapshot length {}",
                self.description,
                mask.data.len(),
                data.len()
            );
            return;
        }
        mask.data.copy_from_slice(data);
    }
}

macro_rules! impl_mask_edit_command {
    ($ty:ty) => {
        impl MaskEditCommand for $ty {
            fn execute(&self, mask: &mut Mask) {
                self.snapshot.apply(mask, &self.snapshot.new_data);
            }

            fn undo(&self, mask: &mut Mask) {
                self.snapshot.apply(mask, &self.snapshot.old_data);
            }

            fn description(&self) -> &str {
                &self.snapshot.description
            }
        }
    };
}

/// Paint a brush stroke onto the mask.
pub struct BrushStrokeCommand {
    snapshot: Snapshot,
}

impl BrushStrokeCommand {
    pub fn new(mask: &Mask, points: &[(f32, f32)], config: &BrushConfig) -> Self {
        let new_data = refine::brush_stroke(&mask.data, mask.size, points, config);
        let description = match config.mode {
            BrushMode::Add => "Brush add mask".to_string(),
            BrushMode::Remove => "Brush remove mask".to_string(),
        };
        Self {
            snapshot: Snapshot {
                old_data: mask.data.clone(),
                new_data,
                description,
            },
        }
    }
}

impl_mask_edit_command!(BrushStrokeCommand);

/// Feather the mask edges.
pub struct FeatherCommand {
    snapshot: Snapshot,
}

impl FeatherCommand {
    pub fn new(mask: &Mask, radius: f32) -> Self {
        Self {
            snapshot: Snapshot {
                old_data: mask.data.clone(),
                new_data: refine::feather(&mask.data, mask.size, radius),
                description: format!("Feather mask ({}px)", radius.round() as i32),
            },
        }
    }
}

impl_mask_edit_command!(FeatherCommand);

/// Expand or contract the mask boundary.
pub struct AdjustBoundaryCommand {
    snapshot: Snapshot,
}

impl AdjustBoundaryCommand {
    pub fn new(mask: &Mask, amount: i32) -> Self {
        let description = if amount >= 0 {
            format!("Expand mask boundary ({}px)", amount)
        } else {
            format!("Contract mask boundary ({}px)", -amount)
        };
        Self {
            snapshot: Snapshot {
                old_data: mask.data.clone(),
                new_data: refine::adjust_boundary(&mask.data, mask.size, amount),
                description,
            },
        }
    }
}

impl_mask_edit_command!(AdjustBoundaryCommand);
