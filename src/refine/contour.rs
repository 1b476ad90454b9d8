//! Contour extraction for boundary visualization.

use crate::types::ImageSize;

/// Collect the boundary pixels of a mask, in row-major scan order.
///
/// A foreground pixel (value 255) is on the contour when it sits on the
/// image edge or has at least one 4-connected background neighbor. The
/// result feeds overlay rendering (marching ants) only; nothing else is
/// computed from it.
pub fn extract_contour(mask: &[u8], size: ImageSize) -> Vec<(u32, u32)> {
    let (w, h) = (size.width, size.height);
    let mut contour = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if mask[(y * w + x) as usize] != 255 {
                continue;
            }
            let on_edge = x == 0 || y == 0 || x == w - 1 || y == h - 1;
            let has_background_neighbor = !on_edge
                && (mask[(y * w + x - 1) as usize] == 0
                    || mask[(y * w + x + 1) as usize] == 0
                    || mask[((y - 1) * w + x) as usize] == 0
                    || mask[((y + 1) * w + x) as usize] == 0);
            if on_edge || has_background_neighbor {
                contour.push((x, y));
            }
        }
    }

    contour
}

/// Per-view marching-ants animation phase.
///
/// Owned by whatever renders the contour; advancing it moves the dash
/// pattern one step. Keeping this a plain value (instead of shared
/// module state) lets independent views animate independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AntsPhase {
    offset: u32,
}

impl AntsPhase {
    /// Dash pattern period in pixels (dash plus gap).
    pub const PERIOD: u32 = 8;

    pub fn new() -> Self {
        Self::default()
    }

    /// Current dash offset, always below `PERIOD`.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Step the animation by one pixel.
    pub fn advance(&mut self) {
        self.offset = (self.offset + 1) % Self::PERIOD;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_pixels_are_not_contour() {
        // 3x3 solid block centered in 5x5: every block pixel has a
        // zero 4-neighbor except the center.
        let size = ImageSize::new(5, 5);
        let mut mask = vec![0u8; size.pixel_count()];
        for y in 1..4u32 {
            for x in 1..4u32 {
                mask[(y * 5 + x) as usize] = 255;
            }
        }
        let contour = extract_contour(&mask, size);
        assert_eq!(contour.len(), 8);
        assert!(!contour.contains(&(2, 2)));
        assert!(contour.contains(&(1, 1)));
        assert!(contour.contains(&(3, 2)));
    }

    #[test]
    fn edge_touching_foreground_is_contour() {
        let size = ImageSize::new(3, 3);
        let mask = vec![255u8; size.pixel_count()];
        let contour = extract_contour(&mask, size);
        // Solid mask: only the image-edge ring, not the center
        assert_eq!(contour.len(), 8);
        assert!(!contour.contains(&(1, 1)));
    }

    #[test]
    fn scan_order_is_row_major() {
        let size = ImageSize::new(4, 2);
        let mut mask = vec![0u8; size.pixel_count()];
        mask[1] = 255; // (1, 0)
        mask[4] = 255; // (0, 1)
        let contour = extract_contour(&mask, size);
        assert_eq!(contour, vec![(1, 0), (0, 1)]);
    }

    #[test]
    fn grey_pixels_are_not_contour() {
        let size = ImageSize::new(3, 1);
        let mask = vec![0u8, 128u8, 0u8];
        assert!(extract_contour(&mask, size).is_empty());
    }

    #[test]
    fn ants_phase_wraps() {
        let mut phase = AntsPhase::new();
        for _ in 0..AntsPhase::PERIOD {
            phase.advance();
        }
        assert_eq!(phase.offset(), 0);
    }
}
