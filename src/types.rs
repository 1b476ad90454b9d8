use thiserror::Error;

/// Pixel dimensions of an image or mask buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count as a usize, for buffer allocation.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Whether a prompt point marks foreground or background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLabel {
    /// Foreground click: "include this region".
    Positive,
    /// Background click: "exclude this region".
    Negative,
}

/// A single user click in original-image pixel coordinates.
///
/// Prompts are ephemeral: they condition one `segment` call and are
/// not retained by the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPrompt {
    pub x: f32,
    pub y: f32,
    pub label: PointLabel,
}

impl PointPrompt {
    pub fn positive(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            label: PointLabel::Positive,
        }
    }

    pub fn negative(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            label: PointLabel::Negative,
        }
    }
}

/// Single-channel byte mask at original image resolution.
///
/// Values are 0 (background) or 255 (foreground) straight out of
/// segmentation; brush blending and feathering may introduce
/// intermediate values. The mask buffer is owned by the caller
/// (typically a document layer), never by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    /// Row-major, one byte per pixel, length `width * height`.
    pub data: Vec<u8>,
    pub size: ImageSize,
    /// Model confidence for this mask, in [0, 1].
    pub confidence: f64,
}

impl Mask {
    /// Create an empty (all-background) mask.
    pub fn new(size: ImageSize) -> Self {
        Self {
            data: vec![0u8; size.pixel_count()],
            size,
            confidence: 0.0,
        }
    }

    /// Mask value at (x, y); 0 when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.size.width || y >= self.size.height {
            return 0;
        }
        self.data[(y * self.size.width + x) as usize]
    }
}

/// Brush painting direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushMode {
    /// Blend toward foreground (255).
    Add,
    /// Blend toward background (0).
    Remove,
}

/// Brush configuration for manual mask touch-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushConfig {
    /// Brush radius in pixels; values below 1 are treated as 1.
    pub radius: f32,
    /// Edge hardness in [0, 1]; 1.0 is a hard-edged stamp.
    pub hardness: f32,
    pub mode: BrushMode,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            radius: 10.0,
            hardness: 0.8,
            mode: BrushMode::Add,
        }
    }
}

/// Errors surfaced by the segmentation provider.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// `set_image` was called before `initialize`.
    #[error("provider not initialized; call initialize() first")]
    NotInitialized,

    /// `segment` was called before a successful `set_image`.
    #[error("no image set; call set_image() first")]
    NoImageSet,

    /// The encoder response carried no recognizable embedding tensor.
    #[error("no embedding output found in encoder response")]
    NoEmbeddingOutput,

    /// The decoder response carried no recognizable mask tensor.
    #[error("no mask output found in decoder response")]
    NoMaskOutput,

    /// Several decoder outputs matched the mask key heuristic.
    #[error("ambiguous mask outputs in decoder response: {0:?}")]
    AmbiguousMaskOutput(Vec<String>),

    /// Failure inside the injected inference runtime.
    #[error(transparent)]
    Runtime(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SegmentError>;
