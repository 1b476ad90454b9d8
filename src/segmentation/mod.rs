pub mod codec;
mod provider;

pub use provider::SegmentationProvider;
