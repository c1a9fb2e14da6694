//! # Compositing Pipeline
//!
//! The compositor blends foreground, background and overlay under the
//! refined alpha mask and keeps the animation playback clocks; the engine
//! sequences one full pass per captured frame across settings reload,
//! capture, segmentation, mask processing, filtering and output.

pub mod compositor;
pub mod engine;

// Re-exports for convenience
pub use compositor::{blend, blend_overlay, PlaybackState};
pub use engine::PipelineEngine;
