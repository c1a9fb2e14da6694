//! # Camveil
//!
//! Real-time webcam background replacement, re-emitted as a virtual
//! camera. Frames are captured from the real device, a segmentation
//! collaborator scores each pixel as subject or background, and the
//! pipeline composites the configured background, filter chains and
//! overlay under a temporally smoothed, morphologically refined alpha
//! mask.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//!
//! use camveil::{
//!     config::ConfigStore,
//!     device::{FfmpegCapture, FfmpegSink},
//!     pipeline::PipelineEngine,
//!     segment::ChromaKeySegmenter,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut config = ConfigStore::new("settings.toml");
//! config.reload();
//!
//! let source = FfmpegCapture::open("/dev/video0", 640, 480)?;
//! let sink = FfmpegSink::open("/dev/video2", 640, 480)?;
//!
//! let mut engine = PipelineEngine::new(
//!     config,
//!     Box::new(source),
//!     Box::new(sink),
//!     Box::new(ChromaKeySegmenter::green()),
//! );
//!
//! let interrupt = AtomicBool::new(false);
//! engine.run(&interrupt)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`config`] - Hot-reloading settings store
//! - [`sources`] - Background/overlay image and animation cache
//! - [`filters`] - Declarative filter chains over a registry
//! - [`mask`] - Temporal smoothing and morphological refinement
//! - [`segment`] - Segmentation collaborator boundary and score projection
//! - [`pipeline`] - Compositor and the per-frame orchestration engine
//! - [`device`] - Camera capture and virtual device output
//!
//! ## Custom segmenters
//!
//! Any model can drive the pipeline by implementing the
//! [`Segmenter`](segment::Segmenter) trait:
//!
//! ```rust,no_run
//! use camveil::segment::{ScoreMap, Segmenter};
//! use camveil::error::SegmentError;
//! use image::RgbaImage;
//!
//! struct MyModel;
//!
//! impl Segmenter for MyModel {
//!     fn infer(&mut self, input: &RgbaImage) -> Result<ScoreMap, SegmentError> {
//!         // Run inference and return per-pixel foreground scores
//!         # unimplemented!()
//!     }
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod filters;
pub mod mask;
pub mod pipeline;
pub mod segment;
pub mod sources;

// Re-export commonly used types for convenience
pub use crate::{
    config::{ConfigStore, Settings},
    error::{CamveilError, Result},
    filters::{FilterRegistry, FilterSpec},
    pipeline::PipelineEngine,
    segment::Segmenter, // Export Segmenter trait
};
