//! # Image and Animation Sources
//!
//! Loads, resizes and caches the background and overlay frame sequences.
//! A source path may point at a single image or at a directory whose
//! children are played as a looping animation. Sources are re-decoded
//! only when their modification time changes.

pub mod cache;
pub mod frameset;

// Re-exports for convenience
pub use cache::{Lookup, SourceCache};
pub use frameset::FrameSet;
