use std::path::PathBuf;

use image::RgbaImage;

/// An ordered sequence of equally-sized frames loaded from one source.
///
/// A single image file yields a set of length 1; a directory yields one
/// frame per decodable child, played as a looping animation. Frames are
/// pre-resized to the capture resolution at load time, so the compositor
/// never resizes on the hot path.
#[derive(Debug, Clone)]
pub struct FrameSet {
    frames: Vec<RgbaImage>,
    has_alpha: bool,
    source: PathBuf,
}

impl FrameSet {
    pub fn new(frames: Vec<RgbaImage>, has_alpha: bool, source: PathBuf) -> Self {
        Self {
            frames,
            has_alpha,
            source,
        }
    }

    /// Number of frames; at least 1 for any constructed set
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether the decoded source carried a real alpha channel.
    ///
    /// Frames are stored as RGBA either way; this records whether the
    /// alpha values are meaningful or synthesized as fully opaque.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn source(&self) -> &std::path::Path {
        &self.source
    }

    /// Frame at a playback index; the index is reduced modulo the set
    /// length so it always lands inside the sequence.
    pub fn frame(&self, index: usize) -> &RgbaImage {
        &self.frames[index % self.frames.len()]
    }

    pub fn frames(&self) -> &[RgbaImage] {
        &self.frames
    }
}
