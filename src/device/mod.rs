//! # Video Device I/O
//!
//! Thin boundary around the real camera and the virtual output device.
//! Frames cross it as raw rgb24 piped through an external `ffmpeg`
//! process, so no native capture or V4L2 bindings are linked in. The
//! [`FrameSource`] and [`FrameSink`] traits keep the pipeline testable
//! without any device present.

pub mod capture;
pub mod output;

// Re-exports for convenience
pub use capture::FfmpegCapture;
pub use output::FfmpegSink;

use image::RgbaImage;

use crate::error::DeviceError;

/// Produces captured camera frames, one per call, blocking until the next
/// frame is available
pub trait FrameSource: Send {
    /// Capture resolution, fixed for the lifetime of the source
    fn resolution(&self) -> (u32, u32);

    fn capture(&mut self) -> Result<RgbaImage, DeviceError>;
}

/// Accepts composited frames at capture resolution; fire-and-forget, no
/// backpressure
pub trait FrameSink: Send {
    fn send(&mut self, frame: &RgbaImage) -> Result<(), DeviceError>;
}

/// Check whether the `ffmpeg` executable is on PATH
pub fn check_ffmpeg_available() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
