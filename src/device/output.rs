use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};

use image::RgbaImage;
use tracing::{info, warn};

use crate::device::FrameSink;
use crate::error::DeviceError;

/// Virtual camera output through an `ffmpeg` subprocess.
///
/// Raw rgb24 frames are written to ffmpeg's stdin and re-emitted on a
/// V4L2 loopback device in a format downstream consumers accept.
pub struct FfmpegSink {
    child: Child,
    stdin: ChildStdin,
}

impl FfmpegSink {
    /// Open a virtual output device at the given resolution
    pub fn open(device: &str, width: u32, height: u32) -> Result<Self, DeviceError> {
        info!("Opening virtual camera {} at {}x{}", device, width, height);

        let mut child = Command::new("ffmpeg")
            .args([
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-video_size",
                &format!("{}x{}", width, height),
                "-i",
                "-",
                "-f",
                "v4l2",
                "-pix_fmt",
                "yuv420p",
                device,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DeviceError::Open {
                device: device.to_string(),
                reason: e.to_string(),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| DeviceError::Open {
            device: device.to_string(),
            reason: "no stdin pipe to ffmpeg".to_string(),
        })?;

        Ok(Self { child, stdin })
    }
}

impl FrameSink for FfmpegSink {
    fn send(&mut self, frame: &RgbaImage) -> Result<(), DeviceError> {
        // Strip the synthesized alpha back off for the wire format
        let mut rgb = Vec::with_capacity(frame.as_raw().len() / 4 * 3);
        for pixel in frame.pixels() {
            rgb.extend_from_slice(&[pixel[0], pixel[1], pixel[2]]);
        }

        self.stdin
            .write_all(&rgb)
            .map_err(|e| DeviceError::Emit {
                reason: e.to_string(),
            })
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("Failed to stop output process: {}", e);
        }
        let _ = self.child.wait();
    }
}
