use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::device::FrameSource;
use crate::error::DeviceError;

/// Camera capture through an `ffmpeg` subprocess.
///
/// ffmpeg reads the V4L2 device and streams raw rgb24 frames to its
/// stdout; each `capture` call blocks until one full frame has been read.
pub struct FfmpegCapture {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
}

impl FfmpegCapture {
    /// Open a camera device at the given resolution
    pub fn open(device: &str, width: u32, height: u32) -> Result<Self, DeviceError> {
        info!("Opening camera {} at {}x{}", device, width, height);

        let mut child = Command::new("ffmpeg")
            .args([
                "-loglevel",
                "error",
                "-f",
                "v4l2",
                "-video_size",
                &format!("{}x{}", width, height),
                "-i",
                device,
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DeviceError::Open {
                device: device.to_string(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| DeviceError::Open {
            device: device.to_string(),
            reason: "no stdout pipe from ffmpeg".to_string(),
        })?;

        Ok(Self {
            child,
            stdout,
            width,
            height,
        })
    }
}

impl FrameSource for FfmpegCapture {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capture(&mut self) -> Result<RgbaImage, DeviceError> {
        let mut rgb = vec![0u8; (self.width * self.height * 3) as usize];
        self.stdout
            .read_exact(&mut rgb)
            .map_err(|e| DeviceError::Capture {
                reason: e.to_string(),
            })?;

        debug!("Captured {}x{} frame", self.width, self.height);

        let mut rgba = Vec::with_capacity((self.width * self.height * 4) as usize);
        for chunk in rgb.chunks_exact(3) {
            rgba.extend_from_slice(chunk);
            rgba.push(255);
        }
        RgbaImage::from_raw(self.width, self.height, rgba).ok_or(DeviceError::Capture {
            reason: "frame buffer size mismatch".to_string(),
        })
    }
}

impl Drop for FfmpegCapture {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("Failed to stop capture process: {}", e);
        }
        let _ = self.child.wait();
    }
}
