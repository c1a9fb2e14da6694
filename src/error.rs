use thiserror::Error;

/// Main error type for the camveil library
#[derive(Error, Debug)]
pub enum CamveilError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Image source error: {0}")]
    Source(#[from] SourceError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Segmentation error: {0}")]
    Segment(#[from] SegmentError),

    #[error("Video device error: {0}")]
    Device(#[from] DeviceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Settings-document errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file: {path}")]
    Unreadable { path: String },

    #[error("Failed to parse settings file {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Errors while loading background/overlay image sources
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Cannot stat image source: {path}")]
    Stat { path: String },

    #[error("Failed to decode image: {path}")]
    Decode { path: String },

    #[error("Image source contains no usable frames: {path}")]
    Empty { path: String },

    #[error("Overlay source has no alpha channel: {path}")]
    OverlayWithoutAlpha { path: String },
}

/// Filter chain resolution errors
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown filter: {name}")]
    Unknown { name: String },

    #[error("Invalid parameters for filter '{name}': {reason}")]
    BadParams { name: String, reason: String },
}

/// Segmentation collaborator errors
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("Inference failed: {reason}")]
    Inference { reason: String },

    #[error("Score map shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

/// Camera capture and virtual device errors
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("ffmpeg executable not found on PATH")]
    FfmpegMissing,

    #[error("Failed to open video device {device}: {reason}")]
    Open { device: String, reason: String },

    #[error("Failed to read a camera frame: {reason}")]
    Capture { reason: String },

    #[error("Failed to write frame to virtual device: {reason}")]
    Emit { reason: String },
}

/// Convenience type alias for Results using CamveilError
pub type Result<T> = std::result::Result<T, CamveilError>;

impl CamveilError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error can be absorbed at the component boundary that
    /// detected it. Device failures and unknown filter names cannot; they
    /// terminate the pipeline.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Source(_) => true,
            Self::Segment(_) => true,
            Self::Filter(FilterError::BadParams { .. }) => true,
            Self::Filter(FilterError::Unknown { .. }) => false,
            Self::Device(_) => false,
            Self::Io(_) => false,
            Self::Generic(_) => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Device(DeviceError::FfmpegMissing) => {
                "ffmpeg was not found. Please install ffmpeg and make sure it is on PATH."
                    .to_string()
            }
            Self::Device(DeviceError::Open { device, .. }) => {
                format!(
                    "Could not open video device '{}'. Check that the device exists and is not in use.",
                    device
                )
            }
            Self::Filter(FilterError::Unknown { name }) => {
                format!("Filter '{}' is not registered. Check the filter name in your settings.", name)
            }
            _ => self.to_string(),
        }
    }
}
