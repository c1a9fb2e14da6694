//! # Settings Store
//!
//! Holds the current pipeline settings and hot-reloads them from a backing
//! TOML document. The file is only re-read when its modification time
//! changes, and a freshly parsed document is merged *over* the previous
//! settings, so a partial file overrides only the keys it names.
//!
//! Read/parse failures are absorbed here: the previous settings stay in
//! effect and a warning is logged.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::filters::FilterSpec;

/// Interpolation method used when resizing image sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[serde(alias = "NEAREST")]
    Nearest,
    #[serde(alias = "LINEAR")]
    #[default]
    Linear,
}

impl Interpolation {
    pub fn filter_type(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Linear => FilterType::Triangle,
        }
    }
}

/// Full set of pipeline settings.
///
/// Every field corresponds to one key of the settings document. Keys the
/// pipeline does not recognize are kept in `extra` and survive merges
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Requested capture width (camera default when unset)
    pub width: Option<u32>,

    /// Requested capture height (camera default when unset)
    pub height: Option<u32>,

    /// Erosion kernel size applied to the mask (0 disables)
    pub erode: u32,

    /// Dilation kernel size applied to the mask (0 disables)
    pub dilate: u32,

    /// Box blur kernel size applied to the mask (0 disables)
    pub blur: u32,

    /// Foreground probability threshold; scores above become 1.0
    pub segmentation_threshold: f32,

    /// Blur strength for the synthesized background when no image is set
    pub blur_background: u32,

    /// Path to the background image or animation directory
    pub background_image: String,

    /// Path to the overlay image or animation directory
    pub overlay_image: Option<String>,

    /// Virtual device the composited stream is written to
    pub virtual_video_device: String,

    /// Real camera device frames are captured from
    pub real_video_device: String,

    /// Number of raw masks averaged to reduce flicker (minimum 1)
    pub average_masks: usize,

    /// Background animation playback rate
    pub background_fps: f64,

    /// Overlay animation playback rate
    pub overlay_fps: f64,

    pub flip_horizontal: bool,
    pub flip_vertical: bool,

    pub background_filters: Vec<FilterSpec>,
    pub foreground_filters: Vec<FilterSpec>,
    pub result_filters: Vec<FilterSpec>,
    pub overlay_filters: Vec<FilterSpec>,

    pub background_interpolation_method: Interpolation,

    /// Replace the output with a grayscale rendering of the mask
    pub debug_show_mask: bool,

    /// Unrecognized keys, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            erode: 0,
            dilate: 0,
            blur: 0,
            segmentation_threshold: 0.75,
            blur_background: 0,
            background_image: "background.jpg".to_string(),
            overlay_image: None,
            virtual_video_device: "/dev/video2".to_string(),
            real_video_device: "/dev/video0".to_string(),
            average_masks: 3,
            background_fps: 1.0,
            overlay_fps: 1.0,
            flip_horizontal: false,
            flip_vertical: false,
            background_filters: Vec::new(),
            foreground_filters: Vec::new(),
            result_filters: Vec::new(),
            overlay_filters: Vec::new(),
            background_interpolation_method: Interpolation::Linear,
            debug_show_mask: false,
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Merge a parsed document over these settings. Only keys present in
    /// the patch are replaced; everything else keeps its previous value.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.width {
            self.width = Some(v);
        }
        if let Some(v) = patch.height {
            self.height = Some(v);
        }
        if let Some(v) = patch.erode {
            self.erode = v;
        }
        if let Some(v) = patch.dilate {
            self.dilate = v;
        }
        if let Some(v) = patch.blur {
            self.blur = v;
        }
        if let Some(v) = patch.segmentation_threshold {
            self.segmentation_threshold = v;
        }
        if let Some(v) = patch.blur_background {
            self.blur_background = v;
        }
        if let Some(v) = patch.background_image {
            self.background_image = v;
        }
        if let Some(v) = patch.overlay_image {
            self.overlay_image = Some(v);
        }
        if let Some(v) = patch.virtual_video_device {
            self.virtual_video_device = v;
        }
        if let Some(v) = patch.real_video_device {
            self.real_video_device = v;
        }
        if let Some(v) = patch.average_masks {
            self.average_masks = v;
        }
        if let Some(v) = patch.background_fps {
            self.background_fps = v;
        }
        if let Some(v) = patch.overlay_fps {
            self.overlay_fps = v;
        }
        if let Some(v) = patch.flip_horizontal {
            self.flip_horizontal = v;
        }
        if let Some(v) = patch.flip_vertical {
            self.flip_vertical = v;
        }
        if let Some(v) = patch.background_filters {
            self.background_filters = v;
        }
        if let Some(v) = patch.foreground_filters {
            self.foreground_filters = v;
        }
        if let Some(v) = patch.result_filters {
            self.result_filters = v;
        }
        if let Some(v) = patch.overlay_filters {
            self.overlay_filters = v;
        }
        if let Some(v) = patch.background_interpolation_method {
            self.background_interpolation_method = v;
        }
        if let Some(v) = patch.debug_show_mask {
            self.debug_show_mask = v;
        }
        self.extra.extend(patch.extra);
    }
}

/// Partial settings document as read from disk. Every field is optional so
/// a file may override any subset of keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub erode: Option<u32>,
    pub dilate: Option<u32>,
    pub blur: Option<u32>,
    pub segmentation_threshold: Option<f32>,
    pub blur_background: Option<u32>,
    pub background_image: Option<String>,
    pub overlay_image: Option<String>,
    pub virtual_video_device: Option<String>,
    pub real_video_device: Option<String>,
    pub average_masks: Option<usize>,
    pub background_fps: Option<f64>,
    pub overlay_fps: Option<f64>,
    pub flip_horizontal: Option<bool>,
    pub flip_vertical: Option<bool>,
    pub background_filters: Option<Vec<FilterSpec>>,
    pub foreground_filters: Option<Vec<FilterSpec>>,
    pub result_filters: Option<Vec<FilterSpec>>,
    pub overlay_filters: Option<Vec<FilterSpec>>,
    pub background_interpolation_method: Option<Interpolation>,
    pub debug_show_mask: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

/// Hot-reloading store for the settings document.
///
/// `reload` stats the backing file and re-parses it only when the
/// modification time differs from the last observed one. The return value
/// tells the caller whether a new document was applied, so dependent caches
/// can be invalidated.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    mtime: Option<SystemTime>,
    settings: Settings,
}

impl ConfigStore {
    /// Create a store seeded with default settings. Nothing is read until
    /// the first `reload`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mtime: None,
            settings: Settings::default(),
        }
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing file if its modification time changed.
    ///
    /// Returns `true` when a new document was applied. Any read or parse
    /// failure leaves the previous settings in effect and returns `false`.
    pub fn reload(&mut self) -> bool {
        let mtime = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(_) => return false,
        };
        if self.mtime == Some(mtime) {
            return false;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => {
                warn!(
                    "{}",
                    ConfigError::Unreadable {
                        path: self.path.display().to_string()
                    }
                );
                return false;
            }
        };

        match toml::from_str::<SettingsPatch>(&content) {
            Ok(patch) => {
                self.mtime = Some(mtime);
                self.settings.apply(patch);
                info!("Reloaded settings from {:?}", self.path);
                true
            }
            Err(e) => {
                // Remember the mtime so a broken file is not re-parsed
                // every frame; the next edit triggers another attempt.
                self.mtime = Some(mtime);
                warn!(
                    "{}",
                    ConfigError::Parse {
                        path: self.path.display().to_string(),
                        reason: e.to_string(),
                    }
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn touch(path: &Path, content: &str, mtime_offset_secs: u64) {
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        drop(file);
        // Bump the mtime explicitly; consecutive writes within the same
        // filesystem timestamp granularity would otherwise be missed.
        let new_time = SystemTime::now() + std::time::Duration::from_secs(mtime_offset_secs);
        let times = fs::FileTimes::new().set_modified(new_time);
        let file = File::options().write(true).open(path).unwrap();
        file.set_times(times).unwrap();
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.segmentation_threshold, 0.75);
        assert_eq!(settings.average_masks, 3);
        assert_eq!(settings.background_image, "background.jpg");
        assert_eq!(settings.real_video_device, "/dev/video0");
        assert_eq!(settings.virtual_video_device, "/dev/video2");
        assert_eq!(settings.background_interpolation_method, Interpolation::Linear);
        assert!(!settings.debug_show_mask);
    }

    #[test]
    fn test_partial_override_keeps_previous_values() {
        let mut settings = Settings::default();
        let patch: SettingsPatch = toml::from_str("erode = 5").unwrap();
        settings.apply(patch);

        assert_eq!(settings.erode, 5);
        // Untouched keys keep their previous values
        assert_eq!(settings.average_masks, 3);
        assert_eq!(settings.background_image, "background.jpg");
    }

    #[test]
    fn test_unrecognized_keys_pass_through() {
        let mut settings = Settings::default();
        let patch: SettingsPatch = toml::from_str("custom_key = \"kept\"\ndilate = 2").unwrap();
        settings.apply(patch);

        assert_eq!(settings.dilate, 2);
        assert_eq!(
            settings.extra.get("custom_key").and_then(|v| v.as_str()),
            Some("kept")
        );

        // A later document without the key leaves it untouched
        let patch: SettingsPatch = toml::from_str("erode = 1").unwrap();
        settings.apply(patch);
        assert!(settings.extra.contains_key("custom_key"));
    }

    #[test]
    fn test_reload_is_gated_on_mtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        touch(&path, "erode = 3", 1);

        let mut store = ConfigStore::new(&path);
        assert!(store.reload());
        assert_eq!(store.settings().erode, 3);

        // Unchanged mtime: no reload reported
        assert!(!store.reload());

        touch(&path, "erode = 7", 2);
        assert!(store.reload());
        assert_eq!(store.settings().erode, 7);
    }

    #[test]
    fn test_parse_failure_retains_previous_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        touch(&path, "blur = 4", 1);

        let mut store = ConfigStore::new(&path);
        assert!(store.reload());
        assert_eq!(store.settings().blur, 4);

        touch(&path, "blur = [not toml", 2);
        assert!(!store.reload());
        assert_eq!(store.settings().blur, 4);
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let mut store = ConfigStore::new("/nonexistent/settings.toml");
        assert!(!store.reload());
        assert_eq!(store.settings().average_masks, 3);
    }

    #[test]
    fn test_interpolation_aliases() {
        let patch: SettingsPatch =
            toml::from_str("background_interpolation_method = \"NEAREST\"").unwrap();
        assert_eq!(
            patch.background_interpolation_method,
            Some(Interpolation::Nearest)
        );
        let patch: SettingsPatch =
            toml::from_str("background_interpolation_method = \"linear\"").unwrap();
        assert_eq!(
            patch.background_interpolation_method,
            Some(Interpolation::Linear)
        );
    }
}
