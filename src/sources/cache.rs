use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::RgbaImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Interpolation;
use crate::error::SourceError;
use crate::filters::{self, BoundFilter};
use crate::sources::frameset::FrameSet;

/// Result of one cache lookup.
///
/// `reloaded` is set when the source was decoded afresh, which tells the
/// caller to rewind its playback position for that set.
#[derive(Debug)]
pub struct Lookup<'a> {
    pub set: Option<&'a FrameSet>,
    pub reloaded: bool,
}

#[derive(Debug)]
struct Entry {
    set: FrameSet,
    /// Observed source mtime; `None` forces a reload on the next lookup
    mtime: Option<SystemTime>,
    size: (u32, u32),
}

/// Cache of decoded background/overlay frame sets, keyed by consumer.
///
/// A source is re-decoded only when its modification time changes (or a
/// reload has been forced via [`invalidate`](SourceCache::invalidate)).
/// Load failures are absorbed: the previously cached set, if any, stays in
/// use.
#[derive(Debug, Default)]
pub struct SourceCache {
    entries: HashMap<String, Entry>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Forget every observed mtime so each source is re-decoded on its
    /// next lookup. Called after any settings change, so that edits which
    /// affect image preprocessing (filters, interpolation, resolution)
    /// take effect without touching the source files.
    pub fn invalidate(&mut self) {
        for entry in self.entries.values_mut() {
            entry.mtime = None;
        }
    }

    /// Fetch the frame set for `key`, reloading from `source` if needed.
    ///
    /// A source that cannot be stat'd or decoded leaves the previous set
    /// in place; `None` is only returned when nothing was ever loaded for
    /// this key.
    pub fn get(
        &mut self,
        key: &str,
        source: &Path,
        size: (u32, u32),
        interpolation: Interpolation,
        chain: &[BoundFilter],
    ) -> Lookup<'_> {
        let mtime = match fs::metadata(source).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(_) => {
                // Transient stat failures keep the previous set alive
                return Lookup {
                    set: self.entries.get(key).map(|e| &e.set),
                    reloaded: false,
                };
            }
        };

        let fresh = self.entries.get(key).is_some_and(|e| {
            e.mtime == Some(mtime) && e.size == size && e.set.source() == source
        });
        if fresh {
            return Lookup {
                set: self.entries.get(key).map(|e| &e.set),
                reloaded: false,
            };
        }

        info!("Loading images from {:?} ...", source);
        match load_frames(source, size, interpolation, chain) {
            Ok((frames, has_alpha)) => {
                debug!("Loaded {} frame(s) from {:?}", frames.len(), source);
                self.entries.insert(
                    key.to_string(),
                    Entry {
                        set: FrameSet::new(frames, has_alpha, source.to_path_buf()),
                        mtime: Some(mtime),
                        size,
                    },
                );
                Lookup {
                    set: self.entries.get(key).map(|e| &e.set),
                    reloaded: true,
                }
            }
            Err(e) => {
                warn!("Failed to load {:?}: {}; keeping previous frames", source, e);
                Lookup {
                    set: self.entries.get(key).map(|e| &e.set),
                    reloaded: false,
                }
            }
        }
    }
}

/// Decode, resize, normalize and filter all frames of a source.
///
/// For a directory, the immediate children are the animation frames in
/// file-name order. Children that fail to decode are skipped; a source
/// with no decodable frames is an error.
fn load_frames(
    source: &Path,
    (width, height): (u32, u32),
    interpolation: Interpolation,
    chain: &[BoundFilter],
) -> Result<(Vec<RgbaImage>, bool), SourceError> {
    let mut paths: Vec<PathBuf> = if source.is_dir() {
        let mut children: Vec<PathBuf> = fs::read_dir(source)
            .map_err(|_| SourceError::Stat {
                path: source.display().to_string(),
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        // Directory enumeration order is not stable across platforms
        children.sort();
        children
    } else {
        vec![source.to_path_buf()]
    };

    let mut frames = Vec::with_capacity(paths.len());
    let mut has_alpha = !paths.is_empty();
    for path in paths.drain(..) {
        let decoded = match image::open(&path) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(
                    "{}: {}",
                    SourceError::Decode {
                        path: path.display().to_string()
                    },
                    e
                );
                continue;
            }
        };
        has_alpha &= decoded.color().has_alpha();
        let resized = decoded
            .resize_exact(width, height, interpolation.filter_type())
            .to_rgba8();
        frames.push(resized);
    }

    if frames.is_empty() {
        return Err(SourceError::Empty {
            path: source.display().to_string(),
        });
    }

    // Bind-once filters run a single time per frame, at load
    frames.par_iter_mut().for_each(|frame| {
        filters::apply_chain(frame, chain);
    });

    Ok((frames, has_alpha))
}
