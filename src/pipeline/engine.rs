use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use image::imageops;
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::config::{ConfigStore, Interpolation, Settings};
use crate::device::{FrameSink, FrameSource};
use crate::error::{Result, SourceError};
use crate::filters::{self, BoundFilter, FilterRegistry};
use crate::mask::{refine, Mask, MaskSmoother};
use crate::pipeline::compositor::{blend, blend_overlay, PlaybackState};
use crate::segment::{input_resolution, prepare_input, project_scores, Segmenter};
use crate::sources::SourceCache;

const BACKGROUND_KEY: &str = "background";
const OVERLAY_KEY: &str = "overlay";

/// Sequences one full compositing pass per captured frame.
///
/// The engine is single-threaded and synchronous: the only suspension
/// point is the blocking wait inside `capture`, and the interrupt flag is
/// observed between iterations only. All mutable pipeline state (settings,
/// mask history, source caches, playback positions) lives here.
pub struct PipelineEngine {
    config: ConfigStore,
    registry: FilterRegistry,
    cache: SourceCache,
    smoother: MaskSmoother,
    background_playback: PlaybackState,
    overlay_playback: PlaybackState,
    source: Box<dyn FrameSource>,
    sink: Box<dyn FrameSink>,
    segmenter: Box<dyn Segmenter>,
}

impl PipelineEngine {
    pub fn new(
        config: ConfigStore,
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
        segmenter: Box<dyn Segmenter>,
    ) -> Self {
        Self {
            config,
            registry: FilterRegistry::new(),
            cache: SourceCache::new(),
            smoother: MaskSmoother::new(),
            background_playback: PlaybackState::new(),
            overlay_playback: PlaybackState::new(),
            source,
            sink,
            segmenter,
        }
    }

    /// Run until the interrupt flag is raised.
    ///
    /// An in-progress iteration always runs to completion; the flag is
    /// checked between iterations. A capture failure aborts the loop.
    pub fn run(&mut self, interrupt: &AtomicBool) -> Result<()> {
        info!("Pipeline running on {:?}", self.config.path());
        while !interrupt.load(Ordering::Relaxed) {
            self.process_frame()?;
        }
        info!("Interrupted, stopping");
        Ok(())
    }

    /// One full pass: reload settings, capture, segment, refine, composite
    /// and emit.
    pub fn process_frame(&mut self) -> Result<()> {
        if self.config.reload() {
            // Any settings edit must be able to force image reprocessing
            self.cache.invalidate();
        }
        let settings = self.config.settings().clone();

        let mut frame = self.source.capture()?;
        let (width, height) = frame.dimensions();

        if settings.flip_horizontal {
            imageops::flip_horizontal_in_place(&mut frame);
        }
        if settings.flip_vertical {
            imageops::flip_vertical_in_place(&mut frame);
        }

        let background_chain = self.registry.resolve(&settings.background_filters)?;
        let background = self.cache.get(
            BACKGROUND_KEY,
            Path::new(&settings.background_image),
            (width, height),
            settings.background_interpolation_method,
            &background_chain,
        );
        if background.reloaded {
            self.background_playback.reset();
        }

        // With no background source, no background filters and no blur
        // there is nothing to composite: pass the frame straight through.
        if background.set.is_none() && background_chain.is_empty() && settings.blur_background == 0
        {
            self.sink.send(&frame)?;
            return Ok(());
        }

        // Missing background source: synthesize one from the live frame
        let synthesized = if background.set.is_none() {
            Some(synthesize_background(&frame, &background_chain, &settings))
        } else {
            None
        };

        let alpha = match score_frame(self.segmenter.as_mut(), &frame, &settings) {
            Ok(raw) => {
                let smoothed = self.smoother.push(raw, settings.average_masks);
                refine(&smoothed, settings.dilate, settings.erode, settings.blur)
            }
            Err(e) => {
                warn!("Segmentation failed: {}", e);
                match self.smoother.average() {
                    // Fall back to the most recent smoothed mask
                    Some(smoothed) => {
                        refine(&smoothed, settings.dilate, settings.erode, settings.blur)
                    }
                    None => {
                        self.sink.send(&frame)?;
                        return Ok(());
                    }
                }
            }
        };

        let foreground_chain = self.registry.resolve(&settings.foreground_filters)?;
        filters::apply_chain(&mut frame, &foreground_chain);

        if let Some(set) = background.set {
            let index = self.background_playback.frame_index(set.len());
            blend(&mut frame, set.frame(index), &alpha);
            self.background_playback.advance_if_due(
                set.len(),
                settings.background_fps,
                Instant::now(),
            );
        } else if let Some(bg) = synthesized.as_ref() {
            blend(&mut frame, bg, &alpha);
        }

        let result_chain = self.registry.resolve(&settings.result_filters)?;
        filters::apply_chain(&mut frame, &result_chain);

        if let Some(overlay_src) = settings
            .overlay_image
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            let overlay_chain = self.registry.resolve(&settings.overlay_filters)?;
            let overlay = self.cache.get(
                OVERLAY_KEY,
                Path::new(overlay_src),
                (width, height),
                Interpolation::Linear,
                &overlay_chain,
            );
            if overlay.reloaded {
                self.overlay_playback.reset();
            }
            if let Some(set) = overlay.set {
                if set.has_alpha() {
                    let index = self.overlay_playback.frame_index(set.len());
                    blend_overlay(&mut frame, set.frame(index));
                    self.overlay_playback.advance_if_due(
                        set.len(),
                        settings.overlay_fps,
                        Instant::now(),
                    );
                } else {
                    let violation = SourceError::OverlayWithoutAlpha {
                        path: overlay_src.to_string(),
                    };
                    warn!("Skipping overlay: {}", violation);
                }
            }
        }

        if settings.debug_show_mask {
            frame = alpha.to_gray_frame();
        }

        self.sink.send(&frame)?;
        Ok(())
    }
}

/// Run segmentation on a frame and project the scores back to capture
/// resolution, thresholded into a raw mask.
fn score_frame(
    segmenter: &mut dyn Segmenter,
    frame: &RgbaImage,
    settings: &Settings,
) -> Result<Mask> {
    let (width, height) = frame.dimensions();
    let target = input_resolution(
        segmenter.internal_resolution(),
        segmenter.output_stride(),
        width,
        height,
    );
    debug!("Segmenting at {}x{}", target.0, target.1);

    let input = prepare_input(frame, target);
    let scores = segmenter.infer(&input.frame)?;
    let mask = project_scores(
        &scores,
        input.padding,
        (width, height),
        Some(settings.segmentation_threshold),
    )?;
    Ok(mask)
}

/// Background used when no source is configured or loadable: the live
/// frame itself, run through the background chain and optionally blurred.
fn synthesize_background(
    frame: &RgbaImage,
    chain: &[BoundFilter],
    settings: &Settings,
) -> RgbaImage {
    let mut background = frame.clone();
    filters::apply_chain(&mut background, chain);
    if settings.blur_background > 0 {
        background = imageops::blur(&background, settings.blur_background as f32);
    }
    background
}
