use std::time::Instant;

use image::RgbaImage;

use crate::mask::Mask;

/// Blend a background into the frame using per-pixel alpha weights.
///
/// Per channel: `out = fg * alpha + bg * (1 - alpha)`. The frame, the
/// background and the mask must share the same dimensions; cached sets are
/// pre-resized and masks are projected to capture resolution, so this holds
/// by construction.
pub fn blend(frame: &mut RgbaImage, background: &RgbaImage, alpha: &Mask) {
    debug_assert_eq!(frame.dimensions(), background.dimensions());
    debug_assert_eq!(frame.dimensions(), alpha.dimensions());

    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        let a = alpha.get(x, y);
        let bg = background.get_pixel(x, y);
        for channel in 0..3 {
            pixel[channel] =
                (pixel[channel] as f32 * a + bg[channel] as f32 * (1.0 - a)) as u8;
        }
    }
}

/// Blend an overlay on top of the frame using the overlay's own alpha
/// channel: `out = out * (1 - a) + overlay * a`.
///
/// Callers must have verified that the overlay source really carries an
/// alpha channel; a fully opaque synthesized alpha would cover the frame.
pub fn blend_overlay(frame: &mut RgbaImage, overlay: &RgbaImage) {
    debug_assert_eq!(frame.dimensions(), overlay.dimensions());

    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        let over = overlay.get_pixel(x, y);
        let a = over[3] as f32 / 255.0;
        for channel in 0..3 {
            pixel[channel] =
                (pixel[channel] as f32 * (1.0 - a) + over[channel] as f32 * a) as u8;
        }
    }
}

/// Playback position and advance timer for one animated frame set.
///
/// Runtime state only: settings reloads never touch it, and a source
/// reload resets it via [`reset`](PlaybackState::reset).
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    index: usize,
    last_advance: Option<Instant>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind to the first frame and forget the advance timer
    pub fn reset(&mut self) {
        self.index = 0;
        self.last_advance = None;
    }

    /// Current frame index for a set of `len` frames
    pub fn frame_index(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.index % len
    }

    /// Advance by exactly one frame (wrapping) when at least `1/fps`
    /// seconds have passed since the last advance.
    ///
    /// However much extra time has passed, the index never skips ahead by
    /// more than one step per call. Returns whether an advance happened.
    pub fn advance_if_due(&mut self, len: usize, fps: f64, now: Instant) -> bool {
        if len == 0 || fps <= 0.0 {
            return false;
        }

        let due = match self.last_advance {
            Some(last) => now.duration_since(last).as_secs_f64() >= 1.0 / fps,
            None => true,
        };
        if due {
            self.index = (self.index + 1) % len;
            self.last_advance = Some(now);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn solid(rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(4, 3, image::Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    #[test]
    fn test_alpha_one_yields_foreground_exactly() {
        let mut frame = solid([10, 200, 30]);
        let expected = frame.clone();
        let background = solid([200, 10, 90]);
        blend(&mut frame, &background, &Mask::new_filled(4, 3, 1.0));
        assert_eq!(frame.as_raw(), expected.as_raw());
    }

    #[test]
    fn test_alpha_zero_yields_background_exactly() {
        let mut frame = solid([10, 200, 30]);
        let background = solid([200, 10, 90]);
        blend(&mut frame, &background, &Mask::new_filled(4, 3, 0.0));
        for pixel in frame.pixels() {
            assert_eq!([pixel[0], pixel[1], pixel[2]], [200, 10, 90]);
        }
    }

    #[test]
    fn test_blend_interpolates_per_channel() {
        let mut frame = solid([100, 0, 0]);
        let background = solid([0, 200, 0]);
        blend(&mut frame, &background, &Mask::new_filled(4, 3, 0.5));
        let px = frame.get_pixel(0, 0);
        assert_eq!([px[0], px[1], px[2]], [50, 100, 0]);
    }

    #[test]
    fn test_overlay_uses_its_own_alpha() {
        let mut frame = solid([0, 0, 0]);
        let mut overlay = solid([255, 255, 255]);
        for pixel in overlay.pixels_mut() {
            pixel[3] = 102; // 40% opaque
        }
        blend_overlay(&mut frame, &overlay);
        let px = frame.get_pixel(1, 1);
        assert_eq!([px[0], px[1], px[2]], [102, 102, 102]);
    }

    #[test]
    fn test_transparent_overlay_is_invisible() {
        let mut frame = solid([7, 8, 9]);
        let mut overlay = solid([255, 255, 255]);
        for pixel in overlay.pixels_mut() {
            pixel[3] = 0;
        }
        blend_overlay(&mut frame, &overlay);
        assert_eq!(frame.as_raw(), solid([7, 8, 9]).as_raw());
    }

    #[test]
    fn test_advance_single_steps_regardless_of_excess_elapsed() {
        let mut playback = PlaybackState::new();
        let start = Instant::now();

        // First call has no timer yet and advances immediately
        assert!(playback.advance_if_due(5, 2.0, start));
        assert_eq!(playback.frame_index(5), 1);

        // A huge gap still advances by exactly one step
        assert!(playback.advance_if_due(5, 2.0, start + Duration::from_secs(30)));
        assert_eq!(playback.frame_index(5), 2);
    }

    #[test]
    fn test_advance_not_due_before_interval() {
        let mut playback = PlaybackState::new();
        let start = Instant::now();
        playback.advance_if_due(4, 2.0, start);

        assert!(!playback.advance_if_due(4, 2.0, start + Duration::from_millis(400)));
        assert_eq!(playback.frame_index(4), 1);
        assert!(playback.advance_if_due(4, 2.0, start + Duration::from_millis(500)));
        assert_eq!(playback.frame_index(4), 2);
    }

    #[test]
    fn test_three_frame_animation_sequence() {
        // 3 frames at 2 fps, iterations 0.6 s apart: the rendered index
        // sequence is 0, 1, 2 with one advance after each render.
        let mut playback = PlaybackState::new();
        let start = Instant::now();
        let mut rendered = Vec::new();

        for i in 0..3u32 {
            rendered.push(playback.frame_index(3));
            let now = start + Duration::from_millis(600 * i as u64);
            playback.advance_if_due(3, 2.0, now);
        }
        assert_eq!(rendered, vec![0, 1, 2]);
    }

    #[test]
    fn test_reset_rewinds_index_and_timer() {
        let mut playback = PlaybackState::new();
        let start = Instant::now();
        playback.advance_if_due(4, 1.0, start);
        playback.advance_if_due(4, 1.0, start + Duration::from_secs(2));
        assert_eq!(playback.frame_index(4), 2);

        playback.reset();
        assert_eq!(playback.frame_index(4), 0);
        // With the timer cleared the next advance is immediately due
        assert!(playback.advance_if_due(4, 1.0, start + Duration::from_millis(2100)));
    }

    #[test]
    fn test_wraps_around_modulo_len() {
        let mut playback = PlaybackState::new();
        let start = Instant::now();
        for i in 0..4u32 {
            playback.advance_if_due(3, 1.0, start + Duration::from_secs(i as u64 * 2));
        }
        assert_eq!(playback.frame_index(3), 1);
    }
}
