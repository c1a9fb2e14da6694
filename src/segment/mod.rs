//! # Segmentation Boundary
//!
//! The segmentation model itself lives behind the [`Segmenter`] trait; this
//! module owns the geometry either side of it. A captured frame is scaled
//! and letterboxed to a valid model input size, the collaborator returns a
//! per-pixel foreground score map at that size together with the padding,
//! and [`project_scores`] maps the scores back to capture resolution and
//! optionally thresholds them into a hard mask.

pub mod chroma;

pub use chroma::ChromaKeySegmenter;

use image::imageops::FilterType;
use image::RgbaImage;

use crate::error::SegmentError;
use crate::mask::Mask;

/// Per-pixel foreground scores produced by a [`Segmenter`].
///
/// Values are either raw logits or probabilities in `[0, 1]`; the flag
/// decides whether projection applies a sigmoid.
#[derive(Debug, Clone)]
pub struct ScoreMap {
    data: Vec<f32>,
    width: u32,
    height: u32,
    logits: bool,
}

impl ScoreMap {
    pub fn from_probabilities(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        (data.len() == (width * height) as usize).then_some(Self {
            data,
            width,
            height,
            logits: false,
        })
    }

    pub fn from_logits(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        (data.len() == (width * height) as usize).then_some(Self {
            data,
            width,
            height,
            logits: true,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Letterbox padding around the frame content inside a model input, in
/// model-input pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

/// Compute the model input size closest to the scaled capture resolution.
///
/// Valid input sizes are of the form `n * stride + 1`, so the scaled
/// dimensions are snapped down onto that grid.
pub fn input_resolution(
    internal_resolution: f32,
    output_stride: u32,
    width: u32,
    height: u32,
) -> (u32, u32) {
    let snap = |size: u32| -> u32 {
        let scaled = size as f32 * internal_resolution;
        let stride = output_stride as f32;
        ((scaled / stride).floor() * stride) as u32 + 1
    };
    (snap(width), snap(height))
}

/// A prepared model input: the letterboxed frame plus its padding
#[derive(Debug, Clone)]
pub struct SegmentInput {
    pub frame: RgbaImage,
    pub padding: Padding,
}

/// Scale a captured frame to fit the model input size, preserving aspect
/// ratio, and pad the borders with black.
pub fn prepare_input(frame: &RgbaImage, target: (u32, u32)) -> SegmentInput {
    let (width, height) = frame.dimensions();
    let (target_w, target_h) = target;

    let scale = (target_w as f32 / width as f32).min(target_h as f32 / height as f32);
    let scaled_w = ((width as f32 * scale).round() as u32).clamp(1, target_w);
    let scaled_h = ((height as f32 * scale).round() as u32).clamp(1, target_h);

    let left = (target_w - scaled_w) / 2;
    let top = (target_h - scaled_h) / 2;
    let padding = Padding {
        top,
        bottom: target_h - scaled_h - top,
        left,
        right: target_w - scaled_w - left,
    };

    let resized = image::imageops::resize(frame, scaled_w, scaled_h, FilterType::Triangle);
    let mut canvas = RgbaImage::from_pixel(target_w, target_h, image::Rgba([0, 0, 0, 255]));
    image::imageops::overlay(&mut canvas, &resized, left as i64, top as i64);

    SegmentInput {
        frame: canvas,
        padding,
    }
}

/// Project a score map back to capture resolution.
///
/// Logits go through a sigmoid first, the letterbox padding is cropped
/// away, the content is resized bilinearly to `capture`, and an optional
/// threshold turns the probabilities into a hard mask.
pub fn project_scores(
    map: &ScoreMap,
    padding: Padding,
    capture: (u32, u32),
    threshold: Option<f32>,
) -> Result<Mask, SegmentError> {
    let content_w = map
        .width
        .checked_sub(padding.left + padding.right)
        .filter(|w| *w > 0);
    let content_h = map
        .height
        .checked_sub(padding.top + padding.bottom)
        .filter(|h| *h > 0);
    let (content_w, content_h) = match (content_w, content_h) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(SegmentError::ShapeMismatch {
                expected: format!("padding smaller than {}x{}", map.width, map.height),
                actual: format!("{:?}", padding),
            })
        }
    };

    let content = Mask::from_fn(content_w, content_h, |x, y| {
        let idx = ((y + padding.top) * map.width + x + padding.left) as usize;
        let v = map.data[idx];
        if map.logits {
            1.0 / (1.0 + (-v).exp())
        } else {
            v
        }
    });

    let mut mask = content.resize(capture.0, capture.1, FilterType::Triangle);
    if let Some(threshold) = threshold {
        for v in mask.data_mut() {
            *v = if *v > threshold { 1.0 } else { 0.0 };
        }
    }
    Ok(mask)
}

/// Segmentation collaborator contract.
///
/// Implementations receive a frame already scaled and letterboxed to their
/// declared input geometry and return a foreground score map at that same
/// resolution.
pub trait Segmenter: Send {
    /// Scale factor applied to the capture resolution before inference
    fn internal_resolution(&self) -> f32 {
        0.5
    }

    /// Quantum of valid model input sizes
    fn output_stride(&self) -> u32 {
        16
    }

    fn infer(&mut self, input: &RgbaImage) -> Result<ScoreMap, SegmentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_resolution_snaps_to_stride_grid() {
        let (w, h) = input_resolution(0.5, 16, 640, 480);
        assert_eq!((w, h), (321, 241));
        assert_eq!((w - 1) % 16, 0);
        assert_eq!((h - 1) % 16, 0);
    }

    #[test]
    fn test_prepare_input_letterboxes() {
        let frame = RgbaImage::from_pixel(100, 50, image::Rgba([255, 255, 255, 255]));
        let input = prepare_input(&frame, (81, 81));

        assert_eq!(input.frame.dimensions(), (81, 81));
        let p = input.padding;
        assert_eq!(p.left + p.right, 0);
        assert_eq!(p.top + p.bottom + 41, 81);
        // Padded rows are black, content rows are not
        assert_eq!(input.frame.get_pixel(40, 0).0[0], 0);
        assert_eq!(input.frame.get_pixel(40, 40).0[0], 255);
    }

    #[test]
    fn test_projection_crops_padding_and_thresholds() {
        // 6x4 map: padded columns score 0, content scores 0.6
        let padding = Padding {
            top: 0,
            bottom: 0,
            left: 1,
            right: 1,
        };
        let data: Vec<f32> = (0..24)
            .map(|i| {
                let x = i % 6;
                if x == 0 || x == 5 {
                    0.0
                } else {
                    0.6
                }
            })
            .collect();
        let map = ScoreMap::from_probabilities(6, 4, data).unwrap();

        let mask = project_scores(&map, padding, (8, 8), Some(0.5)).unwrap();
        assert_eq!(mask.dimensions(), (8, 8));
        assert!(mask.data().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_projection_applies_sigmoid_to_logits() {
        let map = ScoreMap::from_logits(2, 2, vec![0.0; 4]).unwrap();
        let mask = project_scores(&map, Padding::default(), (2, 2), None).unwrap();
        assert!(mask.data().iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_projection_rejects_oversized_padding() {
        let map = ScoreMap::from_probabilities(4, 4, vec![0.0; 16]).unwrap();
        let padding = Padding {
            top: 2,
            bottom: 2,
            left: 0,
            right: 0,
        };
        assert!(project_scores(&map, padding, (4, 4), None).is_err());
    }
}
