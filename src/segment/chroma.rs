use image::RgbaImage;

use crate::error::SegmentError;
use crate::segment::{ScoreMap, Segmenter};

/// Color-distance segmenter for classic greenscreen setups.
///
/// Scores each pixel by its distance from a key color: pixels close to the
/// key are background, everything else foreground. No model required, which
/// makes it the default collaborator; swap in a real model by implementing
/// [`Segmenter`].
#[derive(Debug, Clone)]
pub struct ChromaKeySegmenter {
    key: [u8; 3],
    tolerance: f32,
}

impl ChromaKeySegmenter {
    pub fn new(key: [u8; 3], tolerance: f32) -> Self {
        Self {
            key,
            tolerance: tolerance.clamp(0.01, 1.0),
        }
    }

    /// Green key with a moderate tolerance
    pub fn green() -> Self {
        Self::new([0, 255, 0], 0.35)
    }

    /// Normalized color distance from the key, in `[0, 1]`
    fn distance(&self, pixel: &image::Rgba<u8>) -> f32 {
        let dr = pixel[0] as f32 - self.key[0] as f32;
        let dg = pixel[1] as f32 - self.key[1] as f32;
        let db = pixel[2] as f32 - self.key[2] as f32;
        (dr * dr + dg * dg + db * db).sqrt() / (255.0 * 3f32.sqrt())
    }
}

impl Default for ChromaKeySegmenter {
    fn default() -> Self {
        Self::green()
    }
}

impl Segmenter for ChromaKeySegmenter {
    fn infer(&mut self, input: &RgbaImage) -> Result<ScoreMap, SegmentError> {
        let (width, height) = input.dimensions();
        // Soft band around the tolerance so edges blend instead of popping
        let lo = self.tolerance * 0.75;
        let hi = self.tolerance * 1.25;

        let data: Vec<f32> = input
            .pixels()
            .map(|pixel| {
                let d = self.distance(pixel);
                ((d - lo) / (hi - lo)).clamp(0.0, 1.0)
            })
            .collect();

        ScoreMap::from_probabilities(width, height, data).ok_or_else(|| {
            SegmentError::Inference {
                reason: "score buffer does not match input size".to_string(),
            }
        })
    }
}
