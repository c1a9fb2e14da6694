use image::imageops::FilterType;
use image::{ImageBuffer, Luma, Rgba, RgbaImage};

/// Per-pixel mask with values in `[0, 1]`.
///
/// Used both for raw foreground scores coming out of segmentation and for
/// the refined alpha weights driving the blend.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    buffer: ImageBuffer<Luma<f32>, Vec<f32>>,
}

impl Mask {
    /// Create a mask of the given size filled with zeros
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: ImageBuffer::new(width, height),
        }
    }

    /// Create a mask of the given size filled with a constant value
    pub fn new_filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            buffer: ImageBuffer::from_pixel(width, height, Luma([value])),
        }
    }

    /// Create a mask from a per-pixel function
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: FnMut(u32, u32) -> f32,
    {
        let mut f = f;
        Self {
            buffer: ImageBuffer::from_fn(width, height, |x, y| Luma([f(x, y)])),
        }
    }

    /// Wrap raw row-major values; returns `None` on a size mismatch
    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.buffer.get_pixel(x, y)[0]
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        self.buffer.put_pixel(x, y, Luma([value]));
    }

    /// Flat row-major view of the values
    pub fn data(&self) -> &[f32] {
        self.buffer.as_raw()
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        // image keeps the buffer contiguous, so this is the full grid
        &mut *self.buffer
    }

    /// Resize to a new resolution
    pub fn resize(&self, width: u32, height: u32, filter: FilterType) -> Self {
        Self {
            buffer: image::imageops::resize(&self.buffer, width, height, filter),
        }
    }

    /// Render as an opaque grayscale frame, for mask debugging
    pub fn to_gray_frame(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width(), self.height(), |x, y| {
            let v = (self.get(x, y).clamp(0.0, 1.0) * 255.0) as u8;
            Rgba([v, v, v, 255])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_checks_size() {
        assert!(Mask::from_raw(2, 2, vec![0.0; 4]).is_some());
        assert!(Mask::from_raw(2, 2, vec![0.0; 3]).is_none());
    }

    #[test]
    fn test_gray_frame_rendering() {
        let mask = Mask::from_fn(2, 1, |x, _| x as f32);
        let frame = mask.to_gray_frame();
        assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(frame.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }
}
