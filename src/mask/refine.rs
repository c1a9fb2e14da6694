//! Morphological mask refinement.
//!
//! The refinement pipeline is fixed: scale to the integer domain, dilate,
//! erode, box blur, rescale to `[0, 1]`. Each stage is skipped when its
//! kernel size is zero, so `refine(mask, 0, 0, 0)` is the identity.
//!
//! Dilation and erosion run as two independent sequential passes, not as a
//! fused open/close step.

use crate::mask::types::Mask;

/// Refine a smoothed mask into the final per-pixel blend weights.
///
/// `dilate` grows the foreground, `erode` shrinks it, `blur` softens the
/// edges. Kernel sizes are in pixels; zero disables a stage.
pub fn refine(mask: &Mask, dilate: u32, erode: u32, blur: u32) -> Mask {
    if dilate == 0 && erode == 0 && blur == 0 {
        return mask.clone();
    }

    let (width, height) = mask.dimensions();
    let mut bytes: Vec<u8> = mask
        .data()
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0) as u8)
        .collect();

    if dilate > 0 {
        bytes = morph(&bytes, width, height, dilate, Morph::Dilate);
    }
    if erode > 0 {
        bytes = morph(&bytes, width, height, erode, Morph::Erode);
    }
    if blur > 0 {
        bytes = box_blur(&bytes, width, height, blur);
    }

    let data = bytes.into_iter().map(|b| b as f32 / 255.0).collect();
    Mask::from_raw(width, height, data).unwrap_or_else(|| Mask::new(width, height))
}

#[derive(Clone, Copy, PartialEq)]
enum Morph {
    Dilate,
    Erode,
}

/// Square-kernel morphology. The window is anchored at the pixel center
/// and truncated at the borders.
fn morph(src: &[u8], width: u32, height: u32, kernel: u32, op: Morph) -> Vec<u8> {
    let (width, height) = (width as i64, height as i64);
    let lo = -(kernel as i64) / 2;
    let hi = (kernel as i64 - 1) / 2;

    let mut out = vec![0u8; src.len()];
    for y in 0..height {
        for x in 0..width {
            let mut best = match op {
                Morph::Dilate => u8::MIN,
                Morph::Erode => u8::MAX,
            };
            for dy in lo..=hi {
                let sy = y + dy;
                if sy < 0 || sy >= height {
                    continue;
                }
                for dx in lo..=hi {
                    let sx = x + dx;
                    if sx < 0 || sx >= width {
                        continue;
                    }
                    let v = src[(sy * width + sx) as usize];
                    best = match op {
                        Morph::Dilate => best.max(v),
                        Morph::Erode => best.min(v),
                    };
                }
            }
            out[(y * width + x) as usize] = best;
        }
    }
    out
}

/// Separable box blur with border truncation; each pass divides by the
/// actual number of sampled pixels.
fn box_blur(src: &[u8], width: u32, height: u32, kernel: u32) -> Vec<u8> {
    let (width, height) = (width as i64, height as i64);
    let lo = -(kernel as i64) / 2;
    let hi = (kernel as i64 - 1) / 2;

    // Horizontal pass
    let mut mid = vec![0u8; src.len()];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0u32;
            let mut count = 0u32;
            for dx in lo..=hi {
                let sx = x + dx;
                if sx < 0 || sx >= width {
                    continue;
                }
                sum += src[(y * width + sx) as usize] as u32;
                count += 1;
            }
            mid[(y * width + x) as usize] = (sum / count.max(1)) as u8;
        }
    }

    // Vertical pass
    let mut out = vec![0u8; src.len()];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0u32;
            let mut count = 0u32;
            for dy in lo..=hi {
                let sy = y + dy;
                if sy < 0 || sy >= height {
                    continue;
                }
                sum += mid[(sy * width + x) as usize] as u32;
                count += 1;
            }
            out[(y * width + x) as usize] = (sum / count.max(1)) as u8;
        }
    }
    out
}
