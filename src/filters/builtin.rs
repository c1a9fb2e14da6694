//! Built-in image filters.
//!
//! Each constructor validates its parameters once and binds them into the
//! returned transform. All filters operate on the RGB channels and leave
//! alpha untouched, so they can run on camera frames, backgrounds and
//! overlays alike.

use image::RgbaImage;
use rand::Rng;

use crate::error::FilterError;
use crate::filters::registry::{FilterFn, FilterRegistry};
use crate::filters::spec::FilterArgs;

pub(crate) fn register_all(registry: &mut FilterRegistry) {
    registry.register("grayscale", make_grayscale);
    registry.register("invert", make_invert);
    registry.register("sepia", make_sepia);
    registry.register("blur", make_blur);
    registry.register("brightness", make_brightness);
    registry.register("contrast", make_contrast);
    registry.register("color_filter", make_color_filter);
    registry.register("noise", make_noise);
    registry.register("solid_color", make_solid_color);
}

/// Apply a per-pixel map to the RGB channels
fn per_pixel<F>(frame: &mut RgbaImage, op: F)
where
    F: Fn([u8; 3]) -> [u8; 3],
{
    for pixel in frame.pixels_mut() {
        let [r, g, b] = op([pixel[0], pixel[1], pixel[2]]);
        pixel[0] = r;
        pixel[1] = g;
        pixel[2] = b;
    }
}

fn make_grayscale(args: &FilterArgs<'_>) -> Result<FilterFn, FilterError> {
    args.expect_len("grayscale", 0)?;
    Ok(Box::new(|frame| {
        per_pixel(frame, |[r, g, b]| {
            let luma =
                (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8;
            [luma, luma, luma]
        });
    }))
}

fn make_invert(args: &FilterArgs<'_>) -> Result<FilterFn, FilterError> {
    args.expect_len("invert", 0)?;
    Ok(Box::new(|frame| {
        per_pixel(frame, |[r, g, b]| [255 - r, 255 - g, 255 - b]);
    }))
}

fn make_sepia(args: &FilterArgs<'_>) -> Result<FilterFn, FilterError> {
    args.expect_len("sepia", 0)?;
    Ok(Box::new(|frame| {
        per_pixel(frame, |[r, g, b]| {
            let (r, g, b) = (r as f32, g as f32, b as f32);
            [
                (0.393 * r + 0.769 * g + 0.189 * b).min(255.0) as u8,
                (0.349 * r + 0.686 * g + 0.168 * b).min(255.0) as u8,
                (0.272 * r + 0.534 * g + 0.131 * b).min(255.0) as u8,
            ]
        });
    }))
}

fn make_blur(args: &FilterArgs<'_>) -> Result<FilterFn, FilterError> {
    args.expect_len("blur", 1)?;
    let sigma = args.require_f32("blur", 0, "sigma")?;
    if sigma <= 0.0 {
        return Err(FilterError::BadParams {
            name: "blur".to_string(),
            reason: format!("sigma must be positive, got {}", sigma),
        });
    }
    Ok(Box::new(move |frame| {
        *frame = image::imageops::blur(frame, sigma);
    }))
}

fn make_brightness(args: &FilterArgs<'_>) -> Result<FilterFn, FilterError> {
    args.expect_len("brightness", 1)?;
    let factor = args.require_f32("brightness", 0, "factor")?;
    if factor < 0.0 {
        return Err(FilterError::BadParams {
            name: "brightness".to_string(),
            reason: format!("factor must be non-negative, got {}", factor),
        });
    }
    Ok(Box::new(move |frame| {
        per_pixel(frame, |rgb| rgb.map(|c| (c as f32 * factor).min(255.0) as u8));
    }))
}

fn make_contrast(args: &FilterArgs<'_>) -> Result<FilterFn, FilterError> {
    args.expect_len("contrast", 1)?;
    let factor = args.require_f32("contrast", 0, "factor")?;
    if factor < 0.0 {
        return Err(FilterError::BadParams {
            name: "contrast".to_string(),
            reason: format!("factor must be non-negative, got {}", factor),
        });
    }
    Ok(Box::new(move |frame| {
        per_pixel(frame, |rgb| {
            rgb.map(|c| {
                let centered = (c as f32 / 255.0 - 0.5) * factor + 0.5;
                (centered.clamp(0.0, 1.0) * 255.0) as u8
            })
        });
    }))
}

fn make_color_filter(args: &FilterArgs<'_>) -> Result<FilterFn, FilterError> {
    args.expect_len("color_filter", 3)?;
    let scale_r = args.require_f32("color_filter", 0, "r")?;
    let scale_g = args.require_f32("color_filter", 1, "g")?;
    let scale_b = args.require_f32("color_filter", 2, "b")?;
    Ok(Box::new(move |frame| {
        per_pixel(frame, |[r, g, b]| {
            [
                (r as f32 * scale_r).clamp(0.0, 255.0) as u8,
                (g as f32 * scale_g).clamp(0.0, 255.0) as u8,
                (b as f32 * scale_b).clamp(0.0, 255.0) as u8,
            ]
        });
    }))
}

fn make_noise(args: &FilterArgs<'_>) -> Result<FilterFn, FilterError> {
    args.expect_len("noise", 1)?;
    let level = args.require_f32("noise", 0, "level")?;
    if !(0.0..=1.0).contains(&level) {
        return Err(FilterError::BadParams {
            name: "noise".to_string(),
            reason: format!("level must be in [0, 1], got {}", level),
        });
    }
    let amplitude = (level * 64.0) as i16;
    Ok(Box::new(move |frame| {
        if amplitude == 0 {
            return;
        }
        let mut rng = rand::thread_rng();
        for pixel in frame.pixels_mut() {
            let offset = rng.gen_range(-amplitude..=amplitude);
            for channel in 0..3 {
                pixel[channel] = (pixel[channel] as i16 + offset).clamp(0, 255) as u8;
            }
        }
    }))
}

fn make_solid_color(args: &FilterArgs<'_>) -> Result<FilterFn, FilterError> {
    args.expect_len("solid_color", 3)?;
    let r = args.require_u32("solid_color", 0, "r")?;
    let g = args.require_u32("solid_color", 1, "g")?;
    let b = args.require_u32("solid_color", 2, "b")?;
    for (name, value) in [("r", r), ("g", g), ("b", b)] {
        if value > 255 {
            return Err(FilterError::BadParams {
                name: "solid_color".to_string(),
                reason: format!("channel '{}' must be in [0, 255], got {}", name, value),
            });
        }
    }
    Ok(Box::new(move |frame| {
        per_pixel(frame, |_| [r as u8, g as u8, b as u8]);
    }))
}
