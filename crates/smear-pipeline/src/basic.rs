//! Basic group: the last stage, plain image adjustments.

use image::imageops::{self, FilterType};

use crate::color::{scale_saturation, scale_value};
use crate::ops::{blend, gaussian_blur_rgb, sigma_for_kernel};
use crate::params::Params;
use crate::state::BasicState;
use crate::types::{Frame, accum_from_frame, frame_from_accum};

fn invert(frame: &Frame) -> Frame {
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        image::Rgb([255 - p[0], 255 - p[1], 255 - p[2]])
    })
}

/// Reduce each channel to `bits` bits of depth.
fn color_depth(frame: &Frame, bits: u32) -> Frame {
    let step = (256u32 >> bits.clamp(1, 8)).max(1);
    #[allow(clippy::cast_possible_truncation)]
    let step = step as u8;
    if step <= 1 {
        return frame.clone();
    }
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| (p[c] / step) * step))
    })
}

/// Block mosaic via nearest down/upscale.
fn pixelate(frame: &Frame, block: u32) -> Frame {
    let (w, h) = frame.dimensions();
    let small = imageops::resize(frame, (w / block).max(1), (h / block).max(1), FilterType::Nearest);
    imageops::resize(&small, w, h, FilterType::Nearest)
}

/// Blend toward a slow exponential average of the stage's own input.
fn average(frame: &Frame, state: &mut BasicState, weight: f32) -> Frame {
    let accum = state.average.get_or_insert_with(|| accum_from_frame(frame));
    for (acc, p) in accum.pixels_mut().zip(frame.pixels()) {
        for c in 0..3 {
            acc.0[c] = f32::from(p.0[c]).mul_add(0.05, acc.0[c] * 0.95);
        }
    }
    let averaged = frame_from_accum(accum);
    blend(frame, &averaged, 1.0 - weight, weight)
}

pub fn apply(frame: &Frame, params: &Params, state: &mut BasicState) -> Frame {
    let mut out = frame.clone();
    if params.invert {
        out = invert(&out);
    }
    if (params.contrast - 1.0).abs() > f32::EPSILON {
        out = scale_value(&out, params.contrast);
    }
    if (params.saturation - 1.0).abs() > f32::EPSILON {
        out = scale_saturation(&out, params.saturation);
    }
    if params.color_depth < 8 {
        out = color_depth(&out, params.color_depth.unsigned_abs());
    }
    if params.blur > 0 {
        out = gaussian_blur_rgb(&out, sigma_for_kernel(params.blur.unsigned_abs() * 2 + 1));
    }
    if params.pixelate > 1 {
        out = pixelate(&out, params.pixelate.unsigned_abs());
    }
    if params.average > 0.0 {
        out = average(&out, state, params.average);
    } else {
        state.average = None;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> Frame {
        Frame::from_fn(16, 16, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([(x * 15) as u8, (y * 15) as u8, 70])
        })
    }

    #[test]
    fn invert_is_involution() {
        let frame = gradient();
        assert_eq!(invert(&invert(&frame)), frame);
    }

    #[test]
    fn invert_maps_red_to_cyan() {
        let red = Frame::from_pixel(2, 2, image::Rgb([255, 0, 0]));
        let out = invert(&red);
        assert_eq!(out.get_pixel(0, 0).0, [0, 255, 255]);
    }

    #[test]
    fn contrast_one_is_identity() {
        let frame = gradient();
        assert_eq!(apply(&frame, &Params::default(), &mut BasicState::default()), frame);
    }

    #[test]
    fn contrast_scales_brightness_not_a_pivot() {
        let mut params = Params::default();
        params.contrast = 2.0;
        let frame = Frame::from_pixel(2, 2, image::Rgb([100, 50, 25]));
        let out = apply(&frame, &params, &mut BasicState::default());
        // Gain multiplies the HSV value channel, so every channel
        // doubles; nothing pivots around mid-gray.
        assert_eq!(out.get_pixel(0, 0).0, [200, 100, 50]);
    }

    #[test]
    fn color_depth_one_bit_is_binary() {
        let out = color_depth(&gradient(), 1);
        for p in out.pixels() {
            for &c in &p.0 {
                assert!(c == 0 || c == 128);
            }
        }
    }

    #[test]
    fn color_depth_eight_bits_is_identity() {
        let frame = gradient();
        assert_eq!(color_depth(&frame, 8), frame);
    }

    #[test]
    fn pixelate_flattens_blocks() {
        let out = pixelate(&gradient(), 8);
        assert_eq!(out.get_pixel(0, 0), out.get_pixel(7, 7));
    }

    #[test]
    fn average_converges_to_constant_input() {
        let mut state = BasicState::default();
        let frame = Frame::from_pixel(4, 4, image::Rgb([210, 210, 210]));
        let mut out = frame.clone();
        for _ in 0..200 {
            out = average(&frame, &mut state, 1.0);
        }
        assert!(out.get_pixel(0, 0).0[0] >= 208);
    }
}
