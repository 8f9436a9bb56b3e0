//! Destructive-color group: channel collapse, quantization, rot, and
//! the rolling hue-feedback oscillator.

use rand::Rng;

use crate::color::{quantize_hue, scale_saturation, shift_hue};
use crate::ops::{gaussian_blur_rgb, luma, luma_of};
use crate::params::{DeadChannel, Params};
use crate::state::DestructiveState;
use crate::types::{Frame, round_u8};

/// Pull every channel toward the pixel's own mean.
fn color_collapse(frame: &Frame, amount: f32) -> Frame {
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        let mean = (f32::from(p[0]) + f32::from(p[1]) + f32::from(p[2])) / 3.0;
        image::Rgb(std::array::from_fn(|c| {
            round_u8(f32::from(p[c]).mul_add(1.0 - amount, mean * amount))
        }))
    })
}

/// Per-pixel Bernoulli XOR corruption.
fn bit_rot<R: Rng>(frame: &Frame, probability: f32, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    for p in out.pixels_mut() {
        if rng.random::<f32>() < probability {
            for c in 0..3 {
                p.0[c] ^= rng.random::<u8>();
            }
        }
    }
    out
}

/// Coarse per-channel quantization; the step divisor never drops below
/// one so full strength degrades rather than divides by zero.
fn palette_decay(frame: &Frame, amount: i32) -> Frame {
    #[allow(clippy::cast_sign_loss)]
    let step = ((amount.unsigned_abs() * 255) / 100).max(1) as u8;
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| (p[c] / step) * step))
    })
}

/// Invert every pixel whose luma exceeds the threshold.
fn solarize(frame: &Frame, threshold: u8) -> Frame {
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        if luma_of(p) > threshold {
            image::Rgb([255 - p[0], 255 - p[1], 255 - p[2]])
        } else {
            image::Rgb(p)
        }
    })
}

/// Let color leak across edges: blurred pixels win wherever Canny finds
/// an edge.
fn color_bleeding(frame: &Frame, amount: f32) -> Frame {
    let blurred = gaussian_blur_rgb(frame, amount.mul_add(4.0, 1.0));
    let edges = imageproc::edges::canny(&luma(frame), 50.0, 150.0);
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        if edges.get_pixel(x, y).0[0] > 0 {
            *blurred.get_pixel(x, y)
        } else {
            *frame.get_pixel(x, y)
        }
    })
}

/// Zero out one channel.
fn kill_channel(frame: &Frame, channel: usize) -> Frame {
    let mut out = frame.clone();
    for p in out.pixels_mut() {
        p.0[channel] = 0;
    }
    out
}

#[allow(clippy::cast_precision_loss)]
pub fn apply<R: Rng>(
    frame: &Frame,
    params: &Params,
    state: &mut DestructiveState,
    rng: &mut R,
) -> Frame {
    let mut out = frame.clone();
    if params.color_collapse > 0 {
        out = color_collapse(&out, params.color_collapse as f32 / 100.0);
    }
    if params.hue_shatter > 0 {
        out = quantize_hue(&out, params.hue_shatter.unsigned_abs());
    }
    if params.bit_rot > 0 {
        out = bit_rot(&out, params.bit_rot as f32 / 1000.0, rng);
    }
    if params.palette_decay > 0 {
        out = palette_decay(&out, params.palette_decay);
    }
    if params.solarize_hell > 0 {
        let threshold = 255i32.saturating_sub(params.solarize_hell * 2).max(0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let threshold = threshold as u8;
        out = solarize(&out, threshold);
    }
    if params.color_bleeding > 0 {
        out = color_bleeding(&out, params.color_bleeding as f32 / 100.0);
    }
    if params.chromatic_meltdown > 0 {
        out = scale_saturation(&out, 1.0 + params.chromatic_meltdown as f32 / 10.0);
    }
    if params.hue_feedback > 0 {
        state.hue_offset = (state.hue_offset + params.hue_feedback as f32).rem_euclid(180.0);
        out = shift_hue(&out, state.hue_offset);
    } else {
        state.hue_offset = 0.0;
    }
    if let Some(channel) = match params.dead_channel {
        DeadChannel::None => None,
        DeadChannel::Red => Some(0),
        DeadChannel::Green => Some(1),
        DeadChannel::Blue => Some(2),
    } {
        out = kill_channel(&out, channel);
    }
    out
}
