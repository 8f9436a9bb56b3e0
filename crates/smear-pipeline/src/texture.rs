//! Texture group: painterly edge-preserving smoothing looks built from
//! repeated bilateral filtering.

use crate::params::TextureMode;
use crate::types::{Frame, round_u8};

fn bilateral_pass(frame: &Frame, sigma_color: f32) -> Frame {
    imageproc::filter::bilateral_filter(
        frame,
        2,
        4.0,
        imageproc::filter::bilateral::GaussianEuclideanColorDistance::new(sigma_color),
    )
}

/// One smoothing pass under a woven luma modulation.
fn canvas(frame: &Frame) -> Frame {
    let smoothed = bilateral_pass(frame, 30.0);
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        #[allow(clippy::cast_precision_loss)]
        let weave = ((x as f32 * 0.9).sin() + (y as f32 * 0.9).sin()) * 6.0;
        let p = smoothed.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| round_u8(f32::from(p[c]) + weave)))
    })
}

fn watercolor(frame: &Frame) -> Frame {
    let mut out = frame.clone();
    for _ in 0..2 {
        out = bilateral_pass(&out, 40.0);
    }
    out
}

fn oil(frame: &Frame) -> Frame {
    let mut out = frame.clone();
    for _ in 0..3 {
        out = bilateral_pass(&out, 60.0);
    }
    out
}

pub fn apply(frame: &Frame, mode: TextureMode) -> Frame {
    match mode {
        TextureMode::None => frame.clone(),
        TextureMode::Canvas => canvas(frame),
        TextureMode::Watercolor => watercolor(frame),
        TextureMode::Oil => oil(frame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy() -> Frame {
        Frame::from_fn(16, 16, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([((x * 37 + y * 61) % 256) as u8, 90, 150])
        })
    }

    #[test]
    fn all_modes_preserve_shape() {
        let frame = noisy();
        for mode in [TextureMode::Canvas, TextureMode::Watercolor, TextureMode::Oil] {
            assert_eq!(apply(&frame, mode).dimensions(), frame.dimensions(), "{mode:?}");
        }
    }

    #[test]
    fn watercolor_nearly_keeps_flat_frame() {
        let flat = Frame::from_pixel(8, 8, image::Rgb([90, 150, 210]));
        let out = apply(&flat, TextureMode::Watercolor);
        for (p, q) in out.pixels().zip(flat.pixels()) {
            for c in 0..3 {
                assert!(p.0[c].abs_diff(q.0[c]) <= 2);
            }
        }
    }

    #[test]
    fn canvas_adds_weave_to_flat_frame() {
        let frame = Frame::from_pixel(16, 16, image::Rgb([128, 128, 128]));
        let out = apply(&frame, TextureMode::Canvas);
        assert_ne!(out, frame);
    }

    #[test]
    fn none_mode_is_identity() {
        let frame = noisy();
        assert_eq!(apply(&frame, TextureMode::None), frame);
    }
}
