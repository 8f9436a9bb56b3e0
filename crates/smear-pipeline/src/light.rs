//! Light group: vignette and bloom.

use crate::ops::gaussian_blur_rgb;
use crate::params::Params;
use crate::types::{Frame, round_u8};

/// Gaussian-weighted radial darkening toward the corners.
#[allow(clippy::cast_precision_loss)]
fn vignette(frame: &Frame, amount: f32) -> Frame {
    let (w, h) = frame.dimensions();
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let sigma = cx.hypot(cy) * 0.5;
    Frame::from_fn(w, h, |x, y| {
        let r = (x as f32 - cx).hypot(y as f32 - cy);
        let falloff = (-r * r / (2.0 * sigma * sigma)).exp();
        let weight = amount.mul_add(falloff - 1.0, 1.0);
        let p = frame.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| round_u8(f32::from(p[c]) * weight)))
    })
}

/// Blurred highlights added back on top.
fn bloom(frame: &Frame, amount: f32) -> Frame {
    let highlights = Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        if crate::ops::luma_of(p) > 200 {
            image::Rgb(p)
        } else {
            image::Rgb([0, 0, 0])
        }
    });
    let glow = gaussian_blur_rgb(&highlights, 6.0);
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        let g = glow.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| {
            round_u8(f32::from(g[c]).mul_add(amount, f32::from(p[c])))
        }))
    })
}

#[allow(clippy::cast_precision_loss)]
pub fn apply(frame: &Frame, params: &Params) -> Frame {
    let mut out = frame.clone();
    if params.vignette > 0 {
        out = vignette(&out, params.vignette as f32 / 100.0);
    }
    if params.bloom > 0 {
        out = bloom(&out, params.bloom as f32 / 100.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vignette_darkens_corners_more_than_center() {
        let frame = Frame::from_pixel(32, 32, image::Rgb([200, 200, 200]));
        let out = vignette(&frame, 1.0);
        let center = out.get_pixel(16, 16).0[0];
        let corner = out.get_pixel(0, 0).0[0];
        assert!(corner < center, "corner {corner} vs center {center}");
    }

    #[test]
    fn bloom_brightens_around_highlights() {
        let mut frame = Frame::from_pixel(32, 32, image::Rgb([50, 50, 50]));
        for y in 14..18 {
            for x in 14..18 {
                frame.put_pixel(x, y, image::Rgb([255, 255, 255]));
            }
        }
        let out = bloom(&frame, 1.0);
        // A pixel just outside the highlight picks up glow.
        assert!(out.get_pixel(12, 16).0[0] > 50);
    }

    #[test]
    fn dark_frame_has_no_bloom() {
        let frame = Frame::from_pixel(16, 16, image::Rgb([40, 40, 40]));
        assert_eq!(bloom(&frame, 1.0), frame);
    }

    #[test]
    fn disabled_group_is_identity() {
        let frame = Frame::from_pixel(8, 8, image::Rgb([123, 45, 67]));
        assert_eq!(apply(&frame, &Params::default()), frame);
    }
}
