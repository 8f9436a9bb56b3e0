//! Color-space conversions and palette maps used by the color stages.
//!
//! Hue is handled in the halved-degree convention (one full turn = 180)
//! so rolling hue offsets can be stored mod 180; conversions expand to
//! full degrees internally.

use crate::ops::luma_of;
use crate::types::{Frame, round_u8};

/// HSV triple: hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    /// Hue in degrees.
    pub h: f32,
    /// Saturation.
    pub s: f32,
    /// Value.
    pub v: f32,
}

/// Convert an 8-bit RGB pixel to HSV.
#[must_use]
pub fn rgb_to_hsv(p: [u8; 3]) -> Hsv {
    let r = f32::from(p[0]) / 255.0;
    let g = f32::from(p[1]) / 255.0;
    let b = f32::from(p[2]) / 255.0;
    let cmax = r.max(g).max(b);
    let cmin = r.min(g).min(b);
    let delta = cmax - cmin;

    let mut h = 0.0;
    if delta > 1e-4 {
        h = if (cmax - r).abs() < f32::EPSILON {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if (cmax - g).abs() < f32::EPSILON {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
    }
    if h < 0.0 {
        h += 360.0;
    }
    let s = if cmax > 1e-4 { delta / cmax } else { 0.0 };
    Hsv { h, s, v: cmax }
}

/// Convert HSV back to an 8-bit RGB pixel.
#[must_use]
pub fn hsv_to_rgb(hsv: Hsv) -> [u8; 3] {
    let h = hsv.h.rem_euclid(360.0);
    let s = hsv.s.clamp(0.0, 1.0);
    let v = hsv.v.clamp(0.0, 1.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [
        round_u8((r + m) * 255.0),
        round_u8((g + m) * 255.0),
        round_u8((b + m) * 255.0),
    ]
}

/// Apply a per-pixel HSV rewrite to a whole frame.
pub fn map_hsv(frame: &Frame, mut f: impl FnMut(Hsv) -> Hsv) -> Frame {
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        image::Rgb(hsv_to_rgb(f(rgb_to_hsv(frame.get_pixel(x, y).0))))
    })
}

/// Rotate hue by an offset in half-degrees (the mod-180 convention).
#[must_use]
pub fn shift_hue(frame: &Frame, half_degrees: f32) -> Frame {
    let degrees = half_degrees * 2.0;
    map_hsv(frame, |hsv| Hsv {
        h: (hsv.h + degrees).rem_euclid(360.0),
        ..hsv
    })
}

/// Quantize hue to `shards` discrete buckets over the half-degree wheel.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn quantize_hue(frame: &Frame, shards: u32) -> Frame {
    let step = 180.0 / shards.max(1) as f32;
    map_hsv(frame, |hsv| Hsv {
        h: ((hsv.h / 2.0 / step).floor() * step) * 2.0,
        ..hsv
    })
}

/// Multiply saturation by a gain, clamped.
#[must_use]
pub fn scale_saturation(frame: &Frame, gain: f32) -> Frame {
    map_hsv(frame, |hsv| Hsv {
        s: (hsv.s * gain).clamp(0.0, 1.0),
        ..hsv
    })
}

/// Multiply value (brightness) by a gain, clamped.
#[must_use]
pub fn scale_value(frame: &Frame, gain: f32) -> Frame {
    map_hsv(frame, |hsv| Hsv {
        v: (hsv.v * gain).clamp(0.0, 1.0),
        ..hsv
    })
}

/// Apply a 3×3 color-mixing matrix (rows produce output channels).
#[must_use]
pub fn transform_colors(frame: &Frame, matrix: &[[f32; 3]; 3]) -> Frame {
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|row| {
            round_u8(
                f32::from(p[0]).mul_add(
                    matrix[row][0],
                    f32::from(p[1]).mul_add(matrix[row][1], f32::from(p[2]) * matrix[row][2]),
                ),
            )
        }))
    })
}

/// Invert the chroma opponent channels (Cb/Cr) while keeping luma,
/// producing the "impossible colors" look.
#[must_use]
pub fn invert_chroma(p: [u8; 3]) -> [u8; 3] {
    let r = f32::from(p[0]);
    let g = f32::from(p[1]);
    let b = f32::from(p[2]);
    let y = r.mul_add(0.299, g.mul_add(0.587, b * 0.114));
    let cb = 128.0 + r.mul_add(-0.168_736, g.mul_add(-0.331_264, b * 0.5));
    let cr = 128.0 + r.mul_add(0.5, g.mul_add(-0.418_688, b * -0.081_312));
    let (cb, cr) = (255.0 - cb, 255.0 - cr);
    [
        round_u8((cr - 128.0).mul_add(1.402, y)),
        round_u8((cb - 128.0).mul_add(-0.344_136, (cr - 128.0).mul_add(-0.714_136, y))),
        round_u8((cb - 128.0).mul_add(1.772, y)),
    ]
}

/// Jet-style false-color map over a luma value.
#[must_use]
pub fn colormap_jet(t: u8) -> [u8; 3] {
    let v = f32::from(t) / 255.0;
    let r = (1.5 - (4.0 * v - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * v - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * v - 1.0).abs()).clamp(0.0, 1.0);
    [round_u8(r * 255.0), round_u8(g * 255.0), round_u8(b * 255.0)]
}

/// Hot (black → red → yellow → white) false-color map over a luma value.
#[must_use]
pub fn colormap_hot(t: u8) -> [u8; 3] {
    let v = f32::from(t) / 255.0;
    let r = (v * 3.0).clamp(0.0, 1.0);
    let g = (v * 3.0 - 1.0).clamp(0.0, 1.0);
    let b = (v * 3.0 - 2.0).clamp(0.0, 1.0);
    [round_u8(r * 255.0), round_u8(g * 255.0), round_u8(b * 255.0)]
}

/// False-color a frame by mapping each pixel's luma through `map`.
#[must_use]
pub fn apply_colormap(frame: &Frame, map: fn(u8) -> [u8; 3]) -> Frame {
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        image::Rgb(map(luma_of(frame.get_pixel(x, y).0)))
    })
}
