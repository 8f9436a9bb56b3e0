//! Looks group: whole-frame color grades plus film grain.

use rand::Rng;

use crate::color::{apply_colormap, colormap_jet, scale_saturation, transform_colors};
use crate::params::{LookMode, Params};
use crate::types::{Frame, round_u8};

/// Classic sepia tone matrix.
#[rustfmt::skip]
const SEPIA: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Oversaturated with a magenta/teal push.
fn cyberpunk(frame: &Frame) -> Frame {
    let saturated = scale_saturation(frame, 1.5);
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = saturated.get_pixel(x, y).0;
        image::Rgb([
            round_u8(f32::from(p[0]) + 10.0),
            round_u8(f32::from(p[1]) - 10.0),
            round_u8(f32::from(p[2]) + 25.0),
        ])
    })
}

/// Uniform grain; amplitude in channel values.
fn film_grain<R: Rng>(frame: &Frame, amplitude: f32, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    for p in out.pixels_mut() {
        let offset = rng.random_range(-amplitude..=amplitude);
        for c in 0..3 {
            p.0[c] = round_u8(f32::from(p.0[c]) + offset);
        }
    }
    out
}

pub fn apply<R: Rng>(frame: &Frame, params: &Params, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    match params.look_mode {
        LookMode::None => {}
        LookMode::Sepia => out = transform_colors(&out, &SEPIA),
        LookMode::Cyberpunk => out = cyberpunk(&out),
        LookMode::Duotone => out = apply_colormap(&out, colormap_jet),
    }
    if params.film_grain > 0 {
        #[allow(clippy::cast_precision_loss)]
        let amplitude = params.film_grain as f32;
        out = film_grain(&out, amplitude, rng);
    }
    out
}
