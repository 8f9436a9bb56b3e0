//! Perception group: effects aimed at the viewer's visual system
//! rather than the signal itself.

use rand::Rng;

use crate::color::{apply_colormap, colormap_jet, invert_chroma};
use crate::ops::{blend, channel, gaussian_blur_rgb, luma, merge_channels, noise_frame, roll_row};
use crate::params::Params;
use crate::types::{Frame, round_u8};

/// Horizontal bands rolling in counter-phase, keyed to the session
/// clock so the oscillation is smooth across frames.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn motion_hallucination(frame: &Frame, strength: f32, elapsed_secs: f32) -> Frame {
    const BAND: u32 = 20;
    let mut out = frame.clone();
    for y in 0..frame.height() {
        let band = (y / BAND) as f32;
        let phase = if (y / BAND) % 2 == 0 { 1.0 } else { -1.0 };
        let shift = (elapsed_secs.mul_add(2.0, band).sin() * strength * 10.0 * phase) as i64;
        roll_row(&mut out, y, shift);
    }
    out
}

/// Blend toward chroma-inverted pixels.
fn impossible_colors(frame: &Frame, amount: f32) -> Frame {
    let inverted = Frame::from_fn(frame.width(), frame.height(), |x, y| {
        image::Rgb(invert_chroma(frame.get_pixel(x, y).0))
    });
    blend(frame, &inverted, 1.0 - amount, amount)
}

/// Iterated Canny overlay: edges of edges of edges.
fn edge_overload(frame: &Frame, iterations: u32) -> Frame {
    let mut out = frame.clone();
    for _ in 0..iterations {
        let edges = imageproc::edges::canny(&luma(&out), 50.0, 150.0);
        for (p, e) in out.pixels_mut().zip(edges.pixels()) {
            if e.0[0] > 0 {
                p.0 = [255, 255, 255];
            }
        }
    }
    out
}

/// False-depth view: JET colormap over inverted luma.
fn depth_inversion(frame: &Frame, amount: f32) -> Frame {
    let inverted = Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        image::Rgb([255 - p[0], 255 - p[1], 255 - p[2]])
    });
    let mapped = apply_colormap(&inverted, colormap_jet);
    blend(frame, &mapped, 1.0 - amount, amount)
}

/// Blur only warm-toned regions, the way face detection false-positives
/// smear on cheap cameras.
fn face_ghosting(frame: &Frame, amount: f32) -> Frame {
    let blurred = gaussian_blur_rgb(frame, amount.mul_add(6.0, 2.0));
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        let warm = p[0] > 95 && p[0] > p[1] && p[1] > p[2];
        if warm {
            *blurred.get_pixel(x, y)
        } else {
            image::Rgb(p)
        }
    })
}

/// 3×3 sharpen, run per channel.
fn pareidolia_booster(frame: &Frame, amount: f32) -> Frame {
    #[rustfmt::skip]
    const KERNEL: [i16; 9] = [
         0, -1,  0,
        -1,  5, -1,
         0, -1,  0,
    ];
    let kernel = imageproc::kernel::Kernel::new(&KERNEL, 3, 3);
    let sharpened: [_; 3] = std::array::from_fn(|c| {
        imageproc::filter::filter_clamped::<image::Luma<u8>, i16, u8>(&channel(frame, c), kernel)
    });
    let sharpened = merge_channels(&sharpened[0], &sharpened[1], &sharpened[2]);
    blend(frame, &sharpened, 1.0 - amount, amount)
}

/// Noise that concentrates in the shadows, like sensor hiss.
fn visual_tinnitus<R: Rng>(frame: &Frame, amount: f32, rng: &mut R) -> Frame {
    let noise = noise_frame(rng, frame.width(), frame.height());
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        let n = noise.get_pixel(x, y).0;
        let darkness = 1.0 - f32::from(crate::ops::luma_of(p)) / 255.0;
        let mix = amount * darkness * 0.6;
        image::Rgb(std::array::from_fn(|c| {
            round_u8(f32::from(p[c]).mul_add(1.0 - mix, f32::from(n[c]) * mix))
        }))
    })
}

/// Blend with the inverted previous output, leaving an afterimage of
/// everything that just moved.
fn afterimage_trap(frame: &Frame, prev: &Frame, strength: f32) -> Frame {
    let inverted = Frame::from_fn(prev.width(), prev.height(), |x, y| {
        let p = prev.get_pixel(x, y).0;
        image::Rgb([255 - p[0], 255 - p[1], 255 - p[2]])
    });
    blend(frame, &inverted, 1.0 - 0.3 * strength, 0.3 * strength)
}

#[allow(clippy::cast_precision_loss)]
pub fn apply<R: Rng>(
    frame: &Frame,
    params: &Params,
    prev_output: Option<&Frame>,
    elapsed_secs: f32,
    rng: &mut R,
) -> Frame {
    let mut out = frame.clone();
    if params.motion_hallucination > 0 {
        out = motion_hallucination(&out, params.motion_hallucination as f32 / 100.0, elapsed_secs);
    }
    if params.impossible_colors > 0 {
        out = impossible_colors(&out, params.impossible_colors as f32 / 100.0);
    }
    if params.edge_overload > 0 {
        out = edge_overload(&out, params.edge_overload.unsigned_abs());
    }
    if params.depth_inversion > 0 {
        out = depth_inversion(&out, params.depth_inversion as f32 / 100.0);
    }
    if params.face_ghosting > 0 {
        out = face_ghosting(&out, params.face_ghosting as f32 / 100.0);
    }
    if params.pareidolia_booster > 0 {
        out = pareidolia_booster(&out, params.pareidolia_booster as f32 / 100.0);
    }
    if params.visual_tinnitus > 0 {
        out = visual_tinnitus(&out, params.visual_tinnitus as f32 / 100.0, rng);
    }
    if params.afterimage_trap > 0 {
        if let Some(prev) = prev_output {
            out = afterimage_trap(&out, prev, params.afterimage_trap as f32 / 100.0);
        }
    }
    out
}
