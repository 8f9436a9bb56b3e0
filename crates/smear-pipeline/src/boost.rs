//! Boost group: the effects the original exposed as a hardware-
//! accelerated tier, rendered here on the CPU with the same math.

use image::imageops::{self, FilterType};
use rand::Rng;

use crate::color::{apply_colormap, colormap_hot, shift_hue};
use crate::ops::{blend, gaussian_blur_rgb, gray_to_rgb, luma, roll_row, sigma_for_kernel};
use crate::params::Params;
use crate::remap::{Field, FieldKey};
use crate::state::BoostState;
use crate::types::{Dimensions, Frame, Rgb32FImage, accum_from_frame, frame_from_accum, round_u8};

fn canny_view(frame: &Frame, amount: f32) -> Frame {
    let edges = gray_to_rgb(&imageproc::edges::canny(&luma(frame), 50.0, 150.0));
    blend(frame, &edges, 1.0 - amount, amount)
}

fn bilateral(frame: &Frame, amount: f32) -> Frame {
    let sigma_color = amount.mul_add(60.0, 15.0);
    imageproc::filter::bilateral_filter(
        frame,
        2,
        4.0,
        imageproc::filter::bilateral::GaussianEuclideanColorDistance::new(sigma_color),
    )
}

/// Contrast punch: gain up to 2.25 with a +20 lift.
fn punch(frame: &Frame, amount: f32) -> Frame {
    let gain = amount.mul_add(1.25, 1.0);
    let lift = amount * 20.0;
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| {
            round_u8(f32::from(p[c]).mul_add(gain, lift))
        }))
    })
}

fn edge_glow(frame: &Frame, amount: f32) -> Frame {
    let edges = gray_to_rgb(&imageproc::edges::canny(&luma(frame), 50.0, 150.0));
    let glow = gaussian_blur_rgb(&edges, 3.0);
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        let g = glow.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| {
            round_u8(f32::from(g[c]).mul_add(2.0 * amount, f32::from(p[c])))
        }))
    })
}

/// Soft-focus blur with a purple cast.
fn dream(frame: &Frame, amount: f32) -> Frame {
    let soft = blend(frame, &gaussian_blur_rgb(frame, 4.0), 0.5, 0.5);
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = soft.get_pixel(x, y).0;
        image::Rgb([
            round_u8(20.0f32.mul_add(amount, f32::from(p[0]))),
            p[1],
            round_u8(30.0f32.mul_add(amount, f32::from(p[2]))),
        ])
    })
}

fn posterize(frame: &Frame, amount: f32) -> Frame {
    let coarse = Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| (p[c] / 64) * 64 + 32))
    });
    blend(frame, &coarse, 1.0 - amount, amount)
}

/// Shift the red and blue channels apart horizontally.
#[allow(clippy::cast_possible_truncation)]
fn chromatic(frame: &Frame, amount: f32) -> Frame {
    let shift = (amount * 5.0).round() as i64;
    let w = i64::from(frame.width());
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        #[allow(clippy::cast_sign_loss)]
        let rx = ((i64::from(x) - shift).rem_euclid(w)) as u32;
        #[allow(clippy::cast_sign_loss)]
        let bx = ((i64::from(x) + shift).rem_euclid(w)) as u32;
        image::Rgb([
            frame.get_pixel(rx, y).0[0],
            frame.get_pixel(x, y).0[1],
            frame.get_pixel(bx, y).0[2],
        ])
    })
}

fn solarize_mid(frame: &Frame, amount: f32) -> Frame {
    let flipped = Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        if crate::ops::luma_of(p) > 128 {
            image::Rgb([255 - p[0], 255 - p[1], 255 - p[2]])
        } else {
            image::Rgb(p)
        }
    });
    blend(frame, &flipped, 1.0 - amount, amount)
}

fn ghosting(frame: &Frame, ghost: &mut Rgb32FImage, amount: f32) -> Frame {
    for (acc, p) in ghost.pixels_mut().zip(frame.pixels()) {
        for c in 0..3 {
            acc.0[c] = f32::from(p.0[c]).mul_add(0.1, acc.0[c] * 0.9);
        }
    }
    let trail = frame_from_accum(ghost);
    blend(frame, &trail, 1.0 - 0.3 * amount, 0.3 * amount)
}

fn block_glitch<R: Rng>(frame: &Frame, rng: &mut R) -> Frame {
    const BLOCK: u32 = 40;
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();
    for _ in 0..5 {
        let y0 = rng.random_range(0..h);
        let shift = rng.random_range(-i64::from(w / 4).max(1)..=i64::from(w / 4).max(1));
        for y in y0..(y0 + BLOCK).min(h) {
            roll_row(&mut out, y, shift);
        }
    }
    out
}

/// Approximate radial blur by repeatedly blending slight center zooms.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn radial_blur(frame: &Frame, amount: f32) -> Frame {
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();
    for pass in 1..=4u32 {
        let scale = 1.0 + 0.01 * amount * pass as f32;
        let cw = ((w as f32 / scale) as u32).max(1);
        let ch = ((h as f32 / scale) as u32).max(1);
        let cropped = imageops::crop_imm(&out, (w - cw) / 2, (h - ch) / 2, cw, ch).to_image();
        let zoomed = imageops::resize(&cropped, w, h, FilterType::Triangle);
        out = blend(&out, &zoomed, 0.6, 0.4);
    }
    out
}

fn infrared(frame: &Frame, amount: f32) -> Frame {
    let mapped = apply_colormap(frame, colormap_hot);
    blend(frame, &mapped, 1.0 - amount, amount)
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn apply<R: Rng>(frame: &Frame, params: &Params, state: &mut BoostState, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    if params.boost_blur > 0 {
        let kernel = params.boost_blur.unsigned_abs() * 2 + 1;
        out = gaussian_blur_rgb(&out, sigma_for_kernel(kernel));
    }
    if params.boost_canny > 0 {
        out = canny_view(&out, params.boost_canny as f32 / 100.0);
    }
    if params.boost_bilateral > 0 {
        out = bilateral(&out, params.boost_bilateral as f32 / 100.0);
    }
    if params.boost_warp > 0 {
        let amount = params.boost_warp;
        let dims = Dimensions::of(&out);
        let field = state.warp.get_or_build(
            FieldKey {
                tag: "boost_warp",
                amount,
                dims,
            },
            || {
                let strength = amount as f32 / 10.0;
                Field::from_fn(dims.width, dims.height, |x, y| {
                    (
                        (y / 15.0).sin().mul_add(strength, x),
                        (x / 15.0).cos().mul_add(strength, y),
                    )
                })
            },
        );
        out = field.apply(&out);
    }
    if params.boost_punch > 0 {
        out = punch(&out, params.boost_punch as f32 / 100.0);
    }
    if params.boost_edge_glow > 0 {
        out = edge_glow(&out, params.boost_edge_glow as f32 / 100.0);
    }
    if params.boost_dream > 0 {
        out = dream(&out, params.boost_dream as f32 / 100.0);
    }
    if params.boost_posterize > 0 {
        out = posterize(&out, params.boost_posterize as f32 / 100.0);
    }
    if params.boost_chromatic > 0 {
        out = chromatic(&out, params.boost_chromatic as f32 / 100.0);
    }
    if params.boost_solarize > 0 {
        out = solarize_mid(&out, params.boost_solarize as f32 / 100.0);
    }
    if params.boost_ghosting > 0 {
        let ghost = state.ghost.get_or_insert_with(|| accum_from_frame(&out));
        out = ghosting(&out, ghost, params.boost_ghosting as f32 / 100.0);
    } else {
        state.ghost = None;
    }
    if params.boost_color_cycle > 0 {
        state.hue_phase = (state.hue_phase + 2.0).rem_euclid(180.0);
        out = shift_hue(&out, state.hue_phase);
    } else {
        state.hue_phase = 0.0;
    }
    if params.boost_block_glitch > 0 {
        out = block_glitch(&out, rng);
    }
    if params.boost_radial_blur > 0 {
        out = radial_blur(&out, params.boost_radial_blur as f32 / 100.0);
    }
    if params.boost_infrared > 0 {
        out = infrared(&out, params.boost_infrared as f32 / 100.0);
    }
    out
}
