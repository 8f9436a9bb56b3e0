//! Glitch group: classic analog/digital interference looks.

use rand::Rng;

use crate::ops::{blend, noise_frame, roll_row};
use crate::params::Params;
use crate::types::{Frame, round_u8};

/// Push the red and blue channels apart with wraparound.
fn rgb_split(frame: &Frame, shift: i64) -> Frame {
    let w = i64::from(frame.width());
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rx = ((i64::from(x) - shift).rem_euclid(w)) as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bx = ((i64::from(x) + shift).rem_euclid(w)) as u32;
        image::Rgb([
            frame.get_pixel(rx, y).0[0],
            frame.get_pixel(x, y).0[1],
            frame.get_pixel(bx, y).0[2],
        ])
    })
}

/// A random tenth of the rows jitter sideways.
fn jitter<R: Rng>(frame: &Frame, magnitude: i64, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    for y in 0..frame.height() {
        if rng.random::<f32>() < 0.1 {
            roll_row(&mut out, y, rng.random_range(-magnitude..=magnitude));
        }
    }
    out
}

/// Five random horizontal bands slip sideways.
fn block_shift<R: Rng>(frame: &Frame, max_height: u32, rng: &mut R) -> Frame {
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();
    for _ in 0..5 {
        let y0 = rng.random_range(0..h);
        let band = rng.random_range(1..=max_height.max(1));
        let shift = rng.random_range(-i64::from(w / 4).max(1)..=i64::from(w / 4).max(1));
        for y in y0..(y0 + band).min(h) {
            roll_row(&mut out, y, shift);
        }
    }
    out
}

/// Tape noise plus a few hot scanlines.
fn vhs_noise<R: Rng>(frame: &Frame, amount: f32, rng: &mut R) -> Frame {
    let noise = noise_frame(rng, frame.width(), frame.height());
    let mix = 0.1 * amount;
    let mut out = blend(frame, &noise, 1.0 - mix, mix);
    for _ in 0..3 {
        let y = rng.random_range(0..frame.height());
        for x in 0..frame.width() {
            let p = out.get_pixel_mut(x, y);
            for c in 0..3 {
                p.0[c] = round_u8(f32::from(p.0[c]).mul_add(1.5, 20.0));
            }
        }
    }
    out
}

pub fn apply<R: Rng>(frame: &Frame, params: &Params, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    if params.glitch_rgb_split > 0 {
        out = rgb_split(&out, i64::from(params.glitch_rgb_split));
    }
    if params.glitch_jitter > 0 {
        out = jitter(&out, i64::from(params.glitch_jitter), rng);
    }
    if params.glitch_block_shift > 0 {
        out = block_shift(&out, params.glitch_block_shift.unsigned_abs(), rng);
    }
    if params.vhs_noise > 0 {
        #[allow(clippy::cast_precision_loss)]
        let amount = params.vhs_noise as f32 / 100.0;
        out = vhs_noise(&out, amount, rng);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn gradient() -> Frame {
        Frame::from_fn(20, 10, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([(x * 12) as u8, (y * 25) as u8, 200])
        })
    }

    #[test]
    fn rgb_split_keeps_green_in_place() {
        let frame = gradient();
        let out = rgb_split(&frame, 4);
        for (a, b) in out.pixels().zip(frame.pixels()) {
            assert_eq!(a.0[1], b.0[1]);
        }
    }

    #[test]
    fn rgb_split_moves_red_backwards() {
        let frame = Frame::from_fn(8, 1, |x, _| {
            if x == 4 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        let out = rgb_split(&frame, 2);
        assert_eq!(out.get_pixel(6, 0).0[0], 255);
    }

    #[test]
    fn jitter_preserves_row_content() {
        let frame = gradient();
        let mut rng = StdRng::seed_from_u64(1);
        let out = jitter(&frame, 5, &mut rng);
        // Rolls permute within rows, so each row keeps its multiset.
        for y in 0..frame.height() {
            let mut before: Vec<[u8; 3]> =
                (0..frame.width()).map(|x| frame.get_pixel(x, y).0).collect();
            let mut after: Vec<[u8; 3]> =
                (0..frame.width()).map(|x| out.get_pixel(x, y).0).collect();
            before.sort_unstable();
            after.sort_unstable();
            assert_eq!(before, after, "row {y}");
        }
    }

    #[test]
    fn vhs_noise_preserves_shape() {
        let mut rng = StdRng::seed_from_u64(2);
        let out = vhs_noise(&gradient(), 1.0, &mut rng);
        assert_eq!(out.dimensions(), (20, 10));
    }

    #[test]
    fn disabled_group_is_identity() {
        let frame = gradient();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(apply(&frame, &Params::default(), &mut rng), frame);
    }
}
