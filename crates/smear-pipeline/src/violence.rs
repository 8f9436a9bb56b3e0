//! Digital-violence group: codec damage, transport damage, and buffer
//! damage. Every effect here draws fresh randomness each call.

use image::imageops::{self, FilterType};
use rand::Rng;

use crate::color::transform_colors;
use crate::ops::{roll_horizontal, roll_row, roll_vertical};
use crate::params::Params;
use crate::types::Frame;

/// Real JPEG encode/decode at the requested quality. Codec failure
/// leaves the frame untouched rather than failing the pipeline.
fn comp_artifacts(frame: &Frame, quality: u8) -> Frame {
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    if encoder.encode_image(frame).is_err() {
        return frame.clone();
    }
    image::load_from_memory_with_format(&buf, image::ImageFormat::Jpeg)
        .map_or_else(|_| frame.clone(), |img| img.to_rgb8())
}

/// Rows independently tear sideways.
fn row_desync<R: Rng>(frame: &Frame, probability: f32, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    let max_shift = i64::from(frame.width() / 4).max(1);
    for y in 0..frame.height() {
        if rng.random::<f32>() < probability {
            roll_row(&mut out, y, rng.random_range(-max_shift..=max_shift));
        }
    }
    out
}

/// Drop random rectangular blocks to black or static.
fn packet_loss<R: Rng>(frame: &Frame, losses: u32, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    let (w, h) = frame.dimensions();
    for _ in 0..losses {
        let bw = rng.random_range(10..=50u32);
        let bh = rng.random_range(10..=50u32);
        let x0 = rng.random_range(0..w.max(1));
        let y0 = rng.random_range(0..h.max(1));
        let noise = rng.random::<bool>();
        for y in y0..(y0 + bh).min(h) {
            for x in x0..(x0 + bw).min(w) {
                let p = if noise {
                    [rng.random(), rng.random(), rng.random()]
                } else {
                    [0, 0, 0]
                };
                out.put_pixel(x, y, image::Rgb(p));
            }
        }
    }
    out
}

/// Randomly crush the resolution and blow it back up, nearest both ways.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn res_thrashing<R: Rng>(frame: &Frame, rng: &mut R) -> Frame {
    let factor = rng.random_range(0.1..1.0f32);
    let (w, h) = frame.dimensions();
    let dw = ((w as f32 * factor) as u32).max(1);
    let dh = ((h as f32 * factor) as u32).max(1);
    let small = imageops::resize(frame, dw, dh, FilterType::Nearest);
    imageops::resize(&small, w, h, FilterType::Nearest)
}

/// Permute a random subset of 32-px macroblocks.
fn macroblock_shuffle<R: Rng>(frame: &Frame, fraction: f32, rng: &mut R) -> Frame {
    const BLOCK: u32 = 32;
    let (w, h) = frame.dimensions();
    let (bw, bh) = (w.div_ceil(BLOCK), h.div_ceil(BLOCK));
    let mut selected: Vec<(u32, u32)> = (0..bh)
        .flat_map(|by| (0..bw).map(move |bx| (bx, by)))
        .filter(|_| rng.random::<f32>() < fraction)
        .collect();
    if selected.len() < 2 {
        return frame.clone();
    }
    let sources = selected.clone();
    // Fisher–Yates over the selected blocks.
    for i in (1..selected.len()).rev() {
        selected.swap(i, rng.random_range(0..=i));
    }
    let mut out = frame.clone();
    for (&(dx, dy), &(sx, sy)) in sources.iter().zip(&selected) {
        for oy in 0..BLOCK {
            for ox in 0..BLOCK {
                let (to_x, to_y) = (dx * BLOCK + ox, dy * BLOCK + oy);
                let (from_x, from_y) = (sx * BLOCK + ox, sy * BLOCK + oy);
                if to_x < w && to_y < h && from_x < w && from_y < h {
                    out.put_pixel(to_x, to_y, *frame.get_pixel(from_x, from_y));
                }
            }
        }
    }
    out
}

/// Vertical hold failure driven by the session clock, with occasional
/// horizontal slips.
#[allow(clippy::cast_possible_truncation)]
fn sync_loss<R: Rng>(frame: &Frame, strength: f32, elapsed_secs: f32, rng: &mut R) -> Frame {
    let shift = (elapsed_secs * 60.0 * strength) as i64;
    let mut out = roll_vertical(frame, shift);
    if rng.random::<f32>() < 0.1 {
        out = roll_horizontal(&out, rng.random_range(-50..=50));
    }
    out
}

/// Per-pixel hold from the previous output.
fn datamosh_still<R: Rng>(frame: &Frame, prev: &Frame, probability: f32, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    for (p, old) in out.pixels_mut().zip(prev.pixels()) {
        if rng.random::<f32>() < probability {
            *p = *old;
        }
    }
    out
}

/// Rotate the flat sample buffer, smearing channels across pixels.
fn buffer_overrun(frame: &Frame, bytes: usize) -> Frame {
    let (w, h) = frame.dimensions();
    let mut raw = frame.as_raw().clone();
    if raw.is_empty() {
        return frame.clone();
    }
    let len = raw.len();
    raw.rotate_left(bytes % len);
    Frame::from_raw(w, h, raw).unwrap_or_else(|| frame.clone())
}

/// Random color-mixing matrix, as if the stream's header lied about the
/// pixel format.
fn corrupted_header<R: Rng>(frame: &Frame, rng: &mut R) -> Frame {
    let matrix: [[f32; 3]; 3] =
        std::array::from_fn(|_| std::array::from_fn(|_| rng.random_range(0.5..1.5f32)));
    transform_colors(frame, &matrix)
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn apply<R: Rng>(
    frame: &Frame,
    params: &Params,
    prev_output: Option<&Frame>,
    elapsed_secs: f32,
    rng: &mut R,
) -> Frame {
    let mut out = frame.clone();
    if params.comp_artifacts > 0 {
        #[allow(clippy::cast_possible_truncation)]
        let quality = (100 - params.comp_artifacts).clamp(1, 100) as u8;
        out = comp_artifacts(&out, quality);
    }
    if params.row_desync > 0 {
        out = row_desync(&out, params.row_desync as f32 / 100.0, rng);
    }
    if params.packet_loss > 0 {
        out = packet_loss(&out, params.packet_loss.unsigned_abs(), rng);
    }
    if params.res_thrashing > 0 && rng.random::<f32>() < params.res_thrashing as f32 / 100.0 {
        out = res_thrashing(&out, rng);
    }
    if params.macroblock_shuffle > 0 {
        out = macroblock_shuffle(&out, params.macroblock_shuffle as f32 / 100.0, rng);
    }
    if params.sync_loss > 0 {
        out = sync_loss(&out, params.sync_loss as f32 / 100.0, elapsed_secs, rng);
    }
    if params.datamosh_still > 0 {
        if let Some(prev) = prev_output {
            out = datamosh_still(&out, prev, params.datamosh_still as f32 / 100.0, rng);
        }
    }
    if params.buffer_overrun > 0 {
        out = buffer_overrun(&out, params.buffer_overrun as usize * 10);
    }
    if params.corrupted_header > 0 && rng.random::<f32>() < params.corrupted_header as f32 / 100.0 {
        out = corrupted_header(&out, rng);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn gradient(w: u32, h: u32) -> Frame {
        Frame::from_fn(w, h, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([(x * 2) as u8, (y * 2) as u8, 99])
        })
    }

    #[test]
    fn jpeg_round_trip_preserves_shape() {
        let frame = gradient(33, 17);
        let out = comp_artifacts(&frame, 10);
        assert_eq!(out.dimensions(), frame.dimensions());
    }

    #[test]
    fn jpeg_low_quality_changes_pixels() {
        let frame = gradient(64, 64);
        let out = comp_artifacts(&frame, 5);
        assert_ne!(out, frame);
    }

    #[test]
    fn row_desync_zero_probability_is_identity() {
        let frame = gradient(16, 8);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(row_desync(&frame, 0.0, &mut rng), frame);
    }

    #[test]
    fn packet_loss_preserves_shape() {
        let frame = gradient(64, 48);
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(packet_loss(&frame, 10, &mut rng).dimensions(), (64, 48));
    }

    #[test]
    fn res_thrashing_preserves_shape() {
        let frame = gradient(40, 30);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(res_thrashing(&frame, &mut rng).dimensions(), (40, 30));
    }

    #[test]
    fn macroblock_shuffle_is_a_permutation_of_blocks() {
        // On a frame that is an exact block grid of solid-color blocks,
        // shuffling must preserve the multiset of colors.
        let frame = Frame::from_fn(64, 64, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([(x / 32) as u8 * 100, (y / 32) as u8 * 100, 0])
        });
        let mut rng = StdRng::seed_from_u64(4);
        let out = macroblock_shuffle(&frame, 1.0, &mut rng);
        let mut before: Vec<[u8; 3]> = frame.pixels().map(|p| p.0).collect();
        let mut after: Vec<[u8; 3]> = out.pixels().map(|p| p.0).collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
    }

    #[test]
    fn datamosh_full_probability_holds_previous() {
        let frame = gradient(8, 8);
        let prev = Frame::from_pixel(8, 8, image::Rgb([7, 7, 7]));
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(datamosh_still(&frame, &prev, 1.0, &mut rng), prev);
    }

    #[test]
    fn buffer_overrun_full_cycle_is_identity() {
        let frame = gradient(4, 4);
        let len = frame.as_raw().len();
        assert_eq!(buffer_overrun(&frame, len), frame);
        assert_ne!(buffer_overrun(&frame, 3), frame);
    }

    #[test]
    fn disabled_group_is_identity() {
        let frame = gradient(16, 16);
        let mut rng = StdRng::seed_from_u64(6);
        let out = apply(&frame, &Params::default(), None, 5.0, &mut rng);
        assert_eq!(out, frame);
    }
}
