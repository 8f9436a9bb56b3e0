//! Spatial-chaos group: geometry-warping effects that stay O(W·H) per
//! frame (the Voronoi pass is bounded by cells × seeds).

use image::imageops::{self, FilterType};
use imageproc::distance_transform::Norm;
use rand::Rng;

use crate::ops::{blend, channel, luma_of, merge_channels, roll_row};
use crate::params::Params;
use crate::remap::Field;
use crate::state::SpatialState;
use crate::types::Frame;

/// Bright pixels drip downward. A bounded number of random samples per
/// frame keeps the cost independent of how bright the scene is.
fn pixel_gravity<R: Rng>(frame: &Frame, strength: u32, rng: &mut R) -> Frame {
    const SAMPLES: u32 = 1500;
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();
    for _ in 0..SAMPLES {
        let x = rng.random_range(0..w);
        let y = rng.random_range(0..h);
        let p = *frame.get_pixel(x, y);
        if luma_of(p.0) > 180 {
            for dy in 1..=strength * 5 {
                if y + dy >= h {
                    break;
                }
                out.put_pixel(x, y + dy, p);
            }
        }
    }
    out
}

/// Horizontal tears: everything below a random row slips sideways.
fn reality_tear<R: Rng>(frame: &Frame, tears: u32, rng: &mut R) -> Frame {
    let (_, h) = frame.dimensions();
    let mut out = frame.clone();
    for _ in 0..tears {
        let row = rng.random_range(0..h);
        let shift = rng.random_range(-50..=50i64);
        for y in row..h {
            roll_row(&mut out, y, shift);
        }
    }
    out
}

/// 50/50 blend with a center-zoomed copy of the frame.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn recursive_zoom(frame: &Frame, amount: f32) -> Frame {
    let (w, h) = frame.dimensions();
    let scale = 1.0 + amount;
    let cw = ((w as f32 / scale) as u32).max(1);
    let ch = ((h as f32 / scale) as u32).max(1);
    let cropped = imageops::crop_imm(frame, (w - cw) / 2, (h - ch) / 2, cw, ch).to_image();
    let zoomed = imageops::resize(&cropped, w, h, FilterType::Triangle);
    blend(frame, &zoomed, 0.5, 0.5)
}

/// Assign each 10-px cell the color at its nearest random seed.
fn voronoi_destruction<R: Rng>(frame: &Frame, seeds: u32, rng: &mut R) -> Frame {
    const CELL: u32 = 10;
    let (w, h) = frame.dimensions();
    let seeds: Vec<(u32, u32)> = (0..seeds)
        .map(|_| (rng.random_range(0..w), rng.random_range(0..h)))
        .collect();
    if seeds.is_empty() {
        return frame.clone();
    }
    let mut out = frame.clone();
    for cy in 0..h.div_ceil(CELL) {
        for cx in 0..w.div_ceil(CELL) {
            let center = (cx * CELL + CELL / 2, cy * CELL + CELL / 2);
            let nearest = seeds
                .iter()
                .min_by_key(|(sx, sy)| {
                    let dx = i64::from(*sx) - i64::from(center.0);
                    let dy = i64::from(*sy) - i64::from(center.1);
                    dx * dx + dy * dy
                })
                .copied()
                .unwrap_or((0, 0));
            let color = *frame.get_pixel(nearest.0, nearest.1);
            for y in (cy * CELL)..((cy + 1) * CELL).min(h) {
                for x in (cx * CELL)..((cx + 1) * CELL).min(w) {
                    out.put_pixel(x, y, color);
                }
            }
        }
    }
    out
}

/// Sinusoidal displacement field; samples that leave the frame keep the
/// original pixel.
fn non_euclidean(frame: &Frame, amount: f32) -> Frame {
    let field = Field::from_fn(frame.width(), frame.height(), |x, y| {
        (
            (y / 20.0).sin().mul_add(amount, x),
            (x / 20.0).cos().mul_add(amount, y),
        )
    });
    field.apply(frame)
}

/// Iterated square min-filter over each channel.
fn pixel_erosion(frame: &Frame, radius: u8) -> Frame {
    let eroded: [_; 3] = std::array::from_fn(|c| {
        imageproc::morphology::erode(&channel(frame, c), Norm::LInf, radius)
    });
    merge_channels(&eroded[0], &eroded[1], &eroded[2])
}

/// Shattered-glass shards: random regions re-pasted slightly offset.
fn fracture_glass<R: Rng>(frame: &Frame, shards: u32, rng: &mut R) -> Frame {
    const SHARD: u32 = 100;
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();
    for _ in 0..shards {
        let x0 = rng.random_range(0..w);
        let y0 = rng.random_range(0..h);
        let dx = rng.random_range(-10..=10i64);
        let dy = rng.random_range(-10..=10i64);
        for y in y0..(y0 + SHARD).min(h) {
            for x in x0..(x0 + SHARD).min(w) {
                let tx = i64::from(x) + dx;
                let ty = i64::from(y) + dy;
                if tx >= 0 && ty >= 0 && tx < i64::from(w) && ty < i64::from(h) {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    out.put_pixel(tx as u32, ty as u32, *frame.get_pixel(x, y));
                }
            }
        }
    }
    out
}

/// Persistent feedback buffer with a random region relocation each
/// frame, re-blended with the live frame.
fn spatial_feedback<R: Rng>(frame: &Frame, buffer: &mut Option<Frame>, rng: &mut R) -> Frame {
    let (w, h) = frame.dimensions();
    let mut fb = buffer.take().unwrap_or_else(|| frame.clone());
    fb = blend(frame, &fb, 0.7, 0.3);
    // Relocate one random region inside the buffer.
    let rw = rng.random_range(10..=(w / 2).max(11));
    let rh = rng.random_range(10..=(h / 2).max(11));
    let (sx, sy) = (rng.random_range(0..w), rng.random_range(0..h));
    let (dx, dy) = (rng.random_range(0..w), rng.random_range(0..h));
    let snapshot = fb.clone();
    for oy in 0..rh {
        for ox in 0..rw {
            let (from_x, from_y) = (sx + ox, sy + oy);
            let (to_x, to_y) = (dx + ox, dy + oy);
            if from_x < w && from_y < h && to_x < w && to_y < h {
                fb.put_pixel(to_x, to_y, *snapshot.get_pixel(from_x, from_y));
            }
        }
    }
    *buffer = Some(fb.clone());
    fb
}

/// Iterated 50/50 blend with the horizontal mirror.
fn folding_space(frame: &Frame, folds: u32) -> Frame {
    let mut out = frame.clone();
    for _ in 0..folds {
        let mirrored = imageops::flip_horizontal(&out);
        out = blend(&out, &mirrored, 0.5, 0.5);
    }
    out
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn apply<R: Rng>(frame: &Frame, params: &Params, state: &mut SpatialState, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    if params.pixel_gravity > 0 {
        out = pixel_gravity(&out, params.pixel_gravity.unsigned_abs(), rng);
    }
    if params.reality_tear > 0 {
        out = reality_tear(&out, params.reality_tear.unsigned_abs(), rng);
    }
    if params.recursive_zoom > 0 {
        out = recursive_zoom(&out, params.recursive_zoom as f32 / 100.0);
    }
    if params.voronoi_dest > 0 {
        out = voronoi_destruction(&out, params.voronoi_dest.unsigned_abs(), rng);
    }
    if params.non_euclidean > 0 {
        out = non_euclidean(&out, params.non_euclidean as f32);
    }
    if params.pixel_erosion > 0 {
        #[allow(clippy::cast_possible_truncation)]
        let radius = params.pixel_erosion.clamp(1, 10) as u8;
        out = pixel_erosion(&out, radius);
    }
    if params.fracture_glass > 0 {
        out = fracture_glass(&out, params.fracture_glass.unsigned_abs(), rng);
    }
    if params.spatial_feedback > 0 {
        out = spatial_feedback(&out, &mut state.feedback, rng);
    } else {
        state.feedback = None;
    }
    if params.folding_space > 0 {
        out = folding_space(&out, params.folding_space.unsigned_abs());
    }
    out
}
