//! Temporal-abuse group: accumulators, feedback loops, and history
//! replay that deliberately let the past contaminate the present.
//!
//! Per-frame cost stays O(W·H) regardless of strength; nothing here
//! iterates over the whole history ring except the weighted echo, which
//! is bounded by its parameter.

use std::collections::VecDeque;

use rand::Rng;

use crate::ops::blend;
use crate::params::Params;
use crate::state::{TemporalAbuseState, history_back};
use crate::types::{Frame, GrayImage, Rgb32FImage, accum_from_frame, frame_from_accum, round_u8};

/// Exponential smear: `accum = accum*(1-w) + frame*w` with the live
/// frame carrying weight p/100. Low settings lean hardest on the
/// accumulator; full strength tracks the live frame exactly.
fn time_smear(frame: &Frame, accum: &mut Option<Rgb32FImage>, strength: f32) -> Frame {
    let weight = strength;
    let accum = accum.get_or_insert_with(|| accum_from_frame(frame));
    for (acc, p) in accum.pixels_mut().zip(frame.pixels()) {
        for c in 0..3 {
            acc.0[c] = f32::from(p.0[c]).mul_add(weight, acc.0[c] * (1.0 - weight));
        }
    }
    frame_from_accum(accum)
}

/// Weighted sum over the newest `echoes` history entries with geometric
/// decay 0.7, normalized by the weight actually used.
fn temporal_echo(frame: &Frame, history: &VecDeque<Frame>, echoes: usize) -> Frame {
    let mut accum = accum_from_frame(frame);
    let mut total = 1.0f32;
    let mut weight = 1.0f32;
    for back in 1..=echoes {
        weight *= 0.7;
        let Some(entry) = history_back(history, back) else {
            break;
        };
        for (acc, p) in accum.pixels_mut().zip(entry.pixels()) {
            for c in 0..3 {
                acc.0[c] = f32::from(p.0[c]).mul_add(weight, acc.0[c]);
            }
        }
        total += weight;
    }
    for acc in accum.pixels_mut() {
        for c in 0..3 {
            acc.0[c] /= total;
        }
    }
    frame_from_accum(&accum)
}

/// A 10-px live stripe sweeping across the frame from 30 frames ago.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn time_slice(frame: &Frame, history: &VecDeque<Frame>, elapsed_secs: f32) -> Frame {
    const STRIPE: u32 = 10;
    let Some(delayed) = history_back(history, 30) else {
        return frame.clone();
    };
    let w = frame.width();
    let pos = ((elapsed_secs * 100.0).max(0.0) as u32) % w;
    Frame::from_fn(w, frame.height(), |x, y| {
        let in_stripe = (x + w - pos) % w < STRIPE;
        if in_stripe {
            *frame.get_pixel(x, y)
        } else {
            *delayed.get_pixel(x, y)
        }
    })
}

/// Replace a few random patches with pixels from random history depths.
fn reverse_aging<R: Rng>(frame: &Frame, history: &VecDeque<Frame>, rng: &mut R) -> Frame {
    const PATCH: u32 = 50;
    if history.len() <= 60 {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();
    for _ in 0..5 {
        let depth = rng.random_range(1..=history.len());
        let Some(source) = history_back(history, depth) else {
            continue;
        };
        let x0 = rng.random_range(0..w.max(1));
        let y0 = rng.random_range(0..h.max(1));
        for y in y0..(y0 + PATCH).min(h) {
            for x in x0..(x0 + PATCH).min(w) {
                out.put_pixel(x, y, *source.get_pixel(x, y));
            }
        }
    }
    out
}

/// Cells stochastically freeze into a persistent snapshot; frozen cells
/// get a small chance to thaw each frame.
fn freeze_cells<R: Rng>(
    frame: &Frame,
    state: &mut Option<(Frame, GrayImage)>,
    strength: f32,
    rng: &mut R,
) -> Frame {
    const CELL: u32 = 40;
    let (w, h) = frame.dimensions();
    let (frozen, mask) =
        state.get_or_insert_with(|| (frame.clone(), GrayImage::new(w.div_ceil(CELL), h.div_ceil(CELL))));
    let freeze_p = strength / 10.0; // p/1000 over p in 0..=100
    for cy in 0..mask.height() {
        for cx in 0..mask.width() {
            let cell = mask.get_pixel_mut(cx, cy);
            if cell.0[0] == 0 {
                if rng.random::<f32>() < freeze_p {
                    cell.0[0] = 255;
                    for y in (cy * CELL)..((cy + 1) * CELL).min(h) {
                        for x in (cx * CELL)..((cx + 1) * CELL).min(w) {
                            frozen.put_pixel(x, y, *frame.get_pixel(x, y));
                        }
                    }
                }
            } else if rng.random::<f32>() < 0.05 {
                cell.0[0] = 0;
            }
        }
    }
    Frame::from_fn(w, h, |x, y| {
        if mask.get_pixel(x / CELL, y / CELL).0[0] != 0 {
            *frozen.get_pixel(x, y)
        } else {
            *frame.get_pixel(x, y)
        }
    })
}

/// Additive burn-in: the buffer keeps absorbing the frame and is
/// composited back at 50%.
fn memory_burn(frame: &Frame, burn: &mut Option<Rgb32FImage>, rate: f32) -> Frame {
    let burn = burn.get_or_insert_with(|| accum_from_frame(frame));
    for (acc, p) in burn.pixels_mut().zip(frame.pixels()) {
        for c in 0..3 {
            acc.0[c] = f32::from(p.0[c]).mul_add(rate, acc.0[c]).min(255.0);
        }
    }
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        let b = burn.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| {
            round_u8(f32::from(p[c]).mul_add(0.5, b[c] * 0.5))
        }))
    })
}

/// Runaway gain feedback, clamped every frame so divergence stays
/// bounded at saturation instead of overflowing.
fn temp_feedback(frame: &Frame, buffer: &mut Option<Frame>, gain: f32) -> Frame {
    let prev = buffer.take().unwrap_or_else(|| frame.clone());
    let next = Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        let f = prev.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| {
            round_u8((f32::from(f[c]) * gain).mul_add(0.5, f32::from(p[c]) * 0.5))
        }))
    });
    let out = blend(frame, &next, 0.5, 0.5);
    *buffer = Some(next);
    out
}

/// Show a random history frame within the configured depth.
fn time_jitter<R: Rng>(frame: &Frame, history: &VecDeque<Frame>, depth: usize, rng: &mut R) -> Frame {
    if history.is_empty() {
        return frame.clone();
    }
    let back = rng.random_range(1..=depth.min(history.len()));
    history_back(history, back).cloned().unwrap_or_else(|| frame.clone())
}

/// Each output column sampled from a history entry proportional to its
/// x position: the frame becomes a horizontal timeline.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn slit_scan_time(frame: &Frame, history: &VecDeque<Frame>) -> Frame {
    if history.is_empty() {
        return frame.clone();
    }
    let w = frame.width();
    let len = history.len();
    Frame::from_fn(w, frame.height(), |x, y| {
        let idx = ((x as f32 / w.max(1) as f32) * (len - 1) as f32).floor() as usize;
        *history[idx].get_pixel(x, y)
    })
}

/// Hold a captured frame, recapturing every `quantum` frames.
fn temp_quantize(frame: &Frame, held: &mut Option<Frame>, frame_counter: u64, quantum: u64) -> Frame {
    if held.is_none() || frame_counter % quantum == 0 {
        *held = Some(frame.clone());
    }
    held.clone().unwrap_or_else(|| frame.clone())
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn apply<R: Rng>(
    frame: &Frame,
    params: &Params,
    state: &mut TemporalAbuseState,
    history: &VecDeque<Frame>,
    elapsed_secs: f32,
    frame_counter: u64,
    rng: &mut R,
) -> Frame {
    let mut out = frame.clone();
    if params.time_smear > 0 {
        out = time_smear(&out, &mut state.smear, params.time_smear as f32 / 100.0);
    } else {
        state.smear = None;
    }
    if params.temporal_echo > 0 {
        out = temporal_echo(&out, history, params.temporal_echo as usize);
    }
    if params.time_slice > 0 {
        out = time_slice(&out, history, elapsed_secs);
    }
    if params.reverse_aging > 0 {
        out = reverse_aging(&out, history, rng);
    }
    if params.freeze_cells > 0 {
        out = freeze_cells(&out, &mut state.frozen, params.freeze_cells as f32 / 100.0, rng);
    } else {
        state.frozen = None;
    }
    if params.memory_burn > 0 {
        out = memory_burn(&out, &mut state.burn, params.memory_burn as f32 / 1000.0);
    } else {
        state.burn = None;
    }
    if params.temp_feedback > 0 {
        out = temp_feedback(&out, &mut state.feedback, 1.0 + params.temp_feedback as f32 / 100.0);
    } else {
        state.feedback = None;
    }
    if params.time_jitter > 0 {
        out = time_jitter(&out, history, params.time_jitter as usize, rng);
    }
    if params.slit_scan > 0 {
        out = slit_scan_time(&out, history);
    }
    if params.temp_quantize > 0 {
        let quantum = (60 / u64::from(params.temp_quantize.unsigned_abs())).max(1);
        out = temp_quantize(&out, &mut state.held, frame_counter, quantum);
    } else {
        state.held = None;
    }
    out
}
