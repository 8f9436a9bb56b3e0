//! Minimalism group: conceptual reductions of the image to almost
//! nothing.

use std::collections::HashMap;

use image::imageops::{self, FilterType};
use rand::Rng;

use crate::ops::{blend, mean_color, noise_frame};
use crate::params::Params;
use crate::state::MinimalismState;
use crate::types::{Frame, accum_from_frame, frame_from_accum, round_u8};

/// The whole frame collapses to its mean color.
fn single_pixel(frame: &Frame, amount: f32) -> Frame {
    let mean = mean_color(frame);
    let flat = Frame::from_pixel(
        frame.width(),
        frame.height(),
        image::Rgb([round_u8(mean[0]), round_u8(mean[1]), round_u8(mean[2])]),
    );
    blend(frame, &flat, 1.0 - amount, amount)
}

/// Long-horizon exponential mean of everything the pipeline has seen.
fn average_reality(frame: &Frame, state: &mut MinimalismState, amount: f32) -> Frame {
    let accum = state
        .average
        .get_or_insert_with(|| accum_from_frame(frame));
    for (acc, p) in accum.pixels_mut().zip(frame.pixels()) {
        for c in 0..3 {
            acc.0[c] = f32::from(p.0[c]).mul_add(0.01, acc.0[c] * 0.99);
        }
    }
    let averaged = frame_from_accum(accum);
    blend(frame, &averaged, 1.0 - amount, amount)
}

/// Fill the frame with its single most frequent exact color.
fn color_census(frame: &Frame, amount: f32) -> Frame {
    let mut counts: HashMap<[u8; 3], u32> = HashMap::new();
    for p in frame.pixels() {
        *counts.entry(p.0).or_insert(0) += 1;
    }
    let winner = counts
        .into_iter()
        .max_by_key(|&(_, n)| n)
        .map_or([0, 0, 0], |(color, _)| color);
    let flat = Frame::from_pixel(frame.width(), frame.height(), image::Rgb(winner));
    blend(frame, &flat, 1.0 - amount, amount)
}

/// 16×16 is all the reality you get.
fn reality_quantizer(frame: &Frame, amount: f32) -> Frame {
    let small = imageops::resize(frame, 16, 16, FilterType::Nearest);
    let quantized = imageops::resize(&small, frame.width(), frame.height(), FilterType::Nearest);
    blend(frame, &quantized, 1.0 - amount, amount)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn apply<R: Rng>(
    frame: &Frame,
    params: &Params,
    state: &mut MinimalismState,
    elapsed_secs: f32,
    rng: &mut R,
) -> Frame {
    let mut out = frame.clone();
    if params.single_pixel > 0 {
        out = single_pixel(&out, params.single_pixel as f32 / 100.0);
    }
    if params.average_reality > 0 {
        out = average_reality(&out, state, params.average_reality as f32 / 100.0);
    } else {
        state.average = None;
    }
    if params.color_census > 0 {
        out = color_census(&out, params.color_census as f32 / 100.0);
    }
    if params.entropy_maximizer > 0 {
        let mix = 0.1 * params.entropy_maximizer as f32 / 100.0;
        let noise = noise_frame(rng, frame.width(), frame.height());
        out = blend(&out, &noise, 1.0 - mix, mix);
    }
    if params.camera_amnesia > 0 {
        let period_secs = params.camera_amnesia.unsigned_abs();
        let period = (elapsed_secs.max(0.0) as u64) / u64::from(period_secs.max(1));
        if period > 0 && state.amnesia_period != Some(period) {
            state.amnesia_period = Some(period);
            out = Frame::new(frame.width(), frame.height());
        }
    } else {
        state.amnesia_period = None;
    }
    if params.reality_quantizer > 0 {
        out = reality_quantizer(&out, params.reality_quantizer as f32 / 100.0);
    }
    if params.noise_wins > 0 {
        let share = (elapsed_secs / 60.0).clamp(0.0, 1.0) * params.noise_wins as f32 / 100.0;
        let noise = noise_frame(rng, frame.width(), frame.height());
        out = blend(&out, &noise, 1.0 - share, share);
    }
    out
}
