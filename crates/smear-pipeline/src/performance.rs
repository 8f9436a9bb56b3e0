//! Performance-art group: effects scripted against the session clock.
//! The pipeline never reads a wall clock; elapsed time arrives as an
//! argument so these are fully reproducible.

use image::imageops::{self, FilterType};
use rand::Rng;

use crate::ops::{blend, gaussian_blur_rgb, mean_absdiff};
use crate::params::Params;
use crate::state::PerformanceState;
use crate::types::{Frame, round_u8};

/// Footage quality decays the longer the session runs.
fn surveillance_degradation(frame: &Frame, strength: f32, elapsed_secs: f32) -> Frame {
    let radius = (elapsed_secs / 10.0 * strength * 50.0).min(50.0);
    gaussian_blur_rgb(frame, radius / 3.0)
}

/// Stillness is punished with blur; motion keeps the image sharp.
fn attention_punisher(frame: &Frame, prev: &Frame, strength: f32) -> Frame {
    if mean_absdiff(frame, prev) < 10.0 {
        gaussian_blur_rgb(frame, strength * 8.0)
    } else {
        frame.clone()
    }
}

/// Motion is punished instead: pixels that changed become static.
fn observer_effect<R: Rng>(frame: &Frame, prev: &Frame, probability: f32, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    for (p, q) in out.pixels_mut().zip(prev.pixels()) {
        let diff: u32 = (0..3).map(|c| u32::from(p.0[c].abs_diff(q.0[c]))).sum();
        if diff / 3 > 15 && rng.random::<f32>() < probability {
            p.0 = [rng.random(), rng.random(), rng.random()];
        }
    }
    out
}

/// Additive noise whose amplitude grows with session length.
fn machine_fatigue<R: Rng>(frame: &Frame, strength: f32, elapsed_secs: f32, rng: &mut R) -> Frame {
    let amplitude = (elapsed_secs / 2.0).min(100.0) * strength;
    if amplitude < 1.0 {
        return frame.clone();
    }
    let mut out = frame.clone();
    for p in out.pixels_mut() {
        for c in 0..3 {
            let offset = rng.random_range(-amplitude..=amplitude);
            p.0[c] = round_u8(f32::from(p.0[c]) + offset);
        }
    }
    out
}

/// Binary static; everything dies at two minutes.
fn binary_static<R: Rng>(width: u32, height: u32, rng: &mut R) -> Frame {
    let mut out = Frame::new(width, height);
    for p in out.pixels_mut() {
        let v = if rng.random::<bool>() { 255 } else { 0 };
        p.0 = [v, v, v];
    }
    out
}

/// Thirty-second cycle: the last five seconds collapse the frame toward
/// a single pixel, then it resurrects.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn resurrection_loop(frame: &Frame, elapsed_secs: f32) -> Frame {
    let cycle = elapsed_secs.rem_euclid(30.0);
    if cycle < 25.0 {
        return frame.clone();
    }
    let collapse = (cycle - 25.0) / 5.0;
    let (w, h) = frame.dimensions();
    let dw = (((w as f32) * (1.0 - collapse)) as u32).max(1);
    let dh = (((h as f32) * (1.0 - collapse)) as u32).max(1);
    let small = imageops::resize(frame, dw, dh, FilterType::Triangle);
    imageops::resize(&small, w, h, FilterType::Nearest)
}

#[allow(clippy::cast_precision_loss)]
pub fn apply<R: Rng>(
    frame: &Frame,
    params: &Params,
    state: &mut PerformanceState,
    elapsed_secs: f32,
    rng: &mut R,
) -> Frame {
    let mut out = frame.clone();
    if params.surveillance_degradation > 0 {
        out = surveillance_degradation(
            &out,
            params.surveillance_degradation as f32 / 100.0,
            elapsed_secs,
        );
    }
    if params.attention_punisher > 0 {
        if let Some(prev) = &state.prev {
            out = attention_punisher(&out, prev, params.attention_punisher as f32 / 100.0);
        }
    }
    if params.observer_effect > 0 {
        if let Some(prev) = &state.prev {
            out = observer_effect(&out, prev, params.observer_effect as f32 / 100.0, rng);
        }
    }
    if params.machine_fatigue > 0 {
        out = machine_fatigue(&out, params.machine_fatigue as f32 / 100.0, elapsed_secs, rng);
    }
    if params.digital_death > 0 && elapsed_secs >= 120.0 {
        let strength = params.digital_death as f32 / 100.0;
        let dead = binary_static(frame.width(), frame.height(), rng);
        out = blend(&out, &dead, 1.0 - strength, strength);
    }
    if params.resurrection_loop > 0 {
        out = resurrection_loop(&out, elapsed_secs);
    }

    let needs_prev = params.attention_punisher > 0 || params.observer_effect > 0;
    state.prev = needs_prev.then(|| frame.clone());
    out
}
