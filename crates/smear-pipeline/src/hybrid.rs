//! Hybrid group: effects that cross the history ring with spatial
//! structure. Several share a per-pixel stillness age map, updated once
//! per call from the previous input frame.

use std::collections::VecDeque;

use rand::Rng;

use crate::ops::{gaussian_blur_rgb, luma_of};
use crate::params::Params;
use crate::state::{AgeMap, HybridState, history_back};
use crate::types::{Frame, GrayImage, Rgb32FImage, accum_from_frame, round_u8};

/// Per-channel difference below this counts a pixel as still.
const STILL_THRESHOLD: u32 = 10;

fn update_age(frame: &Frame, prev: &Frame, age: &mut AgeMap) {
    for ((a, p), q) in age.pixels_mut().zip(frame.pixels()).zip(prev.pixels()) {
        let diff: u32 = (0..3).map(|c| u32::from(p.0[c].abs_diff(q.0[c]))).sum();
        if diff / 3 < STILL_THRESHOLD {
            a.0[0] = a.0[0].saturating_add(1);
        } else {
            a.0[0] = 0;
        }
    }
}

/// Left half replayed from 30 frames ago, right half live.
fn time_delayed_mirrors(frame: &Frame, history: &VecDeque<Frame>) -> Frame {
    let Some(delayed) = history_back(history, 30) else {
        return frame.clone();
    };
    let w = frame.width();
    Frame::from_fn(w, frame.height(), |x, y| {
        if x < w / 2 {
            *delayed.get_pixel(x, y)
        } else {
            *frame.get_pixel(x, y)
        }
    })
}

/// Fossils absorb the frame only where motion happens, so moving things
/// leave permanent residue.
fn motion_fossils(frame: &Frame, prev: &Frame, fossils: &mut Rgb32FImage) -> Frame {
    for ((acc, p), q) in fossils.pixels_mut().zip(frame.pixels()).zip(prev.pixels()) {
        let diff: u32 = (0..3).map(|c| u32::from(p.0[c].abs_diff(q.0[c]))).sum();
        if diff / 3 >= STILL_THRESHOLD {
            for c in 0..3 {
                acc.0[c] = f32::from(p.0[c]).mul_add(0.05, acc.0[c] * 0.95);
            }
        }
    }
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        let f = fossils.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| {
            round_u8(f32::from(p[c]).mul_add(0.7, f[c] * 0.3))
        }))
    })
}

/// Blur that accrues with stillness: the longer a pixel sits, the
/// blurrier it renders.
fn temp_blur_field(frame: &Frame, age: &AgeMap, strength: f32) -> Frame {
    let blurred = gaussian_blur_rgb(frame, 6.0);
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let weight = (f32::from(age.get_pixel(x, y).0[0]) / 100.0).min(1.0) * strength;
        let p = frame.get_pixel(x, y).0;
        let b = blurred.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| {
            round_u8(f32::from(p[c]).mul_add(1.0 - weight, f32::from(b[c]) * weight))
        }))
    })
}

/// Rows that have sat still long enough get sorted by luma.
#[allow(clippy::cast_precision_loss)]
fn chrono_pixel_sort(frame: &Frame, age: &AgeMap) -> Frame {
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();
    for y in 0..h {
        let mean_age: f32 =
            (0..w).map(|x| f32::from(age.get_pixel(x, y).0[0])).sum::<f32>() / w.max(1) as f32;
        if mean_age > 50.0 {
            let mut row: Vec<[u8; 3]> = (0..w).map(|x| frame.get_pixel(x, y).0).collect();
            row.sort_by_key(|p| luma_of(*p));
            for (x, p) in row.into_iter().enumerate() {
                #[allow(clippy::cast_possible_truncation)]
                out.put_pixel(x as u32, y, image::Rgb(p));
            }
        }
    }
    out
}

/// Pixels that stay still past the threshold rot into static.
fn frame_erosion<R: Rng>(frame: &Frame, age: &AgeMap, threshold: u16, rng: &mut R) -> Frame {
    let mut out = frame.clone();
    for (p, a) in out.pixels_mut().zip(age.pixels()) {
        if a.0[0] > threshold {
            p.0 = [rng.random(), rng.random(), rng.random()];
        }
    }
    out
}

/// A mask eats the right half of the frame, revealing the previous
/// output wherever it has spread.
fn event_horizon<R: Rng>(
    frame: &Frame,
    prev: &Frame,
    mask: &mut GrayImage,
    growth: u32,
    rng: &mut R,
) -> Frame {
    let (w, h) = frame.dimensions();
    for _ in 0..growth * 20 {
        let x = rng.random_range(w / 2..w.max(1));
        let y = rng.random_range(0..h);
        mask.put_pixel(x, y, image::Luma([255]));
    }
    Frame::from_fn(w, h, |x, y| {
        if mask.get_pixel(x, y).0[0] != 0 {
            *prev.get_pixel(x, y)
        } else {
            *frame.get_pixel(x, y)
        }
    })
}

/// Vortex that twists space and reaches back in time with radius:
/// the further from center, the older the sampled frame. Displaced
/// coordinates wrap modulo the frame size.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn time_warp_vortex(
    frame: &Frame,
    history: &VecDeque<Frame>,
    strength: f32,
) -> Frame {
    let (w, h) = frame.dimensions();
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let max_radius = cx.hypot(cy).max(1.0);
    let max_depth = history.len().min(30);
    Frame::from_fn(w, h, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let radius = dx.hypot(dy);
        let angle = dy.atan2(dx) + strength * (1.0 - radius / max_radius);
        let sx = (radius.mul_add(angle.cos(), cx)).rem_euclid(w as f32) as u32 % w;
        let sy = (radius.mul_add(angle.sin(), cy)).rem_euclid(h as f32) as u32 % h;
        let depth = ((radius / max_radius) * max_depth as f32) as usize;
        let source = if depth == 0 {
            None
        } else {
            history_back(history, depth)
        };
        source.map_or_else(|| *frame.get_pixel(sx, sy), |f| *f.get_pixel(sx, sy))
    })
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn apply<R: Rng>(
    frame: &Frame,
    params: &Params,
    state: &mut HybridState,
    history: &VecDeque<Frame>,
    prev_output: Option<&Frame>,
    rng: &mut R,
) -> Frame {
    let group_enabled = params.time_delayed_mirrors > 0
        || params.motion_fossils > 0
        || params.temp_blur_field > 0
        || params.chrono_pixel_sort > 0
        || params.frame_erosion > 0
        || params.event_horizon > 0
        || params.time_warp_vortex > 0;
    if !group_enabled {
        state.prev = None;
        state.fossils = None;
        state.age = None;
        state.horizon = None;
        return frame.clone();
    }

    let (w, h) = frame.dimensions();
    let needs_age =
        params.temp_blur_field > 0 || params.chrono_pixel_sort > 0 || params.frame_erosion > 0;
    if needs_age {
        let age = state.age.get_or_insert_with(|| AgeMap::new(w, h));
        if let Some(prev) = &state.prev {
            update_age(frame, prev, age);
        }
    } else {
        state.age = None;
    }

    let mut out = frame.clone();
    if params.time_delayed_mirrors > 0 {
        out = time_delayed_mirrors(&out, history);
    }
    if params.motion_fossils > 0 {
        if let Some(prev) = state.prev.clone() {
            let fossils = state
                .fossils
                .get_or_insert_with(|| accum_from_frame(frame));
            out = motion_fossils(&out, &prev, fossils);
        }
    } else {
        state.fossils = None;
    }
    if params.temp_blur_field > 0 {
        if let Some(age) = &state.age {
            out = temp_blur_field(&out, age, params.temp_blur_field as f32 / 100.0);
        }
    }
    if params.chrono_pixel_sort > 0 {
        if let Some(age) = &state.age {
            out = chrono_pixel_sort(&out, age);
        }
    }
    if params.frame_erosion > 0 {
        if let Some(age) = &state.age {
            let threshold = (100 - params.frame_erosion).max(0) as u16;
            out = frame_erosion(&out, age, threshold, rng);
        }
    }
    if params.event_horizon > 0 {
        if let Some(prev) = prev_output {
            let mask = state.horizon.get_or_insert_with(|| GrayImage::new(w, h));
            out = event_horizon(&out, prev, mask, params.event_horizon.unsigned_abs() / 10 + 1, rng);
        }
    } else {
        state.horizon = None;
    }
    if params.time_warp_vortex > 0 {
        out = time_warp_vortex(&out, history, params.time_warp_vortex as f32 / 30.0);
    }

    state.prev = Some(frame.clone());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn solid(v: u8) -> Frame {
        Frame::from_pixel(8, 8, image::Rgb([v, v, v]))
    }

    #[test]
    fn age_increments_when_still_and_resets_on_motion() {
        let mut age = AgeMap::new(2, 1);
        let a = solid(50);
        update_age(&a, &a, &mut age);
        update_age(&a, &a, &mut age);
        assert_eq!(age.get_pixel(0, 0).0[0], 2);
        update_age(&Frame::from_pixel(2, 1, image::Rgb([200, 200, 200])), &a, &mut age);
        assert_eq!(age.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn time_delayed_mirrors_passes_through_without_history() {
        let frame = solid(70);
        assert_eq!(time_delayed_mirrors(&frame, &VecDeque::new()), frame);
    }

    #[test]
    fn vortex_preserves_shape() {
        let frame = solid(90);
        let mut history = VecDeque::new();
        for _ in 0..10 {
            history.push_back(solid(10));
        }
        let out = time_warp_vortex(&frame, &history, 0.5);
        assert_eq!(out.dimensions(), frame.dimensions());
    }

    #[test]
    fn frame_erosion_replaces_old_pixels() {
        let frame = solid(40);
        let mut age = AgeMap::new(8, 8);
        for a in age.pixels_mut() {
            a.0[0] = 200;
        }
        let mut rng = StdRng::seed_from_u64(1);
        let out = frame_erosion(&frame, &age, 50, &mut rng);
        assert_ne!(out, frame);
    }

    #[test]
    fn event_horizon_mask_persists_across_calls() {
        let mut params = Params::default();
        params.event_horizon = 80;
        let mut state = HybridState::default();
        let mut rng = StdRng::seed_from_u64(2);
        let frame = solid(120);
        let prev = solid(5);
        apply(&frame, &params, &mut state, &VecDeque::new(), Some(&prev), &mut rng);
        let after_one: u32 = state
            .horizon
            .as_ref()
            .map(|m| m.pixels().filter(|p| p.0[0] != 0).count())
            .unwrap_or(0)
            .try_into()
            .unwrap_or(0);
        apply(&frame, &params, &mut state, &VecDeque::new(), Some(&prev), &mut rng);
        let after_two: u32 = state
            .horizon
            .as_ref()
            .map(|m| m.pixels().filter(|p| p.0[0] != 0).count())
            .unwrap_or(0)
            .try_into()
            .unwrap_or(0);
        assert!(after_two >= after_one);
        assert!(after_one > 0);
    }

    #[test]
    fn disabling_group_clears_state() {
        let mut params = Params::default();
        params.motion_fossils = 50;
        let mut state = HybridState::default();
        let mut rng = StdRng::seed_from_u64(3);
        let frame = solid(60);
        apply(&frame, &params, &mut state, &VecDeque::new(), None, &mut rng);
        apply(&frame, &params, &mut state, &VecDeque::new(), None, &mut rng);
        assert!(state.fossils.is_some());
        apply(&frame, &Params::default(), &mut state, &VecDeque::new(), None, &mut rng);
        assert!(state.fossils.is_none());
        assert!(state.prev.is_none());
    }

    #[test]
    fn chrono_pixel_sort_orders_old_rows_by_luma() {
        let frame = Frame::from_fn(4, 1, |x, _| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([((3 - x) * 80) as u8, 0, 0])
        });
        let mut age = AgeMap::new(4, 1);
        for a in age.pixels_mut() {
            a.0[0] = 60;
        }
        let out = chrono_pixel_sort(&frame, &age);
        let reds: Vec<u8> = (0..4).map(|x| out.get_pixel(x, 0).0[0]).collect();
        assert_eq!(reds, vec![0, 80, 160, 240]);
    }
}
