//! Temporal group: motion trails and motion-difference ghosting.

use crate::ops::{absdiff, blend};
use crate::params::Params;
use crate::state::TemporalState;
use crate::types::{Frame, Rgb32FImage, frame_from_accum};

/// Rolling average over the last `window` frames seen by this stage.
///
/// The window is group-owned (not the shared history ring) so the trail
/// reflects the frames as they entered this stage.
#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn motion_trail(frame: &Frame, state: &mut TemporalState, window: usize) -> Frame {
    state.trail.push_back(frame.clone());
    while state.trail.len() > window {
        state.trail.pop_front();
    }
    if state.trail.len() < 2 {
        return frame.clone();
    }
    let mut accum = Rgb32FImage::new(frame.width(), frame.height());
    for entry in &state.trail {
        for (acc, p) in accum.pixels_mut().zip(entry.pixels()) {
            for c in 0..3 {
                acc.0[c] += f32::from(p.0[c]);
            }
        }
    }
    let n = state.trail.len() as f32;
    for acc in accum.pixels_mut() {
        for c in 0..3 {
            acc.0[c] /= n;
        }
    }
    frame_from_accum(&accum)
}

/// Emphasize what moved: blend the frame with its absolute difference
/// from the previous output.
fn ghosting(frame: &Frame, prev: &Frame, strength: f32) -> Frame {
    let motion = absdiff(frame, prev);
    blend(frame, &motion, 1.0 - 0.3 * strength, 0.3 * strength)
}

pub fn apply(
    frame: &Frame,
    params: &Params,
    state: &mut TemporalState,
    prev_output: Option<&Frame>,
) -> Frame {
    let mut out = frame.clone();
    if params.motion_trail > 0 {
        #[allow(clippy::cast_sign_loss)]
        let window = params.motion_trail as usize;
        out = motion_trail(&out, state, window);
    } else {
        state.trail.clear();
    }
    if params.ghosting > 0 {
        if let Some(prev) = prev_output {
            #[allow(clippy::cast_precision_loss)]
            let strength = f32::from(u8::try_from(params.ghosting).unwrap_or(100)) / 100.0;
            out = ghosting(&out, prev, strength);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(v: u8) -> Frame {
        Frame::from_pixel(4, 4, image::Rgb([v, v, v]))
    }

    #[test]
    fn motion_trail_averages_window() {
        let mut state = TemporalState::default();
        let mut params = Params::default();
        params.motion_trail = 4;
        apply(&solid(0), &params, &mut state, None);
        let out = apply(&solid(100), &params, &mut state, None);
        assert_eq!(out.get_pixel(0, 0).0, [50, 50, 50]);
    }

    #[test]
    fn motion_trail_window_is_bounded() {
        let mut state = TemporalState::default();
        let mut params = Params::default();
        params.motion_trail = 3;
        for _ in 0..10 {
            apply(&solid(10), &params, &mut state, None);
        }
        assert_eq!(state.trail.len(), 3);
    }

    #[test]
    fn disabling_trail_clears_window() {
        let mut state = TemporalState::default();
        let mut params = Params::default();
        params.motion_trail = 3;
        apply(&solid(10), &params, &mut state, None);
        params.motion_trail = 0;
        apply(&solid(10), &params, &mut state, None);
        assert!(state.trail.is_empty());
    }

    #[test]
    fn ghosting_without_prev_is_identity() {
        let mut state = TemporalState::default();
        let mut params = Params::default();
        params.ghosting = 50;
        let frame = solid(80);
        assert_eq!(apply(&frame, &params, &mut state, None), frame);
    }

    #[test]
    fn ghosting_darkens_still_regions() {
        // A still frame has zero diff, so the blend pulls toward black.
        let mut state = TemporalState::default();
        let mut params = Params::default();
        params.ghosting = 100;
        let frame = solid(100);
        let out = apply(&frame, &params, &mut state, Some(&frame));
        assert_eq!(out.get_pixel(0, 0).0, [70, 70, 70]);
    }

    #[test]
    fn disabled_group_is_identity() {
        let mut state = TemporalState::default();
        let frame = solid(42);
        let out = apply(&frame, &Params::default(), &mut state, Some(&solid(7)));
        assert_eq!(out, frame);
    }
}
