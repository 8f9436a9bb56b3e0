//! Stateful, frame-synchronous video effect pipeline.
//!
//! [`Pipeline::process`] takes one RGB frame, the current parameter
//! set, and the session's elapsed time, and returns the transformed
//! frame. All cross-frame memory (accumulators, masks, the history
//! ring) lives inside the [`Pipeline`]; callers own capture, display,
//! and timing.
//!
//! Stage groups run in a fixed order that is part of the observable
//! contract:
//!
//! split → temporal → temporal-abuse → destructive-color →
//! digital-violence → spatial-chaos → perception → hybrids →
//! minimalism → performance-art → boost → optical → glitch → stylize →
//! looks → light → texture → basic
//!
//! The pipeline is deliberately hard to fail: parameters are clamped,
//! a frame-shape change reinitializes buffers, history-dependent stages
//! pass through until enough frames exist. Only a zero-area input frame
//! returns an error.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

mod basic;
mod boost;
mod color;
mod destructive;
mod glitch;
mod hybrid;
mod light;
mod looks;
mod minimalism;
mod ops;
mod optical;
mod params;
mod perception;
mod performance;
mod remap;
mod spatial;
mod split;
mod state;
mod stylize;
mod temporal;
mod temporal_abuse;
mod texture;
mod types;
mod violence;

pub use params::{
    DeadChannel, EdgeMode, GeometryMode, HalftoneMode, LookMode, OpticalMode, ParamError,
    ParamKind, ParamSpec, ParamValue, Params, SketchMode, SplitMode, TextureMode,
};
pub use state::HISTORY_CAPACITY;
pub use types::{Dimensions, Frame, GrayImage, PipelineError, Rgb32FImage};

use state::PipelineState;

/// The effect pipeline: all cross-frame state plus its random source.
///
/// Construct with [`Pipeline::new`] for OS-seeded randomness or
/// [`Pipeline::seeded`] for reproducible runs.
#[derive(Debug)]
pub struct Pipeline {
    state: PipelineState,
    rng: StdRng,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// A pipeline seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: PipelineState::default(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// A pipeline with a fixed seed; identical inputs then produce
    /// identical outputs, stochastic stages included.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            state: PipelineState::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Frames processed since construction or the last [`reset`].
    ///
    /// [`reset`]: Pipeline::reset
    #[must_use]
    pub const fn frames_processed(&self) -> u64 {
        self.state.frame_counter
    }

    /// Current depth of the output history ring.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.state.history.len()
    }

    /// Drop all cross-frame state, starting the session over.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Run every enabled stage over one frame.
    ///
    /// `elapsed` is the time since the session started, supplied by the
    /// caller; the pipeline never reads a wall clock. Unconditional
    /// state updates (history append, previous-output cache) happen
    /// even when every stage is disabled.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidFrame`] if the frame has zero area.
    pub fn process(
        &mut self,
        frame: &Frame,
        params: &Params,
        elapsed: Duration,
    ) -> Result<Frame, PipelineError> {
        let dims = Dimensions::of(frame);
        if dims.is_empty() {
            return Err(PipelineError::InvalidFrame {
                width: dims.width,
                height: dims.height,
            });
        }
        self.state.ensure_dims(dims);
        let elapsed_secs = elapsed.as_secs_f32();
        let s = &mut self.state;

        let mut out = split::apply(frame, params.split_mode, &mut s.split, &s.history, &mut self.rng);
        out = temporal::apply(&out, params, &mut s.temporal, s.prev_output.as_ref());
        out = temporal_abuse::apply(
            &out,
            params,
            &mut s.temporal_abuse,
            &s.history,
            elapsed_secs,
            s.frame_counter,
            &mut self.rng,
        );
        out = destructive::apply(&out, params, &mut s.destructive, &mut self.rng);
        out = violence::apply(&out, params, s.prev_output.as_ref(), elapsed_secs, &mut self.rng);
        out = spatial::apply(&out, params, &mut s.spatial, &mut self.rng);
        out = perception::apply(&out, params, s.prev_output.as_ref(), elapsed_secs, &mut self.rng);
        out = hybrid::apply(
            &out,
            params,
            &mut s.hybrid,
            &s.history,
            s.prev_output.as_ref(),
            &mut self.rng,
        );
        out = minimalism::apply(&out, params, &mut s.minimalism, elapsed_secs, &mut self.rng);
        out = performance::apply(&out, params, &mut s.performance, elapsed_secs, &mut self.rng);
        out = boost::apply(&out, params, &mut s.boost, &mut self.rng);
        out = optical::apply(&out, params.optical_mode, params.optical_amount, &mut s.optical);
        out = glitch::apply(&out, params, &mut self.rng);
        out = stylize::apply(&out, params);
        out = looks::apply(&out, params, &mut self.rng);
        out = light::apply(&out, params);
        out = texture::apply(&out, params.texture_mode);
        out = basic::apply(&out, params, &mut s.basic);

        s.push_output(&out);
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Frame {
        Frame::from_pixel(w, h, image::Rgb(rgb))
    }

    fn busy_params() -> Params {
        let mut params = Params::default();
        params.split_mode = SplitMode::QuadMirror;
        params.motion_trail = 5;
        params.time_smear = 40;
        params.bit_rot = 20;
        params.row_desync = 30;
        params.recursive_zoom = 25;
        params.impossible_colors = 40;
        params.motion_fossils = 30;
        params.single_pixel = 10;
        params.boost_posterize = 40;
        params.optical_mode = OpticalMode::Swirl;
        params.optical_amount = 50;
        params.glitch_rgb_split = 6;
        params.edge_mode = EdgeMode::Canny;
        params.look_mode = LookMode::Sepia;
        params.vignette = 40;
        params.texture_mode = TextureMode::Watercolor;
        params.contrast = 1.4;
        params
    }

    #[test]
    fn zero_area_frame_is_rejected() {
        let mut pipeline = Pipeline::seeded(1);
        let err = pipeline
            .process(&Frame::new(0, 480), &Params::default(), Duration::ZERO)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidFrame {
                width: 0,
                height: 480,
            },
        ));
    }

    #[test]
    fn output_shape_always_matches_input() {
        let mut pipeline = Pipeline::seeded(2);
        let params = busy_params();
        let frame = solid(64, 48, [120, 90, 30]);
        for i in 0..10 {
            let out = pipeline
                .process(&frame, &params, Duration::from_millis(i * 33))
                .unwrap();
            assert_eq!(out.dimensions(), frame.dimensions());
        }
    }

    #[test]
    fn all_disabled_is_identity_every_frame() {
        let mut pipeline = Pipeline::seeded(3);
        let params = Params::default();
        let frame = solid(32, 32, [10, 200, 45]);
        for i in 0..5 {
            let out = pipeline
                .process(&frame, &params, Duration::from_millis(i * 33))
                .unwrap();
            assert_eq!(out, frame);
        }
        assert_eq!(pipeline.frames_processed(), 5);
    }

    #[test]
    fn red_frame_inverts_to_cyan() {
        let mut pipeline = Pipeline::seeded(4);
        let mut params = Params::default();
        params.invert = true;
        let out = pipeline
            .process(&solid(64, 64, [255, 0, 0]), &params, Duration::ZERO)
            .unwrap();
        assert!(out.pixels().all(|p| p.0 == [0, 255, 255]));
    }

    #[test]
    fn history_ring_never_exceeds_capacity() {
        let mut pipeline = Pipeline::seeded(5);
        let params = Params::default();
        let frame = solid(8, 8, [50, 50, 50]);
        for i in 0..(HISTORY_CAPACITY as u64 + 40) {
            pipeline
                .process(&frame, &params, Duration::from_millis(i * 33))
                .unwrap();
        }
        assert_eq!(pipeline.history_len(), HISTORY_CAPACITY);
    }

    #[test]
    fn resize_resets_buffers_without_error() {
        let mut pipeline = Pipeline::seeded(6);
        let mut params = Params::default();
        params.time_smear = 80;
        let small = solid(8, 8, [0, 0, 0]);
        for i in 0..20 {
            pipeline
                .process(&small, &params, Duration::from_millis(i * 33))
                .unwrap();
        }
        // New shape: the smear accumulator reseeds from the current
        // frame, so the first output equals the input (no black flash).
        let large = solid(16, 12, [230, 140, 20]);
        let out = pipeline
            .process(&large, &params, Duration::from_secs(1))
            .unwrap();
        assert_eq!(out, large);
        assert_eq!(pipeline.history_len(), 1);
    }

    #[test]
    fn seeded_pipelines_are_deterministic() {
        let mut a = Pipeline::seeded(7);
        let mut b = Pipeline::seeded(7);
        let params = busy_params();
        let frame = solid(48, 32, [77, 140, 200]);
        for i in 0..6 {
            let elapsed = Duration::from_millis(i * 33);
            let out_a = a.process(&frame, &params, elapsed).unwrap();
            let out_b = b.process(&frame, &params, elapsed).unwrap();
            assert_eq!(out_a, out_b, "diverged at frame {i}");
        }
    }

    #[test]
    fn reset_starts_the_session_over() {
        let mut pipeline = Pipeline::seeded(8);
        let frame = solid(16, 16, [5, 5, 5]);
        pipeline.process(&frame, &Params::default(), Duration::ZERO).unwrap();
        assert_eq!(pipeline.frames_processed(), 1);
        pipeline.reset();
        assert_eq!(pipeline.frames_processed(), 0);
        assert_eq!(pipeline.history_len(), 0);
    }

    #[test]
    fn time_smear_converges_through_the_pipeline() {
        let mut pipeline = Pipeline::seeded(9);
        let mut params = Params::default();
        // Low strength is the smear-heavy regime: the live frame only
        // carries 5% of each blend, so convergence takes many frames.
        params.time_smear = 5;
        let frame = solid(16, 16, [180, 60, 240]);
        let mut out = frame.clone();
        for i in 0..600 {
            out = pipeline
                .process(&frame, &params, Duration::from_millis(i * 33))
                .unwrap();
        }
        for c in 0..3 {
            let got = out.get_pixel(0, 0).0[c];
            let want = frame.get_pixel(0, 0).0[c];
            assert!(got.abs_diff(want) <= 2, "channel {c}: {got} vs {want}");
        }
    }

    #[test]
    fn time_smear_weights_live_frame_by_strength() {
        let mut pipeline = Pipeline::seeded(10);
        let mut params = Params::default();
        params.time_smear = 90;
        // First frame seeds the accumulator from black.
        pipeline
            .process(&solid(8, 8, [0, 0, 0]), &params, Duration::ZERO)
            .unwrap();
        let out = pipeline
            .process(&solid(8, 8, [255, 255, 255]), &params, Duration::from_millis(33))
            .unwrap();
        // The live frame carries weight 0.9: 0.9 * 255 rounds to 230.
        assert_eq!(out.get_pixel(0, 0).0, [230, 230, 230]);
    }
}
