//! Cross-frame state owned by the pipeline.
//!
//! Every stage group that carries memory between frames gets its own
//! sub-struct here; no buffer is shared between groups. The exceptions
//! are deliberate and read-only: the shared history ring and the cached
//! previous output frame, which several groups consume but only the
//! orchestrator writes.
//!
//! All buffers are lazily created on first use and invalidated together
//! when the input dimensions change. Float accumulators reinitialize
//! from the current frame rather than zero so a reallocation never
//! flashes to black.

use std::collections::VecDeque;

use crate::remap::FieldCache;
use crate::types::{Dimensions, Frame, GrayImage, Rgb32FImage};

/// Capacity of the shared history ring.
pub const HISTORY_CAPACITY: usize = 120;

/// Per-pixel stillness counter used by the hybrid stages. `u16` so ages
/// can run well past the thresholds without saturating in a session.
pub type AgeMap = image::ImageBuffer<image::Luma<u16>, Vec<u16>>;

/// Slit-scan accumulation buffer plus the next write position.
#[derive(Debug, Clone)]
pub struct SlitScan {
    /// Accumulated output so far.
    pub canvas: Frame,
    /// Next column (vertical scan) or row (horizontal scan) to write.
    pub pos: u32,
}

/// State for the split/composition group.
#[derive(Debug, Default)]
pub struct SplitState {
    /// Vertical slit scan (live center column swept left to right).
    pub vertical: Option<SlitScan>,
    /// Horizontal slit scan (live center row swept top to bottom).
    pub horizontal: Option<SlitScan>,
}

/// State for the temporal group.
#[derive(Debug, Default)]
pub struct TemporalState {
    /// Sliding window for the motion-trail rolling average.
    pub trail: VecDeque<Frame>,
}

/// State for the temporal-abuse group.
#[derive(Debug, Default)]
pub struct TemporalAbuseState {
    /// Exponential smear accumulator.
    pub smear: Option<Rgb32FImage>,
    /// Additive burn-in accumulator.
    pub burn: Option<Rgb32FImage>,
    /// Runaway feedback buffer.
    pub feedback: Option<Frame>,
    /// Frozen pixels and the mask saying which cells are frozen.
    pub frozen: Option<(Frame, GrayImage)>,
    /// Frame held by temporal quantization until the next recapture.
    pub held: Option<Frame>,
}

/// State for the destructive-color group.
#[derive(Debug, Default)]
pub struct DestructiveState {
    /// Rolling hue offset in half-degrees, kept in `[0, 180)`.
    pub hue_offset: f32,
}

/// State for the spatial-chaos group.
#[derive(Debug, Default)]
pub struct SpatialState {
    /// Persistent feedback buffer that accumulates region swaps.
    pub feedback: Option<Frame>,
}

/// State for the temporal+spatial hybrid group.
#[derive(Debug, Default)]
pub struct HybridState {
    /// Input frame from the previous call, for motion masks.
    pub prev: Option<Frame>,
    /// Motion-gated fossil accumulator.
    pub fossils: Option<Rgb32FImage>,
    /// Per-pixel stillness age.
    pub age: Option<AgeMap>,
    /// Persistent event-horizon capture mask.
    pub horizon: Option<GrayImage>,
}

/// State for the minimalism group.
#[derive(Debug, Default)]
pub struct MinimalismState {
    /// Long-horizon running mean of everything seen.
    pub average: Option<Rgb32FImage>,
    /// Index of the last amnesia period that was blanked.
    pub amnesia_period: Option<u64>,
}

/// State for the performance-art group.
#[derive(Debug, Default)]
pub struct PerformanceState {
    /// Input frame from the previous call, for motion measurement.
    pub prev: Option<Frame>,
}

/// State for the boost group.
#[derive(Debug, Default)]
pub struct BoostState {
    /// Float ghosting accumulator.
    pub ghost: Option<Rgb32FImage>,
    /// Rolling color-cycle hue offset in half-degrees, `[0, 180)`.
    pub hue_phase: f32,
    /// Memoized warp displacement field.
    pub warp: FieldCache,
}

/// State for the optical group.
#[derive(Debug, Default)]
pub struct OpticalState {
    /// Memoized displacement field for the active mode.
    pub field: FieldCache,
}

/// State for the basic group.
#[derive(Debug, Default)]
pub struct BasicState {
    /// Exponential running average for the `average` blend.
    pub average: Option<Rgb32FImage>,
}

/// All cross-frame state, owned by [`crate::Pipeline`].
#[derive(Debug, Default)]
pub struct PipelineState {
    /// Dimensions the current buffers were built for.
    pub dims: Option<Dimensions>,
    /// Frames processed since construction (survives shape changes).
    pub frame_counter: u64,
    /// Ring of the most recent post-pipeline output frames.
    pub history: VecDeque<Frame>,
    /// The previous call's output frame.
    pub prev_output: Option<Frame>,
    /// Split/composition group.
    pub split: SplitState,
    /// Temporal group.
    pub temporal: TemporalState,
    /// Temporal-abuse group.
    pub temporal_abuse: TemporalAbuseState,
    /// Destructive-color group.
    pub destructive: DestructiveState,
    /// Spatial-chaos group.
    pub spatial: SpatialState,
    /// Hybrid group.
    pub hybrid: HybridState,
    /// Minimalism group.
    pub minimalism: MinimalismState,
    /// Performance-art group.
    pub performance: PerformanceState,
    /// Boost group.
    pub boost: BoostState,
    /// Optical group.
    pub optical: OpticalState,
    /// Basic group.
    pub basic: BasicState,
}

impl PipelineState {
    /// Prepare the state for a frame of the given dimensions,
    /// invalidating every buffer if the shape changed.
    pub fn ensure_dims(&mut self, dims: Dimensions) {
        match self.dims {
            Some(current) if current == dims => {}
            previous => {
                if let Some(previous) = previous {
                    log::debug!(
                        "frame shape changed {}x{} -> {}x{}, resetting pipeline buffers",
                        previous.width,
                        previous.height,
                        dims.width,
                        dims.height,
                    );
                }
                let frame_counter = self.frame_counter;
                *self = Self {
                    dims: Some(dims),
                    frame_counter,
                    ..Self::default()
                };
            }
        }
    }

    /// Record a finished output frame: append it to the history ring
    /// (dropping the oldest past capacity), cache it as the previous
    /// output, and advance the frame counter.
    pub fn push_output(&mut self, output: &Frame) {
        self.history.push_back(output.clone());
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.prev_output = Some(output.clone());
        self.frame_counter += 1;
    }

    /// The history entry `back` frames ago (`1` = most recent), if the
    /// ring has grown that deep.
    #[must_use]
    pub fn history_back(&self, back: usize) -> Option<&Frame> {
        history_back(&self.history, back)
    }

    /// Drop all cross-frame state, including the session frame counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The entry `back` frames ago (`1` = most recent) in a history ring.
#[must_use]
pub fn history_back(history: &VecDeque<Frame>, back: usize) -> Option<&Frame> {
    if back == 0 {
        return None;
    }
    history.len().checked_sub(back).map(|i| &history[i])
}
