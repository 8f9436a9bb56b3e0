//! Shared types for the smear effect pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference mask and
/// luma buffers without depending on `image` directly.
pub use image::GrayImage;

/// Re-export the float accumulator buffer type (`Rgb<f32>`).
pub use image::Rgb32FImage;

/// A video frame: W×H, 3 channels, 8-bit, interleaved.
///
/// Frames are immutable by convention — every stage returns a new frame
/// rather than mutating its input in place.
pub type Frame = image::RgbImage;

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of a frame.
    #[must_use]
    pub fn of(frame: &Frame) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
        }
    }

    /// Whether either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Errors that can occur during pipeline processing.
///
/// The pipeline is deliberately hard to fail: malformed parameter values
/// are clamped, shape changes trigger buffer reinitialization, and
/// history-dependent stages degrade to pass-through. Only a zero-area
/// input frame is rejected.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input frame had zero width or height.
    #[error("input frame has zero area ({width}x{height})")]
    InvalidFrame {
        /// Width of the rejected frame.
        width: u32,
        /// Height of the rejected frame.
        height: u32,
    },
}

/// Convert a `u8` frame into a float32 accumulator with identical values.
///
/// Accumulators seeded from the current frame (rather than zero) avoid a
/// visible flash to black when a buffer is reallocated after a shape
/// change.
#[must_use]
pub fn accum_from_frame(frame: &Frame) -> Rgb32FImage {
    Rgb32FImage::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        image::Rgb([f32::from(p[0]), f32::from(p[1]), f32::from(p[2])])
    })
}

/// Convert a float32 accumulator back to an 8-bit frame.
///
/// Always round-then-clamp, never truncation, so repeated accumulate /
/// emit cycles do not drift systematically downward.
#[must_use]
pub fn frame_from_accum(accum: &Rgb32FImage) -> Frame {
    Frame::from_fn(accum.width(), accum.height(), |x, y| {
        let p = accum.get_pixel(x, y).0;
        image::Rgb([round_u8(p[0]), round_u8(p[1]), round_u8(p[2])])
    })
}

/// Round a float channel value to `u8`, clamping to `[0, 255]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_of_frame() {
        let frame = Frame::new(7, 11);
        assert_eq!(
            Dimensions::of(&frame),
            Dimensions {
                width: 7,
                height: 11,
            },
        );
    }

    #[test]
    fn dimensions_is_empty() {
        assert!(
            Dimensions {
                width: 0,
                height: 5,
            }
            .is_empty()
        );
        assert!(
            Dimensions {
                width: 5,
                height: 0,
            }
            .is_empty()
        );
        assert!(
            !Dimensions {
                width: 1,
                height: 1,
            }
            .is_empty()
        );
    }

    #[test]
    fn error_invalid_frame_display() {
        let err = PipelineError::InvalidFrame {
            width: 0,
            height: 480,
        };
        assert_eq!(err.to_string(), "input frame has zero area (0x480)");
    }

    #[test]
    fn round_u8_rounds_not_truncates() {
        assert_eq!(round_u8(1.5), 2);
        assert_eq!(round_u8(1.4), 1);
        assert_eq!(round_u8(-3.0), 0);
        assert_eq!(round_u8(300.0), 255);
    }

    #[test]
    fn accum_round_trip_is_exact() {
        let frame = Frame::from_fn(4, 3, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([(x * 60) as u8, (y * 80) as u8, 200])
        });
        let accum = accum_from_frame(&frame);
        assert_eq!(frame_from_accum(&accum), frame);
    }

    #[test]
    fn dimensions_serde_round_trip() {
        let d = Dimensions {
            width: 640,
            height: 480,
        };
        let json = serde_json::to_string(&d).unwrap();
        let back: Dimensions = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}
