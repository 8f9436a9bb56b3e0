//! Displacement-field warping shared by the optical, spatial, and boost
//! groups.
//!
//! A [`Field`] stores, for every output pixel, the absolute source
//! coordinate to sample. Sampling is bilinear; a source coordinate
//! outside the frame falls back to the output pixel itself (identity)
//! rather than stretching border pixels. Building a field is O(W·H)
//! trigonometry, so fields for parameter-stable stages are memoized in
//! a single-entry [`FieldCache`] keyed by stage, amount, and shape.

use crate::types::{Dimensions, Frame, round_u8};

/// Cache key: which stage built the field, at what strength, for what
/// frame shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKey {
    /// Stage tag, unique per call site.
    pub tag: &'static str,
    /// Effect strength the field was built for.
    pub amount: i32,
    /// Frame shape the field was built for.
    pub dims: Dimensions,
}

/// A dense per-pixel source-coordinate map.
#[derive(Debug, Clone)]
pub struct Field {
    width: u32,
    height: u32,
    map: Vec<(f32, f32)>,
}

impl Field {
    /// Build a field by evaluating `f(x, y) -> (src_x, src_y)` at every
    /// output pixel.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_fn(width: u32, height: u32, f: impl Fn(f32, f32) -> (f32, f32)) -> Self {
        let mut map = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                map.push(f(x as f32, y as f32));
            }
        }
        Self { width, height, map }
    }

    /// Warp a frame through the field with bilinear sampling.
    ///
    /// Source coordinates outside the frame leave the output pixel at
    /// its own input value.
    #[must_use]
    pub fn apply(&self, frame: &Frame) -> Frame {
        debug_assert_eq!((self.width, self.height), frame.dimensions());
        Frame::from_fn(self.width, self.height, |x, y| {
            let (sx, sy) = self.map[(y * self.width + x) as usize];
            sample_bilinear(frame, sx, sy)
                .unwrap_or_else(|| *frame.get_pixel(x, y))
        })
    }
}

/// Bilinearly sample a frame at a fractional coordinate; `None` when
/// the coordinate falls outside `[0, W-1] × [0, H-1]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn sample_bilinear(frame: &Frame, x: f32, y: f32) -> Option<image::Rgb<u8>> {
    let max_x = (frame.width() - 1) as f32;
    let max_y = (frame.height() - 1) as f32;
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 || x > max_x || y > max_y {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(frame.width() - 1);
    let y1 = (y0 + 1).min(frame.height() - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = frame.get_pixel(x0, y0).0;
    let p10 = frame.get_pixel(x1, y0).0;
    let p01 = frame.get_pixel(x0, y1).0;
    let p11 = frame.get_pixel(x1, y1).0;
    Some(image::Rgb(std::array::from_fn(|c| {
        let top = f32::from(p00[c]).mul_add(1.0 - fx, f32::from(p10[c]) * fx);
        let bottom = f32::from(p01[c]).mul_add(1.0 - fx, f32::from(p11[c]) * fx);
        round_u8(top.mul_add(1.0 - fy, bottom * fy))
    })))
}

/// Single-entry memo for the most recently used field.
#[derive(Debug, Default)]
pub struct FieldCache {
    entry: Option<(FieldKey, Field)>,
}

impl FieldCache {
    /// Return the cached field for `key`, building it with `build` on a
    /// miss (any previous entry is evicted).
    pub fn get_or_build(&mut self, key: FieldKey, build: impl FnOnce() -> Field) -> &Field {
        if !matches!(&self.entry, Some((cached, _)) if *cached == key) {
            self.entry = None;
        }
        let (_, field) = self.entry.get_or_insert_with(|| (key, build()));
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> Frame {
        Frame::from_fn(w, h, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([(x * 10) as u8, (y * 10) as u8, 0])
        })
    }

    fn identity_field(width: u32, height: u32) -> Field {
        Field::from_fn(width, height, |x, y| (x, y))
    }

    #[test]
    fn identity_field_is_identity() {
        let frame = gradient(6, 5);
        assert_eq!(identity_field(6, 5).apply(&frame), frame);
    }

    #[test]
    fn bilinear_midpoint_averages() {
        let frame = Frame::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([100, 200, 50])
            }
        });
        let p = sample_bilinear(&frame, 0.5, 0.0).map(|p| p.0);
        assert_eq!(p, Some([50, 100, 25]));
    }

    #[test]
    fn out_of_bounds_sample_is_none() {
        let frame = gradient(4, 4);
        assert!(sample_bilinear(&frame, -0.1, 0.0).is_none());
        assert!(sample_bilinear(&frame, 0.0, 3.5).is_none());
        assert!(sample_bilinear(&frame, f32::NAN, 0.0).is_none());
    }

    #[test]
    fn out_of_bounds_field_leaves_pixel_unchanged() {
        let frame = gradient(4, 4);
        let field = Field::from_fn(4, 4, |x, y| (x - 100.0, y));
        assert_eq!(field.apply(&frame), frame);
    }

    #[test]
    fn shift_field_moves_content() {
        let frame = gradient(4, 1);
        // Sample one pixel to the right.
        let field = Field::from_fn(4, 1, |x, y| (x + 1.0, y));
        let out = field.apply(&frame);
        assert_eq!(out.get_pixel(0, 0).0[0], 10);
        // Last pixel samples out of bounds and keeps its own value.
        assert_eq!(out.get_pixel(3, 0).0[0], 30);
    }

    #[test]
    fn cache_reuses_field_for_same_key() {
        let mut cache = FieldCache::default();
        let dims = Dimensions {
            width: 3,
            height: 3,
        };
        let key = FieldKey {
            tag: "swirl",
            amount: 40,
            dims,
        };
        let mut builds = 0;
        for _ in 0..3 {
            cache.get_or_build(key, || {
                builds += 1;
                identity_field(3, 3)
            });
        }
        assert_eq!(builds, 1);
    }

    #[test]
    fn cache_rebuilds_on_key_change() {
        let mut cache = FieldCache::default();
        let dims = Dimensions {
            width: 3,
            height: 3,
        };
        let mut builds = 0;
        for amount in [10, 20, 10] {
            cache.get_or_build(
                FieldKey {
                    tag: "swirl",
                    amount,
                    dims,
                },
                || {
                    builds += 1;
                    identity_field(3, 3)
                },
            );
        }
        assert_eq!(builds, 3);
    }
}
