//! Per-pixel frame arithmetic shared across stage groups.
//!
//! All color math runs in floating point and is rounded then clamped
//! back to 8-bit (see [`crate::types::round_u8`]); no stage truncates.
//! Kernel work (Gaussian blur, median) is delegated to `imageproc`,
//! which only operates on single-channel images, so color frames are
//! split into channels, filtered, and reassembled.

use image::GrayImage;
use rand::Rng;

use crate::types::{Frame, round_u8};

/// Weighted blend of two equally sized frames: `round(a*wa + b*wb)`.
#[must_use]
pub fn blend(a: &Frame, b: &Frame, wa: f32, wb: f32) -> Frame {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    Frame::from_fn(a.width(), a.height(), |x, y| {
        let pa = a.get_pixel(x, y).0;
        let pb = b.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| {
            round_u8(f32::from(pa[c]).mul_add(wa, f32::from(pb[c]) * wb))
        }))
    })
}

/// Per-channel absolute difference of two equally sized frames.
#[must_use]
pub fn absdiff(a: &Frame, b: &Frame) -> Frame {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    Frame::from_fn(a.width(), a.height(), |x, y| {
        let pa = a.get_pixel(x, y).0;
        let pb = b.get_pixel(x, y).0;
        image::Rgb(std::array::from_fn(|c| pa[c].abs_diff(pb[c])))
    })
}

/// Mean absolute difference across all channels — the motion magnitude
/// used by the attention-punisher style stages.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_absdiff(a: &Frame, b: &Frame) -> f32 {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    let total: u64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(pa, pb)| {
            (0..3)
                .map(|c| u64::from(pa.0[c].abs_diff(pb.0[c])))
                .sum::<u64>()
        })
        .sum();
    let count = u64::from(a.width()) * u64::from(a.height()) * 3;
    if count == 0 {
        0.0
    } else {
        total as f32 / count as f32
    }
}

/// BT.601 luma of a color frame, rounded.
#[must_use]
pub fn luma(frame: &Frame) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        image::Luma([luma_of(p)])
    })
}

/// BT.601 luma of a single pixel.
#[must_use]
pub fn luma_of(p: [u8; 3]) -> u8 {
    round_u8(
        f32::from(p[0]).mul_add(
            0.299,
            f32::from(p[1]).mul_add(0.587, f32::from(p[2]) * 0.114),
        ),
    )
}

/// Replicate a single-channel image into a color frame.
#[must_use]
pub fn gray_to_rgb(gray: &GrayImage) -> Frame {
    Frame::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        image::Rgb([v, v, v])
    })
}

/// Extract one channel of a color frame as a grayscale image.
#[must_use]
pub fn channel(frame: &Frame, c: usize) -> GrayImage {
    debug_assert!(c < 3);
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        image::Luma([frame.get_pixel(x, y).0[c]])
    })
}

/// Reassemble three grayscale channels into a color frame.
#[must_use]
pub fn merge_channels(r: &GrayImage, g: &GrayImage, b: &GrayImage) -> Frame {
    debug_assert_eq!(r.dimensions(), g.dimensions());
    debug_assert_eq!(r.dimensions(), b.dimensions());
    Frame::from_fn(r.width(), r.height(), |x, y| {
        image::Rgb([
            r.get_pixel(x, y).0[0],
            g.get_pixel(x, y).0[0],
            b.get_pixel(x, y).0[0],
        ])
    })
}

/// Gaussian blur of a color frame by blurring each channel
/// independently (blur is linear, so this equals blurring in color
/// space; `imageproc` only accepts single-channel images).
#[must_use]
pub fn gaussian_blur_rgb(frame: &Frame, sigma: f32) -> Frame {
    if sigma <= 0.0 {
        return frame.clone();
    }
    let blurred: [GrayImage; 3] = std::array::from_fn(|c| {
        imageproc::filter::gaussian_blur_f32(&channel(frame, c), sigma)
    });
    merge_channels(&blurred[0], &blurred[1], &blurred[2])
}

/// Sigma for an odd box kernel of size `k`, matching the common
/// convention `0.3 * ((k - 1) * 0.5 - 1) + 0.8` so amounts expressed as
/// kernel sizes keep their familiar strength.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_kernel(k: u32) -> f32 {
    if k <= 1 {
        return 0.0;
    }
    0.3f32.mul_add((k - 1) as f32 * 0.5 - 1.0, 0.8)
}

/// Frame of uniform random channel values.
pub fn noise_frame<R: Rng>(rng: &mut R, width: u32, height: u32) -> Frame {
    let mut frame = Frame::new(width, height);
    for p in frame.pixels_mut() {
        p.0 = [rng.random(), rng.random(), rng.random()];
    }
    frame
}

/// Mean color across the whole frame, in float.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_color(frame: &Frame) -> [f32; 3] {
    let mut sums = [0.0f64; 3];
    for p in frame.pixels() {
        for c in 0..3 {
            sums[c] += f64::from(p.0[c]);
        }
    }
    let count = (u64::from(frame.width()) * u64::from(frame.height())).max(1) as f64;
    std::array::from_fn(|c| (sums[c] / count) as f32)
}

/// Roll a single row left/right by `shift` pixels with wraparound.
pub fn roll_row(frame: &mut Frame, y: u32, shift: i64) {
    let w = i64::from(frame.width());
    if w == 0 {
        return;
    }
    let shift = shift.rem_euclid(w);
    if shift == 0 {
        return;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let row: Vec<[u8; 3]> = (0..frame.width())
        .map(|x| frame.get_pixel(x, y).0)
        .collect();
    for x in 0..frame.width() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let src = ((i64::from(x) - shift).rem_euclid(w)) as u32;
        frame.put_pixel(x, y, image::Rgb(row[src as usize]));
    }
}

/// Roll the whole frame vertically by `shift` rows with wraparound.
#[must_use]
pub fn roll_vertical(frame: &Frame, shift: i64) -> Frame {
    let h = i64::from(frame.height());
    if h == 0 {
        return frame.clone();
    }
    let shift = shift.rem_euclid(h);
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let src = ((i64::from(y) - shift).rem_euclid(h)) as u32;
        *frame.get_pixel(x, src)
    })
}

/// Roll the whole frame horizontally by `shift` columns with wraparound.
#[must_use]
pub fn roll_horizontal(frame: &Frame, shift: i64) -> Frame {
    let mut out = frame.clone();
    for y in 0..frame.height() {
        roll_row(&mut out, y, shift);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Frame {
        Frame::from_pixel(w, h, image::Rgb(rgb))
    }

    #[test]
    fn blend_is_weighted_average() {
        let a = solid(4, 4, [100, 100, 100]);
        let b = solid(4, 4, [200, 200, 200]);
        let out = blend(&a, &b, 0.5, 0.5);
        assert_eq!(out.get_pixel(0, 0).0, [150, 150, 150]);
    }

    #[test]
    fn blend_clamps_overflow() {
        let a = solid(2, 2, [200, 200, 200]);
        let b = solid(2, 2, [200, 200, 200]);
        let out = blend(&a, &b, 1.0, 1.0);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn absdiff_is_symmetric() {
        let a = solid(2, 2, [10, 200, 50]);
        let b = solid(2, 2, [60, 100, 50]);
        assert_eq!(absdiff(&a, &b), absdiff(&b, &a));
        assert_eq!(absdiff(&a, &b).get_pixel(0, 0).0, [50, 100, 0]);
    }

    #[test]
    fn mean_absdiff_zero_for_identical() {
        let a = solid(3, 3, [1, 2, 3]);
        assert!(mean_absdiff(&a, &a).abs() < f32::EPSILON);
    }

    #[test]
    fn luma_of_white_is_255() {
        assert_eq!(luma_of([255, 255, 255]), 255);
        assert_eq!(luma_of([0, 0, 0]), 0);
    }

    #[test]
    fn channel_merge_round_trip() {
        let frame = Frame::from_fn(3, 2, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([x as u8, y as u8, (x + y) as u8])
        });
        let (r, g, b) = (channel(&frame, 0), channel(&frame, 1), channel(&frame, 2));
        assert_eq!(merge_channels(&r, &g, &b), frame);
    }

    #[test]
    fn gaussian_blur_rgb_zero_sigma_is_identity() {
        let frame = solid(5, 5, [10, 20, 30]);
        assert_eq!(gaussian_blur_rgb(&frame, 0.0), frame);
    }

    #[test]
    fn gaussian_blur_rgb_preserves_dimensions() {
        let frame = solid(9, 7, [10, 20, 30]);
        let out = gaussian_blur_rgb(&frame, 1.4);
        assert_eq!(out.dimensions(), frame.dimensions());
    }

    #[test]
    fn sigma_for_kernel_monotone() {
        assert!(sigma_for_kernel(1).abs() < f32::EPSILON);
        assert!(sigma_for_kernel(3) < sigma_for_kernel(5));
    }

    #[test]
    fn noise_frame_is_seeded_deterministic() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(noise_frame(&mut a, 8, 8), noise_frame(&mut b, 8, 8));
    }

    #[test]
    fn mean_color_of_solid_frame() {
        let frame = solid(4, 4, [10, 20, 30]);
        let mean = mean_color(&frame);
        assert!((mean[0] - 10.0).abs() < 1e-4);
        assert!((mean[1] - 20.0).abs() < 1e-4);
        assert!((mean[2] - 30.0).abs() < 1e-4);
    }

    #[test]
    fn roll_row_wraps() {
        let mut frame = Frame::from_fn(4, 1, |x, _| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([x as u8, 0, 0])
        });
        roll_row(&mut frame, 0, 1);
        let reds: Vec<u8> = (0..4).map(|x| frame.get_pixel(x, 0).0[0]).collect();
        assert_eq!(reds, vec![3, 0, 1, 2]);
    }

    #[test]
    fn roll_vertical_wraps() {
        let frame = Frame::from_fn(1, 3, |_, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([y as u8, 0, 0])
        });
        let rolled = roll_vertical(&frame, 1);
        let reds: Vec<u8> = (0..3).map(|y| rolled.get_pixel(0, y).0[0]).collect();
        assert_eq!(reds, vec![2, 0, 1]);
    }

    #[test]
    fn roll_by_full_period_is_identity() {
        let frame = Frame::from_fn(5, 4, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([x as u8, y as u8, 0])
        });
        assert_eq!(roll_horizontal(&frame, 5), frame);
        assert_eq!(roll_vertical(&frame, 4), frame);
    }
}
