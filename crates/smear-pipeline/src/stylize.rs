//! Stylize group: edge extraction, hand-drawn looks, halftone, and
//! block-geometric restylings.

use imageproc::distance_transform::Norm;

use crate::ops::{blend, channel, gray_to_rgb, luma, merge_channels};
use crate::params::{EdgeMode, GeometryMode, HalftoneMode, Params, SketchMode};
use crate::types::{Frame, GrayImage, round_u8};

fn canny_edges(frame: &Frame, threshold: f32) -> Frame {
    gray_to_rgb(&imageproc::edges::canny(&luma(frame), threshold, threshold * 2.0))
}

/// Sobel gradient magnitude, clamped from the u16 gradient image.
fn sobel_edges(frame: &Frame) -> Frame {
    let gradients = imageproc::gradients::sobel_gradients(&luma(frame));
    let gray = GrayImage::from_fn(gradients.width(), gradients.height(), |x, y| {
        image::Luma([round_u8(f32::from(gradients.get_pixel(x, y).0[0]) / 4.0)])
    });
    gray_to_rgb(&gray)
}

/// Dilated Canny edges tinted magenta over a darkened frame.
fn neon_edges(frame: &Frame, threshold: f32) -> Frame {
    let edges = imageproc::edges::canny(&luma(frame), threshold, threshold * 2.0);
    let thick = imageproc::morphology::dilate(&edges, Norm::LInf, 1);
    let glow = Frame::from_fn(frame.width(), frame.height(), |x, y| {
        if thick.get_pixel(x, y).0[0] > 0 {
            image::Rgb([255, 0, 255])
        } else {
            image::Rgb([0, 0, 0])
        }
    });
    blend(frame, &glow, 0.5, 0.5)
}

/// Median-smoothed color under an adaptive-threshold ink mask.
fn comic_ink(frame: &Frame) -> Frame {
    let smoothed: [_; 3] = std::array::from_fn(|c| {
        imageproc::filter::median_filter(&channel(frame, c), 3, 3)
    });
    let smoothed = merge_channels(&smoothed[0], &smoothed[1], &smoothed[2]);
    let ink = imageproc::contrast::adaptive_threshold(&luma(&smoothed), 10, 10);
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        if ink.get_pixel(x, y).0[0] == 0 {
            image::Rgb([0, 0, 0])
        } else {
            *smoothed.get_pixel(x, y)
        }
    })
}

/// Color-dodge a gray image by a blurred inverse of itself.
fn dodge(gray: &GrayImage, inverse_blurred: &GrayImage) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let g = f32::from(gray.get_pixel(x, y).0[0]);
        let b = f32::from(inverse_blurred.get_pixel(x, y).0[0]);
        image::Luma([round_u8(g * 256.0 / (256.0 - b))])
    })
}

fn pencil_sketch(frame: &Frame) -> Frame {
    let gray = luma(frame);
    let inverted = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        image::Luma([255 - gray.get_pixel(x, y).0[0]])
    });
    let blurred = imageproc::filter::gaussian_blur_f32(&inverted, 8.0);
    gray_to_rgb(&dodge(&gray, &blurred))
}

/// Charcoal keeps the color but dodges every channel by the blurred
/// inverse luma.
fn charcoal_sketch(frame: &Frame) -> Frame {
    let gray = luma(frame);
    let inverted = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        image::Luma([255 - gray.get_pixel(x, y).0[0]])
    });
    let blurred = imageproc::filter::gaussian_blur_f32(&inverted, 8.0);
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        let b = f32::from(blurred.get_pixel(x, y).0[0]);
        image::Rgb(std::array::from_fn(|c| {
            round_u8(f32::from(p[c]) * 256.0 / (256.0 - b))
        }))
    })
}

/// Luminance-driven dot halftone on a 10-px grid. Partial cells at the
/// right/bottom edges participate with their truncated extent.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn halftone_dots(frame: &Frame) -> Frame {
    const CELL: u32 = 10;
    let (w, h) = frame.dimensions();
    let gray = luma(frame);
    let mut out = Frame::new(w, h);
    for cy in 0..h.div_ceil(CELL) {
        for cx in 0..w.div_ceil(CELL) {
            let x0 = cx * CELL;
            let y0 = cy * CELL;
            let x1 = (x0 + CELL).min(w);
            let y1 = (y0 + CELL).min(h);
            let mut sum = 0u32;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += u32::from(gray.get_pixel(x, y).0[0]);
                }
            }
            let count = (x1 - x0) * (y1 - y0);
            let mean = sum as f32 / count.max(1) as f32;
            let radius = mean / 255.0 * (CELL as f32 / 2.0);
            let center = ((x0 + x1) as f32 / 2.0, (y0 + y1) as f32 / 2.0);
            for y in y0..y1 {
                for x in x0..x1 {
                    let d = (x as f32 + 0.5 - center.0).hypot(y as f32 + 0.5 - center.1);
                    if d <= radius {
                        out.put_pixel(x, y, image::Rgb([255, 255, 255]));
                    }
                }
            }
        }
    }
    out
}

/// 20-px block averages separated by 1-px grid lines.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn mosaic(frame: &Frame) -> Frame {
    const CELL: u32 = 20;
    let (w, h) = frame.dimensions();
    let mut out = Frame::new(w, h);
    for cy in 0..h.div_ceil(CELL) {
        for cx in 0..w.div_ceil(CELL) {
            let x0 = cx * CELL;
            let y0 = cy * CELL;
            let x1 = (x0 + CELL).min(w);
            let y1 = (y0 + CELL).min(h);
            let mut sums = [0u32; 3];
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = frame.get_pixel(x, y).0;
                    for c in 0..3 {
                        sums[c] += u32::from(p[c]);
                    }
                }
            }
            let count = ((x1 - x0) * (y1 - y0)).max(1);
            let mean = image::Rgb(std::array::from_fn(|c| (sums[c] / count) as u8));
            for y in y0..y1 {
                for x in x0..x1 {
                    let on_grid = x == x0 || y == y0;
                    out.put_pixel(x, y, if on_grid { image::Rgb([20, 20, 20]) } else { mean });
                }
            }
        }
    }
    out
}

/// Terminal-green character blocks: each 10-px cell renders as a block
/// whose inner brightness tracks the cell's luma ramp.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ascii_blocks(frame: &Frame) -> Frame {
    const CELL: u32 = 10;
    const RAMP: [u8; 5] = [0, 60, 120, 190, 255];
    let (w, h) = frame.dimensions();
    let gray = luma(frame);
    let mut out = Frame::new(w, h);
    for cy in 0..h.div_ceil(CELL) {
        for cx in 0..w.div_ceil(CELL) {
            let x0 = cx * CELL;
            let y0 = cy * CELL;
            let x1 = (x0 + CELL).min(w);
            let y1 = (y0 + CELL).min(h);
            let mut sum = 0u32;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += u32::from(gray.get_pixel(x, y).0[0]);
                }
            }
            let count = ((x1 - x0) * (y1 - y0)).max(1);
            let mean = (sum / count) as usize;
            let level = RAMP[(mean * (RAMP.len() - 1) + 127) / 255];
            for y in y0..y1 {
                for x in x0..x1 {
                    // A 1-px margin keeps the character-grid texture.
                    let inner = x > x0 && y > y0 && x + 1 < x1 && y + 1 < y1;
                    if inner {
                        out.put_pixel(x, y, image::Rgb([0, level, 0]));
                    }
                }
            }
        }
    }
    out
}

pub fn apply(frame: &Frame, params: &Params) -> Frame {
    let mut out = frame.clone();
    #[allow(clippy::cast_precision_loss)]
    let threshold = params.edge_thresh.clamp(1, 255) as f32;
    match params.edge_mode {
        EdgeMode::None => {}
        EdgeMode::Canny => out = canny_edges(&out, threshold),
        EdgeMode::Sobel => out = sobel_edges(&out),
        EdgeMode::Neon => out = neon_edges(&out, threshold),
        EdgeMode::ComicInk => out = comic_ink(&out),
    }
    match params.sketch_mode {
        SketchMode::None => {}
        SketchMode::Pencil => out = pencil_sketch(&out),
        SketchMode::Charcoal => out = charcoal_sketch(&out),
    }
    match params.halftone_mode {
        HalftoneMode::None => {}
        HalftoneMode::Dots => out = halftone_dots(&out),
    }
    match params.geometry_mode {
        GeometryMode::None => {}
        GeometryMode::Mosaic => out = mosaic(&out),
        GeometryMode::Ascii => out = ascii_blocks(&out),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> Frame {
        Frame::from_fn(32, 32, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([(x * 8) as u8, (y * 8) as u8, 100])
        })
    }

    #[test]
    fn halftone_white_fills_dots_black_stays_empty() {
        let white = Frame::from_pixel(20, 20, image::Rgb([255, 255, 255]));
        let out = halftone_dots(&white);
        // Cell centers must be lit.
        assert_eq!(out.get_pixel(5, 5).0, [255, 255, 255]);
        let black = Frame::from_pixel(20, 20, image::Rgb([0, 0, 0]));
        let out = halftone_dots(&black);
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn halftone_handles_partial_edge_cells() {
        // 25 is not a multiple of the 10-px cell.
        let frame = Frame::from_pixel(25, 17, image::Rgb([200, 200, 200]));
        let out = halftone_dots(&frame);
        assert_eq!(out.dimensions(), (25, 17));
    }

    #[test]
    fn mosaic_flattens_blocks() {
        let out = mosaic(&Frame::from_pixel(40, 40, image::Rgb([90, 60, 30])));
        // Off-grid pixels inside one block share the block mean.
        assert_eq!(out.get_pixel(5, 5), out.get_pixel(15, 15));
        assert_eq!(out.get_pixel(5, 5).0, [90, 60, 30]);
        // Grid lines are dark.
        assert_eq!(out.get_pixel(0, 7).0, [20, 20, 20]);
    }

    #[test]
    fn pencil_sketch_of_flat_frame_is_light() {
        let out = pencil_sketch(&Frame::from_pixel(8, 8, image::Rgb([128, 128, 128])));
        // Dodge against its own inverse pushes flat regions to white.
        assert!(out.get_pixel(4, 4).0[0] > 200);
    }

    #[test]
    fn ascii_blocks_are_green() {
        let out = ascii_blocks(&Frame::from_pixel(30, 30, image::Rgb([255, 255, 255])));
        let p = out.get_pixel(5, 5).0;
        assert_eq!(p[0], 0);
        assert_eq!(p[2], 0);
        assert!(p[1] > 0);
    }

    #[test]
    fn comic_ink_keeps_bright_flat_regions() {
        // A flat frame sits exactly at its own block mean, above the
        // mean-minus-delta threshold, so no ink is laid down.
        let frame = Frame::from_pixel(16, 16, image::Rgb([220, 200, 180]));
        let out = comic_ink(&frame);
        assert_eq!(out.get_pixel(8, 8).0, [220, 200, 180]);
    }

    #[test]
    fn edge_modes_preserve_shape() {
        let frame = gradient();
        for mode in [EdgeMode::Canny, EdgeMode::Sobel, EdgeMode::Neon, EdgeMode::ComicInk] {
            let mut params = Params::default();
            params.edge_mode = mode;
            let out = apply(&frame, &params);
            assert_eq!(out.dimensions(), frame.dimensions(), "{mode:?}");
        }
    }

    #[test]
    fn disabled_group_is_identity() {
        let frame = gradient();
        assert_eq!(apply(&frame, &Params::default()), frame);
    }
}
