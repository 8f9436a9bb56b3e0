//! Geometric composition modes, applied before every other group.

use std::collections::VecDeque;

use image::imageops::{self, FilterType};
use rand::Rng;

use crate::ops::{blend, roll_row};
use crate::params::SplitMode;
use crate::state::{SlitScan, SplitState, history_back};
use crate::types::Frame;

/// Mirror the left half of the frame onto the right half.
fn mirror_left(frame: &Frame) -> Frame {
    let w = frame.width();
    Frame::from_fn(w, frame.height(), |x, y| {
        let sx = if x < w.div_ceil(2) { x } else { w - 1 - x };
        *frame.get_pixel(sx, y)
    })
}

/// Mirror the top half of the frame onto the bottom half.
fn mirror_top(frame: &Frame) -> Frame {
    let h = frame.height();
    Frame::from_fn(frame.width(), h, |x, y| {
        let sy = if y < h.div_ceil(2) { y } else { h - 1 - y };
        *frame.get_pixel(x, sy)
    })
}

fn quad_mirror(frame: &Frame) -> Frame {
    mirror_top(&mirror_left(frame))
}

/// Tile the frame as a `grid`×`grid` mosaic of scaled-down copies.
fn recursive_grid(frame: &Frame, grid: u32) -> Frame {
    let (w, h) = frame.dimensions();
    let cell_w = (w / grid).max(1);
    let cell_h = (h / grid).max(1);
    let cell = imageops::resize(frame, cell_w, cell_h, FilterType::Triangle);
    Frame::from_fn(w, h, |x, y| *cell.get_pixel(x % cell_w, y % cell_h))
}

/// Left half live, right half from 30 frames ago.
fn time_shifted_split(frame: &Frame, history: &VecDeque<Frame>) -> Frame {
    let Some(delayed) = history_back(history, 30) else {
        return frame.clone();
    };
    let w = frame.width();
    Frame::from_fn(w, frame.height(), |x, y| {
        if x < w / 2 {
            *frame.get_pixel(x, y)
        } else {
            *delayed.get_pixel(x, y)
        }
    })
}

/// Vertical thirds isolating the red, green, and blue channels.
fn rgb_channel_split(frame: &Frame) -> Frame {
    let w = frame.width();
    let third = (w / 3).max(1);
    Frame::from_fn(w, frame.height(), |x, y| {
        let c = ((x / third) as usize).min(2);
        let mut p = [0u8; 3];
        p[c] = frame.get_pixel(x, y).0[c];
        image::Rgb(p)
    })
}

/// Blend progressively scaled-down centered copies for a tunnel look.
fn infinite_tunnel(frame: &Frame) -> Frame {
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();
    let mut scale = 0.8f32;
    for _ in 0..4 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let (sw, sh) = (
            ((w as f32 * scale) as u32).max(1),
            ((h as f32 * scale) as u32).max(1),
        );
        let inner = imageops::resize(&out, sw, sh, FilterType::Triangle);
        let (ox, oy) = ((w - sw) / 2, (h - sh) / 2);
        let mut layered = out.clone();
        imageops::overlay(&mut layered, &inner, i64::from(ox), i64::from(oy));
        out = blend(&out, &layered, 0.5, 0.5);
        scale *= 0.8;
    }
    out
}

/// 64-px checkerboard where alternate blocks are horizontally flipped.
fn checkerboard_mirror(frame: &Frame) -> Frame {
    const BLOCK: u32 = 64;
    let w = frame.width();
    Frame::from_fn(w, frame.height(), |x, y| {
        if (x / BLOCK + y / BLOCK) % 2 == 1 {
            *frame.get_pixel(w - 1 - x, y)
        } else {
            *frame.get_pixel(x, y)
        }
    })
}

/// Quad mirror folded once more against its 90°-rotated self.
fn kaleidoscope_eight_way(frame: &Frame) -> Frame {
    let quad = quad_mirror(frame);
    let rotated = imageops::rotate90(&quad);
    let rotated = imageops::resize(&rotated, quad.width(), quad.height(), FilterType::Triangle);
    blend(&quad, &rotated, 0.5, 0.5)
}

/// Even rows live, odd rows from 10 frames ago.
fn scanline_interlace(frame: &Frame, history: &VecDeque<Frame>) -> Frame {
    let Some(delayed) = history_back(history, 10) else {
        return frame.clone();
    };
    Frame::from_fn(frame.width(), frame.height(), |x, y| {
        if y % 2 == 0 {
            *frame.get_pixel(x, y)
        } else {
            *delayed.get_pixel(x, y)
        }
    })
}

/// Randomly roll 64-px grid blocks sideways.
fn glitch_grid<R: Rng>(frame: &Frame, rng: &mut R) -> Frame {
    const BLOCK: u32 = 64;
    let mut out = frame.clone();
    let (w, h) = frame.dimensions();
    for by in 0..h.div_ceil(BLOCK) {
        for _bx in 0..w.div_ceil(BLOCK) {
            if rng.random::<f32>() >= 0.3 {
                continue;
            }
            let shift = rng.random_range(-20..=20i64);
            let y0 = by * BLOCK;
            let y1 = (y0 + BLOCK).min(h);
            for y in y0..y1 {
                roll_row(&mut out, y, shift);
            }
        }
    }
    out
}

/// Sweep the live center column (or row) across a persistent canvas.
fn slit_scan(frame: &Frame, scan: &mut Option<SlitScan>, vertical: bool) -> Frame {
    let (w, h) = frame.dimensions();
    let scan = scan.get_or_insert_with(|| SlitScan {
        canvas: frame.clone(),
        pos: 0,
    });
    if vertical {
        let src_x = w / 2;
        for y in 0..h {
            scan.canvas.put_pixel(scan.pos, y, *frame.get_pixel(src_x, y));
        }
        scan.pos = (scan.pos + 1) % w;
    } else {
        let src_y = h / 2;
        for x in 0..w {
            scan.canvas.put_pixel(x, scan.pos, *frame.get_pixel(x, src_y));
        }
        scan.pos = (scan.pos + 1) % h;
    }
    scan.canvas.clone()
}

pub fn apply<R: Rng>(
    frame: &Frame,
    mode: SplitMode,
    state: &mut SplitState,
    history: &VecDeque<Frame>,
    rng: &mut R,
) -> Frame {
    match mode {
        SplitMode::None => frame.clone(),
        SplitMode::VerticalSplit => mirror_left(frame),
        SplitMode::HorizontalSplit => mirror_top(frame),
        SplitMode::QuadMirror => quad_mirror(frame),
        SplitMode::RadialMirror => {
            // One more fold than the quad mirror, against the flipped quad.
            let quad = quad_mirror(frame);
            blend(&quad, &mirror_left(&imageops::flip_vertical(&quad)), 0.5, 0.5)
        }
        SplitMode::RecursiveGrid => recursive_grid(frame, 3),
        SplitMode::TimeShiftedSplit => time_shifted_split(frame, history),
        SplitMode::RgbChannelSplit => rgb_channel_split(frame),
        SplitMode::InfiniteTunnel => infinite_tunnel(frame),
        SplitMode::CheckerboardMirror => checkerboard_mirror(frame),
        SplitMode::KaleidoscopeEightWay => kaleidoscope_eight_way(frame),
        SplitMode::ScanlineInterlace => scanline_interlace(frame, history),
        SplitMode::GlitchGrid => glitch_grid(frame, rng),
        SplitMode::VerticalSlitScan => slit_scan(frame, &mut state.vertical, true),
        SplitMode::HorizontalSlitScan => slit_scan(frame, &mut state.horizontal, false),
    }
}
