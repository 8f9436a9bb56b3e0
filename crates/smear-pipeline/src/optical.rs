//! Optical group: lens-like distortions selected by [`OpticalMode`].

use crate::params::OpticalMode;
use crate::remap::{Field, FieldKey};
use crate::state::OpticalState;
use crate::types::{Dimensions, Frame};

/// Four-way mirror fold around the frame center.
fn kaleidoscope(frame: &Frame) -> Frame {
    let (w, h) = frame.dimensions();
    Frame::from_fn(w, h, |x, y| {
        let sx = if x < w.div_ceil(2) { x } else { w - 1 - x };
        let sy = if y < h.div_ceil(2) { y } else { h - 1 - y };
        *frame.get_pixel(sx, sy)
    })
}

/// Swirl displacement: rotation that decays linearly from the center to
/// the swirl radius, identity beyond it.
#[allow(clippy::cast_precision_loss)]
fn swirl_field(dims: Dimensions, amount: i32) -> Field {
    let (w, h) = (dims.width, dims.height);
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let radius = cx.min(cy);
    let strength = amount as f32 / 100.0 * 4.0;
    Field::from_fn(w, h, move |x, y| {
        let dx = x - cx;
        let dy = y - cy;
        let r = dx.hypot(dy);
        if r >= radius {
            return (x, y);
        }
        let angle = dy.atan2(dx) + strength * (radius - r) / radius;
        (r.mul_add(angle.cos(), cx), r.mul_add(angle.sin(), cy))
    })
}

/// 4×4 grid of alternately flipped tiles.
fn mirror_tiles(frame: &Frame) -> Frame {
    const GRID: u32 = 4;
    let (w, h) = frame.dimensions();
    let (tw, th) = ((w / GRID).max(1), (h / GRID).max(1));
    Frame::from_fn(w, h, |x, y| {
        let (tx, ty) = (x / tw, y / th);
        let (mut ox, mut oy) = (x % tw, y % th);
        if tx % 2 == 1 {
            ox = tw - 1 - ox;
        }
        if ty % 2 == 1 {
            oy = th - 1 - oy;
        }
        // Tiles sample the top-left tile's footprint, scaled up across
        // the grid so every tile shows the whole (decimated) frame.
        *frame.get_pixel((ox * GRID).min(w - 1), (oy * GRID).min(h - 1))
    })
}

pub fn apply(frame: &Frame, mode: OpticalMode, amount: i32, state: &mut OpticalState) -> Frame {
    match mode {
        OpticalMode::None => frame.clone(),
        OpticalMode::Kaleidoscope => kaleidoscope(frame),
        OpticalMode::Swirl => {
            let dims = Dimensions::of(frame);
            let field = state.field.get_or_build(
                FieldKey {
                    tag: "swirl",
                    amount,
                    dims,
                },
                || swirl_field(dims, amount),
            );
            field.apply(frame)
        }
        OpticalMode::MirrorTiles => mirror_tiles(frame),
    }
}
