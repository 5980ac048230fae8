// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The software rasterizer.

use std::sync::Arc;

use easel_common::color::Color;
use easel_common::draw_pass::DrawPass;
use easel_common::geometry::{Point, Rect};
use easel_common::glyph::SharedGlyphAtlas;
use easel_common::image::Image;
use easel_common::pixmap::{Pixmap, PixmapInfo};
use easel_common::recording::{DrawVisitor, Recording};

/// Software rasterization backend.
///
/// Owns its target pixmap for the lifetime of the surface; `execute`
/// walks the pass-ordered ops and writes pixels directly. All
/// coordinates are truncated to integers; primitive edges are not
/// antialiased.
#[derive(Debug)]
pub struct CpuRenderer<'a> {
    target: Pixmap<'a>,
    clip: Option<Rect>,
    atlas: Option<SharedGlyphAtlas>,
    warned_missing_atlas: bool,
}

impl<'a> CpuRenderer<'a> {
    /// Create a renderer over a target pixmap.
    pub fn new(target: Pixmap<'a>) -> Self {
        Self {
            target,
            clip: None,
            atlas: None,
            warned_missing_atlas: false,
        }
    }

    /// The render target.
    pub fn target(&self) -> &Pixmap<'a> {
        &self.target
    }

    /// The render target, mutable.
    pub fn target_mut(&mut self) -> &mut Pixmap<'a> {
        &mut self.target
    }

    /// Install (or remove) the glyph atlas used by text ops.
    pub fn set_glyph_atlas(&mut self, atlas: Option<SharedGlyphAtlas>) {
        self.atlas = atlas;
    }

    /// Clear the target to `clear_color` and reset per-frame state.
    pub fn begin_frame(&mut self, clear_color: Color) {
        if self.target.valid() {
            self.target.clear(clear_color);
        }
        self.clip = None;
        self.warned_missing_atlas = false;
    }

    /// Finish the frame. Pixels are already written; nothing to flush.
    pub fn end_frame(&mut self) {}

    /// Re-create target storage at a new size. Contents are discarded;
    /// a borrowed target becomes owned.
    pub fn resize(&mut self, width: u32, height: u32) {
        let format = self.target.format();
        self.target.reallocate(PixmapInfo::make(width, height, format));
    }

    /// Replay `recording` in the order chosen by `pass`.
    pub fn execute(&mut self, recording: &Recording, pass: &DrawPass) {
        recording.dispatch(self, pass);
    }

    /// An immutable copy of the current target contents.
    pub fn make_snapshot(&self) -> Option<Arc<Image>> {
        if !self.target.valid() {
            return None;
        }
        Image::from_pixmap(&self.target)
    }

    /// The clip and target bounds intersection as integer
    /// `[x0, x1) × [y0, y1)`.
    fn effective_bounds(&self) -> (i32, i32, i32, i32) {
        let (tw, th) = (self.target.width() as i32, self.target.height() as i32);
        match self.clip {
            Some(c) => (
                (c.x as i32).max(0),
                (c.y as i32).max(0),
                (c.right() as i32).min(tw),
                (c.bottom() as i32).min(th),
            ),
            None => (0, 0, tw, th),
        }
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        if color.a == 0 {
            return;
        }
        let (cx0, cy0, cx1, cy1) = self.effective_bounds();
        if x < cx0 || x >= cx1 || y < cy0 || y >= cy1 {
            return;
        }
        let format = self.target.format();
        let row = self.target.row_mut(y as u32);
        let i = x as usize * 4;
        let px = &mut row[i..i + 4];

        if color.a == 255 {
            px.copy_from_slice(&color.to_bytes(format));
            return;
        }

        let dst = Color::from_bytes([px[0], px[1], px[2], px[3]], format);
        let blended = blend_src_over(color, dst);
        px.copy_from_slice(&blended.to_bytes(format));
    }

    /// Fill the pixel span `[x0, x1)` on row `y`, assuming the span is
    /// already clipped. The opaque path writes packed words; anything
    /// translucent goes through the blender.
    fn fill_span(&mut self, x0: i32, x1: i32, y: i32, color: Color) {
        if color.a == 255 {
            let word = color.to_bytes(self.target.format());
            let row = self.target.row_mut(y as u32);
            for px in row[x0 as usize * 4..x1 as usize * 4].chunks_exact_mut(4) {
                px.copy_from_slice(&word);
            }
        } else {
            for x in x0..x1 {
                self.blend_pixel(x, y, color);
            }
        }
    }

    fn fill_rect_impl(&mut self, r: Rect, color: Color) {
        let (cx0, cy0, cx1, cy1) = self.effective_bounds();
        let x0 = (r.x as i32).max(cx0);
        let y0 = (r.y as i32).max(cy0);
        let x1 = (r.right() as i32).min(cx1);
        let y1 = (r.bottom() as i32).min(cy1);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        for y in y0..y1 {
            self.fill_span(x0, x1, y, color);
        }
    }

    fn draw_line_impl(&mut self, p1: Point, p2: Point, color: Color) {
        // Bresenham over truncated endpoints, one blended pixel per
        // step. Line width is not honored here; see the crate docs.
        let (mut x, mut y) = (p1.x as i32, p1.y as i32);
        let (x1, y1) = (p2.x as i32, p2.y as i32);
        let dx = (x1 - x).abs();
        let dy = (y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            self.blend_pixel(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn draw_image_impl(&mut self, image: &Image, x: f32, y: f32) {
        let Some(src) = image.pixels() else {
            // GPU-backed images cannot be read on the CPU path.
            return;
        };
        let (dst_x, dst_y) = (x as i32, y as i32);
        let (cx0, cy0, cx1, cy1) = self.effective_bounds();
        let start_x = dst_x.max(cx0);
        let start_y = dst_y.max(cy0);
        let end_x = (dst_x + image.width() as i32).min(cx1);
        let end_y = (dst_y + image.height() as i32).min(cy1);
        if start_x >= end_x || start_y >= end_y {
            return;
        }

        let src_format = image.format();
        let dst_format = self.target.format();

        for row in start_y..end_y {
            let src_row = src.row((row - dst_y) as u32);
            for col in start_x..end_x {
                let si = (col - dst_x) as usize * 4;
                let sp = Color::from_bytes(
                    [src_row[si], src_row[si + 1], src_row[si + 2], src_row[si + 3]],
                    src_format,
                );
                if sp.a == 0 {
                    continue;
                }
                if sp.a == 255 {
                    let dst_row = self.target.row_mut(row as u32);
                    let di = col as usize * 4;
                    dst_row[di..di + 4].copy_from_slice(&sp.to_bytes(dst_format));
                } else {
                    self.blend_pixel(col, row, sp);
                }
            }
        }
    }
}

/// Integer SRC-OVER: `out = (src·a + dst·(255 − a)) / 255` per
/// channel. The output is opaque; this backend never produces
/// translucent destinations.
fn blend_src_over(src: Color, dst: Color) -> Color {
    let a = u32::from(src.a);
    let inv = 255 - a;
    let ch = |s: u8, d: u8| ((u32::from(s) * a + u32::from(d) * inv) / 255) as u8;
    Color::rgba(ch(src.r, dst.r), ch(src.g, dst.g), ch(src.b, dst.b), 255)
}

impl DrawVisitor for CpuRenderer<'_> {
    fn visit_fill_rect(&mut self, rect: Rect, color: Color) {
        if !self.target.valid() {
            return;
        }
        self.fill_rect_impl(rect, color);
    }

    fn visit_stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        if !self.target.valid() {
            return;
        }
        let w = if width > 0.0 { width } else { 1.0 };
        self.fill_rect_impl(Rect::new(rect.x, rect.y, rect.w, w), color);
        self.fill_rect_impl(Rect::new(rect.x, rect.bottom() - w, rect.w, w), color);
        self.fill_rect_impl(
            Rect::new(rect.x, rect.y + w, w, rect.h - 2.0 * w),
            color,
        );
        self.fill_rect_impl(
            Rect::new(rect.right() - w, rect.y + w, w, rect.h - 2.0 * w),
            color,
        );
    }

    fn visit_line(&mut self, p1: Point, p2: Point, color: Color, _width: f32) {
        if !self.target.valid() {
            return;
        }
        self.draw_line_impl(p1, p2, color);
    }

    fn visit_polyline(&mut self, pts: &[Point], color: Color, _width: f32) {
        if !self.target.valid() {
            return;
        }
        for pair in pts.windows(2) {
            self.draw_line_impl(pair[0], pair[1], color);
        }
    }

    fn visit_text(&mut self, pos: Point, text: &str, color: Color) {
        if !self.target.valid() {
            return;
        }
        let Some(atlas) = self.atlas.clone() else {
            if !self.warned_missing_atlas {
                log::warn!("text op skipped: no glyph atlas installed");
                self.warned_missing_atlas = true;
            }
            return;
        };
        // Text is bounded by the target, not the scissor rect; the
        // atlas compositor clips against the buffer edges only.
        let info = self.target.info();
        let mut atlas = match atlas.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        atlas.draw_text_cpu(
            self.target.data_mut(),
            info.stride,
            info.width,
            info.height,
            info.format,
            pos,
            text,
            color,
        );
    }

    fn visit_draw_image(&mut self, image: &Arc<Image>, x: f32, y: f32) {
        if !self.target.valid() || !image.valid() {
            return;
        }
        self.draw_image_impl(image, x, y);
    }

    fn visit_set_clip(&mut self, rect: Rect) {
        self.clip = Some(rect);
    }

    fn visit_clear_clip(&mut self) {
        self.clip = None;
    }
}
