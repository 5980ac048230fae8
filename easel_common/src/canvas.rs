// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The client-facing drawing API.
//!
//! A canvas is a thin layer over a [`Recorder`]: draw calls pass
//! through one-to-one, while `save`/`restore`/`clip_rect` maintain the
//! clip stack and decide which `SetClip`/`ClearClip` ops actually need
//! to be emitted.

use std::sync::Arc;

use crate::color::Color;
use crate::geometry::{Point, Rect};
use crate::image::Image;
use crate::recording::{DrawVisitor, Recorder, Recording};

/// One frame of clip state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ClipState {
    has_clip: bool,
    clip: Rect,
}

/// Records high-level draw commands while tracking the clip stack.
#[derive(Debug, Default)]
pub struct Canvas {
    recorder: Recorder,
    stack: Vec<ClipState>,
    current: ClipState,
}

impl Canvas {
    /// An empty canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all recorded ops and clip state, keeping allocations.
    pub fn reset(&mut self) {
        self.recorder.reset();
        self.stack.clear();
        self.current = ClipState::default();
    }

    /// Seal the recorded frame into a [`Recording`].
    pub fn finish(&mut self) -> Recording {
        self.recorder.finish()
    }

    /// Number of ops recorded so far. Useful for diagnostics.
    pub fn op_count(&self) -> usize {
        self.recorder.op_count()
    }

    /// Fill a rectangle.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.recorder.fill_rect(rect, color);
    }

    /// Outline a rectangle with the given stroke width.
    pub fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.recorder.stroke_rect(rect, color, width);
    }

    /// Draw a line segment.
    pub fn draw_line(&mut self, p1: Point, p2: Point, color: Color, width: f32) {
        self.recorder.draw_line(p1, p2, color, width);
    }

    /// Draw connected line segments.
    pub fn draw_polyline(&mut self, pts: &[Point], color: Color, width: f32) {
        self.recorder.draw_polyline(pts, color, width);
    }

    /// Draw text with `pos` as the baseline of the first glyph.
    ///
    /// Requires the executing backend to have a glyph atlas installed.
    pub fn draw_text(&mut self, pos: Point, text: &str, color: Color) {
        self.recorder.draw_text(pos, text, color);
    }

    /// Draw an image with its top-left corner at `(x, y)`.
    pub fn draw_image(&mut self, image: Arc<Image>, x: f32, y: f32) {
        self.recorder.draw_image(image, x, y);
    }

    /// Push the current clip state.
    pub fn save(&mut self) {
        self.stack.push(self.current);
    }

    /// Pop to the previously saved clip state, re-emitting a clip op
    /// only if the effective clip actually changed. A `restore`
    /// without a matching `save` is a no-op.
    pub fn restore(&mut self) {
        let Some(prev) = self.stack.pop() else {
            return;
        };
        if prev != self.current {
            if prev.has_clip {
                self.recorder.set_clip(prev.clip);
            } else {
                self.recorder.clear_clip();
            }
        }
        self.current = prev;
    }

    /// Intersect the current clip with `rect` and emit the result.
    ///
    /// A disjoint intersection stays representable as a zero-size clip
    /// rather than being dropped, so later draws are still culled.
    pub fn clip_rect(&mut self, rect: Rect) {
        let rect = Rect {
            x: rect.x,
            y: rect.y,
            w: rect.w.max(0.0),
            h: rect.h.max(0.0),
        };
        let clip = if self.current.has_clip {
            self.current.clip.intersect(&rect)
        } else {
            rect
        };
        self.current = ClipState {
            has_clip: true,
            clip,
        };
        self.recorder.set_clip(clip);
    }
}

/// Replaying a [`Recording`] into a canvas re-records every op, which
/// is how recording-only surfaces feed live ones:
/// `recording.accept(&mut canvas)`.
impl DrawVisitor for Canvas {
    fn visit_fill_rect(&mut self, rect: Rect, color: Color) {
        self.fill_rect(rect, color);
    }

    fn visit_stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.stroke_rect(rect, color, width);
    }

    fn visit_line(&mut self, p1: Point, p2: Point, color: Color, width: f32) {
        self.draw_line(p1, p2, color, width);
    }

    fn visit_polyline(&mut self, pts: &[Point], color: Color, width: f32) {
        self.draw_polyline(pts, color, width);
    }

    fn visit_text(&mut self, pos: Point, text: &str, color: Color) {
        self.draw_text(pos, text, color);
    }

    fn visit_draw_image(&mut self, image: &Arc<Image>, x: f32, y: f32) {
        self.draw_image(image.clone(), x, y);
    }

    fn visit_set_clip(&mut self, rect: Rect) {
        // A replayed SetClip replaces the clip outright; it already
        // went through intersection when it was first recorded.
        self.current = ClipState {
            has_clip: true,
            clip: rect,
        };
        self.recorder.set_clip(rect);
    }

    fn visit_clear_clip(&mut self) {
        self.current = ClipState::default();
        self.recorder.clear_clip();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixmap::{Pixmap, PixmapInfo};
    use crate::recording::{DrawOp, OpKind};

    fn record(build: impl FnOnce(&mut Canvas)) -> Recording {
        let mut canvas = Canvas::new();
        build(&mut canvas);
        canvas.finish()
    }

    fn count_ops(recording: &Recording, kind: OpKind) -> usize {
        recording.ops().iter().filter(|op| op.kind() == kind).count()
    }

    fn last_set_clip(recording: &Recording) -> Option<Rect> {
        recording.ops().iter().rev().find_map(|op| match op {
            DrawOp::SetClip { rect } => Some(*rect),
            _ => None,
        })
    }

    #[test]
    fn clip_rect_records_set_clip() {
        let rec = record(|c| c.clip_rect(Rect::new(10.0, 10.0, 50.0, 50.0)));
        assert_eq!(count_ops(&rec, OpKind::SetClip), 1);
        assert_eq!(last_set_clip(&rec), Some(Rect::new(10.0, 10.0, 50.0, 50.0)));
    }

    #[test]
    fn nested_clips_intersect() {
        let rec = record(|c| {
            c.clip_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
            c.clip_rect(Rect::new(50.0, 50.0, 100.0, 100.0));
        });
        assert_eq!(last_set_clip(&rec), Some(Rect::new(50.0, 50.0, 50.0, 50.0)));
    }

    #[test]
    fn disjoint_clips_become_zero_size() {
        let rec = record(|c| {
            c.clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
            c.clip_rect(Rect::new(20.0, 20.0, 10.0, 10.0));
        });
        let clip = last_set_clip(&rec).unwrap();
        assert_eq!(clip.w, 0.0);
        assert_eq!(clip.h, 0.0);
    }

    #[test]
    fn restore_clears_clip_set_after_save() {
        let rec = record(|c| {
            c.save();
            c.clip_rect(Rect::new(10.0, 10.0, 50.0, 50.0));
            c.restore();
        });
        assert_eq!(count_ops(&rec, OpKind::SetClip), 1);
        assert_eq!(count_ops(&rec, OpKind::ClearClip), 1);
    }

    #[test]
    fn save_restore_without_changes_emits_nothing() {
        let rec = record(|c| {
            c.save();
            c.restore();
        });
        assert!(rec.ops().is_empty());

        // Same holds when a clip is already active.
        let rec = record(|c| {
            c.clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
            c.save();
            c.restore();
        });
        assert_eq!(count_ops(&rec, OpKind::SetClip), 1);
        assert_eq!(count_ops(&rec, OpKind::ClearClip), 0);
    }

    #[test]
    fn nested_save_restore_reasserts_outer_clip() {
        let rec = record(|c| {
            c.save();
            c.clip_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
            c.fill_rect(Rect::new(5.0, 5.0, 10.0, 10.0), Color::rgb(255, 0, 0));

            c.save();
            c.clip_rect(Rect::new(20.0, 20.0, 30.0, 30.0));
            c.fill_rect(Rect::new(25.0, 25.0, 5.0, 5.0), Color::rgb(0, 255, 0));
            c.restore();

            c.fill_rect(Rect::new(50.0, 50.0, 10.0, 10.0), Color::rgb(0, 0, 255));
            c.restore();
        });
        // Two clip_rect calls plus the restore that re-asserts the
        // outer clip; the final restore clears.
        assert_eq!(count_ops(&rec, OpKind::SetClip), 3);
        assert_eq!(count_ops(&rec, OpKind::ClearClip), 1);
        assert_eq!(count_ops(&rec, OpKind::FillRect), 3);
    }

    #[test]
    fn restore_without_save_is_a_no_op() {
        let rec = record(|c| {
            c.restore();
            c.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::rgb(255, 0, 0));
        });
        assert_eq!(rec.ops().len(), 1);
    }

    #[test]
    fn negative_clip_extents_clamp_to_zero() {
        let rec = record(|c| c.clip_rect(Rect::new(5.0, 5.0, -10.0, 20.0)));
        let clip = last_set_clip(&rec).unwrap();
        assert_eq!(clip.w, 0.0);
        assert_eq!(clip.h, 20.0);
    }

    #[test]
    fn replay_re_records_ops() {
        let source = record(|c| {
            c.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::rgb(1, 2, 3));
            c.clip_rect(Rect::new(1.0, 1.0, 2.0, 2.0));
            c.draw_text(Point::new(0.0, 10.0), "replay", Color::WHITE);
        });

        let mut target = Canvas::new();
        source.accept(&mut target);
        let replayed = target.finish();
        assert_eq!(replayed.ops().len(), source.ops().len());
        assert_eq!(count_ops(&replayed, OpKind::Text), 1);
        assert_eq!(last_set_clip(&replayed), Some(Rect::new(1.0, 1.0, 2.0, 2.0)));
    }

    #[test]
    fn draw_image_records_position_and_reference() {
        let pm = Pixmap::alloc(PixmapInfo::make_rgba(4, 4)).unwrap();
        let img = Image::from_pixmap(&pm).unwrap();
        let rec = record(|c| c.draw_image(img, 10.0, 20.0));
        assert_eq!(rec.images().len(), 1);
        match rec.ops()[0] {
            DrawOp::DrawImage { x, y, image } => {
                assert_eq!((x, y, image), (10.0, 20.0, 0));
            }
            ref other => panic!("unexpected op {other:?}"),
        }
    }
}
