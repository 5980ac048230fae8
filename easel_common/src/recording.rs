// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact draw ops, the recorder that emits them, and the immutable
//! recording a finished frame becomes.
//!
//! Ops are a closed set, so dispatch is an exhaustive `match` rather
//! than virtual calls; backends plug in at the [`DrawVisitor`] seam.
//! Variable-length payloads (polyline points, text bytes) live in the
//! recording's [`OpArena`] and are addressed by offset/count pairs,
//! which keeps every op small and trivially copyable.

use std::sync::Arc;

use crate::arena::OpArena;
use crate::color::Color;
use crate::draw_pass::DrawPass;
use crate::geometry::{Point, Rect};
use crate::image::Image;

/// Discriminant of a draw op.
///
/// The numeric order is load-bearing: it is the type field of the
/// [`DrawPass`] sort key, so ops of the same kind batch together and
/// clip changes sort after the draws they follow.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OpKind {
    /// Filled rectangle.
    FillRect = 0,
    /// Outlined rectangle.
    StrokeRect = 1,
    /// Single line segment.
    Line = 2,
    /// Connected line segments.
    Polyline = 3,
    /// Text run at a baseline position.
    Text = 4,
    /// Image blit.
    DrawImage = 5,
    /// Set the scissor/clip rectangle.
    SetClip = 6,
    /// Remove the scissor/clip rectangle.
    ClearClip = 7,
}

/// One recorded draw command.
///
/// Every variant is a few words; anything variable-length is an
/// offset into the recording's arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOp {
    /// Fill `rect` with `color`.
    FillRect {
        /// Target rectangle.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// Stroke the edges of `rect`.
    StrokeRect {
        /// Target rectangle.
        rect: Rect,
        /// Stroke color.
        color: Color,
        /// Stroke width in pixels.
        width: f32,
    },
    /// Draw a line segment.
    Line {
        /// Start point.
        p1: Point,
        /// End point.
        p2: Point,
        /// Line color.
        color: Color,
        /// Line width in pixels.
        width: f32,
    },
    /// Draw connected segments through an arena point run.
    Polyline {
        /// Offset of the first point in the arena.
        offset: u32,
        /// Number of points.
        count: u32,
        /// Line color.
        color: Color,
        /// Line width in pixels.
        width: f32,
    },
    /// Draw a text run.
    Text {
        /// Baseline position of the first glyph.
        pos: Point,
        /// Offset of the text bytes in the arena.
        offset: u32,
        /// Byte length (excluding the stored terminator).
        len: u32,
        /// Text color.
        color: Color,
    },
    /// Blit an image from the recording's image table.
    DrawImage {
        /// Destination left edge.
        x: f32,
        /// Destination top edge.
        y: f32,
        /// Index into [`Recording::images`].
        image: u32,
    },
    /// Replace the active clip rectangle.
    SetClip {
        /// New clip rectangle.
        rect: Rect,
    },
    /// Drop the active clip rectangle.
    ClearClip,
}

impl DrawOp {
    /// The op's discriminant.
    pub fn kind(&self) -> OpKind {
        match self {
            Self::FillRect { .. } => OpKind::FillRect,
            Self::StrokeRect { .. } => OpKind::StrokeRect,
            Self::Line { .. } => OpKind::Line,
            Self::Polyline { .. } => OpKind::Polyline,
            Self::Text { .. } => OpKind::Text,
            Self::DrawImage { .. } => OpKind::DrawImage,
            Self::SetClip { .. } => OpKind::SetClip,
            Self::ClearClip => OpKind::ClearClip,
        }
    }

    /// The color the sort key batches on. Colorless ops (images,
    /// clips) contribute the default color so they still form stable
    /// runs.
    pub fn sort_color(&self) -> Color {
        match self {
            Self::FillRect { color, .. }
            | Self::StrokeRect { color, .. }
            | Self::Line { color, .. }
            | Self::Polyline { color, .. }
            | Self::Text { color, .. } => *color,
            Self::DrawImage { .. } | Self::SetClip { .. } | Self::ClearClip => Color::default(),
        }
    }
}

/// Typed fan-out for draw ops.
///
/// [`Recording::accept`] and [`Recording::dispatch`] resolve arena
/// offsets and image indices and call these methods; both backends and
/// the canvas replay path implement this trait.
pub trait DrawVisitor {
    /// A filled rectangle.
    fn visit_fill_rect(&mut self, rect: Rect, color: Color);
    /// An outlined rectangle.
    fn visit_stroke_rect(&mut self, rect: Rect, color: Color, width: f32);
    /// A line segment.
    fn visit_line(&mut self, p1: Point, p2: Point, color: Color, width: f32);
    /// Connected line segments.
    fn visit_polyline(&mut self, pts: &[Point], color: Color, width: f32);
    /// A text run at a baseline position.
    fn visit_text(&mut self, pos: Point, text: &str, color: Color);
    /// An image blit.
    fn visit_draw_image(&mut self, image: &Arc<Image>, x: f32, y: f32);
    /// A clip change.
    fn visit_set_clip(&mut self, rect: Rect);
    /// A clip removal.
    fn visit_clear_clip(&mut self);
}

/// The immutable result of a finished frame: ops, their arena, and
/// the images they reference.
#[derive(Debug, Default)]
pub struct Recording {
    ops: Vec<DrawOp>,
    arena: OpArena,
    images: Vec<Arc<Image>>,
}

impl Recording {
    /// The recorded ops in insertion order.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// The arena holding variable-length payloads.
    pub fn arena(&self) -> &OpArena {
        &self.arena
    }

    /// The image reference table.
    pub fn images(&self) -> &[Arc<Image>] {
        &self.images
    }

    /// Resolve an image index from a `DrawImage` op.
    pub fn image(&self, index: u32) -> Option<&Arc<Image>> {
        self.images.get(index as usize)
    }

    /// Visit every op in insertion order.
    pub fn accept<V: DrawVisitor>(&self, visitor: &mut V) {
        for op in &self.ops {
            self.dispatch_op(op, visitor);
        }
    }

    /// Visit every op in the execution order chosen by `pass`.
    ///
    /// This is the single choke point backends execute through.
    pub fn dispatch<V: DrawVisitor>(&self, visitor: &mut V, pass: &DrawPass) {
        for &idx in pass.sorted_indices() {
            self.dispatch_op(&self.ops[idx as usize], visitor);
        }
    }

    fn dispatch_op<V: DrawVisitor>(&self, op: &DrawOp, visitor: &mut V) {
        match *op {
            DrawOp::FillRect { rect, color } => visitor.visit_fill_rect(rect, color),
            DrawOp::StrokeRect { rect, color, width } => {
                visitor.visit_stroke_rect(rect, color, width);
            }
            DrawOp::Line { p1, p2, color, width } => visitor.visit_line(p1, p2, color, width),
            DrawOp::Polyline {
                offset,
                count,
                color,
                width,
            } => visitor.visit_polyline(self.arena.points_at(offset, count), color, width),
            DrawOp::Text {
                pos,
                offset,
                len,
                color,
            } => visitor.visit_text(pos, self.arena.str_at(offset, len), color),
            DrawOp::DrawImage { x, y, image } => {
                // An out-of-range index would mean a recorder bug; the
                // op is dropped rather than panicking mid-frame.
                if let Some(image) = self.image(image) {
                    visitor.visit_draw_image(image, x, y);
                }
            }
            DrawOp::SetClip { rect } => visitor.visit_set_clip(rect),
            DrawOp::ClearClip => visitor.visit_clear_clip(),
        }
    }
}

/// Builder that appends ops and populates the arena.
///
/// Each draw method appends exactly one op; `finish` hands the
/// accumulated state over as a [`Recording`] and leaves the recorder
/// empty and reusable.
#[derive(Debug, Default)]
pub struct Recorder {
    ops: Vec<DrawOp>,
    arena: OpArena,
    images: Vec<Arc<Image>>,
}

impl Recorder {
    /// An empty recorder.
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            arena: OpArena::new(),
            images: Vec::new(),
        }
    }

    /// Discard all recorded state, keeping allocations.
    pub fn reset(&mut self) {
        self.ops.clear();
        self.arena.reset();
        self.images.clear();
    }

    /// Record a filled rectangle.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    /// Record an outlined rectangle.
    pub fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.ops.push(DrawOp::StrokeRect { rect, color, width });
    }

    /// Record a line segment.
    pub fn draw_line(&mut self, p1: Point, p2: Point, color: Color, width: f32) {
        self.ops.push(DrawOp::Line { p1, p2, color, width });
    }

    /// Record a polyline; the points are copied into the arena.
    pub fn draw_polyline(&mut self, pts: &[Point], color: Color, width: f32) {
        let offset = self.arena.store_points(pts);
        self.ops.push(DrawOp::Polyline {
            offset,
            count: pts.len() as u32,
            color,
            width,
        });
    }

    /// Record a text run; the bytes are copied into the arena.
    pub fn draw_text(&mut self, pos: Point, text: &str, color: Color) {
        let offset = self.arena.store_str(text);
        self.ops.push(DrawOp::Text {
            pos,
            offset,
            len: text.len() as u32,
            color,
        });
    }

    /// Record an image blit; the image joins the reference table.
    pub fn draw_image(&mut self, image: Arc<Image>, x: f32, y: f32) {
        let index = self.images.len() as u32;
        self.images.push(image);
        self.ops.push(DrawOp::DrawImage { x, y, image: index });
    }

    /// Record a clip change.
    pub fn set_clip(&mut self, rect: Rect) {
        self.ops.push(DrawOp::SetClip { rect });
    }

    /// Record a clip removal.
    pub fn clear_clip(&mut self) {
        self.ops.push(DrawOp::ClearClip);
    }

    /// Number of ops recorded so far.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Seal the recorded state into a [`Recording`], leaving this
    /// recorder empty.
    pub fn finish(&mut self) -> Recording {
        Recording {
            ops: std::mem::take(&mut self.ops),
            arena: std::mem::take(&mut self.arena),
            images: std::mem::take(&mut self.images),
        }
    }
}
