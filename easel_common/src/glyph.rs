// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyph rasterization and atlas packing for text rendering.
//!
//! The atlas is a single-channel coverage bitmap shared by both
//! backends: the CPU rasterizer composites straight out of it, the GPU
//! renderer uploads it (or per-run scratch buffers built from it) as a
//! texture. Font parsing and outline rasterization are delegated
//! entirely to `fontdue`; this module only caches, packs and blends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::color::{Color, PixelFormat};
use crate::geometry::Point;

const INITIAL_ATLAS_WIDTH: u32 = 512;
const INITIAL_ATLAS_HEIGHT: u32 = 256;
const MAX_ATLAS_DIM: u32 = 8192;
/// Gap kept between packed glyphs so linear sampling never bleeds.
const PADDING: u32 = 1;

/// Errors raised while building a glyph atlas.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// The font data could not be parsed.
    #[error("failed to parse font: {0}")]
    Font(&'static str),
    /// The font carries no horizontal metrics at the requested size.
    #[error("font has no horizontal line metrics")]
    MissingMetrics,
    /// The font file could not be read.
    #[error("failed to read font file")]
    Io(#[from] std::io::Error),
}

/// Metrics and atlas location for one rasterized glyph.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphMetrics {
    /// Left edge of the bitmap relative to the pen position.
    pub x0: i32,
    /// Top edge of the bitmap relative to the baseline (negative above).
    pub y0: i32,
    /// Right edge, `x0 + width`.
    pub x1: i32,
    /// Bottom edge, `y0 + height`.
    pub y1: i32,
    /// Horizontal advance in pixels.
    pub advance: i32,
    /// Pixel column of the bitmap in the atlas.
    pub ax: u32,
    /// Pixel row of the bitmap in the atlas.
    pub ay: u32,
    /// Left atlas UV in `[0, 1]`.
    pub u0: f32,
    /// Top atlas UV in `[0, 1]`.
    pub v0: f32,
    /// Right atlas UV in `[0, 1]`.
    pub u1: f32,
    /// Bottom atlas UV in `[0, 1]`.
    pub v1: f32,
}

impl GlyphMetrics {
    /// Bitmap width in pixels.
    pub fn width(&self) -> u32 {
        (self.x1 - self.x0) as u32
    }

    /// Bitmap height in pixels.
    pub fn height(&self) -> u32 {
        (self.y1 - self.y0) as u32
    }
}

/// Next-fit shelf packer over a fixed-size area.
///
/// Glyphs are placed left to right on the current shelf; when one
/// does not fit horizontally a new shelf opens below the tallest
/// glyph of the previous one. No backtracking, no free lists: glyph
/// populations are written once and reset wholesale.
#[derive(Debug)]
struct ShelfPacker {
    width: u32,
    height: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
}

impl ShelfPacker {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cursor_x: PADDING,
            cursor_y: PADDING,
            row_height: 0,
        }
    }

    /// Reserve a `w`×`h` region, returning its top-left corner, or
    /// `None` if the area is exhausted and must grow.
    fn pack(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if self.cursor_x + w + PADDING > self.width {
            // Start a new shelf.
            self.cursor_x = PADDING;
            self.cursor_y += self.row_height;
            self.row_height = 0;
        }
        if self.cursor_x + w + PADDING > self.width || self.cursor_y + h + PADDING > self.height {
            return None;
        }
        let pos = (self.cursor_x, self.cursor_y);
        self.cursor_x += w + PADDING;
        self.row_height = self.row_height.max(h + PADDING);
        Some(pos)
    }

    fn grow_to(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

/// A glyph atlas shared between a surface's backends.
///
/// Rasterization needs `&mut self`, so the atlas is handed around
/// behind a mutex; contention is nil in the library's single-threaded
/// frame model.
pub type SharedGlyphAtlas = Arc<Mutex<GlyphAtlas>>;

/// Rasterizes glyphs on demand and packs their coverage bitmaps into
/// a growable single-channel atlas.
pub struct GlyphAtlas {
    font: fontdue::Font,
    size: f32,
    ascent: i32,
    descent: i32,
    line_height: i32,
    atlas: Vec<u8>,
    atlas_w: u32,
    atlas_h: u32,
    packer: ShelfPacker,
    glyphs: HashMap<char, GlyphMetrics>,
    dirty: bool,
}

impl std::fmt::Debug for GlyphAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphAtlas")
            .field("size", &self.size)
            .field("atlas_w", &self.atlas_w)
            .field("atlas_h", &self.atlas_h)
            .field("glyphs", &self.glyphs.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl GlyphAtlas {
    /// Build an atlas from raw font file data at the given pixel size.
    pub fn from_bytes(data: &[u8], size: f32) -> Result<Self, AtlasError> {
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(AtlasError::Font)?;
        let metrics = font
            .horizontal_line_metrics(size)
            .ok_or(AtlasError::MissingMetrics)?;
        Ok(Self {
            font,
            size,
            ascent: metrics.ascent.round() as i32,
            descent: metrics.descent.round() as i32,
            line_height: metrics.new_line_size.round() as i32,
            atlas: vec![0; (INITIAL_ATLAS_WIDTH * INITIAL_ATLAS_HEIGHT) as usize],
            atlas_w: INITIAL_ATLAS_WIDTH,
            atlas_h: INITIAL_ATLAS_HEIGHT,
            packer: ShelfPacker::new(INITIAL_ATLAS_WIDTH, INITIAL_ATLAS_HEIGHT),
            glyphs: HashMap::new(),
            dirty: true,
        })
    }

    /// Build an atlas from a font file on disk.
    pub fn from_file(path: impl AsRef<std::path::Path>, size: f32) -> Result<Self, AtlasError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data, size)
    }

    /// Wrap the atlas for sharing between backends.
    pub fn into_shared(self) -> SharedGlyphAtlas {
        Arc::new(Mutex::new(self))
    }

    /// Raw single-channel atlas pixels, row-major.
    pub fn atlas_data(&self) -> &[u8] {
        &self.atlas
    }

    /// Atlas width in pixels.
    pub fn atlas_width(&self) -> u32 {
        self.atlas_w
    }

    /// Atlas height in pixels.
    pub fn atlas_height(&self) -> u32 {
        self.atlas_h
    }

    /// Whether the atlas changed since [`mark_clean`](Self::mark_clean)
    /// (the GPU backend's re-upload signal).
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledge an upload of the current atlas contents.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Typographic line height in pixels.
    pub fn line_height(&self) -> i32 {
        self.line_height
    }

    /// Baseline-to-top distance in pixels.
    pub fn ascent(&self) -> i32 {
        self.ascent
    }

    /// Baseline-to-bottom distance in pixels (negative).
    pub fn descent(&self) -> i32 {
        self.descent
    }

    /// Get (rasterizing and packing on first use) the metrics for a
    /// character. Returns `None` only when the glyph cannot fit the
    /// maximum atlas size.
    pub fn glyph(&mut self, ch: char) -> Option<GlyphMetrics> {
        if let Some(m) = self.glyphs.get(&ch) {
            return Some(*m);
        }
        let m = self.rasterize(ch)?;
        self.glyphs.insert(ch, m);
        Some(m)
    }

    /// Sum of advances for `text`. Bytes are looked up as 8-bit glyph
    /// indices; text handling is deliberately ASCII-first.
    pub fn measure_text(&mut self, text: &str) -> i32 {
        text.bytes()
            .filter_map(|b| self.glyph(b as char))
            .map(|m| m.advance)
            .sum()
    }

    fn rasterize(&mut self, ch: char) -> Option<GlyphMetrics> {
        let (metrics, bitmap) = self.font.rasterize(ch, self.size);
        let advance = metrics.advance_width.round() as i32;

        if metrics.width == 0 || metrics.height == 0 {
            // Whitespace and other blank glyphs still advance the pen.
            return Some(GlyphMetrics {
                advance,
                ..GlyphMetrics::default()
            });
        }

        let gw = metrics.width as u32;
        let gh = metrics.height as u32;
        let (ax, ay) = loop {
            if let Some(pos) = self.packer.pack(gw, gh) {
                break pos;
            }
            if !self.grow() {
                log::warn!(
                    "glyph atlas exhausted at {}x{}, dropping glyph {ch:?}",
                    self.atlas_w,
                    self.atlas_h
                );
                return None;
            }
        };

        for row in 0..gh {
            let src = &bitmap[(row * gw) as usize..((row + 1) * gw) as usize];
            let dst_start = ((ay + row) * self.atlas_w + ax) as usize;
            self.atlas[dst_start..dst_start + gw as usize].copy_from_slice(src);
        }
        self.dirty = true;

        // fontdue reports the bitmap box y-up from the baseline;
        // convert to the y-down convention the rest of the pipeline
        // uses (y0 negative above the baseline).
        let x0 = metrics.xmin;
        let y0 = -(metrics.height as i32 + metrics.ymin);
        Some(GlyphMetrics {
            x0,
            y0,
            x1: x0 + metrics.width as i32,
            y1: y0 + metrics.height as i32,
            advance,
            ax,
            ay,
            u0: ax as f32 / self.atlas_w as f32,
            v0: ay as f32 / self.atlas_h as f32,
            u1: (ax + gw) as f32 / self.atlas_w as f32,
            v1: (ay + gh) as f32 / self.atlas_h as f32,
        })
    }

    /// Grow the atlas by doubling its smaller dimension, preserving
    /// packed pixels and rescaling every cached UV.
    fn grow(&mut self) -> bool {
        let (new_w, new_h) = if self.atlas_w <= self.atlas_h {
            (self.atlas_w * 2, self.atlas_h)
        } else {
            (self.atlas_w, self.atlas_h * 2)
        };
        if new_w > MAX_ATLAS_DIM || new_h > MAX_ATLAS_DIM {
            return false;
        }

        let mut grown = vec![0_u8; (new_w * new_h) as usize];
        for row in 0..self.atlas_h {
            let src = (row * self.atlas_w) as usize;
            let dst = (row * new_w) as usize;
            grown[dst..dst + self.atlas_w as usize]
                .copy_from_slice(&self.atlas[src..src + self.atlas_w as usize]);
        }

        let (su, sv) = (
            self.atlas_w as f32 / new_w as f32,
            self.atlas_h as f32 / new_h as f32,
        );
        for m in self.glyphs.values_mut() {
            m.u0 *= su;
            m.u1 *= su;
            m.v0 *= sv;
            m.v1 *= sv;
        }

        log::debug!(
            "glyph atlas grown {}x{} -> {new_w}x{new_h}",
            self.atlas_w,
            self.atlas_h
        );
        self.atlas = grown;
        self.atlas_w = new_w;
        self.atlas_h = new_h;
        self.packer.grow_to(new_w, new_h);
        self.dirty = true;
        true
    }

    /// Composite `text` into a 32-bit pixel buffer, using glyph
    /// coverage as the source alpha.
    ///
    /// `pos` is the baseline of the first glyph. `stride` is in bytes;
    /// `width`/`height` bound the writable pixels of the buffer, which
    /// is interpreted in `format` byte order. Both the CPU backend
    /// (straight into its target pixmap) and the GPU backend (into a
    /// scratch upload buffer) come through here.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text_cpu(
        &mut self,
        buf: &mut [u8],
        stride: usize,
        width: u32,
        height: u32,
        format: PixelFormat,
        pos: Point,
        text: &str,
        color: Color,
    ) {
        let src = color.to_bytes(format);
        let mut pen_x = pos.x as i32;
        let base_y = pos.y as i32;

        for byte in text.bytes() {
            let Some(m) = self.glyph(byte as char) else {
                continue;
            };
            let gw = m.width();
            let gh = m.height();
            for row in 0..gh {
                let py = base_y + m.y0 + row as i32;
                if py < 0 || py >= height as i32 {
                    continue;
                }
                let atlas_row = ((m.ay + row) * self.atlas_w) as usize;
                for col in 0..gw {
                    let px = pen_x + m.x0 + col as i32;
                    if px < 0 || px >= width as i32 {
                        continue;
                    }
                    let coverage = self.atlas[atlas_row + (m.ax + col) as usize];
                    if coverage == 0 {
                        continue;
                    }
                    let alpha = (u32::from(coverage) * u32::from(color.a)) / 255;
                    let i = py as usize * stride + px as usize * 4;
                    let dst = &mut buf[i..i + 4];
                    let inv = 255 - alpha;
                    for c in 0..3 {
                        dst[c] = ((u32::from(src[c]) * alpha + u32::from(dst[c]) * inv) / 255) as u8;
                    }
                    dst[3] = (alpha + u32::from(dst[3]) * inv / 255).min(255) as u8;
                }
            }
            pen_x += m.advance;
        }
    }
}
