// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The batching renderer.
//!
//! Replays a sorted recording against a [`GpuDevice`], accumulating
//! vertices CPU-side and flushing them in as few draws as possible.
//! Color geometry (fills, strokes, lines, polylines) shares one
//! pipeline and batches across op kinds; text and images bind
//! textures, so each forces a flush around its own quad; clip changes
//! flush before touching the scissor. The draw pass has already
//! ordered ops to keep those flush points rare.

use std::sync::{Arc, Mutex};

use bytemuck::cast_slice;

use easel_common::color::{Color, PixelFormat};
use easel_common::draw_pass::DrawPass;
use easel_common::geometry::{Point, Rect};
use easel_common::glyph::SharedGlyphAtlas;
use easel_common::image::Image;
use easel_common::recording::{DrawVisitor, Recording};

use crate::device::{
    BufferId, ColorVertex, FramebufferId, GpuDevice, GpuError, PipelineId, TexVertex,
    TextureFormat, TextureId, VertexLayout,
};
use crate::release::{ReleaseQueue, ReleaseToken};
use crate::texture_cache::TextureCache;

const COLOR_VERT_SRC: &str = include_str!("../shaders/color.vert");
const COLOR_FRAG_SRC: &str = include_str!("../shaders/color.frag");
const TEXTURE_VERT_SRC: &str = include_str!("../shaders/texture.vert");
const TEXTURE_FRAG_SRC: &str = include_str!("../shaders/texture.frag");

/// Column-major orthographic projection mapping target pixels
/// (top-left origin) to normalized device coordinates, Y flipped.
fn ortho_projection(width: f32, height: f32) -> [f32; 16] {
    let mut m = [0.0; 16];
    m[0] = 2.0 / width;
    m[5] = -2.0 / height;
    m[10] = -1.0;
    m[12] = -1.0;
    m[13] = 1.0;
    m[15] = 1.0;
    m
}

/// Half-width perpendicular of the segment `p1 -> p2`, or `None` for
/// segments too short to orient.
fn line_normal(p1: Point, p2: Point, width: f32) -> Option<(f32, f32)> {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-4 {
        return None;
    }
    let hw = width * 0.5;
    Some((-dy / len * hw, dx / len * hw))
}

#[derive(Debug, Clone, Copy)]
enum Target {
    /// Offscreen framebuffer owned by the renderer.
    Offscreen {
        fbo: FramebufferId,
        color: TextureId,
    },
    /// The window/default framebuffer; the host owns its storage.
    Default,
}

impl Target {
    fn fbo(&self) -> Option<FramebufferId> {
        match self {
            Target::Offscreen { fbo, .. } => Some(*fbo),
            Target::Default => None,
        }
    }
}

/// Hardware rasterization backend over an abstract [`GpuDevice`].
#[derive(Debug)]
pub struct GpuRenderer<D: GpuDevice> {
    device: D,
    width: u32,
    height: u32,
    target: Target,

    color_pipeline: PipelineId,
    texture_pipeline: PipelineId,
    color_buffer: BufferId,
    texture_buffer: BufferId,
    color_verts: Vec<ColorVertex>,
    tex_verts: Vec<TexVertex>,

    /// Scratch texture re-used for per-run text uploads.
    temp_texture: TextureId,
    texture_cache: TextureCache,
    atlas: Option<SharedGlyphAtlas>,
    releases: ReleaseQueue,
    warned_missing_atlas: bool,
}

impl<D: GpuDevice> GpuRenderer<D> {
    /// Create a renderer with its own offscreen color target.
    pub fn new(device: D, width: u32, height: u32) -> Result<Self, GpuError> {
        Self::with_target(device, width, height, false)
    }

    /// Create a renderer that draws into the default (window)
    /// framebuffer. `resize` then only tracks dimensions.
    pub fn new_for_default_target(device: D, width: u32, height: u32) -> Result<Self, GpuError> {
        Self::with_target(device, width, height, true)
    }

    fn with_target(
        mut device: D,
        width: u32,
        height: u32,
        default_target: bool,
    ) -> Result<Self, GpuError> {
        let color_pipeline =
            device.compile_pipeline(VertexLayout::Color, COLOR_VERT_SRC, COLOR_FRAG_SRC)?;
        let texture_pipeline =
            device.compile_pipeline(VertexLayout::Texture, TEXTURE_VERT_SRC, TEXTURE_FRAG_SRC)?;
        let color_buffer = device.create_vertex_buffer();
        let texture_buffer = device.create_vertex_buffer();
        let temp_texture = device.create_texture(1, 1, TextureFormat::Rgba8, None)?;
        let target = if default_target {
            Target::Default
        } else {
            match device.create_framebuffer(width, height) {
                Ok((fbo, color)) => Target::Offscreen { fbo, color },
                Err(err) => {
                    device.delete_texture(temp_texture);
                    return Err(err);
                }
            }
        };

        Ok(Self {
            device,
            width,
            height,
            target,
            color_pipeline,
            texture_pipeline,
            color_buffer,
            texture_buffer,
            color_verts: Vec::new(),
            tex_verts: Vec::new(),
            temp_texture,
            texture_cache: TextureCache::new(),
            atlas: None,
            releases: Arc::new(Mutex::new(Vec::new())),
            warned_missing_atlas: false,
        })
    }

    /// Target width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Target height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The underlying device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The underlying device, mutable.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The offscreen color attachment, if not rendering to the
    /// default framebuffer.
    pub fn target_texture(&self) -> Option<TextureId> {
        match self.target {
            Target::Offscreen { color, .. } => Some(color),
            Target::Default => None,
        }
    }

    /// Number of textures held by the image cache.
    pub fn cached_texture_count(&self) -> usize {
        self.texture_cache.len()
    }

    /// Install (or remove) the glyph atlas used by text ops.
    pub fn set_glyph_atlas(&mut self, atlas: Option<SharedGlyphAtlas>) {
        self.atlas = atlas;
    }

    /// Bind the target, reset per-frame state, and clear to
    /// `clear_color`. Blending stays enabled for the whole frame.
    pub fn begin_frame(&mut self, clear_color: Color) {
        self.drain_releases();
        self.color_verts.clear();
        self.tex_verts.clear();
        self.warned_missing_atlas = false;

        self.device.bind_framebuffer(self.target.fbo());
        self.device.set_viewport(self.width, self.height);
        self.device.set_blending(true);
        self.device.enable_scissor(false);
        self.device.clear(clear_color);
    }

    /// Flush pending batches and the device pipeline.
    pub fn end_frame(&mut self) {
        self.flush_color_batch();
        self.device.flush();
        self.drain_releases();
    }

    /// Re-create target storage at a new size. Offscreen contents are
    /// discarded; for the default target only the viewport dimensions
    /// change.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        if let Target::Offscreen { fbo, color } = self.target {
            self.device.destroy_framebuffer(fbo);
            self.device.delete_texture(color);
            match self.device.create_framebuffer(width, height) {
                Ok((fbo, color)) => self.target = Target::Offscreen { fbo, color },
                Err(err) => {
                    // Keep dimensions; the next frame renders nowhere
                    // rather than into a stale attachment.
                    log::warn!("framebuffer resize failed: {err}");
                    self.target = Target::Default;
                }
            }
        }
    }

    /// Replay `recording` in the order chosen by `pass`.
    pub fn execute(&mut self, recording: &Recording, pass: &DrawPass) {
        recording.dispatch(self, pass);
        self.flush_color_batch();
    }

    /// Blit the current target into a fresh texture and wrap it as an
    /// immutable GPU-backed image. The texture is released when the
    /// last image reference drops.
    pub fn make_snapshot(&mut self) -> Option<Arc<Image>> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let (snap_fbo, snap_tex) = match self.device.create_framebuffer(self.width, self.height) {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("snapshot failed: {err}");
                return None;
            }
        };
        self.device
            .blit(self.target.fbo(), Some(snap_fbo), self.width, self.height);
        self.device.destroy_framebuffer(snap_fbo);
        self.device.bind_framebuffer(self.target.fbo());

        let token = ReleaseToken::new(snap_tex, &self.releases);
        Image::from_gpu_texture(
            snap_tex.0,
            self.width,
            self.height,
            PixelFormat::Rgba8888,
            Arc::new(token),
        )
    }

    /// Read back the target's RGBA8 pixels into `out`
    /// (`4 * width * height` bytes). Rows are bottom-up when
    /// [`origin_flipped`](Self::origin_flipped) reports a GL-family
    /// device, top-down otherwise; the snapshot path is always
    /// top-down.
    pub fn read_pixels(&mut self, out: &mut [u8]) {
        self.device.bind_framebuffer(self.target.fbo());
        self.device.read_pixels(0, 0, self.width, self.height, out);
    }

    /// Whether readbacks arrive bottom-up.
    pub fn origin_flipped(&self) -> bool {
        self.device.origin_flipped()
    }

    fn drain_releases(&mut self) {
        let pending: Vec<TextureId> = match self.releases.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => return,
        };
        for texture in pending {
            self.device.delete_texture(texture);
        }
    }

    fn flush_color_batch(&mut self) {
        if self.color_verts.is_empty() {
            return;
        }
        self.device
            .upload_buffer(self.color_buffer, cast_slice(&self.color_verts));
        self.device.bind_pipeline(self.color_pipeline);
        self.device.bind_vertex_buffer(self.color_buffer);
        self.device
            .set_projection(&ortho_projection(self.width as f32, self.height as f32));
        self.device.draw_triangles(0, self.color_verts.len() as u32);
        self.color_verts.clear();
    }

    fn flush_texture_batch(&mut self, texture: TextureId) {
        if self.tex_verts.is_empty() {
            return;
        }
        self.device
            .upload_buffer(self.texture_buffer, cast_slice(&self.tex_verts));
        self.device.bind_pipeline(self.texture_pipeline);
        self.device.bind_vertex_buffer(self.texture_buffer);
        self.device
            .set_projection(&ortho_projection(self.width as f32, self.height as f32));
        self.device.bind_texture(0, texture);
        self.device.draw_triangles(0, self.tex_verts.len() as u32);
        self.tex_verts.clear();
    }

    /// Push an axis-aligned quad as two triangles.
    fn push_quad(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Color) {
        let (r, g, b, a) = (
            f32::from(color.r) / 255.0,
            f32::from(color.g) / 255.0,
            f32::from(color.b) / 255.0,
            f32::from(color.a) / 255.0,
        );
        let v = |x, y| ColorVertex { x, y, r, g, b, a };
        self.color_verts.extend_from_slice(&[
            v(x0, y0),
            v(x1, y0),
            v(x0, y1),
            v(x1, y0),
            v(x1, y1),
            v(x0, y1),
        ]);
    }

    /// Expand a segment into a quad along its perpendicular normal.
    fn push_line(&mut self, p1: Point, p2: Point, color: Color, width: f32) {
        let Some((nx, ny)) = line_normal(p1, p2, width) else {
            return;
        };
        let (r, g, b, a) = (
            f32::from(color.r) / 255.0,
            f32::from(color.g) / 255.0,
            f32::from(color.b) / 255.0,
            f32::from(color.a) / 255.0,
        );
        let v = |x, y| ColorVertex { x, y, r, g, b, a };
        let v0 = v(p1.x + nx, p1.y + ny);
        let v1 = v(p1.x - nx, p1.y - ny);
        let v2 = v(p2.x + nx, p2.y + ny);
        let v3 = v(p2.x - nx, p2.y - ny);
        self.color_verts.extend_from_slice(&[v0, v1, v2, v1, v3, v2]);
    }

    /// Push a textured quad covering `[u0,v0]..[u1,v1]`.
    fn push_tex_quad(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        u0: f32,
        v0: f32,
        u1: f32,
        v1: f32,
    ) {
        let v = |x, y, u, vv| TexVertex { x, y, u, v: vv };
        self.tex_verts.extend_from_slice(&[
            v(x0, y0, u0, v0),
            v(x1, y0, u1, v0),
            v(x0, y1, u0, v1),
            v(x1, y0, u1, v0),
            v(x1, y1, u1, v1),
            v(x0, y1, u0, v1),
        ]);
    }
}

impl<D: GpuDevice> DrawVisitor for GpuRenderer<D> {
    fn visit_fill_rect(&mut self, rect: Rect, color: Color) {
        self.push_quad(rect.x, rect.y, rect.right(), rect.bottom(), color);
    }

    fn visit_stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        let w = if width > 0.0 { width } else { 1.0 };
        // Four thin quads; corners overlap by one stroke width.
        self.push_quad(rect.x, rect.y, rect.right(), rect.y + w, color);
        self.push_quad(rect.x, rect.bottom() - w, rect.right(), rect.bottom(), color);
        self.push_quad(rect.x, rect.y + w, rect.x + w, rect.bottom() - w, color);
        self.push_quad(rect.right() - w, rect.y + w, rect.right(), rect.bottom() - w, color);
    }

    fn visit_line(&mut self, p1: Point, p2: Point, color: Color, width: f32) {
        let w = if width > 0.0 { width } else { 1.0 };
        self.push_line(p1, p2, color, w);
    }

    fn visit_polyline(&mut self, pts: &[Point], color: Color, width: f32) {
        let w = if width > 0.0 { width } else { 1.0 };
        // Segments only; caps and joins are not rendered.
        for pair in pts.windows(2) {
            self.push_line(pair[0], pair[1], color, w);
        }
    }

    fn visit_text(&mut self, pos: Point, text: &str, color: Color) {
        self.flush_color_batch();
        let Some(atlas) = self.atlas.clone() else {
            if !self.warned_missing_atlas {
                log::warn!("text op skipped: no glyph atlas installed");
                self.warned_missing_atlas = true;
            }
            return;
        };
        let mut atlas = match atlas.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let text_w = atlas.measure_text(text);
        let line_h = atlas.line_height();
        let ascent = atlas.ascent();
        if text_w <= 0 || line_h <= 0 {
            return;
        }
        let (w, h) = (text_w as u32, line_h as u32);

        // Rasterize the run into a scratch RGBA buffer with the
        // baseline at `ascent`, upload it, and draw one quad whose top
        // sits at `baseline - ascent` so both backends agree on where
        // text lands.
        let mut buf = vec![0_u8; w as usize * h as usize * 4];
        atlas.draw_text_cpu(
            &mut buf,
            w as usize * 4,
            w,
            h,
            PixelFormat::Rgba8888,
            Point::new(0.0, ascent as f32),
            text,
            color,
        );
        drop(atlas);

        self.device
            .update_texture(self.temp_texture, w, h, TextureFormat::Rgba8, &buf);
        let x = pos.x;
        let y = pos.y - ascent as f32;
        self.push_tex_quad(x, y, x + w as f32, y + h as f32, 0.0, 0.0, 1.0, 1.0);
        self.flush_texture_batch(self.temp_texture);
    }

    fn visit_draw_image(&mut self, image: &Arc<Image>, x: f32, y: f32) {
        self.flush_color_batch();
        if !image.valid() {
            return;
        }
        let texture = if image.is_gpu_backed() {
            TextureId(image.gpu_handle())
        } else {
            match self.texture_cache.resolve(&mut self.device, image) {
                Some(texture) => texture,
                // Upload failed: skip the op, destination unchanged.
                None => return,
            }
        };
        let (w, h) = (image.width() as f32, image.height() as f32);
        self.push_tex_quad(x, y, x + w, y + h, 0.0, 0.0, 1.0, 1.0);
        self.flush_texture_batch(texture);
    }

    fn visit_set_clip(&mut self, rect: Rect) {
        self.flush_color_batch();
        let w = rect.w.max(0.0) as u32;
        let h = rect.h.max(0.0) as u32;
        // Top-left rect to the device's scissor origin convention.
        let y = if self.device.origin_flipped() {
            self.height as i32 - (rect.y + rect.h) as i32
        } else {
            rect.y as i32
        };
        self.device.enable_scissor(true);
        self.device.set_scissor(rect.x as i32, y, w, h);
    }

    fn visit_clear_clip(&mut self) {
        self.flush_color_batch();
        self.device.enable_scissor(false);
    }
}

impl<D: GpuDevice> Drop for GpuRenderer<D> {
    fn drop(&mut self) {
        self.drain_releases();
        self.texture_cache.release_all(&mut self.device);
        self.device.delete_texture(self.temp_texture);
        if let Target::Offscreen { fbo, color } = self.target {
            self.device.destroy_framebuffer(fbo);
            self.device.delete_texture(color);
        }
    }
}
