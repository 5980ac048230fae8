// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The boundary between the batching renderer and a graphics API.
//!
//! [`GpuDevice`] is the minimal surface a platform binding (GL,
//! Vulkan, Metal, a test double) must expose. The renderer drives it
//! with already-batched work: whole vertex buffers, one projection
//! per flush, one texture bind per textured batch. Concrete
//! implementations live outside this repository; the contract here is
//! what keeps them small.
//!
//! A device is assumed to be *current* on the calling thread for the
//! duration of every call; establishing currentness is the caller's
//! responsibility.

use bytemuck::{Pod, Zeroable};
use easel_common::color::Color;
use thiserror::Error;

/// Errors surfaced by a device implementation.
#[derive(Debug, Error)]
pub enum GpuError {
    /// A shader pair failed to compile or link.
    #[error("pipeline failed to link: {0}")]
    PipelineLink(String),
    /// Texture storage could not be allocated.
    #[error("failed to allocate a {width}x{height} texture")]
    TextureAlloc {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// Framebuffer storage could not be allocated or completed.
    #[error("failed to create a {width}x{height} framebuffer")]
    FramebufferIncomplete {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
}

/// Handle to a device texture. Zero is never a live texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Handle to a framebuffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// Handle to a compiled pipeline (shader pair plus vertex layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(pub u32);

/// Handle to a dynamic vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Vertex stream layout of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexLayout {
    /// `ColorVertex`: 2D position plus RGBA color, stride 24.
    Color,
    /// `TexVertex`: 2D position plus UV, stride 16.
    Texture,
}

/// Byte order of texture uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// `[r, g, b, a]` bytes.
    Rgba8,
    /// `[b, g, r, a]` bytes.
    Bgra8,
}

/// A vertex of the color pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    /// X position in target pixels.
    pub x: f32,
    /// Y position in target pixels.
    pub y: f32,
    /// Red, normalized.
    pub r: f32,
    /// Green, normalized.
    pub g: f32,
    /// Blue, normalized.
    pub b: f32,
    /// Alpha, normalized.
    pub a: f32,
}

/// A vertex of the texture pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TexVertex {
    /// X position in target pixels.
    pub x: f32,
    /// Y position in target pixels.
    pub y: f32,
    /// Horizontal texture coordinate.
    pub u: f32,
    /// Vertical texture coordinate.
    pub v: f32,
}

/// Minimal graphics-API surface the batching renderer drives.
///
/// Resource notes: `destroy_framebuffer` releases the framebuffer
/// object only — color attachments are released separately with
/// [`delete_texture`](Self::delete_texture). Pipelines and vertex
/// buffers live for the device lifetime; they are few and fixed.
pub trait GpuDevice {
    /// Create an offscreen framebuffer with a color attachment of the
    /// given size, returning both handles.
    fn create_framebuffer(&mut self, width: u32, height: u32)
    -> Result<(FramebufferId, TextureId), GpuError>;

    /// Destroy a framebuffer object (not its attachments).
    fn destroy_framebuffer(&mut self, fbo: FramebufferId);

    /// Compile and link a pipeline from vertex/fragment source.
    fn compile_pipeline(
        &mut self,
        layout: VertexLayout,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<PipelineId, GpuError>;

    /// Create a dynamic vertex buffer.
    fn create_vertex_buffer(&mut self) -> BufferId;

    /// Replace the contents of a vertex buffer.
    fn upload_buffer(&mut self, buffer: BufferId, bytes: &[u8]);

    /// Bind a framebuffer as the render target; `None` binds the
    /// default (window) framebuffer.
    fn bind_framebuffer(&mut self, fbo: Option<FramebufferId>);

    /// Bind a pipeline for subsequent draws.
    fn bind_pipeline(&mut self, pipeline: PipelineId);

    /// Bind the vertex buffer feeding the bound pipeline.
    fn bind_vertex_buffer(&mut self, buffer: BufferId);

    /// Bind a texture to a sampler slot.
    fn bind_texture(&mut self, slot: u32, texture: TextureId);

    /// Set the projection uniform of the bound pipeline
    /// (column-major 4x4).
    fn set_projection(&mut self, matrix: &[f32; 16]);

    /// Draw `count` vertices as a triangle list starting at `first`.
    fn draw_triangles(&mut self, first: u32, count: u32);

    /// Enable or disable scissor testing.
    fn enable_scissor(&mut self, enabled: bool);

    /// Set the scissor rectangle. The origin convention follows
    /// [`origin_flipped`](Self::origin_flipped); the renderer performs
    /// the flip before calling.
    fn set_scissor(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Create a texture, optionally uploading initial pixels (tightly
    /// packed rows). Sampling is nearest with clamp-to-edge wrapping.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: Option<&[u8]>,
    ) -> Result<TextureId, GpuError>;

    /// Replace a texture's storage and contents (tightly packed rows).
    fn update_texture(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: &[u8],
    );

    /// Release a texture.
    fn delete_texture(&mut self, texture: TextureId);

    /// Copy the full color contents of `src` into `dst` (`None` is
    /// the default framebuffer on either side).
    fn blit(&mut self, src: Option<FramebufferId>, dst: Option<FramebufferId>, width: u32, height: u32);

    /// Read back RGBA8 pixels from the bound framebuffer. Row order
    /// follows [`origin_flipped`](Self::origin_flipped): bottom-up for
    /// GL-family devices, top-down otherwise.
    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32, out: &mut [u8]);

    /// Set the viewport to cover a `width`x`height` target.
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Fill the bound framebuffer with a color.
    fn clear(&mut self, color: Color);

    /// Enable or disable `SRC_ALPHA / ONE_MINUS_SRC_ALPHA` blending.
    /// Depth testing and culling stay off throughout.
    fn set_blending(&mut self, enabled: bool);

    /// Flush pending device work.
    fn flush(&mut self);

    /// Whether the device's window-space origin is bottom-left
    /// (GL family) rather than top-left. Governs scissor placement
    /// and readback row order.
    fn origin_flipped(&self) -> bool;
}

impl<D: GpuDevice + ?Sized> GpuDevice for Box<D> {
    fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<(FramebufferId, TextureId), GpuError> {
        (**self).create_framebuffer(width, height)
    }

    fn destroy_framebuffer(&mut self, fbo: FramebufferId) {
        (**self).destroy_framebuffer(fbo);
    }

    fn compile_pipeline(
        &mut self,
        layout: VertexLayout,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<PipelineId, GpuError> {
        (**self).compile_pipeline(layout, vertex_src, fragment_src)
    }

    fn create_vertex_buffer(&mut self) -> BufferId {
        (**self).create_vertex_buffer()
    }

    fn upload_buffer(&mut self, buffer: BufferId, bytes: &[u8]) {
        (**self).upload_buffer(buffer, bytes);
    }

    fn bind_framebuffer(&mut self, fbo: Option<FramebufferId>) {
        (**self).bind_framebuffer(fbo);
    }

    fn bind_pipeline(&mut self, pipeline: PipelineId) {
        (**self).bind_pipeline(pipeline);
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId) {
        (**self).bind_vertex_buffer(buffer);
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) {
        (**self).bind_texture(slot, texture);
    }

    fn set_projection(&mut self, matrix: &[f32; 16]) {
        (**self).set_projection(matrix);
    }

    fn draw_triangles(&mut self, first: u32, count: u32) {
        (**self).draw_triangles(first, count);
    }

    fn enable_scissor(&mut self, enabled: bool) {
        (**self).enable_scissor(enabled);
    }

    fn set_scissor(&mut self, x: i32, y: i32, width: u32, height: u32) {
        (**self).set_scissor(x, y, width, height);
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: Option<&[u8]>,
    ) -> Result<TextureId, GpuError> {
        (**self).create_texture(width, height, format, pixels)
    }

    fn update_texture(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: &[u8],
    ) {
        (**self).update_texture(texture, width, height, format, pixels);
    }

    fn delete_texture(&mut self, texture: TextureId) {
        (**self).delete_texture(texture);
    }

    fn blit(
        &mut self,
        src: Option<FramebufferId>,
        dst: Option<FramebufferId>,
        width: u32,
        height: u32,
    ) {
        (**self).blit(src, dst, width, height);
    }

    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32, out: &mut [u8]) {
        (**self).read_pixels(x, y, width, height, out);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        (**self).set_viewport(width, height);
    }

    fn clear(&mut self, color: Color) {
        (**self).clear(color);
    }

    fn set_blending(&mut self, enabled: bool) {
        (**self).set_blending(enabled);
    }

    fn flush(&mut self) {
        (**self).flush();
    }

    fn origin_flipped(&self) -> bool {
        (**self).origin_flipped()
    }
}
