// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surfaces: a render target, its canvas, and its backend.

use std::sync::Arc;

use easel_common::canvas::Canvas;
use easel_common::color::{Color, PixelFormat};
use easel_common::draw_pass::DrawPass;
use easel_common::glyph::SharedGlyphAtlas;
use easel_common::image::Image;
use easel_common::pixmap::{PixelData, Pixmap, PixmapInfo};
use easel_common::recording::Recording;
use easel_cpu::CpuRenderer;
#[cfg(feature = "gpu")]
use easel_gpu::{GpuDevice, GpuRenderer};

enum SurfaceBackend<'a> {
    /// Software rasterization into an owned or borrowed pixmap.
    Raster(CpuRenderer<'a>),
    /// Hardware rasterization through an abstract device.
    #[cfg(feature = "gpu")]
    Gpu(GpuRenderer<Box<dyn GpuDevice>>),
    /// No backend; commands are captured only.
    Recording { width: u32, height: u32 },
}

/// A drawing destination: owns a target, a [`Canvas`] recording into
/// it, and the backend that executes recordings.
///
/// Frame lifecycle: [`begin_frame`](Self::begin_frame) → draw through
/// [`canvas`](Self::canvas) → [`end_frame`](Self::end_frame) →
/// [`flush`](Self::flush), optionally followed by
/// [`make_snapshot`](Self::make_snapshot) to feed the result into
/// another surface.
pub struct Surface<'a> {
    canvas: Canvas,
    backend: SurfaceBackend<'a>,
    recording: Option<Recording>,
}

impl std::fmt::Debug for Surface<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            SurfaceBackend::Raster(_) => "raster",
            #[cfg(feature = "gpu")]
            SurfaceBackend::Gpu(_) => "gpu",
            SurfaceBackend::Recording { .. } => "recording",
        };
        f.debug_struct("Surface")
            .field("backend", &backend)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl Surface<'static> {
    /// A CPU surface with an owned pixel buffer.
    ///
    /// Returns `None` for zero-size dimensions.
    pub fn make_raster(width: u32, height: u32, format: PixelFormat) -> Option<Self> {
        let target = Pixmap::alloc(PixmapInfo::make(width, height, format))?;
        Some(Self::from_backend(SurfaceBackend::Raster(CpuRenderer::new(
            target,
        ))))
    }

    /// The general-purpose surface: today this is a raster surface;
    /// hosts that hold a live GPU device use [`make_gpu`](Self::make_gpu)
    /// instead. Never produces an invalid surface for positive sizes.
    pub fn make_auto(width: u32, height: u32, format: PixelFormat) -> Option<Self> {
        Self::make_raster(width, height, format)
    }

    /// A GPU surface over `device`. Falls back to a CPU raster
    /// surface of the same size when no device is supplied or the
    /// backend fails to build its pipelines.
    #[cfg(feature = "gpu")]
    pub fn make_gpu(
        device: Option<Box<dyn GpuDevice>>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        if let Some(device) = device {
            match GpuRenderer::new(device, width, height) {
                Ok(renderer) => {
                    return Some(Self::from_backend(SurfaceBackend::Gpu(renderer)));
                }
                Err(err) => {
                    log::warn!("gpu surface unavailable ({err}), falling back to raster");
                }
            }
        }
        Self::make_raster(width, height, format)
    }

    /// A surface that only captures commands; see
    /// [`take_recording`](Self::take_recording).
    pub fn make_recording(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self::from_backend(SurfaceBackend::Recording {
            width,
            height,
        }))
    }
}

impl<'a> Surface<'a> {
    /// A CPU surface over caller-owned pixels (zero copy). The buffer
    /// must cover `info.byte_size()` bytes.
    pub fn make_raster_direct(info: PixmapInfo, pixels: &'a mut [u8]) -> Option<Self> {
        let target = Pixmap::wrap(info, pixels)?;
        Some(Self::from_backend(SurfaceBackend::Raster(CpuRenderer::new(
            target,
        ))))
    }

    fn from_backend(backend: SurfaceBackend<'a>) -> Self {
        Self {
            canvas: Canvas::new(),
            backend,
            recording: None,
        }
    }

    /// The canvas to record this surface's frame into.
    pub fn canvas(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Target width in pixels.
    pub fn width(&self) -> u32 {
        match &self.backend {
            SurfaceBackend::Raster(r) => r.target().width(),
            #[cfg(feature = "gpu")]
            SurfaceBackend::Gpu(r) => r.width(),
            SurfaceBackend::Recording { width, .. } => *width,
        }
    }

    /// Target height in pixels.
    pub fn height(&self) -> u32 {
        match &self.backend {
            SurfaceBackend::Raster(r) => r.target().height(),
            #[cfg(feature = "gpu")]
            SurfaceBackend::Gpu(r) => r.height(),
            SurfaceBackend::Recording { height, .. } => *height,
        }
    }

    /// Whether this surface renders through a GPU device.
    pub fn is_gpu(&self) -> bool {
        #[cfg(feature = "gpu")]
        if matches!(self.backend, SurfaceBackend::Gpu(_)) {
            return true;
        }
        false
    }

    /// Install (or remove) the glyph atlas used for text on this
    /// surface.
    pub fn set_glyph_atlas(&mut self, atlas: Option<SharedGlyphAtlas>) {
        match &mut self.backend {
            SurfaceBackend::Raster(r) => r.set_glyph_atlas(atlas),
            #[cfg(feature = "gpu")]
            SurfaceBackend::Gpu(r) => r.set_glyph_atlas(atlas),
            SurfaceBackend::Recording { .. } => {}
        }
    }

    /// Start a frame: reset the canvas and prepare the target filled
    /// with `clear_color` (conventionally [`Color::BLACK`]).
    pub fn begin_frame(&mut self, clear_color: Color) {
        self.canvas.reset();
        self.recording = None;
        match &mut self.backend {
            SurfaceBackend::Raster(r) => r.begin_frame(clear_color),
            #[cfg(feature = "gpu")]
            SurfaceBackend::Gpu(r) => r.begin_frame(clear_color),
            SurfaceBackend::Recording { .. } => {}
        }
    }

    /// Seal the canvas into this surface's pending [`Recording`] and
    /// let the backend finish frame-level work.
    pub fn end_frame(&mut self) {
        self.recording = Some(self.canvas.finish());
        match &mut self.backend {
            SurfaceBackend::Raster(r) => r.end_frame(),
            #[cfg(feature = "gpu")]
            SurfaceBackend::Gpu(r) => r.end_frame(),
            SurfaceBackend::Recording { .. } => {}
        }
    }

    /// Execute the pending recording (sealing the canvas first if
    /// [`end_frame`](Self::end_frame) was skipped). The recording is
    /// consumed; recording-only surfaces keep it for
    /// [`take_recording`](Self::take_recording).
    pub fn flush(&mut self) {
        let recording = match self.recording.take() {
            Some(recording) => recording,
            None => self.canvas.finish(),
        };
        match &mut self.backend {
            SurfaceBackend::Raster(r) => {
                let pass = DrawPass::create(&recording);
                r.execute(&recording, &pass);
                r.end_frame();
            }
            #[cfg(feature = "gpu")]
            SurfaceBackend::Gpu(r) => {
                let pass = DrawPass::create(&recording);
                r.execute(&recording, &pass);
                r.end_frame();
            }
            SurfaceBackend::Recording { .. } => {
                self.recording = Some(recording);
            }
        }
    }

    /// Hand the sealed recording to the caller (sealing the canvas
    /// first if needed). This is how recording surfaces are consumed:
    /// replay the result into another surface's canvas with
    /// [`Recording::accept`].
    pub fn take_recording(&mut self) -> Recording {
        match self.recording.take() {
            Some(recording) => recording,
            None => self.canvas.finish(),
        }
    }

    /// An immutable snapshot of the current target contents.
    ///
    /// CPU surfaces copy pixels; GPU surfaces blit into a fresh
    /// texture. Recording surfaces have no pixels and return `None`.
    pub fn make_snapshot(&mut self) -> Option<Arc<Image>> {
        match &mut self.backend {
            SurfaceBackend::Raster(r) => r.make_snapshot(),
            #[cfg(feature = "gpu")]
            SurfaceBackend::Gpu(r) => r.make_snapshot(),
            SurfaceBackend::Recording { .. } => None,
        }
    }

    /// The target pixmap, for raster surfaces.
    pub fn peek_pixels(&self) -> Option<&Pixmap<'a>> {
        match &self.backend {
            SurfaceBackend::Raster(r) => Some(r.target()),
            _ => None,
        }
    }

    /// The target pixmap, mutable, for raster surfaces.
    pub fn peek_pixels_mut(&mut self) -> Option<&mut Pixmap<'a>> {
        match &mut self.backend {
            SurfaceBackend::Raster(r) => Some(r.target_mut()),
            _ => None,
        }
    }

    /// A non-owning descriptor of the raster target's pixels for host
    /// integration. `None` for GPU and recording surfaces.
    pub fn get_pixel_data(&self) -> Option<PixelData<'_>> {
        match &self.backend {
            SurfaceBackend::Raster(r) => {
                let target = r.target();
                let info = target.info();
                Some(PixelData {
                    data: target.data(),
                    width: info.width,
                    height: info.height,
                    stride: info.stride,
                    format: info.format,
                })
            }
            _ => None,
        }
    }

    /// Re-create target storage at a new size; contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        match &mut self.backend {
            SurfaceBackend::Raster(r) => r.resize(width, height),
            #[cfg(feature = "gpu")]
            SurfaceBackend::Gpu(r) => r.resize(width, height),
            SurfaceBackend::Recording {
                width: w,
                height: h,
            } => {
                *w = width;
                *h = height;
            }
        }
    }
}
