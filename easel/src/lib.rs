// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A lightweight retained-style 2D rendering library.
//!
//! Easel exposes a "record, sort, execute" pipeline: drawing commands
//! issued against a [`Canvas`] are compiled into a compact
//! [`Recording`]; a [`DrawPass`] reorders the recording to minimize
//! backend state changes; a backend (software rasterizer or
//! device-abstract GPU renderer) replays the pass onto a target.
//! Surfaces produce immutable [`Image`] snapshots that feed back into
//! other surfaces, which is how multi-layer compositing works.
//!
//! # Usage
//!
//! ```
//! use easel::{Color, PixelFormat, Rect, Surface};
//!
//! let mut surface = Surface::make_raster(64, 64, PixelFormat::Bgra8888).unwrap();
//! surface.begin_frame(Color::BLACK);
//! let canvas = surface.canvas();
//! canvas.fill_rect(Rect::new(8.0, 8.0, 48.0, 48.0), Color::rgb(255, 0, 0));
//! canvas.clip_rect(Rect::new(0.0, 0.0, 32.0, 32.0));
//! canvas.fill_rect(Rect::new(0.0, 0.0, 64.0, 64.0), Color::rgba(0, 255, 0, 128));
//! surface.end_frame();
//! surface.flush();
//!
//! let snapshot = surface.make_snapshot().unwrap();
//! assert_eq!(snapshot.width(), 64);
//! ```
//!
//! # Features
//!
//! - `gpu` (enabled by default): the device-abstract hardware backend.
//!   Concrete GL/Vulkan/Metal device bindings are implemented outside
//!   this crate against [`easel_gpu::GpuDevice`].
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod surface;

pub use easel_common::arena::OpArena;
pub use easel_common::canvas::Canvas;
pub use easel_common::color::{Color, PixelFormat};
pub use easel_common::draw_pass::DrawPass;
pub use easel_common::geometry::{Point, Rect};
pub use easel_common::glyph::{AtlasError, GlyphAtlas, GlyphMetrics, SharedGlyphAtlas};
pub use easel_common::image::Image;
pub use easel_common::pixmap::{PixelData, Pixmap, PixmapInfo};
pub use easel_common::recording::{DrawOp, DrawVisitor, OpKind, Recorder, Recording};
pub use easel_cpu::CpuRenderer;
#[cfg(feature = "gpu")]
pub use easel_gpu;
#[cfg(feature = "gpu")]
pub use easel_gpu::{GpuDevice, GpuError, GpuRenderer};
pub use surface::Surface;
