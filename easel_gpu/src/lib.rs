// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device-abstract hardware backend for easel.
//!
//! The renderer batches a sorted recording into a handful of draws —
//! one shared color pipeline for geometry, a texture pipeline for
//! text and image quads — and drives them through the small
//! [`GpuDevice`] trait. Concrete GL/Vulkan/Metal bindings implement
//! that trait outside this repository; tests exercise the renderer
//! with a recording mock device.
//!
//! CPU-sourced images are uploaded once and cached by image identity
//! in a [`TextureCache`]; surface snapshots come back as GPU-backed
//! [`Image`](easel_common::image::Image)s whose textures are released
//! when the last reference drops.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod device;
mod release;
mod renderer;
mod texture_cache;

pub use device::{
    BufferId, ColorVertex, FramebufferId, GpuDevice, GpuError, PipelineId, TexVertex,
    TextureFormat, TextureId, VertexLayout,
};
pub use release::ReleaseToken;
pub use renderer::GpuRenderer;
pub use texture_cache::TextureCache;
