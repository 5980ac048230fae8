// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU-image-to-texture cache.
//!
//! Keyed by [`Image::unique_id`], so re-drawing the same snapshot
//! frame after frame uploads once. There is no eviction: the cache is
//! scoped to its renderer's lifetime and the CPU images that appear in
//! compositing are small and few.

use std::collections::HashMap;

use easel_common::color::PixelFormat;
use easel_common::image::Image;

use crate::device::{GpuDevice, TextureFormat, TextureId};

/// Maps CPU image identity to an uploaded device texture.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: HashMap<u64, TextureId>,
}

impl TextureCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached textures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The cached texture for an image, if present.
    pub fn get(&self, image: &Image) -> Option<TextureId> {
        self.entries.get(&image.unique_id()).copied()
    }

    /// Resolve a CPU-backed image to a device texture, uploading on
    /// first use. Returns `None` when the image has no CPU pixels or
    /// the device cannot allocate the texture (the caller skips the
    /// draw, leaving the destination unchanged).
    pub fn resolve<D: GpuDevice>(&mut self, device: &mut D, image: &Image) -> Option<TextureId> {
        if let Some(&texture) = self.entries.get(&image.unique_id()) {
            return Some(texture);
        }

        let pixmap = image.pixels()?;
        let format = match image.format() {
            PixelFormat::Rgba8888 => TextureFormat::Rgba8,
            PixelFormat::Bgra8888 => TextureFormat::Bgra8,
        };

        // Uploads want tightly packed rows; strided pixmaps are
        // repacked on the way up.
        let width = image.width();
        let height = image.height();
        let tight = width as usize * 4;
        let packed;
        let bytes: &[u8] = if pixmap.stride() == tight {
            pixmap.data()
        } else {
            let mut buf = Vec::with_capacity(tight * height as usize);
            for y in 0..height {
                buf.extend_from_slice(pixmap.row(y));
            }
            packed = buf;
            &packed
        };

        match device.create_texture(width, height, format, Some(bytes)) {
            Ok(texture) => {
                self.entries.insert(image.unique_id(), texture);
                Some(texture)
            }
            Err(err) => {
                log::warn!("image {} upload failed: {err}", image.unique_id());
                None
            }
        }
    }

    /// Delete every cached texture. Called when the owning renderer
    /// is dropped.
    pub fn release_all<D: GpuDevice>(&mut self, device: &mut D) {
        for (_, texture) in self.entries.drain() {
            device.delete_texture(texture);
        }
    }
}
