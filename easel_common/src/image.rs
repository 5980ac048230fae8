// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable image snapshots.
//!
//! An [`Image`] is what flows between surfaces: a surface snapshot can
//! be drawn onto any other surface via `draw_image`, which is the
//! mechanism for multi-layer compositing. Images are shared by
//! reference counting and never mutate after construction.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::color::PixelFormat;
use crate::pixmap::{Pixmap, PixmapInfo};

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque value whose last drop releases a GPU resource.
///
/// GPU-backed images hold one of these; the concrete type lives in the
/// GPU crate and carries a deferred-release handle for the texture.
pub type ReleaseGuard = Arc<dyn Any + Send + Sync>;

#[derive(Debug)]
enum Storage {
    /// Pixels owned by the image.
    Cpu(Pixmap<'static>),
    /// An opaque device texture, kept alive by the guard.
    Gpu { handle: u64, _release: ReleaseGuard },
}

/// An immutable, reference-counted snapshot of pixel data.
///
/// The storage is either CPU pixels or an opaque GPU texture handle;
/// `unique_id` identifies the image for the lifetime of the process
/// and keys the GPU texture cache.
#[derive(Debug)]
pub struct Image {
    id: u64,
    info: PixmapInfo,
    storage: Storage,
}

impl Image {
    /// Create an image by deep-copying pixels out of a pixmap.
    ///
    /// Returns `None` for invalid sources.
    pub fn from_pixmap(src: &Pixmap<'_>) -> Option<Arc<Self>> {
        if !src.valid() {
            return None;
        }
        let mut copy = Pixmap::alloc(src.info())?;
        for y in 0..src.height() {
            copy.row_mut(y).copy_from_slice(src.row(y));
        }
        Self::from_owned(copy)
    }

    /// Create an image by adopting an owned pixmap without copying.
    ///
    /// This is the zero-copy construction path; the pixmap is moved in
    /// and must never be written again, which the move enforces.
    pub fn from_owned(pixmap: Pixmap<'static>) -> Option<Arc<Self>> {
        if !pixmap.valid() {
            return None;
        }
        let info = pixmap.info();
        Some(Arc::new(Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            info,
            storage: Storage::Cpu(pixmap),
        }))
    }

    /// Create an image around a device texture handle.
    ///
    /// The `release` guard keeps the texture alive: when the last
    /// holder drops, the texture is returned to its device.
    pub fn from_gpu_texture(
        handle: u64,
        width: u32,
        height: u32,
        format: PixelFormat,
        release: ReleaseGuard,
    ) -> Option<Arc<Self>> {
        if handle == 0 || width == 0 || height == 0 {
            return None;
        }
        Some(Arc::new(Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            info: PixmapInfo::make(width, height, format),
            storage: Storage::Gpu {
                handle,
                _release: release,
            },
        }))
    }

    /// Process-unique, monotonically increasing identity.
    pub fn unique_id(&self) -> u64 {
        self.id
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Pixel format of the storage.
    pub fn format(&self) -> PixelFormat {
        self.info.format
    }

    /// Dimensions, stride and format.
    pub fn info(&self) -> PixmapInfo {
        self.info
    }

    /// Whether the image has usable storage.
    pub fn valid(&self) -> bool {
        if self.info.width == 0 || self.info.height == 0 {
            return false;
        }
        match &self.storage {
            Storage::Cpu(pm) => pm.valid(),
            Storage::Gpu { handle, .. } => *handle != 0,
        }
    }

    /// Whether the pixels live in CPU memory.
    pub fn is_cpu_backed(&self) -> bool {
        matches!(self.storage, Storage::Cpu(_))
    }

    /// Whether the image wraps a device texture.
    pub fn is_gpu_backed(&self) -> bool {
        matches!(self.storage, Storage::Gpu { .. })
    }

    /// The CPU pixels, if this is a CPU-backed image.
    pub fn pixels(&self) -> Option<&Pixmap<'static>> {
        match &self.storage {
            Storage::Cpu(pm) => Some(pm),
            Storage::Gpu { .. } => None,
        }
    }

    /// The device texture handle, or 0 for CPU-backed images.
    pub fn gpu_handle(&self) -> u64 {
        match &self.storage {
            Storage::Cpu(_) => 0,
            Storage::Gpu { handle, .. } => *handle,
        }
    }
}
