// Copyright 2025 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel buffer descriptor and owning/borrowing pixel buffers.

use crate::color::{Color, PixelFormat};

/// Descriptor for pixel buffer dimensions, stride, and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixmapInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row. At least `4 * width`.
    pub stride: usize,
    /// Pixel format.
    pub format: PixelFormat,
}

impl PixmapInfo {
    /// A tightly packed descriptor (`stride = 4 * width`).
    pub fn make(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            stride: width as usize * format.bytes_per_pixel(),
            format,
        }
    }

    /// A tightly packed RGBA8888 descriptor.
    pub fn make_rgba(width: u32, height: u32) -> Self {
        Self::make(width, height, PixelFormat::Rgba8888)
    }

    /// A tightly packed BGRA8888 descriptor.
    pub fn make_bgra(width: u32, height: u32) -> Self {
        Self::make(width, height, PixelFormat::Bgra8888)
    }

    /// Total byte size of the described buffer.
    pub fn byte_size(&self) -> usize {
        self.stride * self.height as usize
    }

    /// Whether the descriptor describes a usable buffer.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.stride >= self.width as usize * self.format.bytes_per_pixel()
    }
}

#[derive(Debug)]
enum PixelBuf<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a mut [u8]),
}

impl PixelBuf<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            PixelBuf::Owned(v) => v,
            PixelBuf::Borrowed(s) => s,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            PixelBuf::Owned(v) => v,
            PixelBuf::Borrowed(s) => s,
        }
    }
}

/// Owning or borrowing 2D pixel buffer.
///
/// [`Pixmap::alloc`] creates an owned buffer (`Pixmap<'static>`);
/// [`Pixmap::wrap`] borrows caller memory for its lifetime. Pixmaps
/// move, they do not clone: a surface target has exactly one owner.
#[derive(Debug)]
pub struct Pixmap<'a> {
    info: PixmapInfo,
    buf: PixelBuf<'a>,
}

impl Pixmap<'static> {
    /// Allocate a zeroed buffer described by `info`, with a tight stride.
    ///
    /// Returns `None` for zero-size descriptors.
    pub fn alloc(info: PixmapInfo) -> Option<Self> {
        if info.width == 0 || info.height == 0 {
            return None;
        }
        let info = PixmapInfo::make(info.width, info.height, info.format);
        Some(Self {
            buf: PixelBuf::Owned(vec![0; info.byte_size()]),
            info,
        })
    }
}

impl<'a> Pixmap<'a> {
    /// Wrap existing pixel memory. The caller keeps ownership; the
    /// slice must cover at least `info.byte_size()` bytes.
    pub fn wrap(info: PixmapInfo, pixels: &'a mut [u8]) -> Option<Self> {
        if !info.is_valid() || pixels.len() < info.byte_size() {
            return None;
        }
        Some(Self {
            info,
            buf: PixelBuf::Borrowed(pixels),
        })
    }

    /// The descriptor for this buffer.
    pub fn info(&self) -> PixmapInfo {
        self.info
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.info.stride
    }

    /// Pixel format.
    pub fn format(&self) -> PixelFormat {
        self.info.format
    }

    /// Whether the pixmap has usable pixel storage.
    pub fn valid(&self) -> bool {
        self.info.is_valid() && self.buf.bytes().len() >= self.info.byte_size()
    }

    /// All pixel bytes, rows separated by `stride`.
    pub fn data(&self) -> &[u8] {
        self.buf.bytes()
    }

    /// All pixel bytes, mutable.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.buf.bytes_mut()
    }

    /// The pixel bytes of row `y` (exactly `4 * width` bytes, stride
    /// padding excluded).
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.info.stride;
        &self.buf.bytes()[start..start + self.info.width as usize * 4]
    }

    /// The pixel bytes of row `y`, mutable.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.info.stride;
        let width = self.info.width as usize;
        &mut self.buf.bytes_mut()[start..start + width * 4]
    }

    /// Read one pixel, decoded from the pixmap's format.
    pub fn pixel_at(&self, x: u32, y: u32) -> Color {
        let row = self.row(y);
        let i = x as usize * 4;
        Color::from_bytes([row[i], row[i + 1], row[i + 2], row[i + 3]], self.info.format)
    }

    /// Fill every pixel with `color`, packed in the pixmap's format.
    pub fn clear(&mut self, color: Color) {
        let word = color.to_bytes(self.info.format);
        for y in 0..self.info.height {
            for px in self.row_mut(y).chunks_exact_mut(4) {
                px.copy_from_slice(&word);
            }
        }
    }

    /// Drop the current storage and allocate fresh zeroed pixels.
    /// Existing contents are not preserved. A borrowing pixmap becomes
    /// owning.
    pub fn reallocate(&mut self, info: PixmapInfo) {
        let info = PixmapInfo::make(info.width, info.height, info.format);
        self.buf = PixelBuf::Owned(vec![0; info.byte_size()]);
        self.info = info;
    }

    /// Release pixel storage and return to the empty (invalid) state.
    pub fn reset(&mut self) {
        self.info = PixmapInfo::default();
        self.buf = PixelBuf::Owned(Vec::new());
    }

    /// Encode the current contents as an RGBA PNG.
    #[cfg(feature = "png")]
    pub fn to_png(&self) -> Result<Vec<u8>, png::EncodingError> {
        let mut rgba = Vec::with_capacity(self.info.width as usize * self.info.height as usize * 4);
        for y in 0..self.info.height {
            for px in self.row(y).chunks_exact(4) {
                let c = Color::from_bytes([px[0], px[1], px[2], px[3]], self.info.format);
                rgba.extend_from_slice(&[c.r, c.g, c.b, c.a]);
            }
        }
        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, self.info.width, self.info.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&rgba)?;
        writer.finish()?;
        Ok(out)
    }
}

/// Non-owning pixel descriptor for host integration (window blits,
/// encoders). Only raster surfaces can produce one.
#[derive(Debug, Clone, Copy)]
pub struct PixelData<'a> {
    /// The pixel bytes, `height` rows of `stride` bytes.
    pub data: &'a [u8],
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub stride: usize,
    /// Pixel format.
    pub format: PixelFormat,
}

impl PixelData<'_> {
    /// Whether the descriptor refers to usable pixels.
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty() && self.width > 0 && self.height > 0 && self.stride > 0
    }
}
