//! Captured-frame value types.
//!
//! A capture attempt fills a mutable [`FrameBuffer`] sized to the surface,
//! which is then frozen into an immutable [`CapturedFrame`] for the cache.
//! Frames share their pixel bytes behind an `Arc`, so handing one to a
//! consumer never copies pixel data.

use std::sync::Arc;

/// Pixel format of a captured frame.
///
/// Snapshots are always delivered as 8-bit RGBA; the render path may use
/// whatever format the pipeline prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// RGBA 32-bit, 8 bits per channel
    Rgba,
}

impl PixelFormat {
    /// Returns the number of bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba => 4,
        }
    }
}

/// Mutable staging buffer for one capture attempt.
///
/// Allocated fresh each iteration by the capture worker and handed to the
/// [`SurfaceCapture`](crate::capture::SurfaceCapture) implementation to fill.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocates a zeroed RGBA buffer for a `width` x `height` surface.
    pub fn rgba(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * PixelFormat::Rgba.bytes_per_pixel();
        Self {
            width,
            height,
            format: PixelFormat::Rgba,
            data: vec![0; len],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format of the buffer.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Mutable access to the raw pixel bytes, row-major, tightly packed.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Freezes the buffer into an immutable frame.
    pub fn into_frame(self) -> CapturedFrame {
        CapturedFrame {
            width: self.width,
            height: self.height,
            format: self.format,
            data: self.data.into(),
        }
    }
}

/// An immutable pixel buffer representing one rendered frame at capture time.
///
/// Cloning is cheap; the pixel bytes are shared.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Arc<[u8]>,
}

impl CapturedFrame {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel format of the frame.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes, row-major, tightly packed.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
