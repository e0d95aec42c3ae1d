//! Decoded camera images delivered by the transport layer.

use super::frame::FrameId;

/// 8-bit RGB image, row-major, 3 bytes per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorImage {
    /// Frame of the camera that produced the image.
    pub frame: FrameId,
    /// Capture timestamp in microseconds.
    pub stamp_us: u64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel data (`width * height * 3` bytes).
    pub data: Vec<u8>,
}

impl ColorImage {
    /// Create an image filled with a single color.
    pub fn filled(
        frame: impl Into<FrameId>,
        stamp_us: u64,
        width: u32,
        height: u32,
        rgb: [u8; 3],
    ) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            frame: frame.into(),
            stamp_us,
            width,
            height,
            data,
        }
    }

    /// True if the buffer length matches the dimensions.
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 3
    }

    /// Read a pixel, `None` when out of bounds.
    pub fn pixel(&self, u: u32, v: u32) -> Option<[u8; 3]> {
        if u >= self.width || v >= self.height {
            return None;
        }
        let i = (v as usize * self.width as usize + u as usize) * 3;
        self.data.get(i..i + 3).map(|p| [p[0], p[1], p[2]])
    }

    /// Write a pixel; out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, u: u32, v: u32, rgb: [u8; 3]) {
        if u >= self.width || v >= self.height {
            return;
        }
        let i = (v as usize * self.width as usize + u as usize) * 3;
        if let Some(px) = self.data.get_mut(i..i + 3) {
            px.copy_from_slice(&rgb);
        }
    }
}

/// Depth image in meters, row-major. Invalid pixels are `NaN` or `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    /// Frame of the depth sensor.
    pub frame: FrameId,
    /// Capture timestamp in microseconds.
    pub stamp_us: u64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth values in meters.
    pub data: Vec<f32>,
}

impl DepthImage {
    /// Create a depth image with constant depth.
    pub fn filled(
        frame: impl Into<FrameId>,
        stamp_us: u64,
        width: u32,
        height: u32,
        depth: f32,
    ) -> Self {
        Self {
            frame: frame.into(),
            stamp_us,
            width,
            height,
            data: vec![depth; width as usize * height as usize],
        }
    }

    /// Depth at a pixel, `None` when out of bounds or invalid.
    pub fn depth(&self, u: u32, v: u32) -> Option<f32> {
        if u >= self.width || v >= self.height {
            return None;
        }
        let d = *self.data.get(v as usize * self.width as usize + u as usize)?;
        (d.is_finite() && d > 0.0).then_some(d)
    }
}
