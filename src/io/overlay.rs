//! Debug overlay: recognized objects drawn as rectangles on the color image.
//!
//! Purely observational. Each object's oriented box is projected through a
//! pinhole model into the color camera, and the 2D bounding rectangle of the
//! projected corners is outlined in the label's color.

use serde::{Deserialize, Serialize};

use crate::classification::ShapeLabel;
use crate::config::{ConfigError, ensure_finite, ensure_positive};
use crate::core::{ColorImage, Point3D};
use crate::registry::RecognizedObject;
use crate::transform::{TransformError, TransformSnapshot};

/// Pinhole intrinsics of the color camera (optical frame, z forward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraIntrinsics {
    /// Focal length in pixels, x.
    pub fx: f32,
    /// Focal length in pixels, y.
    pub fy: f32,
    /// Principal point, x.
    pub cx: f32,
    /// Principal point, y.
    pub cy: f32,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self {
            fx: 525.0,
            fy: 525.0,
            cx: 319.5,
            cy: 239.5,
        }
    }
}

impl CameraIntrinsics {
    /// Project a camera-frame point to pixel coordinates.
    ///
    /// Returns `None` for points on or behind the image plane.
    pub fn project(&self, p: &Point3D) -> Option<(f32, f32)> {
        if !p.is_finite() || p.z <= 1e-6 {
            return None;
        }
        Some((self.fx * p.x / p.z + self.cx, self.fy * p.y / p.z + self.cy))
    }
}

/// `[overlay]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Render an overlay after each successful cycle.
    pub enabled: bool,
    /// Color camera intrinsics.
    pub intrinsics: CameraIntrinsics,
    /// Rectangle border width in pixels.
    pub line_thickness: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            intrinsics: CameraIntrinsics::default(),
            line_thickness: 2,
        }
    }
}

impl OverlayConfig {
    /// Validate intrinsics.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("overlay.intrinsics.fx", self.intrinsics.fx)?;
        ensure_positive("overlay.intrinsics.fy", self.intrinsics.fy)?;
        ensure_finite("overlay.intrinsics.cx", self.intrinsics.cx)?;
        ensure_finite("overlay.intrinsics.cy", self.intrinsics.cy)?;
        if self.line_thickness == 0 {
            return Err(ConfigError::invalid(
                "overlay.line_thickness",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left column.
    pub min_u: u32,
    /// Top row.
    pub min_v: u32,
    /// Right column.
    pub max_u: u32,
    /// Bottom row.
    pub max_v: u32,
}

/// Outline color per label (RGB).
pub fn label_color(label: ShapeLabel) -> [u8; 3] {
    match label {
        ShapeLabel::Sphere => [255, 0, 0],
        ShapeLabel::Cube => [0, 255, 0],
        ShapeLabel::Cylinder => [0, 0, 255],
    }
}

/// Draws recognized objects onto color images.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    config: OverlayConfig,
}

impl OverlayRenderer {
    /// Create a renderer.
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Bounding rectangle of camera-frame points, clamped to the image.
    ///
    /// Points behind the camera are ignored. Returns `None` if nothing is in
    /// front of the camera or the rectangle misses the image entirely.
    pub fn bounding_rect(&self, points: &[Point3D], width: u32, height: u32) -> Option<PixelRect> {
        if width == 0 || height == 0 {
            return None;
        }
        let mut min = (f32::INFINITY, f32::INFINITY);
        let mut max = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for (u, v) in points.iter().filter_map(|p| self.config.intrinsics.project(p)) {
            min = (min.0.min(u), min.1.min(v));
            max = (max.0.max(u), max.1.max(v));
        }
        if !min.0.is_finite() || !max.0.is_finite() {
            return None;
        }

        let (w, h) = ((width - 1) as f32, (height - 1) as f32);
        if max.0 < 0.0 || max.1 < 0.0 || min.0 > w || min.1 > h {
            return None;
        }
        Some(PixelRect {
            min_u: min.0.clamp(0.0, w).floor() as u32,
            min_v: min.1.clamp(0.0, h).floor() as u32,
            max_u: max.0.clamp(0.0, w).ceil() as u32,
            max_v: max.1.clamp(0.0, h).ceil() as u32,
        })
    }

    /// Draw the outline of `rect` into `image`.
    pub fn draw_rect(&self, image: &mut ColorImage, rect: &PixelRect, rgb: [u8; 3]) {
        let t = self.config.line_thickness.saturating_sub(1);
        for v in rect.min_v..=rect.max_v {
            for u in rect.min_u..=rect.max_u {
                let on_border = u <= rect.min_u + t
                    || u + t >= rect.max_u
                    || v <= rect.min_v + t
                    || v + t >= rect.max_v;
                if on_border {
                    image.put_pixel(u, v, rgb);
                }
            }
        }
    }

    /// Render `objects` onto a copy of `image`.
    ///
    /// `snapshot` must map the objects' frame into the image's frame.
    pub fn render(
        &self,
        image: &ColorImage,
        objects: &[RecognizedObject],
        snapshot: &TransformSnapshot,
    ) -> Result<ColorImage, TransformError> {
        if snapshot.target() != &image.frame {
            return Err(TransformError::FrameMismatch {
                expected: image.frame.clone(),
                actual: snapshot.target().clone(),
            });
        }

        let mut out = image.clone();
        for object in objects {
            snapshot.check_source(&object.frame)?;
            let corners = object.corners().map(|c| snapshot.apply_point(&c));
            match self.bounding_rect(&corners, image.width, image.height) {
                Some(rect) => self.draw_rect(&mut out, &rect, label_color(object.label)),
                None => log::trace!("{} {} outside the color image", object.label, object.id),
            }
        }
        Ok(out)
    }
}
