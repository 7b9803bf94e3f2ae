//! Viewport module for pan/zoom transforms.

use crate::config::EngineConfig;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Viewport owns the zoom scale and pan offset of the drawing surface.
///
/// Device coordinates are raw pointer positions in canvas pixels; logical
/// coordinates are the shape coordinate system, invariant under pan/zoom.
/// The offset is kept in device space, so panning never needs a scale
/// correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// Current translation offset (pan), in device pixels.
    pub offset: Vec2,
    /// Current zoom scale.
    pub scale: f64,
    /// Minimum allowed scale.
    pub min_scale: f64,
    /// Maximum allowed scale.
    pub max_scale: f64,
    /// Scale factor applied per zoom step.
    pub zoom_step: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl Viewport {
    /// Create a new viewport with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a viewport using the scale limits of `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_step: config.zoom_step,
        }
    }

    /// Affine transform from logical to device coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Affine transform from device to logical coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a device point to logical coordinates.
    pub fn to_logical(&self, device: Point) -> Point {
        Point::new(
            (device.x - self.offset.x) / self.scale,
            (device.y - self.offset.y) / self.scale,
        )
    }

    /// Convert a logical point to device coordinates.
    pub fn to_device(&self, logical: Point) -> Point {
        Point::new(
            logical.x * self.scale + self.offset.x,
            logical.y * self.scale + self.offset.y,
        )
    }

    /// Convert a device-space distance to a logical distance.
    ///
    /// Used for every pixel threshold so hit areas stay the same size on
    /// screen at any zoom.
    pub fn device_dist_to_logical(&self, device_dist: f64) -> f64 {
        device_dist / self.scale
    }

    /// Pan by a raw device-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by one step around `anchor` (device coordinates).
    ///
    /// A negative `delta` (wheel scrolled up/away) zooms in, a positive one
    /// zooms out, zero does nothing. The logical point under `anchor` stays
    /// under it after the rescale.
    pub fn zoom(&mut self, anchor: Point, delta: f64) {
        let factor = if delta < 0.0 {
            self.zoom_step
        } else if delta > 0.0 {
            1.0 / self.zoom_step
        } else {
            return;
        };
        self.zoom_by(anchor, factor);
    }

    /// Multiply the scale by `factor` around `anchor`, clamped to the scale range.
    pub fn zoom_by(&mut self, anchor: Point, factor: f64) {
        let new_scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        let logical = self.to_logical(anchor);
        self.scale = new_scale;

        // Put `logical` back under the anchor
        self.offset = Vec2::new(
            anchor.x - logical.x * self.scale,
            anchor.y - logical.y * self.scale,
        );
    }

    /// Reset to identity: scale 1, no offset.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.scale = 1.0;
    }

    /// Fit `bounds` inside a canvas of `canvas` size, centered.
    ///
    /// Degenerate bounds reset the viewport instead.
    pub fn fit_to_bounds(&mut self, bounds: Rect, canvas: Size) {
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            self.reset();
            return;
        }

        let scale_x = canvas.width / bounds.width();
        let scale_y = canvas.height / bounds.height();
        self.scale = scale_x.min(scale_y).clamp(self.min_scale, self.max_scale);

        let center = bounds.center();
        self.offset = Vec2::new(
            canvas.width / 2.0 - center.x * self.scale,
            canvas.height / 2.0 - center.y * self.scale,
        );
    }
}
