//! Engine configuration.
//!
//! Every threshold the editing engine uses lives here so an owning screen can
//! tune them without touching the engine. Pixel thresholds (`*_px`) are in
//! device pixels and are divided by the current viewport scale before use, so
//! they stay constant on screen regardless of zoom.

use crate::shapes::SerializableColor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Tunable constants for the viewport, draw session and manipulation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Smallest allowed viewport scale.
    pub min_scale: f64,
    /// Largest allowed viewport scale.
    pub max_scale: f64,
    /// Multiplicative zoom factor applied per wheel notch.
    pub zoom_step: f64,
    /// A drawn rectangle must exceed this size (logical units) on both axes to be kept.
    pub min_draw_size: f64,
    /// Floor applied to rectangle width/height when a transform is committed.
    pub min_transform_size: f64,
    /// Radius around the first polygon vertex that closes the polygon on click.
    pub close_radius_px: f64,
    /// Maximum distance from an outline at which a click inserts a vertex.
    /// The press must also be on the stroke, so the effective threshold is
    /// the smaller of this and `hit_tolerance_px`.
    pub edge_insert_px: f64,
    /// Slop used when hit-testing shape bodies and outlines.
    pub hit_tolerance_px: f64,
    /// Radius of vertex and corner handles.
    pub handle_radius_px: f64,
    /// Stroke color given to newly drawn shapes.
    pub default_color: SerializableColor,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.2,
            max_scale: 5.0,
            zoom_step: 1.05,
            min_draw_size: 8.0,
            min_transform_size: 10.0,
            close_radius_px: 10.0,
            edge_insert_px: 8.0,
            hit_tolerance_px: 4.0,
            handle_radius_px: 6.0,
            default_color: SerializableColor::new(255, 0, 0, 255),
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON. Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded engine config from {:?}", path.as_ref());
        Self::from_json(&json)
    }

    /// Check the numeric ranges the viewport relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_scale must be positive, got {}",
                self.min_scale
            )));
        }
        if self.min_scale > self.max_scale {
            return Err(ConfigError::Invalid(format!(
                "min_scale {} exceeds max_scale {}",
                self.min_scale, self.max_scale
            )));
        }
        if !(self.zoom_step > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "zoom_step must be greater than 1, got {}",
                self.zoom_step
            )));
        }
        Ok(())
    }
}
