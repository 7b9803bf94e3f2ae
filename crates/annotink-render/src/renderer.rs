//! Renderer trait abstraction.

use annotink_core::engine::AnnotationCanvas;
use kurbo::Size;
use peniko::Color;
use std::sync::Arc;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("Image has no pixels")]
    EmptyImage,
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Decoded background bitmap, drawn at the logical origin at one logical unit per pixel.
#[derive(Clone)]
pub struct BackgroundImage {
    data: peniko::ImageData,
}

impl std::fmt::Debug for BackgroundImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundImage")
            .field("width", &self.data.width)
            .field("height", &self.data.height)
            .finish()
    }
}

impl BackgroundImage {
    /// Decode a PNG, JPEG or WebP file.
    pub fn from_bytes(bytes: &[u8]) -> RenderResult<Self> {
        let decoded = image::load_from_memory(bytes)?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(RendererError::EmptyImage);
        }
        log::debug!("Decoded background image {width}x{height}");
        Ok(Self {
            data: peniko::ImageData {
                data: peniko::Blob::new(Arc::new(rgba.into_vec())),
                format: peniko::ImageFormat::Rgba8,
                width,
                height,
                alpha_type: peniko::ImageAlphaType::Alpha,
            },
        })
    }

    /// Pixel data for a drawing backend.
    pub fn image_data(&self) -> &peniko::ImageData {
        &self.data
    }

    /// Size in logical units.
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.data.width), f64::from(self.data.height))
    }
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a AnnotationCanvas,
    /// Background bitmap; `None` while it is missing or still loading.
    pub background: Option<&'a BackgroundImage>,
    /// Fill behind the image, and the whole surface when there is none.
    pub background_color: Color,
    /// Selection outline and handle border color.
    pub selection_color: Color,
    /// Shape stroke width in device pixels.
    pub stroke_width: f64,
    /// Alpha of the translucent fill inside closed shapes.
    pub fill_alpha: u8,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(canvas: &'a AnnotationCanvas) -> Self {
        Self {
            canvas,
            background: None,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            stroke_width: 2.0,
            fill_alpha: 40,
        }
    }

    /// Set the background bitmap.
    pub fn with_image(mut self, image: Option<&'a BackgroundImage>) -> Self {
        self.background = image;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Set the selection color.
    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    /// Set the shape stroke width.
    pub fn with_stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = width;
        self
    }

    /// Set the fill alpha of closed shapes (0 disables the fill).
    pub fn with_fill_alpha(mut self, alpha: u8) -> Self {
        self.fill_alpha = alpha;
        self
    }
}

/// Trait for rendering backends.
///
/// A renderer holds no canvas state of its own: everything it draws comes
/// from the [`RenderContext`] of the current frame.
pub trait Renderer: Send + Sync {
    /// Build the scene/command buffer for a frame.
    fn build_scene(&mut self, ctx: &RenderContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
