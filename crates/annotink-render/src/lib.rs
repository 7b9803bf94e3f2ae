//! Annotink Render Library
//!
//! Renderer abstraction for the annotation canvas and a display-list
//! implementation that turns each frame into device-space drawing commands.

mod renderer;
mod scene;

pub use renderer::{BackgroundImage, RenderContext, RenderResult, Renderer, RendererError};
pub use scene::{Scene, SceneItem, SceneRenderer};
