//! Annotink Core Library
//!
//! Platform-agnostic shape-editing engine for image annotation: rectangles,
//! polygons and polylines drawn and edited on a pannable, zoomable canvas.

pub mod command;
pub mod config;
pub mod engine;
pub mod input;
pub mod record;
pub mod selection;
pub mod shapes;
pub mod store;
pub mod tools;
pub mod viewport;

pub use command::{EditCommand, apply_command};
pub use config::{ConfigError, EngineConfig};
pub use engine::{AnnotationCanvas, ChangeCallback};
pub use input::{InputState, KeyEvent, MouseButton, PointerEvent};
pub use record::{ShapeError, ShapeRecord};
pub use selection::{Corner, Handle, HandleKind, ManipulationState};
pub use shapes::{Classification, Polygon, Rectangle, SerializableColor, Shape, ShapeId, ShapeKind};
pub use store::ShapeStore;
pub use tools::{DraftPreview, DraftState, DrawSession, Mode};
pub use viewport::Viewport;
