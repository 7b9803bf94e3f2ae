//! Display-list renderer.
//!
//! [`SceneRenderer`] flattens a frame into device-space [`SceneItem`]s that a
//! drawing backend (canvas 2D, tiny-skia, vello, ...) can replay in order.

use crate::renderer::{BackgroundImage, RenderContext, Renderer};
use annotink_core::selection::{Handle, HandleKind};
use annotink_core::shapes::Shape;
use annotink_core::tools::DraftPreview;
use kurbo::{Affine, BezPath, Circle, Point, Rect, Shape as KurboShape};
use peniko::Color;

/// Side of a square corner handle in device pixels.
const CORNER_HANDLE_SIZE: f64 = 8.0;
/// Dash length of selection and preview outlines in device pixels.
const DASH_LEN: f64 = 4.0;

/// A single drawing command in device coordinates.
#[derive(Debug, Clone)]
pub enum SceneItem {
    /// Background bitmap placed by `transform`.
    Image {
        image: BackgroundImage,
        transform: Affine,
    },
    Fill {
        path: BezPath,
        color: Color,
    },
    Stroke {
        path: BezPath,
        color: Color,
        width: f64,
        /// Dash pattern `[on, off]`; `None` for a solid line.
        dashes: Option<[f64; 2]>,
    },
}

/// Ordered display list for one frame, back to front.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub items: Vec<SceneItem>,
}

impl Scene {
    pub fn reset(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn fill(&mut self, path: BezPath, color: Color) {
        self.items.push(SceneItem::Fill { path, color });
    }

    fn stroke(&mut self, path: BezPath, color: Color, width: f64) {
        self.items.push(SceneItem::Stroke {
            path,
            color,
            width,
            dashes: None,
        });
    }

    fn dashed(&mut self, path: BezPath, color: Color, width: f64) {
        self.items.push(SceneItem::Stroke {
            path,
            color,
            width,
            dashes: Some([DASH_LEN, DASH_LEN]),
        });
    }
}

/// Renderer producing a [`Scene`] display list.
#[derive(Debug, Default)]
pub struct SceneRenderer {
    scene: Scene,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the scene of the last frame.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take the scene, leaving an empty one behind.
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    fn render_background(&mut self, ctx: &RenderContext, transform: Affine) {
        let size = ctx.canvas.canvas_size();
        let surface = Rect::new(0.0, 0.0, size.width, size.height);
        self.scene.fill(surface.to_path(0.1), ctx.background_color);
        if let Some(image) = ctx.background {
            self.scene.items.push(SceneItem::Image {
                image: image.clone(),
                transform,
            });
        }
    }

    fn render_shape(&mut self, ctx: &RenderContext, shape: &Shape, transform: Affine) {
        let path = transform * shape.to_path();
        let color: Color = shape.color().into();
        let closed = shape.as_polygon().is_none_or(|poly| poly.closed);
        if closed && ctx.fill_alpha > 0 {
            let rgba = color.to_rgba8();
            self.scene
                .fill(path.clone(), Color::from_rgba8(rgba.r, rgba.g, rgba.b, ctx.fill_alpha));
        }
        self.scene.stroke(path, color, ctx.stroke_width);
    }

    fn render_selection(&mut self, ctx: &RenderContext, shape: &Shape, transform: Affine) {
        let outline = transform.transform_rect_bbox(shape.bounds());
        self.scene.dashed(outline.to_path(0.1), ctx.selection_color, 1.0);

        let radius = ctx.canvas.config().handle_radius_px;
        for handle in ctx.canvas.handles() {
            self.render_handle(ctx, &handle, transform, radius);
        }
    }

    /// Render a single handle at constant screen size.
    fn render_handle(&mut self, ctx: &RenderContext, handle: &Handle, transform: Affine, radius: f64) {
        let pos = transform * handle.position;
        let path = match handle.kind {
            // Circle handle for vertices
            HandleKind::Vertex(_) => Circle::new(pos, radius).to_path(0.1),
            HandleKind::Corner(_) => {
                let half = CORNER_HANDLE_SIZE / 2.0;
                Rect::new(pos.x - half, pos.y - half, pos.x + half, pos.y + half).to_path(0.1)
            }
        };
        self.scene.fill(path.clone(), Color::WHITE);
        self.scene.stroke(path, ctx.selection_color, 1.5);
    }

    fn render_draft(&mut self, ctx: &RenderContext, draft: &DraftPreview, transform: Affine) {
        let color: Color = ctx.canvas.draw_color().into();
        match draft {
            DraftPreview::Rectangle { origin, width, height } => {
                let corner = Point::new(origin.x + width, origin.y + height);
                let rect = Rect::from_points(*origin, corner);
                self.scene
                    .dashed(transform * rect.to_path(0.1), color, ctx.stroke_width);
            }
            DraftPreview::Vertices {
                points,
                closed,
                pointer,
            } => {
                let Some((first, rest)) = points.split_first() else {
                    return;
                };
                let mut path = BezPath::new();
                path.move_to(*first);
                for p in rest.iter().chain(pointer) {
                    path.line_to(*p);
                }
                self.scene.stroke(transform * path, color, ctx.stroke_width);

                for p in points {
                    self.scene
                        .fill(Circle::new(transform * *p, 3.0).to_path(0.1), color);
                }
                // Close target around the first vertex
                if *closed && points.len() >= 2 {
                    let radius = ctx.canvas.config().close_radius_px;
                    self.scene
                        .dashed(Circle::new(transform * *first, radius).to_path(0.1), color, 1.0);
                }
            }
        }
    }
}

impl Renderer for SceneRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        self.scene.reset();
        let transform = ctx.canvas.viewport.transform();

        self.render_background(ctx, transform);

        // Shapes in z-order, with any live drag or transform applied
        let shapes = ctx.canvas.display_shapes();
        for shape in &shapes {
            self.render_shape(ctx, shape, transform);
        }

        if let Some(selected) = ctx
            .canvas
            .selection()
            .and_then(|id| shapes.iter().find(|s| s.id() == id))
        {
            self.render_selection(ctx, selected, transform);
        }

        if let Some(draft) = ctx.canvas.draft_preview() {
            self.render_draft(ctx, &draft, transform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotink_core::engine::AnnotationCanvas;
    use annotink_core::input::MouseButton;
    use annotink_core::shapes::{Polygon, Rectangle};
    use annotink_core::tools::Mode;
    use kurbo::{PathEl, Size, Vec2};

    fn canvas() -> AnnotationCanvas {
        let _ = env_logger::builder().is_test(true).try_init();
        AnnotationCanvas::new(Size::new(800.0, 600.0))
    }

    fn count(scene: &Scene, pred: impl Fn(&SceneItem) -> bool) -> usize {
        scene.items.iter().filter(|item| pred(item)).count()
    }

    fn is_solid_stroke(item: &SceneItem) -> bool {
        matches!(item, SceneItem::Stroke { dashes: None, .. })
    }

    #[test]
    fn test_empty_canvas_without_image() {
        let canvas = canvas();
        let mut renderer = SceneRenderer::new();
        renderer.build_scene(&RenderContext::new(&canvas));

        // Just the plain background
        assert_eq!(renderer.scene().items.len(), 1);
        assert!(matches!(renderer.scene().items[0], SceneItem::Fill { .. }));
    }

    #[test]
    fn test_shapes_in_device_space() {
        let mut canvas = canvas();
        canvas.set_shapes(vec![Shape::Rectangle(Rectangle::new(
            Point::new(10.0, 20.0),
            30.0,
            40.0,
        ))]);
        canvas.viewport.scale = 2.0;
        canvas.viewport.offset = Vec2::new(5.0, 5.0);

        let mut renderer = SceneRenderer::new();
        renderer.build_scene(&RenderContext::new(&canvas));
        let stroke = renderer
            .scene()
            .items
            .iter()
            .find(|item| is_solid_stroke(item))
            .unwrap();
        let SceneItem::Stroke { path, .. } = stroke else {
            unreachable!();
        };
        assert_eq!(path.bounding_box(), Rect::new(25.0, 45.0, 85.0, 125.0));
    }

    #[test]
    fn test_polyline_is_not_filled() {
        let mut canvas = canvas();
        canvas.set_shapes(vec![Shape::Polygon(Polygon::polyline(vec![
            Point::new(0.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(100.0, 0.0),
        ]))]);
        let mut renderer = SceneRenderer::new();
        renderer.build_scene(&RenderContext::new(&canvas));

        // Background fill only
        assert_eq!(count(renderer.scene(), |i| matches!(i, SceneItem::Fill { .. })), 1);
        let SceneItem::Stroke { path, .. } = &renderer.scene().items[1] else {
            panic!("expected stroke");
        };
        assert!(!path.elements().contains(&PathEl::ClosePath));
    }

    #[test]
    fn test_selected_polygon_handles() {
        let mut canvas = canvas();
        let shape = Shape::Polygon(Polygon::polygon(vec![
            Point::new(100.0, 100.0),
            Point::new(200.0, 100.0),
            Point::new(150.0, 200.0),
        ]));
        canvas.set_shapes(vec![shape.clone()]);
        canvas.select(shape.id());

        let mut renderer = SceneRenderer::new();
        renderer.build_scene(&RenderContext::new(&canvas).with_fill_alpha(0));
        // Background, outline, dashed box, 3 vertex + 4 corner handles (fill and border each)
        assert_eq!(renderer.scene().items.len(), 1 + 1 + 1 + 7 * 2);
    }

    #[test]
    fn test_draft_preview_rendered() {
        let mut canvas = canvas();
        canvas.set_mode(Mode::Rectangle);
        canvas.pointer_down(Point::new(200.0, 200.0), MouseButton::Left);
        canvas.pointer_move(Point::new(100.0, 150.0));

        let mut renderer = SceneRenderer::new();
        renderer.build_scene(&RenderContext::new(&canvas));
        let last = renderer.scene().items.last().unwrap();
        let SceneItem::Stroke { path, dashes, .. } = last else {
            panic!("expected dashed preview");
        };
        assert!(dashes.is_some());
        assert_eq!(path.bounding_box(), Rect::new(100.0, 150.0, 200.0, 200.0));
    }

    #[test]
    fn test_drag_preview_replaces_stored_shape() {
        let mut canvas = canvas();
        canvas.set_shapes(vec![Shape::Rectangle(Rectangle::new(
            Point::new(0.0, 0.0),
            50.0,
            50.0,
        ))]);
        canvas.pointer_down(Point::new(25.0, 25.0), MouseButton::Left);
        canvas.pointer_move(Point::new(125.0, 25.0));

        let mut renderer = SceneRenderer::new();
        renderer.build_scene(&RenderContext::new(&canvas).with_fill_alpha(0));
        let outlines: Vec<Rect> = renderer
            .scene()
            .items
            .iter()
            .filter_map(|item| match item {
                SceneItem::Stroke { path, dashes: None, width, .. } if *width == 2.0 => {
                    Some(path.bounding_box())
                }
                _ => None,
            })
            .collect();
        assert_eq!(outlines, vec![Rect::new(100.0, 0.0, 150.0, 50.0)]);
    }

    #[test]
    fn test_take_scene() {
        let canvas = canvas();
        let mut renderer = SceneRenderer::new();
        renderer.build_scene(&RenderContext::new(&canvas));
        let scene = renderer.take_scene();
        assert!(!scene.is_empty());
        assert!(renderer.scene().is_empty());
    }
}
