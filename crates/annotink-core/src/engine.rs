//! The event-driven annotation canvas.
//!
//! [`AnnotationCanvas`] owns the viewport, the shape store, the draw session
//! and the current gesture. The host feeds it raw pointer and keyboard events
//! in device coordinates; every change to the shape sequence is reported
//! through the change callback with the complete new sequence.

use crate::command::EditCommand;
use crate::config::EngineConfig;
use crate::input::{InputState, KEY_ESCAPE, KEY_SPACE, KeyEvent, MouseButton, PointerEvent, normalize_key};
use crate::record::{ShapeError, ShapeRecord, shapes_from_records};
use crate::selection::{Handle, HandleKind, ManipulationState, edge_insertion, get_handles, hit_test_handles};
use crate::shapes::{Classification, SerializableColor, Shape, ShapeId};
use crate::store::ShapeStore;
use crate::tools::{DraftPreview, DrawSession, Mode};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Size};

/// Callback receiving the full shape sequence after every change.
pub type ChangeCallback = Box<dyn FnMut(&[Shape])>;

/// Pointer gesture in progress. Gestures are mutually exclusive.
#[derive(Debug, Clone)]
enum Gesture {
    Idle,
    /// Viewport drag; `last` is the previous device position.
    Panning { last: Point, button: MouseButton },
    /// Translate, corner transform or vertex drag of one shape.
    Manipulating(ManipulationState),
}

impl Gesture {
    /// Button whose release ends the gesture.
    fn button(&self) -> Option<MouseButton> {
        match self {
            Gesture::Idle => None,
            Gesture::Panning { button, .. } => Some(*button),
            Gesture::Manipulating(_) => Some(MouseButton::Left),
        }
    }
}

/// Interactive shape-editing surface.
pub struct AnnotationCanvas {
    config: EngineConfig,
    /// Pan/zoom state.
    pub viewport: Viewport,
    store: ShapeStore,
    draw_session: DrawSession,
    selection: Option<ShapeId>,
    gesture: Gesture,
    input: InputState,
    mode: Mode,
    drawing_enabled: bool,
    draw_color: SerializableColor,
    canvas_size: Size,
    on_change: Option<ChangeCallback>,
}

impl std::fmt::Debug for AnnotationCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationCanvas")
            .field("viewport", &self.viewport)
            .field("shapes", &self.store.len())
            .field("selection", &self.selection)
            .field("gesture", &self.gesture)
            .field("mode", &self.mode)
            .field("drawing_enabled", &self.drawing_enabled)
            .field("canvas_size", &self.canvas_size)
            .finish_non_exhaustive()
    }
}

impl AnnotationCanvas {
    /// Create a canvas of `canvas_size` device pixels with default settings.
    pub fn new(canvas_size: Size) -> Self {
        Self::with_config(EngineConfig::default(), canvas_size)
    }

    /// Create a canvas using `config`.
    pub fn with_config(config: EngineConfig, canvas_size: Size) -> Self {
        Self {
            viewport: Viewport::from_config(&config),
            store: ShapeStore::new(),
            draw_session: DrawSession::new(),
            selection: None,
            gesture: Gesture::Idle,
            input: InputState::new(),
            mode: Mode::default(),
            drawing_enabled: true,
            draw_color: config.default_color,
            canvas_size,
            on_change: None,
            config,
        }
    }

    /// Register the change callback, replacing any previous one.
    pub fn set_on_change(&mut self, callback: impl FnMut(&[Shape]) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current shapes in draw order.
    pub fn shapes(&self) -> &[Shape] {
        self.store.shapes()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selection(&self) -> Option<ShapeId> {
        self.selection
    }

    /// The selected shape as stored.
    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selection.and_then(|id| self.store.get(id))
    }

    pub fn drawing_enabled(&self) -> bool {
        self.drawing_enabled
    }

    pub fn draw_color(&self) -> SerializableColor {
        self.draw_color
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    pub fn set_canvas_size(&mut self, size: Size) {
        self.canvas_size = size;
    }

    /// Whether a pan, drag or transform gesture is in progress.
    pub fn is_busy(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    /// In-progress draft geometry, if any.
    pub fn draft_preview(&self) -> Option<DraftPreview> {
        self.draw_session.preview()
    }

    /// Live result of a translate or transform gesture that has not been committed yet.
    pub fn manipulation_preview(&self) -> Option<Shape> {
        match &self.gesture {
            Gesture::Manipulating(state) if !matches!(state.handle, Some(HandleKind::Vertex(_))) => {
                Some(state.preview(self.config.min_transform_size))
            }
            _ => None,
        }
    }

    /// Shapes as they should be drawn right now, with any live gesture applied.
    pub fn display_shapes(&self) -> Vec<Shape> {
        let mut shapes = self.store.shapes().to_vec();
        if let Some(preview) = self.manipulation_preview() {
            if let Some(slot) = shapes.iter_mut().find(|s| s.id() == preview.id()) {
                *slot = preview;
            }
        }
        shapes
    }

    /// Handles of the selected shape (vertex handles in cursor mode only).
    pub fn handles(&self) -> Vec<Handle> {
        let Some(id) = self.selection else {
            return Vec::new();
        };
        let shape = match &self.gesture {
            Gesture::Manipulating(state) if state.shape_id == id => self.manipulation_preview(),
            _ => None,
        };
        shape
            .or_else(|| self.store.get(id).cloned())
            .map(|shape| get_handles(&shape, self.vertex_editing()))
            .unwrap_or_default()
    }

    fn vertex_editing(&self) -> bool {
        self.mode == Mode::Cursor
    }

    // --- Owner operations ---

    /// Replace the shape sequence with one supplied by the owner.
    ///
    /// Not reported back through the change callback. A selection or
    /// gesture whose shape no longer exists is dropped.
    pub fn set_shapes(&mut self, shapes: Vec<Shape>) {
        self.store.replace(shapes);
        if let Some(id) = self.selection {
            if !self.store.contains(id) {
                self.selection = None;
            }
        }
        if let Gesture::Manipulating(state) = &self.gesture {
            if !self.store.contains(state.shape_id) {
                self.gesture = Gesture::Idle;
            }
        }
    }

    /// Replace the shape sequence from flat records.
    ///
    /// On error the current sequence is kept.
    pub fn set_records(&mut self, records: Vec<ShapeRecord>) -> Result<(), ShapeError> {
        match shapes_from_records(records) {
            Ok(shapes) => {
                self.set_shapes(shapes);
                Ok(())
            }
            Err(err) => {
                log::warn!("Rejected shape records: {err}");
                Err(err)
            }
        }
    }

    /// Switch the interaction mode.
    ///
    /// Any draft is discarded. Leaving cursor mode clears the selection.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        log::debug!("Mode {:?} -> {:?}", self.mode, mode);
        self.draw_session.cancel();
        if mode.is_drawing() {
            self.selection = None;
        }
        self.mode = mode;
    }

    /// Enable or disable shape creation. Disabling discards any draft.
    pub fn set_drawing_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.draw_session.cancel();
        }
        self.drawing_enabled = enabled;
    }

    /// Color given to shapes drawn from now on.
    pub fn set_draw_color(&mut self, color: SerializableColor) {
        self.draw_color = color;
    }

    /// Apply an edit command, notifying the owner if anything changed.
    pub fn apply(&mut self, command: EditCommand) -> bool {
        if !self.store.apply(&command) {
            log::trace!("Ignored {} on shape {}", command.name(), command.target());
            return false;
        }
        log::debug!("Applied {} to shape {}", command.name(), command.target());
        if let EditCommand::Remove(id) = command {
            if self.selection == Some(id) {
                self.selection = None;
            }
        }
        if let Some(callback) = self.on_change.as_mut() {
            callback(self.store.shapes());
        }
        true
    }

    /// Delete a shape.
    pub fn remove_shape(&mut self, id: ShapeId) -> bool {
        if let Gesture::Manipulating(state) = &self.gesture {
            if state.shape_id == id {
                self.gesture = Gesture::Idle;
            }
        }
        self.apply(EditCommand::Remove(id))
    }

    /// Delete the selected shape.
    pub fn remove_selected(&mut self) -> bool {
        match self.selection {
            Some(id) => self.remove_shape(id),
            None => false,
        }
    }

    /// Assign a label to a shape.
    pub fn set_classification(&mut self, id: ShapeId, classification: Classification) -> bool {
        self.apply(EditCommand::SetClassification { id, classification })
    }

    /// Recolor a shape.
    pub fn set_color(&mut self, id: ShapeId, color: SerializableColor) -> bool {
        self.apply(EditCommand::SetColor { id, color })
    }

    /// Reset pan and zoom to identity.
    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    /// Fit an image of `image_size` logical units inside the canvas.
    pub fn fit_image(&mut self, image_size: Size) {
        self.viewport.reset();
        self.viewport
            .fit_to_bounds(Rect::from_origin_size(Point::ZERO, image_size), self.canvas_size);
    }

    /// Select a shape by id. Returns false if it does not exist.
    pub fn select(&mut self, id: ShapeId) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        self.selection = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Drop any gesture in progress without committing it.
    pub fn cancel_gesture(&mut self) {
        if self.is_busy() {
            log::trace!("Gesture abandoned");
        }
        self.gesture = Gesture::Idle;
    }

    /// The host surface lost focus: held keys are forgotten and any gesture
    /// is dropped, since its release will never arrive.
    pub fn focus_lost(&mut self) {
        self.input.clear();
        self.cancel_gesture();
    }

    // --- Event entry points ---

    /// Dispatch a pointer event.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) {
        match *event {
            PointerEvent::Down { position, button } => self.pointer_down(position, button),
            PointerEvent::Up { position, button } => self.pointer_up(position, button),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::DoubleClick { position } => self.double_click(position),
            PointerEvent::Wheel { position, delta } => self.wheel(position, delta),
        }
    }

    /// Dispatch a keyboard event.
    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        match event {
            KeyEvent::Pressed(key) => self.key_down(key),
            KeyEvent::Released(key) => self.key_up(key),
        }
    }

    /// Pointer pressed at `device`.
    pub fn pointer_down(&mut self, device: Point, button: MouseButton) {
        if self.is_busy() {
            // Lost the previous release
            self.cancel_gesture();
        }

        let panning = match button {
            MouseButton::Middle => true,
            MouseButton::Left => self.input.is_key_pressed(KEY_SPACE),
            MouseButton::Right => false,
        };
        if panning {
            log::trace!("Pan started at {device:?}");
            self.gesture = Gesture::Panning { last: device, button };
            return;
        }

        let logical = self.viewport.to_logical(device);
        match button {
            MouseButton::Right => self.secondary_down(logical),
            MouseButton::Left => self.primary_down(logical),
            MouseButton::Middle => {}
        }
    }

    fn secondary_down(&mut self, logical: Point) {
        if !self.vertex_editing() {
            return;
        }
        let Some(shape) = self.selected_shape() else {
            return;
        };
        let radius = self.viewport.device_dist_to_logical(self.config.handle_radius_px);
        if let Some(HandleKind::Vertex(index)) = hit_test_handles(shape, logical, radius, true) {
            let id = shape.id();
            self.apply(EditCommand::DeleteVertex { id, index });
        }
    }

    fn primary_down(&mut self, logical: Point) {
        if self.draw_session.is_placing_vertices() {
            self.place_vertex(logical);
            return;
        }

        if self.selected_shape_down(logical) {
            return;
        }

        let tolerance = self.viewport.device_dist_to_logical(self.config.hit_tolerance_px);
        if let Some(id) = self.store.topmost_at_point(logical, tolerance) {
            if let Some(shape) = self.store.get(id) {
                log::trace!("Drag started on shape {id}");
                self.gesture = Gesture::Manipulating(ManipulationState::new(id, None, logical, shape.clone()));
                self.selection = Some(id);
            }
            return;
        }

        self.selection = None;
        if !self.drawing_enabled {
            return;
        }
        match self.mode {
            Mode::Cursor => {}
            Mode::Rectangle => self.draw_session.begin_rectangle(logical),
            Mode::Polygon | Mode::Polyline => self.place_vertex(logical),
        }
    }

    /// Handle and outline interaction with the selected shape.
    /// Returns true if the press was consumed.
    fn selected_shape_down(&mut self, logical: Point) -> bool {
        let Some(shape) = self.selected_shape() else {
            return false;
        };
        let id = shape.id();
        let radius = self.viewport.device_dist_to_logical(self.config.handle_radius_px);
        if let Some(handle) = hit_test_handles(shape, logical, radius, self.vertex_editing()) {
            log::trace!("Handle {handle:?} grabbed on shape {id}");
            self.gesture =
                Gesture::Manipulating(ManipulationState::new(id, Some(handle), logical, shape.clone()));
            return true;
        }

        if !self.vertex_editing() {
            return false;
        }
        let Some(polygon) = shape.as_polygon() else {
            return false;
        };
        let stroke = self.viewport.device_dist_to_logical(self.config.hit_tolerance_px);
        let threshold = self.viewport.device_dist_to_logical(self.config.edge_insert_px);
        match edge_insertion(polygon, logical, stroke, threshold) {
            Some(command) => {
                self.apply(command);
                true
            }
            None => false,
        }
    }

    fn place_vertex(&mut self, logical: Point) {
        let closed = self.mode == Mode::Polygon;
        let radius = self.viewport.device_dist_to_logical(self.config.close_radius_px);
        if let Some(shape) = self.draw_session.place_vertex(logical, closed, radius, self.draw_color) {
            self.apply(EditCommand::Add(shape));
        }
    }

    /// Pointer moved to `device`.
    pub fn pointer_move(&mut self, device: Point) {
        let logical = self.viewport.to_logical(device);
        let mut vertex_move = None;
        match &mut self.gesture {
            Gesture::Panning { last, .. } => {
                let delta = device - *last;
                *last = device;
                self.viewport.pan(delta);
            }
            Gesture::Manipulating(state) => {
                state.current_point = logical;
                // Vertex drags are committed as they happen
                if matches!(state.handle, Some(HandleKind::Vertex(_))) {
                    vertex_move = state.command(self.config.min_transform_size);
                }
            }
            Gesture::Idle => self.draw_session.update(logical),
        }
        if let Some(command) = vertex_move {
            self.apply(command);
        }
    }

    /// Pointer released at `device`.
    pub fn pointer_up(&mut self, device: Point, button: MouseButton) {
        let logical = self.viewport.to_logical(device);
        if self.gesture.button().is_some_and(|started| started != button) {
            return;
        }
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Panning { last, .. } => {
                self.viewport.pan(device - last);
                log::trace!("Pan ended, offset {:?}", self.viewport.offset);
            }
            Gesture::Manipulating(mut state) => {
                state.current_point = logical;
                if let Some(command) = state.command(self.config.min_transform_size) {
                    self.apply(command);
                }
            }
            Gesture::Idle => {
                if button != MouseButton::Left {
                    return;
                }
                if let Some(shape) = self.draw_session.end_rectangle(
                    logical,
                    self.config.min_draw_size,
                    self.draw_color,
                ) {
                    self.apply(EditCommand::Add(shape));
                }
            }
        }
    }

    /// Double-click at `device`: finishes a polygon/polyline draft.
    pub fn double_click(&mut self, device: Point) {
        if !self.draw_session.is_placing_vertices() {
            return;
        }
        if let Some(shape) = self.draw_session.finish(self.draw_color) {
            self.apply(EditCommand::Add(shape));
        }
    }

    /// Wheel notch at `device`; negative `delta` zooms in.
    pub fn wheel(&mut self, device: Point, delta: f64) {
        self.viewport.zoom(device, delta);
    }

    pub fn key_down(&mut self, key: &str) {
        self.input.handle_key_event(&KeyEvent::Pressed(key.to_string()));
        if normalize_key(key) == KEY_ESCAPE {
            self.draw_session.cancel();
        }
    }

    pub fn key_up(&mut self, key: &str) {
        self.input.handle_key_event(&KeyEvent::Released(key.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Polygon, Rectangle};
    use kurbo::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn canvas() -> AnnotationCanvas {
        let _ = env_logger::builder().is_test(true).try_init();
        AnnotationCanvas::new(Size::new(800.0, 600.0))
    }

    fn recording(canvas: &mut AnnotationCanvas) -> Rc<RefCell<Vec<Vec<Shape>>>> {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        canvas.set_on_change(move |shapes| sink.borrow_mut().push(shapes.to_vec()));
        calls
    }

    fn click(canvas: &mut AnnotationCanvas, x: f64, y: f64) {
        let p = Point::new(x, y);
        canvas.pointer_down(p, MouseButton::Left);
        canvas.pointer_up(p, MouseButton::Left);
    }

    fn drag(canvas: &mut AnnotationCanvas, from: Point, to: Point) {
        canvas.pointer_down(from, MouseButton::Left);
        canvas.pointer_move(to);
        canvas.pointer_up(to, MouseButton::Left);
    }

    fn square() -> Shape {
        Shape::Polygon(Polygon::polygon(vec![
            Point::new(100.0, 100.0),
            Point::new(200.0, 100.0),
            Point::new(200.0, 200.0),
            Point::new(100.0, 200.0),
        ]))
    }

    fn vertices(canvas: &AnnotationCanvas) -> Vec<Point> {
        canvas.shapes()[0].as_polygon().unwrap().vertices.clone()
    }

    #[test]
    fn test_draw_rectangle_notifies_once() {
        let mut canvas = canvas();
        let calls = recording(&mut canvas);
        canvas.set_mode(Mode::Rectangle);

        canvas.pointer_down(Point::new(150.0, 120.0), MouseButton::Left);
        canvas.pointer_move(Point::new(100.0, 90.0));
        assert!(matches!(
            canvas.draft_preview(),
            Some(DraftPreview::Rectangle { width, .. }) if width < 0.0
        ));
        canvas.pointer_move(Point::new(50.0, 50.0));
        canvas.pointer_up(Point::new(50.0, 50.0), MouseButton::Left);

        assert_eq!(calls.borrow().len(), 1);
        let Shape::Rectangle(rect) = &canvas.shapes()[0] else {
            panic!("expected rectangle");
        };
        assert_eq!(rect.position, Point::new(50.0, 50.0));
        assert!((rect.width - 100.0).abs() < f64::EPSILON);
        assert!((rect.height - 70.0).abs() < f64::EPSILON);
        assert_eq!(rect.color, canvas.config().default_color);
        assert!(canvas.draft_preview().is_none());
    }

    #[test]
    fn test_drawing_disabled() {
        let mut canvas = canvas();
        canvas.set_mode(Mode::Rectangle);
        canvas.set_drawing_enabled(false);
        drag(&mut canvas, Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        assert!(canvas.shapes().is_empty());
    }

    #[test]
    fn test_draw_threshold_uses_logical_units() {
        let mut canvas = canvas();
        canvas.set_mode(Mode::Rectangle);
        canvas.viewport.scale = 2.0;
        // 12 device px is 6 logical units
        drag(&mut canvas, Point::new(0.0, 0.0), Point::new(12.0, 100.0));
        assert!(canvas.shapes().is_empty());
        drag(&mut canvas, Point::new(0.0, 0.0), Point::new(40.0, 40.0));
        assert_eq!(canvas.shapes().len(), 1);
    }

    #[test]
    fn test_draw_polygon_close_click() {
        let mut canvas = canvas();
        let calls = recording(&mut canvas);
        canvas.set_mode(Mode::Polygon);
        click(&mut canvas, 10.0, 10.0);
        click(&mut canvas, 100.0, 10.0);
        click(&mut canvas, 100.0, 100.0);
        assert!(calls.borrow().is_empty());
        click(&mut canvas, 14.0, 12.0);

        assert_eq!(calls.borrow().len(), 1);
        let shape = &canvas.shapes()[0];
        assert_eq!(shape.kind(), crate::shapes::ShapeKind::Polygon);
        assert_eq!(shape.as_polygon().unwrap().vertices.len(), 3);
    }

    #[test]
    fn test_close_radius_is_zoom_independent() {
        let mut canvas = canvas();
        canvas.set_mode(Mode::Polygon);
        canvas.viewport.scale = 4.0;
        click(&mut canvas, 40.0, 40.0);
        click(&mut canvas, 400.0, 40.0);
        click(&mut canvas, 400.0, 400.0);
        // 8 device px from the first vertex, 2 logical units
        click(&mut canvas, 48.0, 40.0);
        assert_eq!(canvas.shapes().len(), 1);
    }

    #[test]
    fn test_draw_polyline_double_click() {
        let mut canvas = canvas();
        canvas.set_mode(Mode::Polyline);
        click(&mut canvas, 10.0, 10.0);
        click(&mut canvas, 100.0, 10.0);
        click(&mut canvas, 100.0, 100.0);
        click(&mut canvas, 100.0, 100.0);
        canvas.double_click(Point::new(100.0, 100.0));

        assert_eq!(canvas.shapes().len(), 1);
        let polyline = canvas.shapes()[0].as_polygon().unwrap();
        assert!(!polyline.closed);
        assert_eq!(polyline.vertices.len(), 3);
    }

    #[test]
    fn test_escape_and_mode_switch_cancel_draft() {
        let mut canvas = canvas();
        canvas.set_mode(Mode::Polygon);
        click(&mut canvas, 10.0, 10.0);
        click(&mut canvas, 100.0, 10.0);
        canvas.key_down("Escape");
        assert!(canvas.draft_preview().is_none());

        click(&mut canvas, 10.0, 10.0);
        canvas.set_mode(Mode::Rectangle);
        assert!(canvas.draft_preview().is_none());
        assert!(canvas.shapes().is_empty());
    }

    #[test]
    fn test_clicks_on_shapes_feed_vertex_draft() {
        let mut canvas = canvas();
        let shape = square();
        canvas.set_shapes(vec![shape.clone()]);
        canvas.set_mode(Mode::Polyline);
        click(&mut canvas, 20.0, 20.0);
        // Inside the existing polygon: still a vertex, no drag
        click(&mut canvas, 150.0, 150.0);
        canvas.double_click(Point::new(150.0, 150.0));
        assert_eq!(canvas.shapes().len(), 2);
        assert_eq!(canvas.shapes()[0], shape);
        assert_eq!(canvas.selection(), None);
    }

    #[test]
    fn test_selection_priority_over_drawing() {
        let mut canvas = canvas();
        let shape = square();
        let id = shape.id();
        canvas.set_shapes(vec![shape]);
        canvas.set_mode(Mode::Rectangle);

        drag(&mut canvas, Point::new(150.0, 150.0), Point::new(170.0, 150.0));
        assert_eq!(canvas.shapes().len(), 1);
        assert_eq!(canvas.selection(), Some(id));
        assert_eq!(vertices(&canvas)[0], Point::new(120.0, 100.0));

        // Empty space clears the selection
        click(&mut canvas, 700.0, 500.0);
        assert_eq!(canvas.selection(), None);
    }

    #[test]
    fn test_translate_commits_on_release() {
        let mut canvas = canvas();
        let calls = recording(&mut canvas);
        let rect = Shape::Rectangle(Rectangle::new(Point::new(50.0, 50.0), 100.0, 70.0));
        canvas.set_shapes(vec![rect]);

        canvas.pointer_down(Point::new(100.0, 80.0), MouseButton::Left);
        canvas.pointer_move(Point::new(110.0, 85.0));
        canvas.pointer_move(Point::new(120.0, 90.0));
        assert!(calls.borrow().is_empty());
        assert!(canvas.is_busy());
        let preview = canvas.display_shapes();
        assert_eq!(preview[0].bounds().origin(), Point::new(70.0, 60.0));
        // Store untouched until release
        assert_eq!(canvas.shapes()[0].bounds().origin(), Point::new(50.0, 50.0));

        canvas.pointer_up(Point::new(120.0, 90.0), MouseButton::Left);
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(canvas.shapes()[0].bounds().origin(), Point::new(70.0, 60.0));
        assert!(!canvas.is_busy());
    }

    #[test]
    fn test_click_without_move_does_not_notify() {
        let mut canvas = canvas();
        let calls = recording(&mut canvas);
        canvas.set_shapes(vec![square()]);
        click(&mut canvas, 150.0, 150.0);
        assert!(canvas.selection().is_some());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_corner_transform() {
        let mut canvas = canvas();
        let rect = Shape::Rectangle(Rectangle::new(Point::new(100.0, 100.0), 100.0, 50.0));
        let id = rect.id();
        canvas.set_shapes(vec![rect]);
        assert!(canvas.select(id));

        drag(&mut canvas, Point::new(200.0, 150.0), Point::new(250.0, 200.0));
        let Shape::Rectangle(rect) = &canvas.shapes()[0] else {
            panic!("expected rectangle");
        };
        assert_eq!(rect.position, Point::new(100.0, 100.0));
        assert!((rect.width - 150.0).abs() < 1e-9);
        assert!((rect.height - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_transform_floor() {
        let mut canvas = canvas();
        let rect = Shape::Rectangle(Rectangle::new(Point::new(100.0, 100.0), 100.0, 100.0));
        let id = rect.id();
        canvas.set_shapes(vec![rect]);
        canvas.select(id);

        // Collapse the bottom-right corner onto the top-left one
        drag(&mut canvas, Point::new(200.0, 200.0), Point::new(101.0, 101.0));
        let Shape::Rectangle(rect) = &canvas.shapes()[0] else {
            panic!("expected rectangle");
        };
        assert!((rect.width - 10.0).abs() < 1e-9);
        assert!((rect.height - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_transform_floor() {
        let mut canvas = canvas();
        let triangle = Shape::Polygon(Polygon::polygon(vec![
            Point::new(100.0, 100.0),
            Point::new(200.0, 100.0),
            Point::new(150.0, 200.0),
        ]));
        canvas.set_shapes(vec![triangle.clone()]);
        canvas.select(triangle.id());

        // Bottom-right bbox corner dropped onto the top-left one
        drag(&mut canvas, Point::new(200.0, 200.0), Point::new(100.0, 100.0));
        let bounds = canvas.shapes()[0].bounds();
        assert!((bounds.width() - 10.0).abs() < 1e-9);
        assert!((bounds.height() - 10.0).abs() < 1e-9);

        // Still scalable afterwards; corner handles only, so no vertex is grabbed
        canvas.set_mode(Mode::Rectangle);
        canvas.select(triangle.id());
        let corner = Point::new(bounds.x1, bounds.y1);
        drag(&mut canvas, corner, corner + Vec2::new(40.0, 40.0));
        let bounds = canvas.shapes()[0].bounds();
        assert!((bounds.width() - 50.0).abs() < 1e-9);
        assert!((bounds.height() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_vertex_drag_back_to_start() {
        let mut canvas = canvas();
        let calls = recording(&mut canvas);
        let shape = square();
        canvas.set_shapes(vec![shape.clone()]);
        canvas.select(shape.id());

        canvas.pointer_down(Point::new(200.0, 200.0), MouseButton::Left);
        canvas.pointer_move(Point::new(240.0, 240.0));
        assert_eq!(vertices(&canvas)[2], Point::new(240.0, 240.0));
        canvas.pointer_move(Point::new(200.0, 200.0));
        canvas.pointer_up(Point::new(200.0, 200.0), MouseButton::Left);

        assert_eq!(vertices(&canvas)[2], Point::new(200.0, 200.0));
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_edge_insert_and_vertex_drag() {
        let mut canvas = canvas();
        let calls = recording(&mut canvas);
        let shape = square();
        canvas.set_shapes(vec![shape.clone()]);
        canvas.select(shape.id());

        // On the top edge
        click(&mut canvas, 150.0, 101.0);
        assert_eq!(calls.borrow().len(), 1);
        let points = vertices(&canvas);
        assert_eq!(points.len(), 5);
        assert_eq!(points[1], Point::new(150.0, 101.0));

        // Drag the new vertex; every move is committed
        canvas.pointer_down(Point::new(150.0, 101.0), MouseButton::Left);
        canvas.pointer_move(Point::new(150.0, 80.0));
        assert_eq!(vertices(&canvas)[1], Point::new(150.0, 80.0));
        canvas.pointer_move(Point::new(150.0, 60.0));
        canvas.pointer_up(Point::new(150.0, 60.0), MouseButton::Left);
        let points = vertices(&canvas);
        assert_eq!(points[1], Point::new(150.0, 60.0));
        assert_eq!(points[0], Point::new(100.0, 100.0));
        assert_eq!(calls.borrow().len(), 3);
    }

    #[test]
    fn test_interior_click_on_selected_polygon_drags() {
        let mut canvas = canvas();
        let shape = square();
        canvas.set_shapes(vec![shape.clone()]);
        canvas.select(shape.id());

        click(&mut canvas, 150.0, 150.0);
        assert_eq!(vertices(&canvas).len(), 4);
    }

    #[test]
    fn test_vertex_editing_only_in_cursor_mode() {
        let mut canvas = canvas();
        let shape = square();
        canvas.set_shapes(vec![shape.clone()]);
        canvas.set_mode(Mode::Rectangle);
        click(&mut canvas, 150.0, 150.0);
        assert_eq!(canvas.selection(), Some(shape.id()));

        click(&mut canvas, 150.0, 101.0);
        assert_eq!(vertices(&canvas).len(), 4);
    }

    #[test]
    fn test_delete_vertex_with_secondary_button() {
        let mut canvas = canvas();
        let shape = square();
        canvas.set_shapes(vec![shape.clone()]);
        canvas.select(shape.id());

        canvas.pointer_down(Point::new(200.0, 200.0), MouseButton::Right);
        canvas.pointer_up(Point::new(200.0, 200.0), MouseButton::Right);
        assert_eq!(vertices(&canvas).len(), 3);

        // Floor reached
        canvas.pointer_down(Point::new(100.0, 100.0), MouseButton::Right);
        canvas.pointer_up(Point::new(100.0, 100.0), MouseButton::Right);
        assert_eq!(vertices(&canvas).len(), 3);
    }

    #[test]
    fn test_middle_button_pan() {
        let mut canvas = canvas();
        canvas.pointer_down(Point::new(100.0, 100.0), MouseButton::Middle);
        canvas.pointer_move(Point::new(130.0, 90.0));
        canvas.pointer_up(Point::new(140.0, 90.0), MouseButton::Middle);
        assert_eq!(canvas.viewport.offset, kurbo::Vec2::new(40.0, -10.0));
        assert!(!canvas.is_busy());
    }

    #[test]
    fn test_space_drag_pans_instead_of_drawing() {
        let mut canvas = canvas();
        canvas.set_mode(Mode::Rectangle);
        canvas.key_down(" ");
        drag(&mut canvas, Point::new(100.0, 100.0), Point::new(200.0, 200.0));
        canvas.key_up(" ");
        assert!(canvas.shapes().is_empty());
        assert_eq!(canvas.viewport.offset, kurbo::Vec2::new(100.0, 100.0));

        drag(&mut canvas, Point::new(100.0, 100.0), Point::new(200.0, 200.0));
        assert_eq!(canvas.shapes().len(), 1);
    }

    #[test]
    fn test_focus_lost_forgets_space() {
        let mut canvas = canvas();
        let calls = recording(&mut canvas);
        canvas.set_mode(Mode::Rectangle);
        canvas.key_down(" ");
        canvas.focus_lost();

        // Space release never arrived, the drag still draws
        drag(&mut canvas, Point::new(100.0, 100.0), Point::new(200.0, 200.0));
        assert_eq!(canvas.shapes().len(), 1);
        assert_eq!(canvas.viewport.offset, kurbo::Vec2::ZERO);

        canvas.set_mode(Mode::Cursor);
        canvas.pointer_down(Point::new(150.0, 150.0), MouseButton::Left);
        canvas.pointer_move(Point::new(180.0, 150.0));
        canvas.focus_lost();
        assert!(!canvas.is_busy());
        canvas.pointer_up(Point::new(180.0, 150.0), MouseButton::Left);
        assert_eq!(canvas.shapes()[0].bounds().origin(), Point::new(100.0, 100.0));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_other_button_release_keeps_drag() {
        let mut canvas = canvas();
        let calls = recording(&mut canvas);
        canvas.set_shapes(vec![square()]);

        canvas.pointer_down(Point::new(150.0, 150.0), MouseButton::Left);
        canvas.pointer_move(Point::new(170.0, 150.0));
        canvas.pointer_up(Point::new(170.0, 150.0), MouseButton::Right);
        assert!(canvas.is_busy());
        assert!(calls.borrow().is_empty());

        canvas.pointer_move(Point::new(190.0, 150.0));
        canvas.pointer_up(Point::new(190.0, 150.0), MouseButton::Left);
        assert!(!canvas.is_busy());
        assert_eq!(vertices(&canvas)[0], Point::new(140.0, 100.0));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_wheel_zoom_keeps_anchor() {
        let mut canvas = canvas();
        let anchor = Point::new(300.0, 200.0);
        let before = canvas.viewport.to_logical(anchor);
        canvas.wheel(anchor, -1.0);
        assert!(canvas.viewport.scale > 1.0);
        let after = canvas.viewport.to_logical(anchor);
        assert!((before - after).hypot() < 1e-9);

        canvas.reset_view();
        assert!((canvas.viewport.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut canvas = canvas();
        let calls = recording(&mut canvas);
        let shape = square();
        let id = shape.id();
        canvas.set_shapes(vec![shape]);
        canvas.select(id);

        assert!(canvas.remove_selected());
        assert_eq!(canvas.selection(), None);
        assert!(canvas.shapes().is_empty());
        assert_eq!(calls.borrow().len(), 1);
        assert!(!canvas.remove_shape(id));
    }

    #[test]
    fn test_set_records_keeps_shapes_on_error() {
        let mut canvas = canvas();
        canvas.set_shapes(vec![square()]);
        let bad = ShapeRecord::Polyline {
            id: uuid::Uuid::new_v4(),
            points: vec![1.0, 2.0, 3.0],
            color: "#000000".to_string(),
            classification: Classification::default(),
        };
        assert!(canvas.set_records(vec![bad]).is_err());
        assert_eq!(canvas.shapes().len(), 1);
    }

    #[test]
    fn test_set_records_rejects_shared_id() {
        let mut canvas = canvas();
        canvas.set_shapes(vec![square()]);
        let mut records = crate::record::records_from_shapes(&[square(), square()]);
        let id = canvas.shapes()[0].id();
        for record in &mut records {
            if let ShapeRecord::Polygon { id: record_id, .. } = record {
                *record_id = id;
            }
        }
        assert!(matches!(
            canvas.set_records(records),
            Err(ShapeError::DuplicateId { .. })
        ));
        assert_eq!(canvas.shapes().len(), 1);
    }

    #[test]
    fn test_leaving_cursor_mode_clears_selection() {
        let mut canvas = canvas();
        let shape = square();
        canvas.set_shapes(vec![shape.clone()]);
        canvas.select(shape.id());
        assert_eq!(canvas.handles().len(), 8);

        canvas.set_mode(Mode::Polygon);
        assert_eq!(canvas.selection(), None);
        assert!(canvas.handles().is_empty());
    }

    #[test]
    fn test_fit_image() {
        let mut canvas = canvas();
        canvas.fit_image(Size::new(1600.0, 600.0));
        assert!((canvas.viewport.scale - 0.5).abs() < 1e-12);
        let center = canvas.viewport.to_device(Point::new(800.0, 300.0));
        assert!((center - Point::new(400.0, 300.0)).hypot() < 1e-9);
    }
}
