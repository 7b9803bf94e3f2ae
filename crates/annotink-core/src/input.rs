//! Input events delivered by the host and the pressed-state tracking the engine needs.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    /// Primary button: select, drag, draw.
    Left,
    /// Secondary button: delete a vertex under a handle.
    Right,
    /// Pans the viewport.
    Middle,
}

/// Pointer event in device (canvas pixel) coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    DoubleClick {
        position: Point,
    },
    /// Wheel notch; negative `delta` scrolls up/away.
    Wheel {
        position: Point,
        delta: f64,
    },
}

/// Keyboard event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

/// Key name of the pan modifier.
pub const KEY_SPACE: &str = "Space";
/// Key name that abandons the shape being drawn.
pub const KEY_ESCAPE: &str = "Escape";

/// Map host key names onto the names the engine checks.
///
/// Browsers report the space bar as `" "` in `key` and `"Space"` in `code`.
pub fn normalize_key(key: &str) -> &str {
    match key {
        " " | "Spacebar" => KEY_SPACE,
        "Esc" => KEY_ESCAPE,
        other => other,
    }
}

/// Currently held keys, under their normalized names.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pressed_keys: HashSet<String>,
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a keyboard event.
    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        match event {
            KeyEvent::Pressed(key) => {
                self.pressed_keys.insert(normalize_key(key).to_string());
            }
            KeyEvent::Released(key) => {
                self.pressed_keys.remove(normalize_key(key));
            }
        }
    }

    /// Check if a key is currently pressed.
    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(normalize_key(key))
    }

    /// Forget every held key (focus loss).
    pub fn clear(&mut self) {
        self.pressed_keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_key_names() {
        let mut input = InputState::new();
        input.handle_key_event(&KeyEvent::Pressed(" ".to_string()));
        assert!(input.is_key_pressed(KEY_SPACE));
        assert!(input.is_key_pressed(" "));

        input.handle_key_event(&KeyEvent::Released("Space".to_string()));
        assert!(!input.is_key_pressed(KEY_SPACE));
    }

    #[test]
    fn test_clear() {
        let mut input = InputState::new();
        input.handle_key_event(&KeyEvent::Pressed("Shift".to_string()));
        input.handle_key_event(&KeyEvent::Pressed("Esc".to_string()));
        assert!(input.is_key_pressed(KEY_ESCAPE));
        input.clear();
        assert!(!input.is_key_pressed("Shift"));
        assert!(!input.is_key_pressed(KEY_ESCAPE));
    }
}
