//! Input state records. The windowing layer translates native events into
//! these; consumers poll them once per tick.

use std::collections::HashSet;

use glam::Vec2;

/// Keys the engine cares about. Extend as needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Grave,
    Escape,
    Space,
    LShift,
    W,
    A,
    S,
    D,
    Q,
    E,
    Up,
    Down,
    Left,
    Right,
    F1,
    F2,
    F3,
    F4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Per-tick input state with edge tracking.
#[derive(Default)]
pub struct Input {
    held: HashSet<Key>,
    pressed: HashSet<Key>,
    released: HashSet<Key>,
    mouse_held: HashSet<MouseButton>,
    mouse_pressed: HashSet<MouseButton>,
    pub mouse_pos: Vec2,
}

impl Input {
    /// Drop edge state for the next tick. Held state persists.
    pub fn clear_state(&mut self) {
        self.pressed.clear();
        self.released.clear();
        self.mouse_pressed.clear();
    }

    pub fn set_key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub fn set_key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.released.insert(key);
        }
    }

    pub fn set_mouse_down(&mut self, button: MouseButton) {
        if self.mouse_held.insert(button) {
            self.mouse_pressed.insert(button);
        }
    }

    pub fn set_mouse_up(&mut self, button: MouseButton) {
        self.mouse_held.remove(&button);
    }

    /// True while the key is held.
    pub fn is_key_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// True only on the tick the key went down.
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed.contains(&button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_is_an_edge_not_a_level() {
        let mut input = Input::default();
        input.set_key_down(Key::Grave);
        assert!(input.is_key_pressed(Key::Grave));
        assert!(input.is_key_held(Key::Grave));

        input.clear_state();
        // Key repeat from the OS must not re-trigger the edge.
        input.set_key_down(Key::Grave);
        assert!(!input.is_key_pressed(Key::Grave));
        assert!(input.is_key_held(Key::Grave));

        input.set_key_up(Key::Grave);
        input.clear_state();
        input.set_key_down(Key::Grave);
        assert!(input.is_key_pressed(Key::Grave));
    }
}
