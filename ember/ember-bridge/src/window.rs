//! Windowing bridge: owns the native window and translates its events into
//! the engine's input records.

use render_api::{Input, Key, MouseButton};
use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

pub struct EngineWindow {
    pub handle: winit::window::Window,
    pub width: u32,
    pub height: u32,
}

impl EngineWindow {
    pub fn new(handle: winit::window::Window) -> Self {
        let size = handle.inner_size();
        Self {
            width: size.width,
            height: size.height,
            handle,
        }
    }
}

fn translate_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::Backquote => Key::Grave,
        KeyCode::Escape => Key::Escape,
        KeyCode::Space => Key::Space,
        KeyCode::ShiftLeft => Key::LShift,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        _ => return None,
    })
}

fn translate_button(button: WinitMouseButton) -> Option<MouseButton> {
    Some(match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        _ => return None,
    })
}

/// Feed one window event into the input state. Returns true when handled.
pub fn handle_event(input: &mut Input, event: &WindowEvent) -> bool {
    match event {
        WindowEvent::KeyboardInput { event, .. } => {
            if let PhysicalKey::Code(code) = event.physical_key {
                if let Some(key) = translate_key(code) {
                    match event.state {
                        ElementState::Pressed => input.set_key_down(key),
                        ElementState::Released => input.set_key_up(key),
                    }
                    return true;
                }
            }
            false
        }
        WindowEvent::MouseInput { state, button, .. } => {
            if let Some(button) = translate_button(*button) {
                match state {
                    ElementState::Pressed => input.set_mouse_down(button),
                    ElementState::Released => input.set_mouse_up(button),
                }
                return true;
            }
            false
        }
        WindowEvent::CursorMoved { position, .. } => {
            input.mouse_pos = glam::Vec2::new(position.x as f32, position.y as f32);
            true
        }
        _ => false,
    }
}
