//! Engine systems: a uniform capability set called once per tick and once per
//! frame, in registration order.

use crate::{Entity, Input, World};

/// Size of the presentable surface, in pixels.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
}

impl SurfaceInfo {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Borrowed engine state handed to every system call.
pub struct SystemCtx<'a> {
    pub world: &'a mut World,
    pub input: &'a Input,
    pub surface: SurfaceInfo,
    /// Active camera entity; set by the game.
    pub active_camera: Option<Entity>,
}

/// A system is updated every game tick and rendered every frame.
/// Systems run in the order they were registered.
pub trait System {
    fn update(&mut self, _ctx: &mut SystemCtx, _dt: f32) {}

    fn render(&mut self, _ctx: &mut SystemCtx) {}
}
