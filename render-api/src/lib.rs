//! Shared contract between the Ember host engine and its renderer.
//! The renderer consumes components and the world read-only; the host fills
//! them each tick and drives every registered system.

mod components;
mod error;
mod input;
mod system;
mod world;

pub use components::{Camera, Mesh, Transform};
pub use error::{Error, Result};
pub use input::{Input, Key, MouseButton};
pub use system::{SurfaceInfo, System, SystemCtx};
pub use world::{Entity, World};
