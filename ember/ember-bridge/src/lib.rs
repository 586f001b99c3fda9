//! Host side of Ember: the window & input bridge, the logger backend, file
//! and asset loading, and the engine loop that drives every system.

mod assets;
mod engine;
mod files;
mod logger;
mod model;
mod window;

pub use assets::{Asset, Assets};
pub use engine::Engine;
pub use files::Files;
pub use logger::init_logging;
pub use model::load_mesh;
