//! The engine facade: owns the world and every host module, creates the
//! device & renderer once a window exists, and drives the system list from
//! the event loop.

use std::time::Instant;

use ember_renderer::Renderer;
use ember_rhi::Device;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use render_api::{Entity, Error, Input, Result, SurfaceInfo, System, SystemCtx, World};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::WindowId;

use crate::window::{self, EngineWindow};
use crate::{Assets, Files};

const DEFAULT_WIDTH: u32 = 1920;
const DEFAULT_HEIGHT: u32 = 1080;

/// Ember engine instance. Spawn entities & register systems, then `run`.
pub struct Engine {
    title: String,

    pub world: World,
    pub input: Input,
    pub files: Files,
    pub assets: Assets,

    /// Active camera entity; has to be set by the game.
    pub active_camera: Option<Entity>,

    /// The renderer always runs first; game systems follow in
    /// registration order.
    systems: Vec<Box<dyn System>>,
    renderer: Option<Renderer>,

    window: Option<EngineWindow>,
    last_tick: Instant,
    failure: Option<Error>,
}

impl Engine {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            world: World::new(),
            input: Input::default(),
            files: Files::new(),
            assets: Assets::new(),
            active_camera: None,
            systems: Vec::new(),
            renderer: None,
            window: None,
            last_tick: Instant::now(),
            failure: None,
        }
    }

    /// Register a game system. Systems run in registration order, after the
    /// renderer.
    pub fn register_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    /// Execute the engine main loop; blocks until the window closes.
    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()
            .map_err(|e| Error::device_init(format!("failed to create event loop: {e}")))?;
        let loop_result = event_loop
            .run_app(&mut self)
            .map_err(|e| Error::device_init(format!("event loop failed: {e}")));

        // Tear down even when the loop itself failed.
        if let Some(renderer) = self.renderer.take() {
            renderer.destroy();
        }
        loop_result?;
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = winit::window::Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(DEFAULT_WIDTH, DEFAULT_HEIGHT));
        let handle = event_loop
            .create_window(attributes)
            .map_err(|e| Error::device_init(format!("failed to create window: {e}")))?;
        let window = EngineWindow::new(handle);

        let display = window
            .handle
            .display_handle()
            .map_err(|e| Error::device_init(format!("no display handle: {e}")))?
            .as_raw();
        let surface = window
            .handle
            .window_handle()
            .map_err(|e| Error::device_init(format!("no window handle: {e}")))?
            .as_raw();

        let device = Device::init(window.width, window.height, display, surface)?;
        self.renderer = Some(Renderer::new(device)?);
        self.window = Some(window);

        log::info!(target: "graphics", "initialized device & renderer");
        Ok(())
    }

    fn tick(&mut self) {
        let Some(window) = &self.window else { return };
        let Some(renderer) = &mut self.renderer else {
            return;
        };

        let now = Instant::now();
        let dt = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        let surface = SurfaceInfo {
            width: window.width,
            height: window.height,
        };
        let mut ctx = SystemCtx {
            world: &mut self.world,
            input: &self.input,
            surface,
            active_camera: self.active_camera,
        };

        renderer.update(&mut ctx, dt);
        for system in self.systems.iter_mut() {
            system.update(&mut ctx, dt);
        }

        renderer.render(&mut ctx);
        for system in self.systems.iter_mut() {
            system.render(&mut ctx);
        }

        // Edge state lives for exactly one tick.
        self.input.clear_state();
    }
}

impl ApplicationHandler for Engine {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init_graphics(event_loop) {
            log::error!(target: "graphics", "failed to init device: {err}");
            self.failure = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                self.tick();
                if let Some(window) = &self.window {
                    window.handle.request_redraw();
                }
            }
            event => {
                window::handle_event(&mut self.input, &event);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.handle.request_redraw();
        }
    }
}
