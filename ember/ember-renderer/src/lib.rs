//! Ember's renderer: a ray-traced primary pass feeding a surfel-cascade
//! global illumination pipeline, composed into the swapchain by a final
//! full-screen pass.

pub mod cascade;
mod bvh_packer;
mod pipelines;
mod stages;

pub use bvh_packer::BvhPacker;
pub use cascade::{CascadeParams, SurfelCascade, CASCADE_COUNT};
pub use stages::{FinalStage, GeometryStage, GiStage};

use ember_rhi::{buffer, Device, RenderView};
use ember_scene::BvhMaintainer;
use glam::{Mat4, Vec3};
use render_api::{Key, Result, System, SystemCtx};

/// The frame driver: advances time, toggles the debug views, assembles the
/// camera uniform, keeps the BVH fresh, and submits the stages in order.
pub struct Renderer {
    device: Device,

    bvh_maintainer: BvhMaintainer,
    bvh_packer: BvhPacker,

    geometry_stage: GeometryStage,
    gi_stage: GiStage,
    final_stage: FinalStage,

    last_dt: f32,
    show_overlay: bool,
}

impl Renderer {
    pub fn new(device: Device) -> Result<Self> {
        let bvh_maintainer = BvhMaintainer::new();
        let bvh_packer = BvhPacker::new(&device)?;
        let geometry_stage = GeometryStage::new(&device, &bvh_packer.desc)?;
        let gi_stage = GiStage::new(&device, &bvh_packer.desc)?;
        let final_stage = FinalStage::new(&device)?;

        log::info!(target: "graphics", "initialized renderer stages");
        Ok(Self {
            device,
            bvh_maintainer,
            bvh_packer,
            geometry_stage,
            gi_stage,
            final_stage,
            last_dt: 1.0,
            show_overlay: true,
        })
    }

    pub fn last_dt(&self) -> f32 {
        self.last_dt
    }

    pub fn gi_stage_mut(&mut self) -> &mut GiStage {
        &mut self.gi_stage
    }

    /// Destroy renderer resources in reverse construction order, then the
    /// device itself.
    pub fn destroy(mut self) {
        let _ = self.device.wait_idle();
        self.final_stage.destroy(&self.device);
        self.gi_stage.destroy(&self.device);
        self.geometry_stage.destroy(&self.device);
        self.bvh_packer.destroy(&self.device);
        self.device.destroy();
    }
}

impl System for Renderer {
    fn update(&mut self, ctx: &mut SystemCtx, dt: f32) {
        self.last_dt = dt;
        if ctx.input.is_key_pressed(Key::Grave) {
            self.show_overlay = !self.show_overlay;
        }
        if ctx.input.is_key_pressed(Key::F1) {
            self.gi_stage.heatmap = !self.gi_stage.heatmap;
        }
        if ctx.input.is_key_pressed(Key::F2) {
            self.gi_stage.direct_draw = !self.gi_stage.direct_draw;
        }
        if ctx.input.is_key_pressed(Key::F3) {
            self.gi_stage.ground_truth = !self.gi_stage.ground_truth;
        }
    }

    fn render(&mut self, ctx: &mut SystemCtx) {
        // The render view comes from the active camera; no camera, no frame.
        let Some(camera_entity) = ctx.active_camera else {
            return;
        };
        let (Some(transform), Some(camera)) = (
            ctx.world.transform(camera_entity),
            ctx.world.camera(camera_entity),
        ) else {
            return;
        };

        let forward = transform.forward();
        let view = Mat4::look_at_rh(
            transform.position,
            transform.position + forward,
            Vec3::Y,
        );
        let proj = camera.projection(ctx.surface.aspect(), 0.1, 1000.0);
        let render_view = RenderView {
            view,
            proj,
            inv_view: view.inverse(),
            inv_proj: proj.inverse(),
            origin: transform.position,
            fov: camera.fov.to_radians(),
        };

        // A failed acquire drops the frame; the loop retries next tick.
        if !self.device.start_frame() {
            return;
        }

        if buffer::copy_raw(
            &self.device,
            &self.device.frame().render_view,
            0,
            bytemuck::bytes_of(&render_view),
        )
        .is_err()
        {
            log::warn!(target: "graphics", "failed to upload render view");
        }

        // Maintain the scene BVH & mirror it to the GPU.
        self.bvh_maintainer.maintain(ctx.world);
        if let Err(err) = self.bvh_packer.package(&self.device, &self.bvh_maintainer.bvh) {
            log::warn!(target: "graphics", "bvh packaging failed: {err}");
        }

        // Queue the render stages in order.
        self.geometry_stage
            .enqueue(&self.device, ctx.surface, &self.bvh_packer.desc);
        self.gi_stage
            .enqueue(&self.device, ctx.surface, &self.bvh_packer.desc);
        let overlay = self.show_overlay.then(|| self.gi_stage.debug_usage());
        self.final_stage.enqueue(&self.device, ctx.surface, overlay);

        self.device.end_frame();
    }
}
