//! Surfel spawn pass: walks the G-buffer and probabilistically plants new
//! surfels on visible surface where the local hash cell still has room.

use ember_rhi::Device;
use render_api::{Result, SurfaceInfo};

use super::{frame_pc, groups, ComputePass};
use crate::cascade::SurfelCascade;

const SPAWN_SHADER: &str = "assets/shaders/surfel_spawn.comp.spv";

pub struct SurfelSpawnPipeline {
    pass: ComputePass,
}

impl SurfelSpawnPipeline {
    pub fn new(device: &Device, cascade: &SurfelCascade) -> Result<Self> {
        let pass = ComputePass::new(
            device,
            SPAWN_SHADER,
            &[cascade.desc.layout, device.frame().attach_render_desc.layout],
        )?;
        Ok(Self { pass })
    }

    pub fn enqueue(&self, device: &Device, surface: SurfaceInfo, cascade: &SurfelCascade) {
        let cmd = device.frame().gcb;
        self.pass.bind(
            device,
            cmd,
            &[cascade.desc.set, device.frame().attach_render_desc.set],
            frame_pc(cascade.index, device.fid),
        );
        self.pass.dispatch(
            device,
            cmd,
            groups(surface.width, 16),
            groups(surface.height, 16),
            1,
        );
    }

    pub fn destroy(&self, device: &Device) {
        self.pass.destroy(device);
    }
}
