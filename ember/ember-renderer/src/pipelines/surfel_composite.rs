//! Surfel composite pass: gathers the merged radiance of nearby cascade-0
//! surfels per pixel and multiplies it into the albedo attachment.

use ember_rhi::Device;
use render_api::{Result, SurfaceInfo};

use super::{frame_pc, groups, ComputePass};
use crate::cascade::SurfelCascade;

const COMPOSITE_SHADER: &str = "assets/shaders/surfel_composite.comp.spv";

pub struct SurfelCompositePipeline {
    pass: ComputePass,
}

impl SurfelCompositePipeline {
    pub fn new(device: &Device, cascade: &SurfelCascade) -> Result<Self> {
        let pass = ComputePass::new(
            device,
            COMPOSITE_SHADER,
            &[cascade.desc.layout, device.frame().attach_store_desc.layout],
        )?;
        Ok(Self { pass })
    }

    pub fn enqueue(&self, device: &Device, surface: SurfaceInfo, cascade: &SurfelCascade) {
        let cmd = device.frame().gcb;
        self.pass.bind(
            device,
            cmd,
            &[cascade.desc.set, device.frame().attach_store_desc.set],
            frame_pc(cascade.index, device.fid),
        );
        self.pass.dispatch(
            device,
            cmd,
            groups(surface.width, 8),
            groups(surface.height, 8),
            1,
        );
    }

    pub fn destroy(&self, device: &Device) {
        self.pass.destroy(device);
    }
}
