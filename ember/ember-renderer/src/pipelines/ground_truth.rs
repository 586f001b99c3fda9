//! Reference pass: brute-force path trace of the indirect light, bypassing
//! the cascade pipeline entirely. Slow; debugging only.

use ember_rhi::{DescriptorSet, Device};
use render_api::{Result, SurfaceInfo};

use super::{groups, ComputePass};

const GROUND_TRUTH_SHADER: &str = "assets/shaders/ground_truth.comp.spv";

pub struct GroundTruthPipeline {
    pass: ComputePass,
}

impl GroundTruthPipeline {
    pub fn new(device: &Device, bvh: &DescriptorSet) -> Result<Self> {
        let pass = ComputePass::new(
            device,
            GROUND_TRUTH_SHADER,
            &[device.frame().attach_store_desc.layout, bvh.layout],
        )?;
        Ok(Self { pass })
    }

    pub fn enqueue(&self, device: &Device, surface: SurfaceInfo, bvh: &DescriptorSet) {
        let cmd = device.frame().gcb;
        self.pass.bind(
            device,
            cmd,
            &[device.frame().attach_store_desc.set, bvh.set],
            device.fid,
        );
        self.pass.dispatch(
            device,
            cmd,
            groups(surface.width, 16),
            groups(surface.height, 8),
            1,
        );
    }

    pub fn destroy(&self, device: &Device) {
        self.pass.destroy(device);
    }
}
