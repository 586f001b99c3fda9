//! Surfel recycle pass: ages every live surfel and pushes expired ones back
//! onto the free stack. The backstop that keeps the system self-healing.

use ember_rhi::Device;
use render_api::Result;

use super::{frame_pc, groups, ComputePass};
use crate::cascade::SurfelCascade;

const RECYCLE_SHADER: &str = "assets/shaders/surfel_recycle.comp.spv";

pub struct SurfelRecyclePipeline {
    pass: ComputePass,
}

impl SurfelRecyclePipeline {
    pub fn new(device: &Device, cascade: &SurfelCascade) -> Result<Self> {
        let pass = ComputePass::new(
            device,
            RECYCLE_SHADER,
            &[cascade.desc.layout, device.frame().attach_store_desc.layout],
        )?;
        Ok(Self { pass })
    }

    pub fn enqueue(&self, device: &Device, cascade: &SurfelCascade) {
        let cmd = device.frame().gcb;
        self.pass.bind(
            device,
            cmd,
            &[cascade.desc.set, device.frame().attach_store_desc.set],
            frame_pc(cascade.index, device.fid),
        );
        let stack_slots = (cascade.stack.size / 4) as u32;
        self.pass.dispatch(device, cmd, groups(stack_slots, 256), 1, 1);
    }

    pub fn destroy(&self, device: &Device) {
        self.pass.destroy(device);
    }
}
