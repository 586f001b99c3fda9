//! Surfel count pass: every live surfel bumps its hash cell's counter; the
//! prefix sum then turns the counters into list offsets.

use ember_rhi::Device;
use render_api::Result;

use super::{frame_pc, groups, ComputePass};
use crate::cascade::SurfelCascade;

const COUNT_SHADER: &str = "assets/shaders/surfel_count.comp.spv";

pub struct SurfelCountPipeline {
    pass: ComputePass,
}

impl SurfelCountPipeline {
    pub fn new(device: &Device, cascade: &SurfelCascade) -> Result<Self> {
        let pass = ComputePass::new(
            device,
            COUNT_SHADER,
            &[cascade.desc.layout, device.frame().attach_store_desc.layout],
        )?;
        Ok(Self { pass })
    }

    pub fn enqueue(&self, device: &Device, cascade: &SurfelCascade, probe_capacity: u32) {
        let cmd = device.frame().gcb;
        self.pass.bind(
            device,
            cmd,
            &[cascade.desc.set, device.frame().attach_store_desc.set],
            frame_pc(cascade.index, device.fid),
        );
        // Dispatch over capacity; the kernel guards on the live count so the
        // advisory host readback never gates the dispatch shape.
        self.pass.dispatch(device, cmd, groups(probe_capacity, 128), 1, 1);
    }

    pub fn destroy(&self, device: &Device) {
        self.pass.destroy(device);
    }
}
