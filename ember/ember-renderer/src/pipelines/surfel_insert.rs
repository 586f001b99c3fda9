//! Surfel insert pass: writes every live surfel's index into its hash cell's
//! slice of the list, using the scanned grid offsets as write cursors.

use ember_rhi::Device;
use render_api::Result;

use super::{frame_pc, groups, ComputePass};
use crate::cascade::SurfelCascade;

const INSERT_SHADER: &str = "assets/shaders/surfel_insert.comp.spv";

pub struct SurfelInsertPipeline {
    pass: ComputePass,
}

impl SurfelInsertPipeline {
    pub fn new(device: &Device, cascade: &SurfelCascade) -> Result<Self> {
        let pass = ComputePass::new(
            device,
            INSERT_SHADER,
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
        self.pass.dispatch(device, cmd, groups(probe_capacity, 128), 1, 1);
    }

    pub fn destroy(&self, device: &Device) {
        self.pass.destroy(device);
    }
}
