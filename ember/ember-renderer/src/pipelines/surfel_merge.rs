//! Surfel merge pass: reconstructs a finer cascade's merged cache from its
//! own intervals and the interpolated radiance of the next coarser cascade.

use ember_rhi::Device;
use render_api::Result;

use super::{frame_pc, groups, ComputePass, PC_SRC_IS_TOP};
use crate::cascade::SurfelCascade;

const MERGE_SHADER: &str = "assets/shaders/surfel_merge.comp.spv";

pub struct SurfelMergePipeline {
    pass: ComputePass,
}

impl SurfelMergePipeline {
    pub fn new(device: &Device, cascade: &SurfelCascade) -> Result<Self> {
        let pass = ComputePass::new(
            device,
            MERGE_SHADER,
            &[
                cascade.desc.layout,
                cascade.desc.layout,
                device.frame().attach_store_desc.layout,
            ],
        )?;
        Ok(Self { pass })
    }

    /// Merge `src` (coarser) into `dst` (finer). `src_is_top` marks the
    /// topmost cascade, whose raw cache doubles as its merged cache.
    pub fn enqueue(
        &self,
        device: &Device,
        src: &SurfelCascade,
        dst: &SurfelCascade,
        src_is_top: bool,
    ) {
        let cmd = device.frame().gcb;
        let mut pc = frame_pc(dst.index, device.fid);
        if src_is_top {
            pc |= PC_SRC_IS_TOP;
        }
        self.pass.bind(
            device,
            cmd,
            &[dst.desc.set, src.desc.set, device.frame().attach_store_desc.set],
            pc,
        );
        self.pass.dispatch(
            device,
            cmd,
            groups(dst.rad.width, 16),
            groups(dst.rad.height, 16),
            1,
        );
    }

    pub fn destroy(&self, device: &Device) {
        self.pass.destroy(device);
    }
}
