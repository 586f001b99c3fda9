//! Geometry stage: fills the G-buffers with a ray-cast primary pass.

use ember_rhi::{DescriptorSet, Device};
use render_api::{Result, SurfaceInfo};

use crate::pipelines::PrimaryPipeline;

pub struct GeometryStage {
    primary: PrimaryPipeline,
}

impl GeometryStage {
    pub fn new(device: &Device, bvh: &DescriptorSet) -> Result<Self> {
        Ok(Self {
            primary: PrimaryPipeline::new(device, bvh)?,
        })
    }

    /// Push geometry stage commands into the graphics command buffer.
    pub fn enqueue(&self, device: &Device, surface: SurfaceInfo, bvh: &DescriptorSet) {
        self.primary.enqueue(device, surface, bvh);
    }

    pub fn destroy(&self, device: &Device) {
        self.primary.destroy(device);
    }
}
