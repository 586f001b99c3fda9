//! Primary pass pipeline: camera rays against the scene BVH, filling the
//! albedo and normal+depth G-buffers.

use ember_rhi::{image, vk, DescriptorSet, Device};
use render_api::{Result, SurfaceInfo};

use super::{groups, ComputePass};

const PRIMARY_SHADER: &str = "assets/shaders/primary.comp.spv";

pub struct PrimaryPipeline {
    pass: ComputePass,
}

impl PrimaryPipeline {
    pub fn new(device: &Device, bvh: &DescriptorSet) -> Result<Self> {
        let pass = ComputePass::new(
            device,
            PRIMARY_SHADER,
            &[device.frame().attach_store_desc.layout, bvh.layout],
        )?;
        Ok(Self { pass })
    }

    pub fn enqueue(&self, device: &Device, surface: SurfaceInfo, bvh: &DescriptorSet) {
        let cmd = device.frame().gcb;
        let frame = device.frame();

        // Transition both G-buffers into general layout for shader writes.
        for attachment in [&frame.albedo, &frame.normal_depth] {
            image::barrier(
                &device.device,
                cmd,
                attachment.image,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::AccessFlags::empty(),
                vk::ImageLayout::UNDEFINED,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_WRITE,
                vk::ImageLayout::GENERAL,
            );
        }

        self.pass.bind(
            device,
            cmd,
            &[frame.attach_store_desc.set, bvh.set],
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
