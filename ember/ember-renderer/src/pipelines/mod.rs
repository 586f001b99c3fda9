//! The render pass pipelines. Each pass owns its pipeline exclusively and
//! borrows the device & descriptor layouts it was constructed with;
//! destruction is driven by the owning stage in reverse construction order.

mod final_pass;
mod ground_truth;
mod overlay;
mod primary;
mod surfel_composite;
mod surfel_count;
mod surfel_draw;
mod surfel_gather;
mod surfel_heatmap;
mod surfel_insert;
mod surfel_merge;
mod surfel_prefix;
mod surfel_recycle;
mod surfel_spawn;

pub use final_pass::FinalPipeline;
pub use ground_truth::GroundTruthPipeline;
pub use overlay::OverlayPipeline;
pub use primary::PrimaryPipeline;
pub use surfel_composite::SurfelCompositePipeline;
pub use surfel_count::SurfelCountPipeline;
pub use surfel_draw::SurfelDrawPipeline;
pub use surfel_gather::SurfelGatherPipeline;
pub use surfel_heatmap::SurfelHeatmapPipeline;
pub use surfel_insert::SurfelInsertPipeline;
pub use surfel_merge::SurfelMergePipeline;
pub use surfel_prefix::SurfelPrefixPipeline;
pub use surfel_recycle::SurfelRecyclePipeline;
pub use surfel_spawn::SurfelSpawnPipeline;

use ember_rhi::pipeline::ComputeBuilder;
use ember_rhi::{shader, vk, Device};
use render_api::Result;

/// Pack the per-pass push constant: cascade index in the low half, frame
/// index in the high half (the kernels use it as a random seed).
pub(crate) fn frame_pc(cascade: u32, fid: u32) -> u32 {
    (cascade & 0x7FFF) | (fid << 16)
}

/// Push-constant bit telling the merge kernel that its source cascade is the
/// topmost one (whose raw cache doubles as its merged cache).
pub(crate) const PC_SRC_IS_TOP: u32 = 1 << 15;

pub(crate) fn groups(size: u32, group: u32) -> u32 {
    size.div_ceil(group)
}

/// One compute pipeline around an opaque SPIR-V kernel: shader module,
/// layout, pipeline, and the bind-and-push boilerplate every pass shares.
pub(crate) struct ComputePass {
    shader: vk::ShaderModule,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl ComputePass {
    pub fn new(
        device: &Device,
        path: &str,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Self> {
        let shader = shader::from_file(&device.device, path)?;

        let mut builder = ComputeBuilder::default();
        builder.set_shader_entry(shader, "main");
        for &layout in set_layouts {
            builder.add_descriptor_set(layout);
        }
        builder.add_push_constants(std::mem::size_of::<u32>() as u32);

        let layout = builder.build_layout(&device.device)?;
        let pipeline = builder.build_pipeline(&device.device, layout)?;

        log::info!(target: "graphics", "initialized compute pipeline '{path}'");
        Ok(Self {
            shader,
            layout,
            pipeline,
        })
    }

    /// Bind the pipeline & its descriptor sets, push the frame constant.
    pub fn bind(&self, device: &Device, cmd: vk::CommandBuffer, sets: &[vk::DescriptorSet], pc: u32) {
        unsafe {
            device
                .device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::COMPUTE, self.pipeline);
            device.device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::COMPUTE,
                self.layout,
                0,
                sets,
                &[],
            );
            device.device.cmd_push_constants(
                cmd,
                self.layout,
                vk::ShaderStageFlags::COMPUTE,
                0,
                &pc.to_ne_bytes(),
            );
        }
    }

    pub fn dispatch(&self, device: &Device, cmd: vk::CommandBuffer, x: u32, y: u32, z: u32) {
        unsafe { device.device.cmd_dispatch(cmd, x, y, z) };
    }

    pub fn destroy(&self, device: &Device) {
        unsafe {
            device.device.destroy_shader_module(self.shader, None);
            device.device.destroy_pipeline_layout(self.layout, None);
            device.device.destroy_pipeline(self.pipeline, None);
        }
    }
}
