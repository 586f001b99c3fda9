//! Compute & graphics pipeline builders. Graphics pipelines target dynamic
//! rendering; vertex-free full-screen passes only.

use ash::vk;
use render_api::{Error, Result};

/// Builder for compute pipelines: one shader entry, N descriptor set
/// layouts, optional push constants.
#[derive(Default)]
pub struct ComputeBuilder<'a> {
    shader: vk::ShaderModule,
    entry: &'a str,
    set_layouts: Vec<vk::DescriptorSetLayout>,
    push_constant_size: u32,
}

impl<'a> ComputeBuilder<'a> {
    pub fn set_shader_entry(&mut self, shader: vk::ShaderModule, entry: &'a str) -> &mut Self {
        self.shader = shader;
        self.entry = entry;
        self
    }

    pub fn add_descriptor_set(&mut self, layout: vk::DescriptorSetLayout) -> &mut Self {
        self.set_layouts.push(layout);
        self
    }

    pub fn add_push_constants(&mut self, size: u32) -> &mut Self {
        self.push_constant_size = size;
        self
    }

    pub fn build_layout(&self, device: &ash::Device) -> Result<vk::PipelineLayout> {
        let ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::COMPUTE,
            offset: 0,
            size: self.push_constant_size,
        }];
        let mut ci = vk::PipelineLayoutCreateInfo::default().set_layouts(&self.set_layouts);
        if self.push_constant_size > 0 {
            ci = ci.push_constant_ranges(&ranges);
        }
        unsafe {
            device
                .create_pipeline_layout(&ci, None)
                .map_err(|e| Error::device_init(format!("failed to create pipeline layout: {e}")))
        }
    }

    pub fn build_pipeline(
        &self,
        device: &ash::Device,
        layout: vk::PipelineLayout,
    ) -> Result<vk::Pipeline> {
        let entry = std::ffi::CString::new(self.entry)
            .map_err(|_| Error::device_init("invalid shader entry point name"))?;
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(self.shader)
            .name(&entry);
        let ci = vk::ComputePipelineCreateInfo::default().stage(stage).layout(layout);
        let pipelines = unsafe {
            device
                .create_compute_pipelines(vk::PipelineCache::null(), &[ci], None)
                .map_err(|(_, e)| Error::device_init(format!("failed to create compute pipeline: {e}")))?
        };
        Ok(pipelines[0])
    }
}

/// Builder for full-screen graphics pipelines (vertex-id triangle, dynamic
/// rendering, single color attachment).
pub struct GraphicsBuilder<'a> {
    vertex: (vk::ShaderModule, &'a str),
    fragment: (vk::ShaderModule, &'a str),
    set_layouts: Vec<vk::DescriptorSetLayout>,
    color_format: vk::Format,
    blend: bool,
    push_constant_size: u32,
}

impl<'a> GraphicsBuilder<'a> {
    pub fn new(color_format: vk::Format) -> Self {
        Self {
            vertex: (vk::ShaderModule::null(), "main"),
            fragment: (vk::ShaderModule::null(), "main"),
            set_layouts: Vec::new(),
            color_format,
            blend: false,
            push_constant_size: 0,
        }
    }

    pub fn set_vertex_entry(&mut self, shader: vk::ShaderModule, entry: &'a str) -> &mut Self {
        self.vertex = (shader, entry);
        self
    }

    pub fn set_fragment_entry(&mut self, shader: vk::ShaderModule, entry: &'a str) -> &mut Self {
        self.fragment = (shader, entry);
        self
    }

    pub fn add_descriptor_set(&mut self, layout: vk::DescriptorSetLayout) -> &mut Self {
        self.set_layouts.push(layout);
        self
    }

    /// Enable alpha blending on the color attachment (used by the overlay).
    pub fn enable_blend(&mut self) -> &mut Self {
        self.blend = true;
        self
    }

    pub fn add_push_constants(&mut self, size: u32) -> &mut Self {
        self.push_constant_size = size;
        self
    }

    pub fn build_layout(&self, device: &ash::Device) -> Result<vk::PipelineLayout> {
        let ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            offset: 0,
            size: self.push_constant_size,
        }];
        let mut ci = vk::PipelineLayoutCreateInfo::default().set_layouts(&self.set_layouts);
        if self.push_constant_size > 0 {
            ci = ci.push_constant_ranges(&ranges);
        }
        unsafe {
            device
                .create_pipeline_layout(&ci, None)
                .map_err(|e| Error::device_init(format!("failed to create pipeline layout: {e}")))
        }
    }

    pub fn build_pipeline(
        &self,
        device: &ash::Device,
        layout: vk::PipelineLayout,
    ) -> Result<vk::Pipeline> {
        let vs_entry = std::ffi::CString::new(self.vertex.1)
            .map_err(|_| Error::device_init("invalid shader entry point name"))?;
        let fs_entry = std::ffi::CString::new(self.fragment.1)
            .map_err(|_| Error::device_init("invalid shader entry point name"))?;
        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(self.vertex.0)
                .name(&vs_entry),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(self.fragment.0)
                .name(&fs_entry),
        ];

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);
        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let attachment = if self.blend {
            vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                .alpha_blend_op(vk::BlendOp::ADD)
                .color_write_mask(vk::ColorComponentFlags::RGBA)
        } else {
            vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
        };
        let attachments = [attachment];
        let color_blend =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let color_formats = [self.color_format];
        let mut rendering =
            vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);

        let ci = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic)
            .layout(layout)
            .push_next(&mut rendering);

        let pipelines = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[ci], None)
                .map_err(|(_, e)| Error::device_init(format!("failed to create graphics pipeline: {e}")))?
        };
        Ok(pipelines[0])
    }
}
