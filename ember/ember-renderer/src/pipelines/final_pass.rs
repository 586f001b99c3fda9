//! Final pass pipeline: full-screen triangle that reads the G-buffers, tone
//! maps, and writes the swapchain image.

use ember_rhi::pipeline::GraphicsBuilder;
use ember_rhi::{image, shader, vk, Device};
use render_api::{Result, SurfaceInfo};

const FINAL_VERT: &str = "assets/shaders/final.vert.spv";
const FINAL_FRAG: &str = "assets/shaders/final.frag.spv";

pub struct FinalPipeline {
    vert: vk::ShaderModule,
    frag: vk::ShaderModule,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl FinalPipeline {
    pub fn new(device: &Device) -> Result<Self> {
        let vert = shader::from_file(&device.device, FINAL_VERT)?;
        let frag = shader::from_file(&device.device, FINAL_FRAG)?;

        let mut builder = GraphicsBuilder::new(device.swapchain_fmt);
        builder
            .set_vertex_entry(vert, "main")
            .set_fragment_entry(frag, "main")
            .add_descriptor_set(device.frame().attach_render_desc.layout);
        let layout = builder.build_layout(&device.device)?;
        let pipeline = builder.build_pipeline(&device.device, layout)?;

        log::info!(target: "graphics", "initialized final pipeline");
        Ok(Self {
            vert,
            frag,
            layout,
            pipeline,
        })
    }

    pub fn enqueue(&self, device: &Device, surface: SurfaceInfo) {
        let cmd = device.frame().gcb;
        let dev = &device.device;
        let frame = device.frame();
        let rt = device.rt();

        // The swapchain image was cleared through transfer-dst; move it to
        // color-attachment for the raster passes.
        image::barrier(
            dev,
            cmd,
            rt.img,
            vk::PipelineStageFlags::TRANSFER,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        );

        // Wait on the compute writes before the fragment shader samples the
        // G-buffers.
        for attachment in [&frame.albedo, &frame.normal_depth] {
            image::barrier(
                dev,
                cmd,
                attachment.image,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_WRITE,
                vk::ImageLayout::GENERAL,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::AccessFlags::SHADER_READ,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        }

        let clear = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.05, 0.05, 0.05, 1.0],
            },
        };
        let attachment = vk::RenderingAttachmentInfo::default()
            .image_view(rt.view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(clear);
        let attachments = [attachment];
        let rendering = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: surface.width,
                    height: surface.height,
                },
            })
            .layer_count(1)
            .color_attachments(&attachments);

        unsafe {
            dev.cmd_begin_rendering(cmd, &rendering);
            dev.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
            dev.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.layout,
                0,
                &[frame.attach_render_desc.set],
                &[],
            );
            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: surface.width as f32,
                height: surface.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            dev.cmd_set_viewport(cmd, 0, &[viewport]);
            dev.cmd_set_scissor(
                cmd,
                0,
                &[vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: vk::Extent2D {
                        width: surface.width,
                        height: surface.height,
                    },
                }],
            );
            // Full-screen triangle from gl_VertexIndex.
            dev.cmd_draw(cmd, 3, 1, 0, 0);
            dev.cmd_end_rendering(cmd);
        }
    }

    pub fn destroy(&self, device: &Device) {
        unsafe {
            device.device.destroy_shader_module(self.vert, None);
            device.device.destroy_shader_module(self.frag, None);
            device.device.destroy_pipeline_layout(self.layout, None);
            device.device.destroy_pipeline(self.pipeline, None);
        }
    }
}
