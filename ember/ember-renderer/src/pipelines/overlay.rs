//! Debug UI overlay pass. Fixed render-pass contract: color-attachment
//! optimal, load=load, store=store. Draws the surfel usage bar in the
//! top-right corner; no text, no external UI toolkit.

use bytemuck::{Pod, Zeroable};
use ember_rhi::pipeline::GraphicsBuilder;
use ember_rhi::{shader, vk, Device};
use render_api::{Result, SurfaceInfo};

const OVERLAY_VERT: &str = "assets/shaders/overlay.vert.spv";
const OVERLAY_FRAG: &str = "assets/shaders/overlay.frag.spv";

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct OverlayPush {
    /// Live surfels over capacity for the debug cascade, 0..1.
    usage: f32,
    aspect: f32,
    _pad: [f32; 2],
}

pub struct OverlayPipeline {
    vert: vk::ShaderModule,
    frag: vk::ShaderModule,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl OverlayPipeline {
    pub fn new(device: &Device) -> Result<Self> {
        let vert = shader::from_file(&device.device, OVERLAY_VERT)?;
        let frag = shader::from_file(&device.device, OVERLAY_FRAG)?;

        let mut builder = GraphicsBuilder::new(device.swapchain_fmt);
        builder
            .set_vertex_entry(vert, "main")
            .set_fragment_entry(frag, "main")
            .add_push_constants(std::mem::size_of::<OverlayPush>() as u32)
            .enable_blend();
        let layout = builder.build_layout(&device.device)?;
        let pipeline = builder.build_pipeline(&device.device, layout)?;

        log::info!(target: "graphics", "initialized overlay pipeline");
        Ok(Self {
            vert,
            frag,
            layout,
            pipeline,
        })
    }

    pub fn enqueue(&self, device: &Device, surface: SurfaceInfo, usage: f32) {
        let cmd = device.frame().gcb;
        let dev = &device.device;
        let rt = device.rt();

        let attachment = vk::RenderingAttachmentInfo::default()
            .image_view(rt.view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::LOAD)
            .store_op(vk::AttachmentStoreOp::STORE);
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

        let push = OverlayPush {
            usage: usage.clamp(0.0, 1.0),
            aspect: surface.aspect(),
            _pad: [0.0; 2],
        };

        unsafe {
            dev.cmd_begin_rendering(cmd, &rendering);
            dev.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
            dev.cmd_push_constants(
                cmd,
                self.layout,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                0,
                bytemuck::bytes_of(&push),
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
            // One quad, 6 vertices from gl_VertexIndex.
            dev.cmd_draw(cmd, 6, 1, 0, 0);
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
