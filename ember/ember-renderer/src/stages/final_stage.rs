//! Final stage: composes the G-buffers into the swapchain image and lays the
//! debug overlay on top.

use ember_rhi::Device;
use render_api::{Result, SurfaceInfo};

use crate::pipelines::{FinalPipeline, OverlayPipeline};

pub struct FinalStage {
    final_pipeline: FinalPipeline,
    overlay_pipeline: OverlayPipeline,
}

impl FinalStage {
    pub fn new(device: &Device) -> Result<Self> {
        Ok(Self {
            final_pipeline: FinalPipeline::new(device)?,
            overlay_pipeline: OverlayPipeline::new(device)?,
        })
    }

    /// Push final stage commands into the graphics command buffer.
    pub fn enqueue(&self, device: &Device, surface: SurfaceInfo, overlay_usage: Option<f32>) {
        self.final_pipeline.enqueue(device, surface);
        if let Some(usage) = overlay_usage {
            self.overlay_pipeline.enqueue(device, surface, usage);
        }
    }

    pub fn destroy(&self, device: &Device) {
        self.final_pipeline.destroy(device);
        self.overlay_pipeline.destroy(device);
    }
}
