//! Per-frame resources: one set per frame in flight.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::buffer::Buffer;
use crate::descriptor::DescriptorSet;
use crate::image::RenderAttachment;

/// Number of frame-in-flight resource sets.
pub const FRAMES_IN_FLIGHT: usize = 3;

/// One swapchain image and its view.
#[derive(Clone, Copy, Default)]
pub struct RenderTarget {
    pub view: vk::ImageView,
    pub img: vk::Image,
}

/// View parameters for rendering, uploaded once per frame.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct RenderView {
    pub view: Mat4,
    pub proj: Mat4,
    pub inv_view: Mat4,
    pub inv_proj: Mat4,
    pub origin: Vec3,
    /// Field of view in radians.
    pub fov: f32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            inv_view: Mat4::IDENTITY,
            inv_proj: Mat4::IDENTITY,
            origin: Vec3::ZERO,
            fov: 0.0,
        }
    }
}

/// Data for rendering a single frame. Each slot owns its command buffer, sync
/// primitives, G-buffers, view uniform, and the two descriptor sets binding
/// the attachments as sampled / storage respectively.
#[derive(Default)]
pub struct FrameData {
    /// Graphics command buffer holding all draw commands for this frame.
    pub gcb: vk::CommandBuffer,
    /// Uniform buffer for camera state.
    pub render_view: Buffer,
    /// G-buffer: albedo (rgba8 unorm).
    pub albedo: RenderAttachment,
    /// G-buffer: rgb = world normal, a = linear depth (rgba32 sfloat).
    pub normal_depth: RenderAttachment,
    /// Attachments bound as combined image samplers (fragment reads).
    pub attach_render_desc: DescriptorSet,
    /// Attachments bound as storage images (compute writes).
    pub attach_store_desc: DescriptorSet,
    /// Host waits on this before reusing the slot.
    pub flight_fence: vk::Fence,
    /// Signaled by the swapchain acquire, waited at submit.
    pub image_acquired: vk::Semaphore,
    /// Signaled by submit, waited by present.
    pub render_complete: vk::Semaphore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_view_matches_the_uniform_block() {
        // 4 mat4 + vec3 + float = 4*64 + 16.
        assert_eq!(std::mem::size_of::<RenderView>(), 272);
    }

    #[test]
    fn frame_ring_advances_modulo_n() {
        let mut fid = 0u32;
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(fid as usize % FRAMES_IN_FLIGHT);
            fid += 1;
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    }
}
