//! Vulkan image helpers: render attachments, storage textures, and layout
//! transition barriers.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use render_api::{Error, Result};

use crate::Device;

pub fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Layout transition & memory access barrier on a single-mip color image.
#[allow(clippy::too_many_arguments)]
pub fn barrier(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    src_stage: vk::PipelineStageFlags,
    src_access: vk::AccessFlags,
    old_layout: vk::ImageLayout,
    dst_stage: vk::PipelineStageFlags,
    dst_access: vk::AccessFlags,
    new_layout: vk::ImageLayout,
) {
    let barrier = vk::ImageMemoryBarrier::default()
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_subresource_range());
    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

fn create_image(
    device: &Device,
    size: vk::Extent2D,
    format: vk::Format,
    usage: vk::ImageUsageFlags,
) -> Result<(vk::Image, Allocation, vk::ImageView)> {
    let image_ci = vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .format(format)
        .extent(vk::Extent3D {
            width: size.width,
            height: size.height,
            depth: 1,
        })
        .mip_levels(1)
        .array_layers(1)
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(usage)
        .initial_layout(vk::ImageLayout::UNDEFINED);
    let image = unsafe {
        device
            .device
            .create_image(&image_ci, None)
            .map_err(|e| Error::out_of_resources(format!("failed to create image: {e}")))?
    };
    let requirements = unsafe { device.device.get_image_memory_requirements(image) };
    let allocation = device
        .allocator()
        .allocate(&AllocationCreateDesc {
            name: "image",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
        .map_err(|e| Error::out_of_resources(format!("image allocation refused: {e}")))?;
    unsafe {
        device
            .device
            .bind_image_memory(image, allocation.memory(), allocation.offset())
            .map_err(|e| Error::out_of_resources(format!("failed to bind image memory: {e}")))?;
    }

    let view_ci = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .subresource_range(color_subresource_range());
    let view = unsafe {
        device
            .device
            .create_image_view(&view_ci, None)
            .map_err(|e| Error::device_init(format!("failed to create image view: {e}")))?
    };
    Ok((image, allocation, view))
}

/// Rendering attachment, e.g. albedo or normal+depth.
#[derive(Default)]
pub struct RenderAttachment {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub format: vk::Format,
    allocation: Option<Allocation>,
}

impl RenderAttachment {
    pub fn make(
        device: &Device,
        size: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> Result<Self> {
        let (image, allocation, view) = create_image(device, size, format, usage)?;
        Ok(Self {
            image,
            view,
            format,
            allocation: Some(allocation),
        })
    }

    pub fn free(mut self, device: &Device) {
        unsafe { device.device.destroy_image_view(self.view, None) };
        if let Some(allocation) = self.allocation.take() {
            let _ = device.allocator().free(allocation);
        }
        unsafe { device.device.destroy_image(self.image, None) };
    }
}

/// Storage texture with a tracked size, e.g. a cascade radiance cache.
#[derive(Default)]
pub struct Texture2D {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub format: vk::Format,
    pub width: u32,
    pub height: u32,
    allocation: Option<Allocation>,
}

impl Texture2D {
    pub fn make(
        device: &Device,
        size: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> Result<Self> {
        let (image, allocation, view) = create_image(device, size, format, usage)?;
        Ok(Self {
            image,
            view,
            format,
            width: size.width,
            height: size.height,
            allocation: Some(allocation),
        })
    }

    pub fn free(mut self, device: &Device) {
        unsafe { device.device.destroy_image_view(self.view, None) };
        if let Some(allocation) = self.allocation.take() {
            let _ = device.allocator().free(allocation);
        }
        unsafe { device.device.destroy_image(self.image, None) };
    }
}
