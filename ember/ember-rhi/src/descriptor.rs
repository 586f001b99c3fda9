//! Descriptor set layout builder & attachment helpers.

use ash::vk;
use render_api::{Error, Result};

use crate::buffer::Buffer;
use crate::Device;

/// Collects bindings, then builds a layout + set pair from the static pool.
#[derive(Default)]
pub struct DescriptorBuilder {
    bindings: Vec<(u32, vk::DescriptorType)>,
}

/// A descriptor set together with its layout.
#[derive(Default)]
pub struct DescriptorSet {
    pub layout: vk::DescriptorSetLayout,
    pub set: vk::DescriptorSet,
}

impl DescriptorBuilder {
    pub fn add_binding(&mut self, binding: u32, ty: vk::DescriptorType) -> &mut Self {
        self.bindings.push((binding, ty));
        self
    }

    pub fn build(&self, device: &Device, stages: vk::ShaderStageFlags) -> Result<DescriptorSet> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = self
            .bindings
            .iter()
            .map(|&(binding, ty)| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(binding)
                    .descriptor_type(ty)
                    .descriptor_count(1)
                    .stage_flags(stages)
            })
            .collect();
        let layout_ci = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = unsafe {
            device
                .device
                .create_descriptor_set_layout(&layout_ci, None)
                .map_err(|e| Error::device_init(format!("failed to create descriptor layout: {e}")))?
        };

        let layouts = [layout];
        let ai = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(device.static_desc_pool)
            .set_layouts(&layouts);
        let set = unsafe {
            device
                .device
                .allocate_descriptor_sets(&ai)
                .map_err(|e| Error::out_of_resources(format!("failed to allocate descriptor set: {e}")))?[0]
        };
        Ok(DescriptorSet { layout, set })
    }
}

impl DescriptorSet {
    pub fn attach_uniform_buffer(&self, device: &Device, binding: u32, buffer: &Buffer) {
        self.attach_buffer(device, binding, buffer, vk::DescriptorType::UNIFORM_BUFFER);
    }

    pub fn attach_storage_buffer(&self, device: &Device, binding: u32, buffer: &Buffer) {
        self.attach_buffer(device, binding, buffer, vk::DescriptorType::STORAGE_BUFFER);
    }

    fn attach_buffer(
        &self,
        device: &Device,
        binding: u32,
        buffer: &Buffer,
        ty: vk::DescriptorType,
    ) {
        let info = [vk::DescriptorBufferInfo {
            buffer: buffer.buffer,
            offset: 0,
            range: buffer.size,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(binding)
            .descriptor_type(ty)
            .buffer_info(&info);
        unsafe { device.device.update_descriptor_sets(&[write], &[]) };
    }

    pub fn attach_storage_image(
        &self,
        device: &Device,
        binding: u32,
        view: vk::ImageView,
        layout: vk::ImageLayout,
    ) {
        let info = [vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: view,
            image_layout: layout,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
            .image_info(&info);
        unsafe { device.device.update_descriptor_sets(&[write], &[]) };
    }

    pub fn attach_image_sampler(
        &self,
        device: &Device,
        binding: u32,
        view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    ) {
        let info = [vk::DescriptorImageInfo {
            sampler,
            image_view: view,
            image_layout: layout,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&info);
        unsafe { device.device.update_descriptor_sets(&[write], &[]) };
    }

    pub fn free(self, device: &Device) {
        unsafe {
            let _ = device
                .device
                .free_descriptor_sets(device.static_desc_pool, &[self.set]);
            device.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}
