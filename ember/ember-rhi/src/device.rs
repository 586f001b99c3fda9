//! Vulkan initialization & the core per-frame loop (acquire / record /
//! submit / present), plus the immediate-submit path used for uploads.

use std::ffi::{c_void, CStr};
use std::sync::{Mutex, MutexGuard};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use render_api::{Error, Result};

use crate::buffer;
use crate::descriptor::DescriptorBuilder;
use crate::frame::{FrameData, RenderTarget, RenderView, FRAMES_IN_FLIGHT};
use crate::image::{self, RenderAttachment};

/// Vulkan debug-utils messages routed through the logger.
unsafe extern "system" fn vk_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    cb_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*cb_data).p_message).to_string_lossy();
    match severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!(target: "graphics", "{message}")
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!(target: "graphics", "{message}")
        }
        _ => log::info!(target: "graphics", "{message}"),
    }
    vk::FALSE
}

/// Graphics device. Owns the instance, logical device, swapchain, and the
/// frame-in-flight ring.
pub struct Device {
    /// Keeps the Vulkan library loaded for the lifetime of the device.
    _entry: ash::Entry,
    pub instance: ash::Instance,
    pub phy_device: vk::PhysicalDevice,
    pub device: ash::Device,
    pub queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub qf_graphics: u32,
    pub qf_present: u32,
    pub cmd_pool: vk::CommandPool,
    pub surface: vk::SurfaceKHR,
    pub swapchain: vk::SwapchainKHR,
    pub swapchain_fmt: vk::Format,

    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    allocator: Option<Mutex<Allocator>>,

    /// Immediate submit fence & command buffer.
    pub imm_fence: vk::Fence,
    pub imm_cmd: vk::CommandBuffer,

    /// Descriptor pool with static lifetime.
    pub static_desc_pool: vk::DescriptorPool,
    pub nearest_sampler: vk::Sampler,

    pub frames: Vec<FrameData>,
    pub targets: Vec<RenderTarget>,
    /// Monotonic frame index.
    pub fid: u32,
    /// Frame buffer index (fid % FRAMES_IN_FLIGHT).
    pub fbi: usize,
    /// Swapchain image index of the current frame.
    pub sci: u32,
}

impl Device {
    /// Frame data of the current frame slot.
    pub fn frame(&self) -> &FrameData {
        &self.frames[self.fbi]
    }

    /// Swapchain render target of the current frame.
    pub fn rt(&self) -> &RenderTarget {
        &self.targets[self.sci as usize]
    }

    pub fn allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator
            .as_ref()
            .expect("allocator is alive until destroy()")
            .lock()
            .unwrap()
    }

    /// Device initialization: instance, surface, device, swapchain, frame
    /// ring, allocator, per-frame attachments & descriptor sets.
    pub fn init(
        width: u32,
        height: u32,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<Device> {
        let entry = unsafe {
            ash::Entry::load()
                .map_err(|e| Error::device_init(format!("failed to load vulkan library: {e}")))?
        };

        let app_name = c"ember";
        let app_info = vk::ApplicationInfo::default()
            .application_name(app_name)
            .engine_name(app_name)
            .api_version(vk::API_VERSION_1_3);

        let mut i_extensions = ash_window::enumerate_required_extensions(display)
            .map_err(|e| Error::device_init(format!("surface extensions unavailable: {e}")))?
            .to_vec();

        let validation = cfg!(debug_assertions) && has_validation_layer(&entry);
        let mut i_layers = Vec::new();
        if validation {
            i_extensions.push(ash::ext::debug_utils::NAME.as_ptr());
            i_layers.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
        }

        let mut debug_ci = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            )
            .pfn_user_callback(Some(vk_debug_callback));

        let mut instance_ci = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&i_extensions)
            .enabled_layer_names(&i_layers);
        if validation {
            instance_ci = instance_ci.push_next(&mut debug_ci);
        }

        let instance = unsafe {
            entry
                .create_instance(&instance_ci, None)
                .map_err(|e| Error::device_init(format!("failed to init vulkan instance: {e}")))?
        };

        let debug_utils = if validation {
            let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger = unsafe {
                loader
                    .create_debug_utils_messenger(&debug_ci, None)
                    .map_err(|e| Error::device_init(format!("failed to create debug messenger: {e}")))?
            };
            log::info!(target: "graphics", "created vulkan debug messenger");
            Some((loader, messenger))
        } else {
            None
        };

        let surface = unsafe {
            ash_window::create_surface(&entry, &instance, display, window, None).map_err(|e| {
                Error::device_init(format!("failed to create native video output surface: {e}"))
            })?
        };
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let phy_device = pick_physical_device(&instance)?;
        unsafe {
            let props = instance.get_physical_device_properties(phy_device);
            let name = CStr::from_ptr(props.device_name.as_ptr()).to_string_lossy();
            let v = props.api_version;
            log::info!(
                target: "graphics",
                "selected physical device: {name} (v{}.{}.{})",
                vk::api_version_major(v),
                vk::api_version_minor(v),
                vk::api_version_patch(v)
            );
        }

        // One graphics+present queue when the device supports it, otherwise a
        // separate present queue family.
        let qf_props =
            unsafe { instance.get_physical_device_queue_family_properties(phy_device) };
        let qf_graphics = qf_props
            .iter()
            .position(|p| p.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .ok_or_else(|| Error::device_init("failed to find graphics queue family"))?
            as u32;
        let supports_present = |family: u32| unsafe {
            surface_loader
                .get_physical_device_surface_support(phy_device, family, surface)
                .unwrap_or(false)
        };
        let qf_present = if supports_present(qf_graphics) {
            qf_graphics
        } else {
            (0..qf_props.len() as u32)
                .find(|&f| supports_present(f))
                .ok_or_else(|| Error::device_init("no queue family supports present"))?
        };

        let queue_priority = [1.0f32];
        let mut queue_cis = vec![vk::DeviceQueueCreateInfo::default()
            .queue_family_index(qf_graphics)
            .queue_priorities(&queue_priority)];
        if qf_present != qf_graphics {
            queue_cis.push(
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(qf_present)
                    .queue_priorities(&queue_priority),
            );
        }

        let device_exts = [ash::khr::swapchain::NAME.as_ptr()];
        let mut features13 =
            vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);
        let device_ci = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_cis)
            .enabled_extension_names(&device_exts)
            .push_next(&mut features13);
        let device = unsafe {
            instance
                .create_device(phy_device, &device_ci, None)
                .map_err(|e| Error::device_init(format!("failed to create logical device: {e}")))?
        };

        let queue = unsafe { device.get_device_queue(qf_graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(qf_present, 0) };

        let cmd_pool_ci = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(qf_graphics);
        let cmd_pool = unsafe {
            device
                .create_command_pool(&cmd_pool_ci, None)
                .map_err(|e| Error::device_init(format!("failed to create command pool: {e}")))?
        };

        let alloc_cmds = |count: u32| -> Result<Vec<vk::CommandBuffer>> {
            let ai = vk::CommandBufferAllocateInfo::default()
                .command_pool(cmd_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(count);
            unsafe {
                device
                    .allocate_command_buffers(&ai)
                    .map_err(|e| Error::device_init(format!("failed to allocate command buffers: {e}")))
            }
        };

        let mut frames: Vec<FrameData> = (0..FRAMES_IN_FLIGHT)
            .map(|_| FrameData::default())
            .collect();
        for (frame, cmd) in frames.iter_mut().zip(alloc_cmds(FRAMES_IN_FLIGHT as u32)?) {
            frame.gcb = cmd;
        }
        let imm_cmd = alloc_cmds(1)?[0];

        let (swapchain_loader, swapchain, swapchain_fmt, targets) = create_swapchain(
            &instance,
            &device,
            &surface_loader,
            phy_device,
            surface,
            width,
            height,
            qf_graphics,
            qf_present,
        )?;

        // Per-frame sync primitives. Fences start signaled so the first wait
        // on each slot passes.
        for frame in frames.iter_mut() {
            unsafe {
                frame.flight_fence = device
                    .create_fence(
                        &vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED),
                        None,
                    )
                    .map_err(|e| Error::device_init(format!("failed to create render fence: {e}")))?;
                frame.image_acquired = device
                    .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                    .map_err(|e| Error::device_init(format!("failed to create semaphore: {e}")))?;
                frame.render_complete = device
                    .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                    .map_err(|e| Error::device_init(format!("failed to create semaphore: {e}")))?;
            }
        }

        let imm_fence = unsafe {
            device
                .create_fence(
                    &vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED),
                    None,
                )
                .map_err(|e| Error::device_init(format!("failed to create immediate fence: {e}")))?
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device: phy_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| Error::device_init(format!("failed to create gpu allocator: {e}")))?;

        let static_desc_pool = create_descriptor_pool(&device)?;
        let nearest_sampler = unsafe {
            device
                .create_sampler(&vk::SamplerCreateInfo::default(), None)
                .map_err(|e| Error::device_init(format!("failed to create nearest sampler: {e}")))?
        };

        let mut this = Device {
            _entry: entry,
            instance,
            phy_device,
            device,
            queue,
            present_queue,
            qf_graphics,
            qf_present,
            cmd_pool,
            surface,
            swapchain,
            swapchain_fmt,
            surface_loader,
            swapchain_loader,
            debug_utils,
            allocator: Some(Mutex::new(allocator)),
            imm_fence,
            imm_cmd,
            static_desc_pool,
            nearest_sampler,
            frames,
            targets,
            fid: 0,
            fbi: 0,
            sci: 0,
        };
        this.init_frame_attachments(width, height)?;
        Ok(this)
    }

    /// Render-view uniform, G-buffers, and attachment descriptor sets for
    /// every frame slot.
    fn init_frame_attachments(&mut self, width: u32, height: u32) -> Result<()> {
        let mut render_builder = DescriptorBuilder::default();
        render_builder.add_binding(0, vk::DescriptorType::UNIFORM_BUFFER);
        render_builder.add_binding(1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        render_builder.add_binding(2, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);

        let mut store_builder = DescriptorBuilder::default();
        store_builder.add_binding(0, vk::DescriptorType::UNIFORM_BUFFER);
        store_builder.add_binding(1, vk::DescriptorType::STORAGE_IMAGE);
        store_builder.add_binding(2, vk::DescriptorType::STORAGE_IMAGE);

        for i in 0..FRAMES_IN_FLIGHT {
            let render_view = buffer::alloc(
                self,
                std::mem::size_of::<RenderView>() as u64,
                vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
                gpu_allocator::MemoryLocation::CpuToGpu,
            )?;
            buffer::copy_raw(self, &render_view, 0, bytemuck::bytes_of(&RenderView::default()))?;

            let albedo = RenderAttachment::make(
                self,
                vk::Extent2D { width, height },
                vk::Format::R8G8B8A8_UNORM,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::STORAGE,
            )?;
            let normal_depth = RenderAttachment::make(
                self,
                vk::Extent2D { width, height },
                vk::Format::R32G32B32A32_SFLOAT,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::STORAGE,
            )?;

            let attach_render_desc = render_builder.build(
                self,
                vk::ShaderStageFlags::COMPUTE | vk::ShaderStageFlags::FRAGMENT,
            )?;
            attach_render_desc.attach_uniform_buffer(self, 0, &render_view);
            attach_render_desc.attach_image_sampler(
                self,
                1,
                albedo.view,
                self.nearest_sampler,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
            attach_render_desc.attach_image_sampler(
                self,
                2,
                normal_depth.view,
                self.nearest_sampler,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );

            let attach_store_desc = store_builder.build(self, vk::ShaderStageFlags::COMPUTE)?;
            attach_store_desc.attach_uniform_buffer(self, 0, &render_view);
            attach_store_desc.attach_storage_image(self, 1, albedo.view, vk::ImageLayout::GENERAL);
            attach_store_desc.attach_storage_image(
                self,
                2,
                normal_depth.view,
                vk::ImageLayout::GENERAL,
            );

            let frame = &mut self.frames[i];
            frame.render_view = render_view;
            frame.albedo = albedo;
            frame.normal_depth = normal_depth;
            frame.attach_render_desc = attach_render_desc;
            frame.attach_store_desc = attach_store_desc;
        }
        Ok(())
    }

    /// Set up the current frame for rendering: wait for the slot, acquire a
    /// swapchain image, begin recording, clear the target.
    /// Returns false when the frame must be dropped (loop retries).
    pub fn start_frame(&mut self) -> bool {
        self.fbi = self.fid as usize % FRAMES_IN_FLIGHT;
        let cmd = self.frame().gcb;
        let fence = self.frame().flight_fence;
        let image_acquired = self.frame().image_acquired;

        unsafe {
            if self.device.wait_for_fences(&[fence], true, u64::MAX).is_err() {
                return false;
            }
            if self.device.reset_fences(&[fence]).is_err() {
                return false;
            }

            match self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                image_acquired,
                vk::Fence::null(),
            ) {
                Ok((index, _suboptimal)) => self.sci = index,
                Err(e) => {
                    log::warn!(target: "graphics", "failed to acquire swapchain image: {e}");
                    return false;
                }
            }

            let begin = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            if self.device.begin_command_buffer(cmd, &begin).is_err() {
                return false;
            }

            // Clear the swapchain image through a transfer-destination layout.
            let rt_img = self.rt().img;
            image::barrier(
                &self.device,
                cmd,
                rt_img,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::AccessFlags::empty(),
                vk::ImageLayout::UNDEFINED,
                vk::PipelineStageFlags::TRANSFER,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            );
            let clear = vk::ClearColorValue {
                float32: [1.0, 0.0, 0.0, 1.0],
            };
            let range = image::color_subresource_range();
            self.device.cmd_clear_color_image(
                cmd,
                rt_img,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &clear,
                &[range],
            );
        }
        true
    }

    /// Finish rendering the current frame: submit and present.
    pub fn end_frame(&mut self) {
        let cmd = self.frame().gcb;
        let fence = self.frame().flight_fence;
        let image_acquired = self.frame().image_acquired;
        let render_complete = self.frame().render_complete;
        let rt_img = self.rt().img;

        unsafe {
            // Transition the target into a presentable layout.
            image::barrier(
                &self.device,
                cmd,
                rt_img,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::AccessFlags::empty(),
                vk::ImageLayout::PRESENT_SRC_KHR,
            );

            if self.device.end_command_buffer(cmd).is_err() {
                return;
            }

            let wait_stage = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let waits = [image_acquired];
            let cmds = [cmd];
            let signals = [render_complete];
            let submit = vk::SubmitInfo::default()
                .wait_semaphores(&waits)
                .wait_dst_stage_mask(&wait_stage)
                .command_buffers(&cmds)
                .signal_semaphores(&signals);
            if let Err(e) = self.device.queue_submit(self.queue, &[submit], fence) {
                log::warn!(target: "graphics", "failed to submit frame: {e}");
                return;
            }

            let swapchains = [self.swapchain];
            let indices = [self.sci];
            let present = vk::PresentInfoKHR::default()
                .wait_semaphores(&signals)
                .swapchains(&swapchains)
                .image_indices(&indices);
            if let Err(e) = self.swapchain_loader.queue_present(self.present_queue, &present) {
                log::warn!(target: "graphics", "failed to present frame: {e}");
            }
        }

        self.fid += 1;
    }

    /// Record and run commands on the GPU immediately, waiting for completion.
    pub fn imm_submit(&self, record: impl FnOnce(vk::CommandBuffer)) -> bool {
        unsafe {
            if self.device.reset_fences(&[self.imm_fence]).is_err() {
                return false;
            }
            let begin = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            if self.device.begin_command_buffer(self.imm_cmd, &begin).is_err() {
                return false;
            }

            record(self.imm_cmd);

            if self.device.end_command_buffer(self.imm_cmd).is_err() {
                return false;
            }
            let cmds = [self.imm_cmd];
            let submit = vk::SubmitInfo::default().command_buffers(&cmds);
            if self.device.queue_submit(self.queue, &[submit], self.imm_fence).is_err() {
                return false;
            }
            if self
                .device
                .wait_for_fences(&[self.imm_fence], true, u64::MAX)
                .is_err()
            {
                return false;
            }
            self.device.queue_wait_idle(self.queue).is_ok()
        }
    }

    /// Wait for the GPU to become idle; used before teardown.
    pub fn wait_idle(&self) -> bool {
        unsafe { self.device.device_wait_idle().is_ok() }
    }

    /// Cleanup device resources in reverse construction order.
    pub fn destroy(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            for frame in std::mem::take(&mut self.frames) {
                self.device.destroy_fence(frame.flight_fence, None);
                self.device.destroy_semaphore(frame.image_acquired, None);
                self.device.destroy_semaphore(frame.render_complete, None);
                frame.render_view.free(self);
                frame.albedo.free(self);
                frame.normal_depth.free(self);
                frame.attach_render_desc.free(self);
                frame.attach_store_desc.free(self);
            }
            for target in std::mem::take(&mut self.targets) {
                self.device.destroy_image_view(target.view, None);
            }

            // The allocator frees its remaining blocks on drop; it must go
            // before the logical device.
            self.allocator = None;

            self.device.destroy_descriptor_pool(self.static_desc_pool, None);
            self.device.destroy_sampler(self.nearest_sampler, None);
            self.device.destroy_fence(self.imm_fence, None);
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);
            self.device.destroy_command_pool(self.cmd_pool, None);
            self.device.destroy_device(None);
            if let Some((loader, messenger)) = self.debug_utils.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn has_validation_layer(entry: &ash::Entry) -> bool {
    let layers = unsafe {
        entry
            .enumerate_instance_layer_properties()
            .unwrap_or_default()
    };
    layers.iter().any(|l| {
        unsafe { CStr::from_ptr(l.layer_name.as_ptr()) }
            .to_string_lossy()
            .contains("VK_LAYER_KHRONOS_validation")
    })
}

fn pick_physical_device(instance: &ash::Instance) -> Result<vk::PhysicalDevice> {
    let devices = unsafe {
        instance
            .enumerate_physical_devices()
            .map_err(|e| Error::device_init(format!("failed to enumerate physical devices: {e}")))?
    };
    devices
        .into_iter()
        .min_by_key(|&d| {
            let props = unsafe { instance.get_physical_device_properties(d) };
            match props.device_type {
                vk::PhysicalDeviceType::DISCRETE_GPU => 0,
                vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
                vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
                _ => 3,
            }
        })
        .ok_or_else(|| Error::device_init("no vulkan physical device found"))
}

#[allow(clippy::too_many_arguments)]
fn create_swapchain(
    instance: &ash::Instance,
    device: &ash::Device,
    surface_loader: &ash::khr::surface::Instance,
    phy_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    width: u32,
    height: u32,
    qf_graphics: u32,
    qf_present: u32,
) -> Result<(
    ash::khr::swapchain::Device,
    vk::SwapchainKHR,
    vk::Format,
    Vec<RenderTarget>,
)> {
    let formats = unsafe {
        surface_loader
            .get_physical_device_surface_formats(phy_device, surface)
            .map_err(|e| Error::device_init(format!("failed to get surface formats: {e}")))?
    };
    let first = formats
        .first()
        .ok_or_else(|| Error::device_init("no formats for native video output surface"))?;
    let swapchain_fmt = if first.format == vk::Format::UNDEFINED {
        vk::Format::B8G8R8A8_UNORM
    } else {
        first.format
    };

    let capabilities = unsafe {
        surface_loader
            .get_physical_device_surface_capabilities(phy_device, surface)
            .map_err(|e| Error::device_init(format!("failed to get surface capabilities: {e}")))?
    };

    let extent = if capabilities.current_extent.width == u32::MAX {
        vk::Extent2D {
            width: width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    } else {
        capabilities.current_extent
    };

    if capabilities.max_image_count != 0 && capabilities.max_image_count < FRAMES_IN_FLIGHT as u32 {
        return Err(Error::device_init(
            "native video output surface does not support the frame count",
        ));
    }
    let image_count = (FRAMES_IN_FLIGHT as u32).max(capabilities.min_image_count);

    let preferred = vk::SurfaceTransformFlagsKHR::IDENTITY;
    let transform = if capabilities.supported_transforms.contains(preferred) {
        preferred
    } else {
        capabilities.current_transform
    };

    let qf_indices = [qf_graphics, qf_present];
    let mut swapchain_ci = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(swapchain_fmt)
        .image_color_space(vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(vk::PresentModeKHR::FIFO)
        .clipped(true);
    if qf_graphics != qf_present {
        swapchain_ci = swapchain_ci
            .image_sharing_mode(vk::SharingMode::CONCURRENT)
            .queue_family_indices(&qf_indices);
    }

    let swapchain_loader = ash::khr::swapchain::Device::new(instance, device);
    let swapchain = unsafe {
        swapchain_loader
            .create_swapchain(&swapchain_ci, None)
            .map_err(|e| Error::device_init(format!("failed to create swapchain: {e}")))?
    };

    let images = unsafe {
        swapchain_loader
            .get_swapchain_images(swapchain)
            .map_err(|e| Error::device_init(format!("failed to retrieve swapchain images: {e}")))?
    };
    let mut targets = Vec::with_capacity(images.len());
    for img in images {
        let view_ci = vk::ImageViewCreateInfo::default()
            .image(img)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(swapchain_fmt)
            .subresource_range(crate::image::color_subresource_range());
        let view = unsafe {
            device
                .create_image_view(&view_ci, None)
                .map_err(|e| Error::device_init(format!("failed to create swapchain image view: {e}")))?
        };
        targets.push(RenderTarget { view, img });
    }

    Ok((swapchain_loader, swapchain, swapchain_fmt, targets))
}

fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let sizes = [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 128,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_IMAGE,
            descriptor_count: 128,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 128,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_BUFFER,
            descriptor_count: 256,
        },
    ];
    let ci = vk::DescriptorPoolCreateInfo::default()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .max_sets(64)
        .pool_sizes(&sizes);
    unsafe {
        device
            .create_descriptor_pool(&ci, None)
            .map_err(|e| Error::device_init(format!("failed to create descriptor pool: {e}")))
    }
}
