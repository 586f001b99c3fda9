//! Vulkan buffer helpers: allocation through the GPU allocator, staged
//! uploads over the immediate queue, readback, and memory barriers.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use render_api::{Error, Result};

use crate::Device;

/// Buffer instance with its memory allocation.
#[derive(Default)]
pub struct Buffer {
    pub buffer: vk::Buffer,
    pub size: u64,
    allocation: Option<Allocation>,
}

impl Buffer {
    /// Read one u32 from a host-visible (readback) buffer at a word index.
    pub fn read_u32(&self, index: usize) -> Option<u32> {
        let mapped = self.allocation.as_ref()?.mapped_slice()?;
        let offset = index * 4;
        mapped
            .get(offset..offset + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Free the buffer memory.
    pub fn free(mut self, device: &Device) {
        if let Some(allocation) = self.allocation.take() {
            let _ = device.allocator().free(allocation);
        }
        if self.buffer != vk::Buffer::null() {
            unsafe { device.device.destroy_buffer(self.buffer, None) };
        }
    }
}

/// Allocate a new buffer.
pub fn alloc(
    device: &Device,
    size: u64,
    usage: vk::BufferUsageFlags,
    location: MemoryLocation,
) -> Result<Buffer> {
    let size = size.max(4);
    let ci = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    let buffer = unsafe {
        device
            .device
            .create_buffer(&ci, None)
            .map_err(|e| Error::out_of_resources(format!("failed to create buffer: {e}")))?
    };
    let requirements = unsafe { device.device.get_buffer_memory_requirements(buffer) };
    let allocation = device
        .allocator()
        .allocate(&AllocationCreateDesc {
            name: "buffer",
            requirements,
            location,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
        .map_err(|e| Error::out_of_resources(format!("buffer allocation refused: {e}")))?;
    unsafe {
        device
            .device
            .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            .map_err(|e| Error::out_of_resources(format!("failed to bind buffer memory: {e}")))?;
    }
    Ok(Buffer {
        buffer,
        size,
        allocation: Some(allocation),
    })
}

/// Copy data from CPU memory directly into a host-visible buffer.
pub fn copy_raw(_device: &Device, buffer: &Buffer, offset: u64, data: &[u8]) -> Result<()> {
    let allocation = buffer
        .allocation
        .as_ref()
        .ok_or_else(|| Error::out_of_resources("buffer has no allocation"))?;
    let mapped = allocation
        .mapped_ptr()
        .ok_or_else(|| Error::out_of_resources("buffer is not host visible"))?;
    unsafe {
        std::ptr::copy_nonoverlapping(
            data.as_ptr(),
            mapped.as_ptr().cast::<u8>().add(offset as usize),
            data.len(),
        );
    }
    Ok(())
}

/// Copy between GPU buffers over the immediate queue.
pub fn copy(device: &Device, src: &Buffer, dst: &Buffer, size: u64) -> bool {
    let (src, dst) = (src.buffer, dst.buffer);
    device.imm_submit(|cmd| unsafe {
        let region = vk::BufferCopy::default().size(size);
        device.device.cmd_copy_buffer(cmd, src, dst, &[region]);
    })
}

/// Fill a GPU buffer with a repeated 32-bit value over the immediate queue.
pub fn fill(device: &Device, val: u32, dst: &Buffer) -> bool {
    let buffer = dst.buffer;
    let size = dst.size;
    device.imm_submit(|cmd| unsafe {
        device.device.cmd_fill_buffer(cmd, buffer, 0, size, val);
    })
}

/// Upload data from the CPU to a GPU buffer using a staging buffer.
pub fn upload(device: &Device, dst: &Buffer, data: &[u8]) -> Result<()> {
    let stage = alloc(
        device,
        data.len() as u64,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryLocation::CpuToGpu,
    )?;
    copy_raw(device, &stage, 0, data)?;
    let ok = copy(device, &stage, dst, data.len() as u64);
    stage.free(device);
    if ok {
        Ok(())
    } else {
        Err(Error::out_of_resources("staged buffer upload failed"))
    }
}

/// Memory sync barrier on a buffer range.
#[allow(clippy::too_many_arguments)]
pub fn barrier(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    buffer: &Buffer,
    offset: u64,
    size: u64,
    src_stage: vk::PipelineStageFlags,
    src_access: vk::AccessFlags,
    dst_stage: vk::PipelineStageFlags,
    dst_access: vk::AccessFlags,
) {
    let barrier = vk::BufferMemoryBarrier::default()
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .buffer(buffer.buffer)
        .offset(offset)
        .size(size);
    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[barrier],
            &[],
        );
    }
}

/// Shader-write then shader-read barrier over a whole buffer; the edge every
/// compute pass pair in the GI pipeline needs.
pub fn rw_barrier(device: &ash::Device, cmd: vk::CommandBuffer, buffer: &Buffer) {
    barrier(
        device,
        cmd,
        buffer,
        0,
        buffer.size,
        vk::PipelineStageFlags::COMPUTE_SHADER,
        vk::AccessFlags::SHADER_WRITE,
        vk::PipelineStageFlags::COMPUTE_SHADER,
        vk::AccessFlags::SHADER_READ,
    );
}
