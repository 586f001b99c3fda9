//! Mirrors the CPU BVH into GPU storage buffers whenever it changes, and owns
//! the descriptor set the ray kernels traverse through.

use ember_rhi::buffer::{self, Buffer};
use ember_rhi::{vk, DescriptorBuilder, DescriptorSet, Device, MemoryLocation};
use ember_scene::{Bvh, GpuNode, TriNormals, Triangle};
use render_api::Result;

/// Worst-case element capacity of the packed buffers (~2M).
const PACK_CAPACITY: u64 = 1 << 21;

pub struct BvhPacker {
    pub desc: DescriptorSet,
    nodes: Buffer,
    prims: Buffer,
    norms: Buffer,
    prev_nodes_used: u32,
    prev_prim_count: u32,
}

impl BvhPacker {
    pub fn new(device: &Device) -> Result<Self> {
        let usage = vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::TRANSFER_DST;
        let nodes = buffer::alloc(
            device,
            std::mem::size_of::<GpuNode>() as u64 * PACK_CAPACITY,
            usage,
            MemoryLocation::GpuOnly,
        )?;
        let prims = buffer::alloc(
            device,
            std::mem::size_of::<Triangle>() as u64 * PACK_CAPACITY,
            usage,
            MemoryLocation::GpuOnly,
        )?;
        let norms = buffer::alloc(
            device,
            std::mem::size_of::<TriNormals>() as u64 * PACK_CAPACITY,
            usage,
            MemoryLocation::GpuOnly,
        )?;

        let mut builder = DescriptorBuilder::default();
        builder
            .add_binding(0, vk::DescriptorType::STORAGE_BUFFER)
            .add_binding(1, vk::DescriptorType::STORAGE_BUFFER)
            .add_binding(2, vk::DescriptorType::STORAGE_BUFFER);
        let desc = builder.build(device, vk::ShaderStageFlags::COMPUTE)?;
        desc.attach_storage_buffer(device, 0, &nodes);
        desc.attach_storage_buffer(device, 1, &prims);
        desc.attach_storage_buffer(device, 2, &norms);

        Ok(Self {
            desc,
            nodes,
            prims,
            norms,
            prev_nodes_used: 0,
            prev_prim_count: 0,
        })
    }

    /// Upload the packed BVH when its identity changed since the last call.
    /// Uploads run on the immediate queue; the fence wait inside makes the
    /// new data visible before the next frame's consumers.
    pub fn package(&mut self, device: &Device, bvh: &Bvh) -> Result<()> {
        if !bvh.gpu_nodes.is_empty() && self.prev_nodes_used != bvh.nodes_used {
            buffer::upload(device, &self.nodes, bytemuck::cast_slice(&bvh.gpu_nodes))?;
            self.prev_nodes_used = bvh.nodes_used;
        }
        if !bvh.prims.is_empty() && self.prev_prim_count != bvh.prim_count() {
            buffer::upload(device, &self.prims, bytemuck::cast_slice(&bvh.prims))?;
            buffer::upload(device, &self.norms, bytemuck::cast_slice(&bvh.norms))?;
            self.prev_prim_count = bvh.prim_count();
        }
        Ok(())
    }

    pub fn destroy(self, device: &Device) {
        self.desc.free(device);
        self.nodes.free(device);
        self.prims.free(device);
        self.norms.free(device);
    }
}
