//! Surfel cascade parameters & per-cascade GPU resources.

use bytemuck::{Pod, Zeroable};
use ember_rhi::buffer::{self, Buffer};
use ember_rhi::image::Texture2D;
use ember_rhi::{vk, DescriptorBuilder, DescriptorSet, Device, MemoryLocation};
use render_api::Result;

/// Number of cascade levels.
pub const CASCADE_COUNT: u32 = 6;

/// Spatial branch factor between cascades.
pub const SPATIAL_FACTOR: u32 = 4;
/// Angular branch factor between cascades.
pub const ANGULAR_FACTOR: u32 = 4;

// The half-factor shortcuts below are only valid for power-of-two factors
// that divide by two.
const _: () = assert!(SPATIAL_FACTOR.is_power_of_two() && SPATIAL_FACTOR % 2 == 0);
const _: () = assert!(ANGULAR_FACTOR.is_power_of_two() && ANGULAR_FACTOR % 2 == 0);

/// Maximum number of surfels referenced per hash grid cell.
pub const CELL_CAPACITY: u32 = 12 - 1;

/// 262,144 probes at cascade 0.
pub const MAX_SURFEL_COUNT: u32 = 1 << 18;

/// Tunable cascade parameters; the `c0_` values apply to cascade 0 and the
/// per-cascade values derive from them through the branch factors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeParams {
    /// Entries in the spatial hash grid.
    pub c0_grid_capacity: u32,
    /// Grid cells per world unit at cascade 0; cells double per cascade.
    pub c0_grid_scale: f32,
    /// Max surfels referenced per grid cell.
    pub cell_capacity: u32,
    /// sqrt(interval count per surfel) at cascade 0.
    pub c0_memory_width: u32,
    /// Max live surfels at cascade 0.
    pub c0_probe_capacity: u32,
    /// Surfel influence radius at cascade 0 (screen-space factor).
    pub c0_probe_radius: f32,
    /// Upper bound on per-interval solid angle.
    pub max_solid_angle: f32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            // 512 * 512 comes from the segment size of the prefix sum; the
            // last slot has to stay empty for the exclusive scan.
            c0_grid_capacity: (512 * 512) - 1,
            c0_grid_scale: 70.0,
            cell_capacity: CELL_CAPACITY,
            c0_memory_width: 4,
            c0_probe_capacity: MAX_SURFEL_COUNT,
            c0_probe_radius: 0.002,
            max_solid_angle: 0.005,
        }
    }
}

/// GPU copy of the parameters plus the cascade index; scalar fields only so
/// the block layout matches std140 without padding games.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct GpuCascadeParams {
    pub c0_grid_capacity: u32,
    pub c0_grid_scale: f32,
    pub cell_capacity: u32,
    pub c0_memory_width: u32,
    pub c0_probe_capacity: u32,
    pub c0_probe_radius: f32,
    pub max_solid_angle: f32,
    pub cascade_index: u32,
}

impl CascadeParams {
    /// sqrt of the interval count of one surfel at cascade `i`.
    pub fn memory_width(&self, cascade: u32) -> u32 {
        self.c0_memory_width * (ANGULAR_FACTOR / 2).pow(cascade)
    }

    /// Max live surfels at cascade `i`.
    pub fn probe_capacity(&self, cascade: u32) -> u32 {
        self.c0_probe_capacity / SPATIAL_FACTOR.pow(cascade)
    }

    /// Hash grid capacity; shared across cascades.
    pub fn grid_capacity(&self, _cascade: u32) -> u32 {
        self.c0_grid_capacity
    }

    /// Side length of the (square) tiled radiance cache at cascade `i`.
    pub fn cache_width(&self, cascade: u32) -> u32 {
        let cap = self.probe_capacity(cascade);
        debug_assert!(cap.is_power_of_two() && cap.trailing_zeros() % 2 == 0);
        self.memory_width(cascade) * (1 << (cap.trailing_zeros() / 2))
    }

    /// The grid must stay a power-of-two multiple of the scan segment grid,
    /// minus the slack slot the exclusive scan needs. The single-group
    /// segment scan caps the cell count at 512 blocks of 1024.
    pub fn validate(&self) -> bool {
        let cells = self.c0_grid_capacity + 1;
        const SEGMENT_GRID: u32 = 512 * 512;
        cells % SEGMENT_GRID == 0
            && (cells / SEGMENT_GRID).is_power_of_two()
            && cells / 1024 <= 512
    }

    pub fn gpu(&self, cascade_index: u32) -> GpuCascadeParams {
        GpuCascadeParams {
            c0_grid_capacity: self.c0_grid_capacity,
            c0_grid_scale: self.c0_grid_scale,
            cell_capacity: self.cell_capacity,
            c0_memory_width: self.c0_memory_width,
            c0_probe_capacity: self.c0_probe_capacity,
            c0_probe_radius: self.c0_probe_radius,
            max_solid_angle: self.max_solid_angle,
            cascade_index,
        }
    }
}

/// Per-cascade GPU state: the parameter uniform, the surfel stack (slot 0 is
/// the live counter, the rest a free list), the hash grid offsets, the
/// cell-to-surfel list, the surfel attribute buffers, and the two radiance
/// cache textures.
#[derive(Default)]
pub struct SurfelCascade {
    pub index: u32,
    pub desc: DescriptorSet,
    pub param: Buffer,
    pub stack: Buffer,
    pub grid: Buffer,
    pub list: Buffer,
    pub posr: Buffer,
    pub norw: Buffer,
    pub rad: Texture2D,
    pub merge: Texture2D,
    /// Advisory live count mirrored back from the GPU; UI only.
    pub surfel_count: u32,
}

impl SurfelCascade {
    pub fn alloc(device: &Device, params: &CascadeParams, index: u32) -> Result<Self> {
        assert!(params.validate(), "grid capacity breaks the scan contract");

        let surfel_cap = params.probe_capacity(index) as u64;
        let grid_cap = params.grid_capacity(index) as u64;
        let cache_width = params.cache_width(index);

        let storage = vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::TRANSFER_DST;
        let param = buffer::alloc(
            device,
            std::mem::size_of::<GpuCascadeParams>() as u64,
            vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::CpuToGpu,
        )?;
        let stack = buffer::alloc(
            device,
            4 * (1 + surfel_cap),
            storage | vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::GpuOnly,
        )?;
        // +1 slot of slack for the exclusive scan total.
        let grid = buffer::alloc(device, 4 * (grid_cap + 1), storage, MemoryLocation::GpuOnly)?;
        let list = buffer::alloc(
            device,
            4 * surfel_cap * params.cell_capacity as u64,
            storage,
            MemoryLocation::GpuOnly,
        )?;
        let posr = buffer::alloc(device, 16 * surfel_cap, storage, MemoryLocation::GpuOnly)?;
        let norw = buffer::alloc(device, 16 * surfel_cap, storage, MemoryLocation::GpuOnly)?;

        let texture_usage = vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::TRANSFER_SRC;
        let extent = vk::Extent2D {
            width: cache_width,
            height: cache_width,
        };
        let rad = Texture2D::make(device, extent, vk::Format::R16G16B16A16_SFLOAT, texture_usage)?;
        let merge =
            Texture2D::make(device, extent, vk::Format::R16G16B16A16_SFLOAT, texture_usage)?;

        // The spawn pass reads the grid before the first rebuild, so the
        // storage buffers must start zeroed.
        for buf in [&grid, &list, &posr, &norw] {
            buffer::fill(device, 0, buf);
        }

        // Initialize the stack as a full free list: count 0, then 0..N-1.
        let mut init_stack = Vec::with_capacity(1 + surfel_cap as usize);
        init_stack.push(0u32);
        init_stack.extend(0..surfel_cap as u32);
        buffer::upload(device, &stack, bytemuck::cast_slice(&init_stack))?;

        buffer::copy_raw(device, &param, 0, bytemuck::bytes_of(&params.gpu(index)))?;

        let mut builder = DescriptorBuilder::default();
        builder
            .add_binding(0, vk::DescriptorType::UNIFORM_BUFFER)
            .add_binding(1, vk::DescriptorType::STORAGE_BUFFER)
            .add_binding(2, vk::DescriptorType::STORAGE_BUFFER)
            .add_binding(3, vk::DescriptorType::STORAGE_BUFFER)
            .add_binding(4, vk::DescriptorType::STORAGE_BUFFER)
            .add_binding(5, vk::DescriptorType::STORAGE_BUFFER)
            .add_binding(6, vk::DescriptorType::STORAGE_IMAGE)
            .add_binding(7, vk::DescriptorType::STORAGE_IMAGE);
        let desc = builder.build(device, vk::ShaderStageFlags::COMPUTE)?;
        desc.attach_uniform_buffer(device, 0, &param);
        desc.attach_storage_buffer(device, 1, &stack);
        desc.attach_storage_buffer(device, 2, &grid);
        desc.attach_storage_buffer(device, 3, &list);
        desc.attach_storage_buffer(device, 4, &posr);
        desc.attach_storage_buffer(device, 5, &norw);
        desc.attach_storage_image(device, 6, rad.view, vk::ImageLayout::GENERAL);
        desc.attach_storage_image(device, 7, merge.view, vk::ImageLayout::GENERAL);

        Ok(Self {
            index,
            desc,
            param,
            stack,
            grid,
            list,
            posr,
            norw,
            rad,
            merge,
            surfel_count: 0,
        })
    }

    pub fn free(self, device: &Device) {
        self.param.free(device);
        self.stack.free(device);
        self.grid.free(device);
        self.list.free(device);
        self.posr.free(device);
        self.norw.free(device);
        self.rad.free(device);
        self.merge.free(device);
        self.desc.free(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_hold_the_scan_contract() {
        let params = CascadeParams::default();
        assert!(params.validate());
        assert_eq!(params.c0_grid_capacity + 1, 512 * 512);
    }

    #[test]
    fn capacities_shrink_and_widths_grow_per_cascade() {
        let params = CascadeParams::default();
        for i in 0..CASCADE_COUNT {
            assert_eq!(params.probe_capacity(i), MAX_SURFEL_COUNT / 4u32.pow(i));
            assert_eq!(params.memory_width(i), 4 << i);
            assert_eq!(params.grid_capacity(i), params.c0_grid_capacity);
        }
    }

    #[test]
    fn cache_side_stays_constant_across_cascades() {
        // Probe count shrinks by 4 while the angular width doubles, so the
        // tiled texture keeps one size.
        let params = CascadeParams::default();
        let side = params.cache_width(0);
        assert_eq!(side, 4 * 512);
        for i in 1..CASCADE_COUNT {
            assert_eq!(params.cache_width(i), side);
        }
    }

    #[test]
    fn gpu_block_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<GpuCascadeParams>(), 32);
    }

    #[test]
    fn bad_grid_capacities_are_rejected() {
        let mut params = CascadeParams::default();
        params.c0_grid_capacity = 1000;
        assert!(!params.validate());
        params.c0_grid_capacity = 3 * 512 * 512 - 1;
        assert!(!params.validate());
        params.c0_grid_capacity = 2 * 512 * 512 - 1;
        assert!(params.validate());
    }

    #[test]
    fn stack_free_list_layout() {
        // Mirror of the GPU initialization: slot 0 is the live counter,
        // slots 1..N hold the free indices in order.
        let cap = 16u32;
        let mut stack = vec![0u32];
        stack.extend(0..cap);
        assert_eq!(stack.len(), 17);
        assert_eq!(stack[0], 0);

        // Pop: counter++ and read the slot the old counter points past.
        let mut pop = || {
            let prev = stack[0];
            stack[0] += 1;
            stack[1 + prev as usize]
        };
        assert_eq!(pop(), 0);
        assert_eq!(pop(), 1);
        assert_eq!(stack[0], 2);
    }

    #[test]
    fn overspawn_is_clamped_by_the_stack() {
        // Sequential model of the spawn/recycle stack discipline: heavy
        // spawn pressure against a tiny capacity never overshoots it, and
        // recycled slots become spawnable again.
        const CAP: u32 = 16;
        const TTL: u32 = 8;
        let mut stack = vec![0u32];
        stack.extend(0..CAP);
        let mut ttl = vec![0u32; CAP as usize];

        for _frame in 0..60 {
            // Spawn pass: far more candidates than capacity.
            for _ in 0..100 {
                let prev = stack[0];
                if prev >= CAP {
                    continue; // silently dropped
                }
                let id = stack[1 + prev as usize];
                stack[0] += 1;
                ttl[id as usize] = TTL;
            }
            assert!(stack[0] <= CAP);

            // Recycle pass over the live region.
            let mut gid = 0;
            while gid < stack[0] {
                let id = stack[1 + gid as usize];
                ttl[id as usize] -= 1;
                if ttl[id as usize] == 0 {
                    let prev = stack[0];
                    stack[0] -= 1;
                    stack.swap(1 + gid as usize, prev as usize);
                    continue; // re-check the swapped-in slot
                }
                gid += 1;
            }
        }

        // Used and free halves stay disjoint permutations of 0..CAP.
        let live = stack[0] as usize;
        let mut all: Vec<u32> = stack[1..].to_vec();
        all.sort_unstable();
        assert_eq!(all, (0..CAP).collect::<Vec<_>>());
        assert!(stack[1..1 + live].iter().all(|&id| ttl[id as usize] > 0));
        assert!(stack[1 + live..].iter().all(|&id| ttl[id as usize] == 0));
    }
}
