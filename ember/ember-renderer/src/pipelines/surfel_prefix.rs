//! Surfel prefix-sum pass: a three-kernel exclusive scan that turns the hash
//! grid's per-cell counters into list start offsets.
//!
//! Kernel A scans 1024-cell blocks in shared memory (two cells per thread)
//! and writes each block's total into the segments buffer. Kernel B scans the
//! segments in place with a single work group. Kernel C adds each block's
//! segment offset back onto its elements.

use ember_rhi::buffer::{self, Buffer};
use ember_rhi::{vk, DescriptorBuilder, DescriptorSet, Device, MemoryLocation};
use render_api::Result;

use super::{frame_pc, ComputePass};
use crate::cascade::SurfelCascade;

const SUM_SHADER: &str = "assets/shaders/prefix_sum.comp.spv";
const SEGMENTS_SHADER: &str = "assets/shaders/prefix_segments.comp.spv";
const MERGE_SHADER: &str = "assets/shaders/prefix_merge.comp.spv";

pub(crate) const THREAD_GROUP_SIZE: u32 = 512;
pub(crate) const SEGMENT_SIZE: u32 = THREAD_GROUP_SIZE * 2;

pub struct SurfelPrefixPipeline {
    sum: ComputePass,
    segments: ComputePass,
    merge: ComputePass,
    segments_set: DescriptorSet,
    segments_buffer: Buffer,
}

impl SurfelPrefixPipeline {
    pub fn new(device: &Device, cascade: &SurfelCascade) -> Result<Self> {
        let mut builder = DescriptorBuilder::default();
        builder.add_binding(0, vk::DescriptorType::STORAGE_BUFFER);
        let segments_set = builder.build(device, vk::ShaderStageFlags::COMPUTE)?;

        let layouts = [cascade.desc.layout, segments_set.layout];
        let sum = ComputePass::new(device, SUM_SHADER, &layouts)?;
        let segments = ComputePass::new(device, SEGMENTS_SHADER, &layouts)?;
        let merge = ComputePass::new(device, MERGE_SHADER, &layouts)?;

        let segments_buffer = buffer::alloc(
            device,
            4 * THREAD_GROUP_SIZE as u64,
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        )?;
        segments_set.attach_storage_buffer(device, 0, &segments_buffer);

        Ok(Self {
            sum,
            segments,
            merge,
            segments_set,
            segments_buffer,
        })
    }

    pub fn enqueue(&self, device: &Device, cascade: &SurfelCascade) {
        let cmd = device.frame().gcb;
        let dev = &device.device;
        let pc = frame_pc(cascade.index, device.fid);
        let cells = (cascade.grid.size / 4) as u32;
        let sets = [cascade.desc.set, self.segments_set.set];

        unsafe {
            // Clear the segments buffer; write-after-write against kernel A.
            dev.cmd_fill_buffer(cmd, self.segments_buffer.buffer, 0, self.segments_buffer.size, 0);
        }
        buffer::barrier(
            dev,
            cmd,
            &self.segments_buffer,
            0,
            self.segments_buffer.size,
            vk::PipelineStageFlags::TRANSFER,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_WRITE | vk::AccessFlags::SHADER_READ,
        );
        buffer::rw_barrier(dev, cmd, &cascade.grid);

        // Kernel A: block-local Blelloch scan.
        self.sum.bind(device, cmd, &sets, pc);
        self.sum
            .dispatch(device, cmd, cells / THREAD_GROUP_SIZE, 1, 1);

        buffer::rw_barrier(dev, cmd, &cascade.grid);
        buffer::barrier(
            dev,
            cmd,
            &self.segments_buffer,
            0,
            self.segments_buffer.size,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_WRITE,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_WRITE | vk::AccessFlags::SHADER_READ,
        );

        // Kernel B: single-group scan of the block totals.
        self.segments.bind(device, cmd, &sets, pc);
        self.segments.dispatch(device, cmd, 1, 1, 1);

        buffer::barrier(
            dev,
            cmd,
            &self.segments_buffer,
            0,
            self.segments_buffer.size,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_WRITE,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_READ,
        );

        // Kernel C: push the segment offsets back onto every block element.
        self.merge.bind(device, cmd, &sets, pc);
        self.merge
            .dispatch(device, cmd, cells / THREAD_GROUP_SIZE, 1, 1);
    }

    pub fn destroy(self, device: &Device) {
        self.sum.destroy(device);
        self.segments.destroy(device);
        self.merge.destroy(device);
        self.segments_buffer.free(device);
        self.segments_set.free(device);
    }
}

#[cfg(test)]
mod tests {
    //! CPU reference of the kernel triple. The arithmetic mirrors the GLSL:
    //! per-block exclusive Blelloch scan, block totals into segments, single
    //! group scan of the segments, then the per-block offset add.

    use super::{SEGMENT_SIZE, THREAD_GROUP_SIZE};

    fn kernel_a(grid: &mut [u32], segments: &mut [u32]) {
        let cells = grid.len() as u32;
        let groups = cells / THREAD_GROUP_SIZE;
        for group in 0..groups {
            let base = (group * SEGMENT_SIZE) as usize;
            if base >= grid.len() {
                // Over-dispatched groups fall outside the grid and only
                // write their (zero) total.
                if (group as usize) < segments.len() {
                    segments[group as usize] = 0;
                }
                continue;
            }
            let block = &mut grid[base..(base + SEGMENT_SIZE as usize).min(cells as usize)];
            let mut total = 0u32;
            for v in block.iter_mut() {
                let c = *v;
                *v = total;
                total += c;
            }
            segments[group as usize] = total;
        }
    }

    fn kernel_b(segments: &mut [u32]) {
        let mut total = 0u32;
        for v in segments.iter_mut() {
            let c = *v;
            *v = total;
            total += c;
        }
    }

    fn kernel_c(grid: &mut [u32], segments: &[u32]) {
        let cells = grid.len() as u32;
        let groups = cells / THREAD_GROUP_SIZE;
        for group in 0..groups {
            let base = (group * SEGMENT_SIZE) as usize;
            if base >= grid.len() {
                continue;
            }
            let end = (base + SEGMENT_SIZE as usize).min(cells as usize);
            for v in &mut grid[base..end] {
                *v += segments[group as usize];
            }
        }
    }

    fn scan(input: &[u32]) -> Vec<u32> {
        let mut grid = input.to_vec();
        let mut segments = vec![0u32; THREAD_GROUP_SIZE as usize];
        kernel_a(&mut grid, &mut segments);
        kernel_b(&mut segments);
        kernel_c(&mut grid, &segments);
        grid
    }

    fn sequential(input: &[u32]) -> Vec<u32> {
        let mut total = 0u32;
        input
            .iter()
            .map(|&v| {
                let c = total;
                total += v;
                c
            })
            .collect()
    }

    #[test]
    fn matches_the_sequential_scan_for_1024_multiples() {
        for cells in [1024usize, 4096, 512 * 512] {
            let input: Vec<u32> = (0..cells as u32).map(|i| (i * 7 + 3) % 13).collect();
            assert_eq!(scan(&input), sequential(&input), "cells = {cells}");
        }
    }

    #[test]
    fn one_two_three_up_to_1024() {
        let input: Vec<u32> = (1..=1024).collect();
        let out = scan(&input);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 1);
        assert_eq!(out[2], 3);
        assert_eq!(out[3], 6);
        assert_eq!(out[1023], 523_776);
        // With the grid's slack slot appended the scan leaves the total in
        // the final element.
        let mut with_slack: Vec<u32> = (1..=1024).collect();
        with_slack.push(0);
        with_slack.resize(2048, 0);
        let out = scan(&with_slack);
        assert_eq!(out[1024], 524_800);
    }

    #[test]
    fn scan_is_exclusive() {
        let input = vec![5u32; 2048];
        let out = scan(&input);
        assert_eq!(out[0], 0);
        assert_eq!(out[2047], 5 * 2047);
    }
}
