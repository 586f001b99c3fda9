//! Global illumination stage: the per-cascade surfel pipeline.
//!
//! Per frame: spawn surfels from the G-buffer, rebuild every cascade's hash
//! grid (clear, count, prefix-scan, insert), gather radiance intervals
//! against the BVH, merge coarse cascades into fine ones, composite into the
//! albedo attachment, then recycle expired surfels. Every write→read edge
//! between passes is an explicit barrier on the specific resource.

use ember_rhi::buffer::{self, Buffer};
use ember_rhi::{image, vk, DescriptorSet, Device, MemoryLocation, FRAMES_IN_FLIGHT};
use render_api::{Result, SurfaceInfo};

use crate::cascade::{CascadeParams, SurfelCascade, CASCADE_COUNT};
use crate::pipelines::{
    GroundTruthPipeline, SurfelCompositePipeline, SurfelCountPipeline, SurfelDrawPipeline,
    SurfelGatherPipeline, SurfelHeatmapPipeline, SurfelInsertPipeline, SurfelMergePipeline,
    SurfelPrefixPipeline, SurfelRecyclePipeline, SurfelSpawnPipeline,
};

pub struct GiStage {
    pub params: CascadeParams,
    pub cascades: Vec<SurfelCascade>,

    spawn: SurfelSpawnPipeline,
    count: SurfelCountPipeline,
    prefix: SurfelPrefixPipeline,
    insert: SurfelInsertPipeline,
    gather: SurfelGatherPipeline,
    merge: SurfelMergePipeline,
    composite: SurfelCompositePipeline,
    recycle: SurfelRecyclePipeline,
    heatmap_pipeline: SurfelHeatmapPipeline,
    draw_pipeline: SurfelDrawPipeline,
    ground_truth_pipeline: GroundTruthPipeline,

    /// Ring of `stack[0]` mirrors, one slot per frame and cascade. Advisory;
    /// read back for the overlay only, never gates a dispatch.
    readback: Buffer,

    /// Debug toggles.
    pub heatmap: bool,
    pub direct_draw: bool,
    pub ground_truth: bool,
    pub debug_cascade_index: u32,
}

impl GiStage {
    pub fn new(device: &Device, bvh: &DescriptorSet) -> Result<Self> {
        let params = CascadeParams::default();
        let cascades = alloc_cascades(device, &params)?;

        // All cascades share one descriptor layout shape; pipeline layouts
        // are built against cascade 0 and stay compatible with the rest.
        let c0 = &cascades[0];
        let spawn = SurfelSpawnPipeline::new(device, c0)?;
        let count = SurfelCountPipeline::new(device, c0)?;
        let prefix = SurfelPrefixPipeline::new(device, c0)?;
        let insert = SurfelInsertPipeline::new(device, c0)?;
        let gather = SurfelGatherPipeline::new(device, bvh, c0)?;
        let merge = SurfelMergePipeline::new(device, c0)?;
        let composite = SurfelCompositePipeline::new(device, c0)?;
        let recycle = SurfelRecyclePipeline::new(device, c0)?;
        let heatmap_pipeline = SurfelHeatmapPipeline::new(device, c0)?;
        let draw_pipeline = SurfelDrawPipeline::new(device, c0)?;
        let ground_truth_pipeline = GroundTruthPipeline::new(device, bvh)?;

        let readback = buffer::alloc(
            device,
            4 * (FRAMES_IN_FLIGHT as u64) * CASCADE_COUNT as u64,
            vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuToCpu,
        )?;

        Ok(Self {
            params,
            cascades,
            spawn,
            count,
            prefix,
            insert,
            gather,
            merge,
            composite,
            recycle,
            heatmap_pipeline,
            draw_pipeline,
            ground_truth_pipeline,
            readback,
            heatmap: false,
            direct_draw: false,
            ground_truth: false,
            debug_cascade_index: 0,
        })
    }

    fn debug_cascade(&self) -> &SurfelCascade {
        let index = (self.debug_cascade_index as usize).min(self.cascades.len() - 1);
        &self.cascades[index]
    }

    /// Live-count over capacity for the debug cascade; overlay fuel.
    pub fn debug_usage(&self) -> f32 {
        let cascade = self.debug_cascade();
        cascade.surfel_count as f32 / self.params.probe_capacity(cascade.index).max(1) as f32
    }

    /// Reallocate every cascade after a parameter change.
    pub fn update_params(&mut self, device: &Device, params: CascadeParams) -> Result<()> {
        let _ = device.wait_idle();
        for cascade in self.cascades.drain(..) {
            cascade.free(device);
        }
        self.params = params;
        self.cascades = alloc_cascades(device, &self.params)?;
        Ok(())
    }

    /// Push GI stage commands into the graphics command buffer.
    pub fn enqueue(&mut self, device: &Device, surface: SurfaceInfo, bvh: &DescriptorSet) {
        let cmd = device.frame().gcb;
        let dev = &device.device;
        let frame = device.frame();

        if self.ground_truth {
            // Reference path: read-modify-write the albedo the primary pass
            // just wrote.
            for attachment in [&frame.albedo, &frame.normal_depth] {
                image::barrier(
                    dev,
                    cmd,
                    attachment.image,
                    vk::PipelineStageFlags::COMPUTE_SHADER,
                    vk::AccessFlags::SHADER_WRITE,
                    vk::ImageLayout::GENERAL,
                    vk::PipelineStageFlags::COMPUTE_SHADER,
                    vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
                    vk::ImageLayout::GENERAL,
                );
            }
            self.ground_truth_pipeline.enqueue(device, surface, bvh);
            return;
        }

        // The slot we are about to reuse was fenced; its mirror holds the
        // live counts recorded FRAMES_IN_FLIGHT frames ago.
        for cascade in self.cascades.iter_mut() {
            let slot = device.fbi * CASCADE_COUNT as usize + cascade.index as usize;
            cascade.surfel_count = self.readback.read_u32(slot).unwrap_or(0);
        }

        // G-buffers become sampled inputs for the spawn pass.
        for attachment in [&frame.albedo, &frame.normal_depth] {
            image::barrier(
                dev,
                cmd,
                attachment.image,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_WRITE,
                vk::ImageLayout::GENERAL,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_READ,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        }
        for cascade in &self.cascades {
            buffer::rw_barrier(dev, cmd, &cascade.grid);
        }

        for cascade in &self.cascades {
            self.spawn.enqueue(device, surface, cascade);
        }

        // Back to general layout for the passes that write through them.
        for attachment in [&frame.albedo, &frame.normal_depth] {
            image::barrier(
                dev,
                cmd,
                attachment.image,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_READ,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_WRITE | vk::AccessFlags::SHADER_READ,
                vk::ImageLayout::GENERAL,
            );
        }

        // Clear the hash grids. Fill counts as a transfer write, so fence it
        // from the spawn pass's accesses and from the count pass after.
        for cascade in &self.cascades {
            buffer::barrier(
                dev,
                cmd,
                &cascade.grid,
                0,
                cascade.grid.size,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
                vk::PipelineStageFlags::TRANSFER,
                vk::AccessFlags::TRANSFER_WRITE,
            );
            unsafe {
                dev.cmd_fill_buffer(cmd, cascade.grid.buffer, 0, cascade.grid.size, 0);
            }
        }
        for cascade in &self.cascades {
            buffer::barrier(
                dev,
                cmd,
                &cascade.grid,
                0,
                cascade.grid.size,
                vk::PipelineStageFlags::TRANSFER,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            );
            buffer::rw_barrier(dev, cmd, &cascade.stack);
        }

        for cascade in &self.cascades {
            self.count
                .enqueue(device, cascade, self.params.probe_capacity(cascade.index));
        }

        for cascade in &self.cascades {
            self.prefix.enqueue(device, cascade);
        }

        for cascade in &self.cascades {
            buffer::rw_barrier(dev, cmd, &cascade.grid);
        }
        for cascade in &self.cascades {
            self.insert
                .enqueue(device, cascade, self.params.probe_capacity(cascade.index));
        }

        // Mirror stack[0] into the readback ring. Advisory only; nothing in
        // this frame consumes the value.
        for cascade in &self.cascades {
            buffer::barrier(
                dev,
                cmd,
                &cascade.stack,
                0,
                4,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_WRITE,
                vk::PipelineStageFlags::TRANSFER,
                vk::AccessFlags::TRANSFER_READ,
            );
            let slot = device.fbi * CASCADE_COUNT as usize + cascade.index as usize;
            let region = vk::BufferCopy::default()
                .src_offset(0)
                .dst_offset(4 * slot as u64)
                .size(4);
            unsafe {
                dev.cmd_copy_buffer(cmd, cascade.stack.buffer, self.readback.buffer, &[region]);
            }
            buffer::barrier(
                dev,
                cmd,
                &cascade.stack,
                0,
                4,
                vk::PipelineStageFlags::TRANSFER,
                vk::AccessFlags::TRANSFER_READ,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_WRITE | vk::AccessFlags::SHADER_READ,
            );
        }

        // Radiance caches come back as fresh shader-write targets each frame.
        for cascade in &self.cascades {
            for texture in [&cascade.rad, &cascade.merge] {
                image::barrier(
                    dev,
                    cmd,
                    texture.image,
                    vk::PipelineStageFlags::COMPUTE_SHADER,
                    vk::AccessFlags::SHADER_WRITE,
                    vk::ImageLayout::UNDEFINED,
                    vk::PipelineStageFlags::COMPUTE_SHADER,
                    vk::AccessFlags::SHADER_WRITE,
                    vk::ImageLayout::GENERAL,
                );
            }
            buffer::rw_barrier(dev, cmd, &cascade.posr);
            buffer::rw_barrier(dev, cmd, &cascade.list);
        }

        for cascade in &self.cascades {
            self.gather.enqueue(device, bvh, cascade);
        }

        for cascade in &self.cascades {
            image::barrier(
                dev,
                cmd,
                cascade.rad.image,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_WRITE,
                vk::ImageLayout::GENERAL,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_READ,
                vk::ImageLayout::GENERAL,
            );
        }

        // Merge coarse into fine. Each step reads the previous step's merge
        // output, so fence it before reuse.
        for i in (0..CASCADE_COUNT as usize - 1).rev() {
            let src_is_top = i + 1 == CASCADE_COUNT as usize - 1;
            if !src_is_top {
                image::barrier(
                    dev,
                    cmd,
                    self.cascades[i + 1].merge.image,
                    vk::PipelineStageFlags::COMPUTE_SHADER,
                    vk::AccessFlags::SHADER_WRITE,
                    vk::ImageLayout::GENERAL,
                    vk::PipelineStageFlags::COMPUTE_SHADER,
                    vk::AccessFlags::SHADER_READ,
                    vk::ImageLayout::GENERAL,
                );
            }
            self.merge
                .enqueue(device, &self.cascades[i + 1], &self.cascades[i], src_is_top);
        }

        image::barrier(
            dev,
            cmd,
            self.cascades[0].merge.image,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_WRITE,
            vk::ImageLayout::GENERAL,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_READ,
            vk::ImageLayout::GENERAL,
        );
        // The composite read-modify-writes the albedo the primary pass wrote.
        image::barrier(
            dev,
            cmd,
            frame.albedo.image,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_WRITE,
            vk::ImageLayout::GENERAL,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            vk::ImageLayout::GENERAL,
        );

        self.composite.enqueue(device, surface, &self.cascades[0]);

        if self.heatmap || self.direct_draw {
            image::barrier(
                dev,
                cmd,
                frame.albedo.image,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_WRITE,
                vk::ImageLayout::GENERAL,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
                vk::ImageLayout::GENERAL,
            );
            let debug_cascade = self.debug_cascade();
            if self.heatmap {
                self.heatmap_pipeline.enqueue(device, surface, debug_cascade);
            }
            if self.direct_draw {
                self.draw_pipeline.enqueue(device, surface, debug_cascade);
            }
        }

        for cascade in &self.cascades {
            buffer::rw_barrier(dev, cmd, &cascade.norw);
        }
        for cascade in &self.cascades {
            self.recycle.enqueue(device, cascade);
        }
    }

    pub fn destroy(self, device: &Device) {
        self.spawn.destroy(device);
        self.count.destroy(device);
        self.prefix.destroy(device);
        self.insert.destroy(device);
        self.gather.destroy(device);
        self.merge.destroy(device);
        self.composite.destroy(device);
        self.recycle.destroy(device);
        self.heatmap_pipeline.destroy(device);
        self.draw_pipeline.destroy(device);
        self.ground_truth_pipeline.destroy(device);
        for cascade in self.cascades {
            cascade.free(device);
        }
        self.readback.free(device);
    }
}

fn alloc_cascades(device: &Device, params: &CascadeParams) -> Result<Vec<SurfelCascade>> {
    (0..CASCADE_COUNT)
        .map(|i| SurfelCascade::alloc(device, params, i))
        .collect()
}
