//! Surfel gather pass: one thread per radiance interval; traces the
//! interval's ray slice against the BVH and writes the result into the
//! cascade's radiance cache.

use ember_rhi::{DescriptorSet, Device};
use render_api::Result;

use super::{frame_pc, groups, ComputePass};
use crate::cascade::SurfelCascade;

const GATHER_SHADER: &str = "assets/shaders/surfel_gather.comp.spv";

pub struct SurfelGatherPipeline {
    pass: ComputePass,
}

impl SurfelGatherPipeline {
    pub fn new(device: &Device, bvh: &DescriptorSet, cascade: &SurfelCascade) -> Result<Self> {
        let pass = ComputePass::new(
            device,
            GATHER_SHADER,
            &[cascade.desc.layout, bvh.layout],
        )?;
        Ok(Self { pass })
    }

    pub fn enqueue(&self, device: &Device, bvh: &DescriptorSet, cascade: &SurfelCascade) {
        let cmd = device.frame().gcb;
        self.pass.bind(
            device,
            cmd,
            &[cascade.desc.set, bvh.set],
            frame_pc(cascade.index, device.fid),
        );
        self.pass.dispatch(
            device,
            cmd,
            groups(cascade.rad.width, 16),
            groups(cascade.rad.height, 16),
            1,
        );
    }

    pub fn destroy(&self, device: &Device) {
        self.pass.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    //! CPU mirrors of the kernel's angular & radial math.

    use crate::cascade::{CascadeParams, ANGULAR_FACTOR, CASCADE_COUNT};
    use glam::{Vec2, Vec3};

    // Hemisphere octahedral map, as the kernels implement it.
    fn octa_hemi_decode(uv: Vec2) -> Vec3 {
        let uv = uv * 2.0 - Vec2::ONE;
        let mut d = Vec3::new((uv.x + uv.y) * 0.5, (uv.x - uv.y) * 0.5, 0.0);
        d.z = 1.0 - d.x.abs() - d.y.abs();
        d.normalize()
    }

    fn octa_hemi_encode(d: Vec3) -> Vec2 {
        let d = d / (d.x.abs() + d.y.abs() + d.z.abs());
        Vec2::new(d.x + d.y, d.x - d.y) * 0.5 + Vec2::splat(0.5)
    }

    #[test]
    fn octahedral_bins_round_trip() {
        let mw = 4u32;
        for y in 0..mw {
            for x in 0..mw {
                let uv = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) / mw as f32;
                let dir = octa_hemi_decode(uv);
                assert!(dir.z >= 0.0, "bin ({x},{y}) left the hemisphere");
                let back = octa_hemi_encode(dir);
                let bin = (back * mw as f32).floor();
                assert_eq!((bin.x as u32, bin.y as u32), (x, y));
            }
        }
    }

    fn interval_base(params: &CascadeParams) -> f32 {
        let intervals = (params.c0_memory_width * params.c0_memory_width) as f32;
        params.max_solid_angle * intervals / (4.0 * std::f32::consts::PI) / ANGULAR_FACTOR as f32
    }

    #[test]
    fn radial_partition_is_contiguous() {
        let params = CascadeParams::default();
        let base = interval_base(&params);
        let mut prev_end = 0.0f32;
        for ci in 0..CASCADE_COUNT {
            let start = if ci == 0 {
                0.0
            } else {
                base * (ANGULAR_FACTOR as f32).powi(ci as i32)
            };
            let end = base * (ANGULAR_FACTOR as f32).powi(ci as i32 + 1);
            // Each cascade starts where the previous one ended.
            assert!((start - prev_end).abs() < 1e-6 || ci == 0);
            assert!(end > start);
            prev_end = end;
        }
    }
}
