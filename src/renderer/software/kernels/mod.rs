//! CPU reference kernels.
//!
//! One function per [`Kernel`] variant, each reading its bound views
//! positionally (see the stage modules under `graph::passes` for the binding
//! order) and writing every covered pixel independently. Rows are processed
//! in parallel with rayon.

mod combine;
mod contribution;
mod denoise;
mod output;
mod rays;
mod shading;
mod trace;

use glam::{UVec2, Vec4};
use rayon::prelude::*;

use super::image::Image;
use crate::errors::{RenderError, Result};
use crate::renderer::core::{Kernel, PassParams};

/// Everything a kernel sees besides its outputs.
pub(crate) struct KernelArgs<'a, 'p> {
    pub kernel: Kernel,
    /// One mip chain per read view; element 0 is the view's base level.
    pub reads: &'a [&'a [Image]],
    pub params: &'a PassParams<'p>,
    /// Pixels covered by the dispatched thread groups.
    pub region: UVec2,
}

impl<'a> KernelArgs<'a, '_> {
    pub fn expect_reads(&self, count: usize) -> Result<()> {
        if self.reads.len() < count {
            return Err(RenderError::BindingMismatch {
                kernel: self.kernel.name(),
                role: "read",
                expected: count,
                found: self.reads.len(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn image(&self, slot: usize) -> &'a Image {
        &self.reads[slot][0]
    }

    #[inline]
    pub fn chain(&self, slot: usize) -> &'a [Image] {
        self.reads[slot]
    }

    pub fn mismatch(&self) -> RenderError {
        RenderError::ParamsMismatch(self.kernel.name())
    }
}

pub(crate) fn expect_outputs(kernel: Kernel, outputs: &[Image], count: usize) -> Result<()> {
    if outputs.len() < count {
        return Err(RenderError::BindingMismatch {
            kernel: kernel.name(),
            role: "read-write",
            expected: count,
            found: outputs.len(),
        });
    }
    Ok(())
}

/// Runs `f` for every covered pixel of the first `N` outputs.
///
/// `f` receives the pixel and the current values of the outputs there, and
/// returns their new values. All outputs must share the first one's extent.
pub(crate) fn for_each_pixel<const N: usize>(
    outputs: &mut [Image],
    region: UVec2,
    f: impl Fn(UVec2, [Vec4; N]) -> [Vec4; N] + Sync,
) {
    let (width, height) = (outputs[0].width(), outputs[0].height());
    let (rw, rh) = (region.x.min(width) as usize, region.y.min(height) as usize);
    if rw == 0 || rh == 0 {
        return;
    }

    let snapshot: &[Image] = outputs;
    let mut results = vec![[Vec4::ZERO; N]; rw * rh];
    results
        .par_chunks_mut(rw)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, slot) in row.iter_mut().enumerate() {
                let p = UVec2::new(x as u32, y as u32);
                let current = std::array::from_fn(|k| {
                    let image = &snapshot[k];
                    image.texels()[image.index(p.x, p.y)]
                });
                *slot = f(p, current);
            }
        });

    let mut row_values = Vec::with_capacity(rw);
    for (y, row) in results.chunks(rw).enumerate() {
        for (k, output) in outputs.iter_mut().take(N).enumerate() {
            row_values.clear();
            row_values.extend(row.iter().map(|values| values[k]));
            output.store_row(y as u32, &row_values);
        }
    }
}

#[inline]
pub(crate) fn has_ray(direction: Vec4) -> bool {
    direction.truncate().length_squared() > 0.0
}

/// Executes one kernel.
pub(crate) fn run(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    match args.kernel {
        Kernel::GeneratePrimaryRays => rays::generate_primary(args, outputs),
        Kernel::GenerateReflectionRays => rays::generate_reflection(args, outputs),
        Kernel::GenerateRefractionRays => rays::generate_refraction(args, outputs),
        Kernel::ClearHits => trace::clear_hits(args, outputs),
        Kernel::TraceActor(_) => trace::trace_actor(args, outputs),
        Kernel::SeedContribution => contribution::seed(args, outputs),
        Kernel::ComputeContribution(branch) => contribution::compute(args, branch, outputs),
        Kernel::ShadeBase => shading::shade_base(args, outputs),
        Kernel::ClearShadow => shading::clear_shadow(args, outputs),
        Kernel::TraceShadow => shading::trace_shadow(args, outputs),
        Kernel::ShadeLight => shading::shade_light(args, outputs),
        Kernel::BlurShadow(pass) => denoise::blur_shadow(args, pass, outputs),
        Kernel::HitDistanceSearch => denoise::hit_distance_search(args, outputs),
        Kernel::GenerateMip => denoise::generate_mip(args, outputs),
        Kernel::Combine(variant) => combine::combine(args, variant, outputs),
        Kernel::ToneMap => output::tone_map(args, outputs),
        Kernel::CopyView => output::copy_view(args, outputs),
    }
}
