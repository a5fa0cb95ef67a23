//! Contribution Terms
//!
//! The root level is seeded with weight 1 wherever the camera ray hit
//! something. Every child level multiplies its parent's weight by its own
//! term at the parent's surface: Fresnel reflectance for reflection,
//! transmitted share for refraction. Pixels where the parent missed, carried
//! no weight or produced no ray get exactly zero.
//!
//! Binding order:
//!
//! | Kernel | Reads | Read-writes |
//! |--------|-------|-------------|
//! | `SeedContribution` | root position | contribution, stack |
//! | `ComputeContribution(Reflection)` | P.direction, P.position, P.normal, P.albedo, P.emissive, P.index, P.contribution, direction | contribution |
//! | `ComputeContribution(Refraction)` | … as above, then P.stack | contribution |

use crate::errors::Result;
use crate::renderer::core::uniforms::MediumUniforms;
use crate::renderer::core::{BranchKind, GpuDispatch, Kernel, PassDesc, PassParams};
use crate::renderer::graph::frame::FrameContext;
use crate::renderer::graph::level::LevelView;
use crate::renderer::graph::pass::run_pass;

fn medium(ctx: &FrameContext<'_>) -> PassParams<'static> {
    PassParams::Medium(MediumUniforms::new(ctx.settings.ambient_refractive_index))
}

pub fn seed<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    root: &LevelView,
) -> Result<()> {
    let pass = PassDesc::new(Kernel::SeedContribution)
        .level(root.tag)
        .read(root.hits().position_distance)
        .write(root.targets.contribution)
        .write(root.stack)
        .params(medium(ctx));
    run_pass(dispatch, &pass)
}

pub fn compute<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    branch: BranchKind,
    parent: &LevelView,
    child: &LevelView,
) -> Result<()> {
    let hits = parent.hits();
    let mut pass = PassDesc::new(Kernel::ComputeContribution(branch))
        .level(child.tag)
        .read(parent.targets.rays.direction)
        .read(hits.position_distance)
        .read(hits.normal_roughness)
        .read(hits.albedo_opacity)
        .read(hits.emissive_metalness)
        .read(hits.refractive_index)
        .read(parent.targets.contribution)
        .read(child.targets.rays.direction);
    if branch == BranchKind::Refraction {
        pass = pass.read(parent.stack);
    }
    let pass = pass.write(child.targets.contribution).params(medium(ctx));
    run_pass(dispatch, &pass)
}
