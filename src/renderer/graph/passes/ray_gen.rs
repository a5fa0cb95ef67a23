//! Ray Generation
//!
//! Primary rays come from the camera through pixel centers. Secondary rays
//! start at the parent level's hits: reflection rays mirror (and jitter by
//! roughness) about the hit normal, refraction rays bend through the surface
//! and update the medium stack.
//!
//! Binding order:
//!
//! | Kernel | Reads | Read-writes |
//! |--------|-------|-------------|
//! | `GeneratePrimaryRays` | – | origin, direction |
//! | `GenerateReflectionRays` | P.direction, P.position, P.normal, P.contribution | origin, direction |
//! | `GenerateRefractionRays` | P.direction, P.position, P.normal, P.index, P.contribution, P.stack | origin, direction, stack |

use crate::errors::Result;
use crate::renderer::core::uniforms::{CameraUniforms, SecondaryRayUniforms};
use crate::renderer::core::{BranchKind, GpuDispatch, Kernel, PassDesc, PassParams};
use crate::renderer::graph::frame::FrameContext;
use crate::renderer::graph::level::LevelView;
use crate::renderer::graph::pass::run_pass;

pub fn generate_primary<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    root: &LevelView,
) -> Result<()> {
    let rays = root.targets.rays;
    let pass = PassDesc::new(Kernel::GeneratePrimaryRays)
        .level(root.tag)
        .write(rays.origin)
        .write(rays.direction)
        .params(PassParams::Camera(CameraUniforms::new(
            ctx.camera, ctx.width, ctx.height,
        )));
    run_pass(dispatch, &pass)
}

pub fn generate_secondary<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    branch: BranchKind,
    parent: &LevelView,
    child: &LevelView,
) -> Result<()> {
    let settings = ctx.settings;
    let params = PassParams::SecondaryRays(SecondaryRayUniforms {
        ray_bias: settings.ray_bias,
        roughness_jitter: settings.roughness_jitter,
        ambient_index: settings.ambient_refractive_index,
        seed: child.tag.ordinal,
    });
    let hits = parent.hits();

    let pass = match branch {
        BranchKind::Reflection => PassDesc::new(Kernel::GenerateReflectionRays)
            .read(parent.targets.rays.direction)
            .read(hits.position_distance)
            .read(hits.normal_roughness)
            .read(parent.targets.contribution),
        BranchKind::Refraction => PassDesc::new(Kernel::GenerateRefractionRays)
            .read(parent.targets.rays.direction)
            .read(hits.position_distance)
            .read(hits.normal_roughness)
            .read(hits.refractive_index)
            .read(parent.targets.contribution)
            .read(parent.stack),
    };
    let mut pass = pass
        .level(child.tag)
        .write(child.targets.rays.origin)
        .write(child.targets.rays.direction)
        .params(params);
    if branch == BranchKind::Refraction {
        pass = pass.write(child.stack);
    }
    run_pass(dispatch, &pass)
}
