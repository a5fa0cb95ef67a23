//! Denoise / Blur Stage
//!
//! - Shadow blur: a position/normal-aware Gaussian over the shadow mask,
//!   either separable (horizontal into the ping-pong target, vertical back) or
//!   as one 2-D pass into the ping-pong target.
//! - Hit-distance search: turns a level's accumulated roughness and average
//!   hit distance into a per-pixel blur radius for the combiner.
//!
//! Binding order:
//!
//! | Kernel | Reads | Read-writes |
//! |--------|-------|-------------|
//! | `BlurShadow(*)` | source mask, position, normal | destination mask |
//! | `HitDistanceSearch` | position, screen position, screen normal, contribution | blur radius |

use crate::errors::Result;
use crate::renderer::core::uniforms::{BlurUniforms, HitDistanceUniforms};
use crate::renderer::core::{BlurPass, GpuDispatch, Kernel, PassDesc, PassParams, TargetId};
use crate::renderer::graph::frame::FrameContext;
use crate::renderer::graph::level::LevelView;
use crate::renderer::graph::pass::run_pass;
use crate::renderer::settings::BlurMode;

/// Blurs the shadow mask. Returns the target holding the result.
pub fn blur_shadow<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    level: &LevelView,
) -> Result<TargetId> {
    let settings = ctx.settings;
    let radius = settings.shadows.blur.radius;
    let uniforms = BlurUniforms {
        radius,
        sigma: (radius as f32 * 0.5).max(0.5),
        position_threshold: settings.position_threshold,
        normal_threshold: settings.normal_threshold,
    };
    let (shadow, pingpong) = (ctx.shading.shadow, ctx.shading.shadow_pingpong);

    let pass = |blur: BlurPass, source: TargetId, destination: TargetId| {
        PassDesc::new(Kernel::BlurShadow(blur))
            .level(level.tag)
            .read(source)
            .read(level.hits().position_distance)
            .read(level.hits().normal_roughness)
            .write(destination)
            .params(PassParams::Blur(uniforms))
    };

    match settings.shadows.blur.mode {
        BlurMode::Separable => {
            run_pass(dispatch, &pass(BlurPass::Horizontal, shadow, pingpong))?;
            run_pass(dispatch, &pass(BlurPass::Vertical, pingpong, shadow))?;
            Ok(shadow)
        }
        BlurMode::SinglePass => {
            run_pass(dispatch, &pass(BlurPass::SinglePass, shadow, pingpong))?;
            Ok(pingpong)
        }
    }
}

/// Writes the roughness blur radius of `level` into the shading scratch.
pub fn search_hit_distance<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    level: &LevelView,
    screen: &LevelView,
) -> Result<()> {
    let settings = ctx.settings;
    let pass = PassDesc::new(Kernel::HitDistanceSearch)
        .level(level.tag)
        .read(level.hits().position_distance)
        .read(screen.hits().position_distance)
        .read(screen.hits().normal_roughness)
        .read(level.targets.contribution)
        .write(ctx.shading.blur_radius)
        .params(PassParams::HitDistance(HitDistanceUniforms {
            search_radius: settings.reflection_blur.search_radius,
            max_radius: settings.reflection_blur.max_radius,
            roughness_multiplier: settings.roughness_blur_multiplier,
            pixel_scale: ctx.pixel_scale(),
            position_threshold: settings.position_threshold,
            normal_threshold: settings.normal_threshold,
            _pad: [0.0; 2],
        }));
    run_pass(dispatch, &pass)
}
