//! Shading Stage
//!
//! Shades one level's hit records into a radiance target: a base pass
//! (emission, ambient, background on miss) followed by one accumulate pass per
//! light. Lights at levels within the shadow depth are shadow-traced against
//! every actor first and optionally blurred.
//!
//! Binding order:
//!
//! | Kernel | Reads | Read-writes |
//! |--------|-------|-------------|
//! | `ShadeBase` | direction, position, normal, albedo, emissive | radiance |
//! | `ClearShadow` | – | shadow |
//! | `TraceShadow` | position, normal | shadow |
//! | `ShadeLight` | direction, position, normal, albedo, emissive, shadow | radiance |

use crate::errors::Result;
use crate::renderer::core::uniforms::{
    CopyUniforms, LightUniforms, ShadingUniforms, ShadowUniforms, TraceUniforms,
};
use crate::renderer::core::{GpuDispatch, Kernel, PassDesc, PassParams, TargetId, TargetView};
use crate::renderer::graph::frame::FrameContext;
use crate::renderer::graph::level::LevelView;
use crate::renderer::graph::pass::run_pass;
use crate::scene::Light;

use super::blur;

/// Shades `level` into `output`.
///
/// When `shadow_export` is set, the first shadow-traced light's (filtered)
/// shadow mask is copied there; it is cleared to fully lit if no light was
/// shadow-traced.
pub fn shade_level<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    level: &LevelView,
    output: TargetView,
    shadow_export: Option<TargetId>,
) -> Result<()> {
    let hits = level.hits();
    let direction = level.targets.rays.direction;
    let settings = ctx.settings;

    let base = PassDesc::new(Kernel::ShadeBase)
        .level(level.tag)
        .read(direction)
        .read(hits.position_distance)
        .read(hits.normal_roughness)
        .read(hits.albedo_opacity)
        .read(hits.emissive_metalness)
        .write(output)
        .params(PassParams::Shading(ShadingUniforms {
            background: settings.background_color(),
            ambient: settings.ambient_color(),
        }));
    run_pass(dispatch, &base)?;

    let shadowed = settings.shadows_at(level.tag.depth);
    let mut exported = false;
    for light in ctx.lights {
        let mask = if shadowed && light.cast_shadows {
            let mask = trace_shadow(dispatch, ctx, level, light)?;
            if let Some(export) = shadow_export.filter(|_| !exported) {
                copy_mask(dispatch, level, mask, export)?;
                exported = true;
            }
            mask
        } else {
            clear_shadow(dispatch, level, ctx.shading.shadow)?;
            ctx.shading.shadow
        };

        let lit = PassDesc::new(Kernel::ShadeLight)
            .level(level.tag)
            .read(direction)
            .read(hits.position_distance)
            .read(hits.normal_roughness)
            .read(hits.albedo_opacity)
            .read(hits.emissive_metalness)
            .read(mask)
            .write(output)
            .params(PassParams::Light {
                uniforms: LightUniforms::new(light),
                light,
            });
        run_pass(dispatch, &lit)?;
    }

    if let Some(export) = shadow_export.filter(|_| !exported) {
        clear_shadow(dispatch, level, export)?;
    }
    Ok(())
}

fn clear_shadow<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    level: &LevelView,
    target: TargetId,
) -> Result<()> {
    run_pass(
        dispatch,
        &PassDesc::new(Kernel::ClearShadow).level(level.tag).write(target),
    )
}

/// Traces `light`'s shadow mask for `level`. Returns the target holding the
/// final (possibly blurred) mask.
fn trace_shadow<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    level: &LevelView,
    light: &Light,
) -> Result<TargetId> {
    let settings = ctx.settings;
    let shadow = ctx.shading.shadow;
    let hits = level.hits();
    clear_shadow(dispatch, level, shadow)?;

    let light_uniforms = LightUniforms::new(light);
    for occluder in ctx.actors {
        let pass = PassDesc::new(Kernel::TraceShadow)
            .level(level.tag)
            .read(hits.position_distance)
            .read(hits.normal_roughness)
            .write(shadow)
            .params(PassParams::Shadow {
                uniforms: ShadowUniforms {
                    light: light_uniforms,
                    occluder: TraceUniforms::for_actor(
                        occluder,
                        settings.ray_bias,
                        settings.alpha_cutoff,
                    ),
                },
                light,
                occluder,
            });
        run_pass(dispatch, &pass)?;
    }

    if settings.shadows.blur.enabled {
        blur::blur_shadow(dispatch, ctx, level)
    } else {
        Ok(shadow)
    }
}

fn copy_mask<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    level: &LevelView,
    mask: TargetId,
    export: TargetId,
) -> Result<()> {
    let pass = PassDesc::new(Kernel::CopyView)
        .level(level.tag)
        .read(mask)
        .write(export)
        .params(PassParams::Copy(CopyUniforms::IDENTITY));
    run_pass(dispatch, &pass)
}
