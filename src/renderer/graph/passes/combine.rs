//! Combiner
//!
//! Merges a level's radiance into the HDR composite:
//! `hdr = hdr + radiance × weight`, with `weight` the level's own
//! contribution term. With reflection blur enabled the radiance is read from
//! the LOD chain at the level's blur radius and averaged over a 3×3
//! neighbourhood of samples that lie on the same visible surface; deeper
//! levels also require the neighbours to share the parent's surface.
//!
//! Binding order:
//!
//! | Kernel | Reads | Read-writes |
//! |--------|-------|-------------|
//! | `Combine(FirstLevel)` | radiance (all mips), blur radius, contribution, screen position, screen normal | HDR |
//! | `Combine(Deeper)` | … as above, then P.position | HDR |

use crate::errors::Result;
use crate::renderer::core::uniforms::CombineUniforms;
use crate::renderer::core::{
    CombineVariant, GpuDispatch, Kernel, PassDesc, PassParams, TargetView,
};
use crate::renderer::graph::frame::FrameContext;
use crate::renderer::graph::level::LevelView;
use crate::renderer::graph::pass::run_pass;

pub fn combine_level<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    level: &LevelView,
    parent: &LevelView,
    screen: &LevelView,
) -> Result<()> {
    let settings = ctx.settings;
    let variant = if level.tag.depth <= 1 {
        CombineVariant::FirstLevel
    } else {
        CombineVariant::Deeper
    };

    let mut pass = PassDesc::new(Kernel::Combine(variant))
        .level(level.tag)
        .read(TargetView::whole(ctx.shading.radiance))
        .read(ctx.shading.blur_radius)
        .read(level.targets.contribution)
        .read(screen.hits().position_distance)
        .read(screen.hits().normal_roughness);
    if variant == CombineVariant::Deeper {
        pass = pass.read(parent.hits().position_distance);
    }
    let pass = pass.write(ctx.hdr).params(PassParams::Combine(CombineUniforms {
        position_threshold: settings.position_threshold,
        normal_threshold: settings.normal_threshold,
        mip_count: ctx.shading.mip_levels,
        blur_enabled: u32::from(settings.reflection_blur.enabled),
    }));
    run_pass(dispatch, &pass)
}
