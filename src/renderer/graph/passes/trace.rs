//! Tracer
//!
//! Clears a level's hit records to "miss" once, then dispatches one
//! `TraceActor` per actor. Each dispatch keeps a pixel's record only where the
//! actor is strictly closer, so the recorded distance never grows across the
//! loop. The result does not depend on actor order, except where two actors
//! are hit at exactly the same distance: the earlier actor then keeps the
//! pixel.
//!
//! Binding order:
//!
//! | Kernel | Reads | Read-writes |
//! |--------|-------|-------------|
//! | `ClearHits` | – | position, normal, albedo, emissive, index |
//! | `TraceActor` | origin, direction | position, normal, albedo, emissive, index |

use crate::errors::Result;
use crate::renderer::core::uniforms::TraceUniforms;
use crate::renderer::core::{GpuDispatch, Kernel, PassDesc, PassParams, TraceVariant};
use crate::renderer::graph::frame::FrameContext;
use crate::renderer::graph::level::LevelView;
use crate::renderer::graph::pass::run_pass;

pub fn trace_level<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    level: &LevelView,
    variant: TraceVariant,
) -> Result<()> {
    let hits = level.hits();
    let mut clear = PassDesc::new(Kernel::ClearHits).level(level.tag);
    for id in hits.ids() {
        clear = clear.write(id);
    }
    run_pass(dispatch, &clear)?;

    let t_min = match variant {
        TraceVariant::Primary => 0.0,
        TraceVariant::Secondary => ctx.settings.ray_bias,
    };
    for actor in ctx.actors {
        let mut pass = PassDesc::new(Kernel::TraceActor(variant))
            .level(level.tag)
            .read(level.targets.rays.origin)
            .read(level.targets.rays.direction)
            .params(PassParams::Trace {
                uniforms: TraceUniforms::for_actor(actor, t_min, ctx.settings.alpha_cutoff),
                actor,
            });
        for id in hits.ids() {
            pass = pass.write(id);
        }
        run_pass(dispatch, &pass)?;
    }
    Ok(())
}
