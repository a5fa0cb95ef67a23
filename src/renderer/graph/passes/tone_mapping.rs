//! Output Stage
//!
//! Tone maps the HDR composite into the byte4 display image every frame, and
//! copies primary-level buffers into the debug-view target selected by the
//! frame's active view.
//!
//! Binding order:
//!
//! | Kernel | Reads | Read-writes |
//! |--------|-------|-------------|
//! | `ToneMap` | HDR | tone-mapped |
//! | `CopyView` | source | debug view |

use crate::errors::Result;
use crate::renderer::core::uniforms::{CopyUniforms, ToneMapUniforms};
use crate::renderer::core::{GpuDispatch, Kernel, PassDesc, PassParams, TargetId};
use crate::renderer::graph::frame::FrameContext;
use crate::renderer::graph::level::LevelView;
use crate::renderer::graph::pass::run_pass;
use crate::renderer::settings::ActiveView;

/// Hit distance lives in the w channel of the position record.
const DISTANCE_TO_RED: CopyUniforms = CopyUniforms {
    swizzle: [3, 0, 0, 0],
};

pub fn tone_map<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    output: TargetId,
) -> Result<()> {
    let pass = PassDesc::new(Kernel::ToneMap)
        .read(ctx.hdr)
        .write(output)
        .params(PassParams::ToneMap(ToneMapUniforms {
            exposure: ctx.settings.exposure,
            mode: ctx.settings.tone_mapping.as_u32(),
            _pad: [0; 2],
        }));
    run_pass(dispatch, &pass)
}

/// Copies the primary-level buffer behind `view` into `target`.
///
/// Views not backed by a primary hit buffer (the composites and the shadow
/// mask, which the shading stage exports) are ignored.
pub fn export_primary<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    root: &LevelView,
    view: ActiveView,
    target: TargetId,
) -> Result<()> {
    let (source, routing) = match view {
        ActiveView::PrimaryHitDistance => (root.hits().position_distance, DISTANCE_TO_RED),
        ActiveView::PrimaryContribution => (root.targets.contribution, CopyUniforms::IDENTITY),
        ActiveView::PrimaryAlbedo => (root.hits().albedo_opacity, CopyUniforms::IDENTITY),
        ActiveView::ToneMapped | ActiveView::Hdr | ActiveView::PrimaryShadow => return Ok(()),
    };
    let pass = PassDesc::new(Kernel::CopyView)
        .level(root.tag)
        .read(source)
        .write(target)
        .params(PassParams::Copy(routing));
    run_pass(dispatch, &pass)
}
