//! Mipmap Stage
//!
//! Builds the radiance LOD chain the combiner samples for rough surfaces.
//! Each level is the area-weighted mean of the texels its footprint covers in
//! the level above, so odd extents neither drop edge texels nor bleed.
//!
//! Binding order: `GenerateMip` reads mip `i`, writes mip `i + 1` of the same
//! target.

use crate::errors::Result;
use crate::renderer::core::uniforms::MipUniforms;
use crate::renderer::core::{GpuDispatch, Kernel, LevelTag, PassDesc, PassParams, TargetView};
use crate::renderer::graph::frame::FrameContext;
use crate::renderer::graph::pass::run_pass;

pub fn generate_radiance_mips<D: GpuDispatch + ?Sized>(
    dispatch: &mut D,
    ctx: &FrameContext<'_>,
    tag: LevelTag,
) -> Result<()> {
    let radiance = ctx.shading.radiance;
    for source_level in 0..ctx.shading.mip_levels.saturating_sub(1) {
        let pass = PassDesc::new(Kernel::GenerateMip)
            .level(tag)
            .read(TargetView::mip(radiance, source_level))
            .write(TargetView::mip(radiance, source_level + 1))
            .params(PassParams::Mip(MipUniforms {
                source_level,
                _pad: [0; 3],
            }));
        run_pass(dispatch, &pass)?;
    }
    Ok(())
}
