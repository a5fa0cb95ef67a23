use glam::Vec4;

use super::{KernelArgs, expect_outputs, for_each_pixel};
use crate::errors::Result;
use crate::renderer::core::PassParams;
use crate::renderer::optics::{linear_to_srgb, tone_map as map_color};
use crate::renderer::settings::ToneMappingMode;
use crate::renderer::software::image::Image;

/// Reads: HDR composite.
/// Writes: display-referred sRGB.
pub(super) fn tone_map(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::ToneMap(params) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(1)?;
    expect_outputs(args.kernel, outputs, 1)?;

    let mode = ToneMappingMode::from_u32(params.mode);
    let hdr = args.image(0);
    for_each_pixel::<1>(outputs, args.region, |p, _| {
        let color = hdr.load(p.x as i32, p.y as i32).truncate();
        [linear_to_srgb(map_color(color, params.exposure, mode)).extend(1.0)]
    });
    Ok(())
}

/// Reads: any view.
/// Writes: debug target, channels routed by the swizzle.
pub(super) fn copy_view(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::Copy(copy) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(1)?;
    expect_outputs(args.kernel, outputs, 1)?;

    let source = args.image(0);
    for_each_pixel::<1>(outputs, args.region, |p, _| {
        let texel = source.load(p.x as i32, p.y as i32).to_array();
        let routed = copy.swizzle.map(|channel| texel[(channel as usize).min(3)]);
        [Vec4::from_array(routed)]
    });
    Ok(())
}
