use glam::{IVec2, Vec2, Vec4};

use super::denoise::similar;
use super::{KernelArgs, expect_outputs, for_each_pixel};
use crate::errors::Result;
use crate::renderer::core::{CombineVariant, PassParams};
use crate::renderer::optics::HIT_DISTANCE_MISS;
use crate::renderer::software::image::{Image, sample_lod};

/// 3×3 binomial neighbourhood.
const TAPS: [(i32, f32); 3] = [(-1, 1.0), (0, 2.0), (1, 1.0)];

/// Reads: radiance mip chain, blur radius, level contribution, screen
/// position/distance, screen normal/roughness, and for deeper levels the
/// parent's position/distance.
/// Read-writes: HDR composite, `hdr += radiance × weight`.
///
/// A zero blur radius reads the centre texel only. Neighbours count only
/// where the level itself contributes and the gates accept them.
pub(super) fn combine(
    args: &KernelArgs<'_, '_>,
    variant: CombineVariant,
    outputs: &mut [Image],
) -> Result<()> {
    let PassParams::Combine(combine) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(match variant {
        CombineVariant::FirstLevel => 5,
        CombineVariant::Deeper => 6,
    })?;
    expect_outputs(args.kernel, outputs, 1)?;

    let radiance = args.chain(0);
    let mip_count = (combine.mip_count as usize).clamp(1, radiance.len());
    let radiance = &radiance[..mip_count];
    let base = &radiance[0];
    let blur_radii = args.image(1);
    let contributions = args.image(2);
    let screen_positions = args.image(3);
    let screen_normals = args.image(4);
    let parent_positions = match variant {
        CombineVariant::FirstLevel => None,
        CombineVariant::Deeper => Some(args.image(5)),
    };
    let texel = Vec2::new(1.0 / base.width() as f32, 1.0 / base.height() as f32);

    for_each_pixel::<1>(outputs, args.region, |p, [hdr]| {
        let center = p.as_ivec2();
        let weight = contributions.load(center.x, center.y).x;
        if weight <= 0.0 {
            return [hdr];
        }
        let radius = if combine.blur_enabled == 0 {
            0.0
        } else {
            blur_radii.load(center.x, center.y).x
        };
        if radius <= 0.0 {
            let result = base.load(center.x, center.y);
            return [hdr + (result * weight).truncate().extend(0.0)];
        }
        // Neighbours fade in over the first texel of blur radius.
        let spread = radius.min(1.0);
        let lod = (1.0 + radius).log2();
        let screen_position = screen_positions.load(center.x, center.y);
        let screen_normal = screen_normals.load(center.x, center.y);
        let parent_position = parent_positions.map(|img| img.load(center.x, center.y));

        let (mut sum, mut total) = (Vec4::ZERO, 0.0);
        for (dy, wy) in TAPS {
            for (dx, wx) in TAPS {
                let q = center + IVec2::new(dx, dy);
                if !base.contains(q.x, q.y) {
                    continue;
                }
                let mut tap = wx * wy;
                if (dx, dy) != (0, 0) {
                    let contributes = contributions.load(q.x, q.y).x > 0.0;
                    let same_surface = similar(
                        screen_position,
                        screen_normal,
                        screen_positions.load(q.x, q.y),
                        screen_normals.load(q.x, q.y),
                        combine.position_threshold,
                        combine.normal_threshold,
                    );
                    let same_parent = parent_position.is_none_or(|center_parent| {
                        let neighbour = parent_positions
                            .map_or(Vec4::ZERO, |img| img.load(q.x, q.y));
                        neighbour.w != HIT_DISTANCE_MISS
                            && center_parent.w != HIT_DISTANCE_MISS
                            && center_parent.truncate().distance(neighbour.truncate())
                                < combine.position_threshold
                    });
                    if !(contributes && same_surface && same_parent) {
                        continue;
                    }
                    tap *= spread;
                }
                let uv = (q.as_vec2() + Vec2::splat(0.5)) * texel;
                sum += sample_lod(radiance, uv, lod) * tap;
                total += tap;
            }
        }

        let result = sum / total;
        [hdr + (result * weight).truncate().extend(0.0)]
    });
    Ok(())
}
