//! Shadow blur, blur-radius search and radiance mip generation.

use glam::{IVec2, Vec4, Vec4Swizzles};

use super::{KernelArgs, expect_outputs, for_each_pixel};
use crate::errors::Result;
use crate::renderer::core::{BlurPass, PassParams};
use crate::renderer::optics::HIT_DISTANCE_MISS;
use crate::renderer::software::image::Image;

/// Distance assumed for neighbours whose ray escaped the scene.
const MISS_SEARCH_DISTANCE: f32 = 1.0e4;

/// Position/normal similarity gate shared by the edge-aware filters.
#[inline]
pub(super) fn similar(
    center_position: Vec4,
    center_normal: Vec4,
    position: Vec4,
    normal: Vec4,
    position_threshold: f32,
    normal_threshold: f32,
) -> bool {
    if position.w == HIT_DISTANCE_MISS || center_position.w == HIT_DISTANCE_MISS {
        return false;
    }
    center_position.xyz().distance(position.xyz()) < position_threshold
        && center_normal.xyz().dot(normal.xyz()) > normal_threshold
}

/// Reads: shadow source, position/distance, normal/roughness.
/// Writes: filtered shadow.
pub(super) fn blur_shadow(
    args: &KernelArgs<'_, '_>,
    pass: BlurPass,
    outputs: &mut [Image],
) -> Result<()> {
    let PassParams::Blur(blur) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(3)?;
    expect_outputs(args.kernel, outputs, 1)?;

    let source = args.image(0);
    let positions = args.image(1);
    let normals = args.image(2);
    let radius = blur.radius as i32;
    let falloff = 1.0 / (2.0 * blur.sigma.max(1e-3).powi(2));
    let gaussian = |k: i32| (-((k * k) as f32) * falloff).exp();

    let offsets: Vec<(IVec2, f32)> = match pass {
        BlurPass::Horizontal => (-radius..=radius)
            .map(|k| (IVec2::new(k, 0), gaussian(k)))
            .collect(),
        BlurPass::Vertical => (-radius..=radius)
            .map(|k| (IVec2::new(0, k), gaussian(k)))
            .collect(),
        BlurPass::SinglePass => (-radius..=radius)
            .flat_map(|j| (-radius..=radius).map(move |i| (i, j)))
            .map(|(i, j)| (IVec2::new(i, j), gaussian(i) * gaussian(j)))
            .collect(),
    };

    for_each_pixel::<1>(outputs, args.region, |p, _| {
        let center = p.as_ivec2();
        let center_position = positions.load(center.x, center.y);
        let center_normal = normals.load(center.x, center.y);
        let center_value = source.load(center.x, center.y).x;
        if center_position.w == HIT_DISTANCE_MISS {
            return [Vec4::splat(center_value)];
        }

        let (mut sum, mut total) = (0.0, 0.0);
        for &(offset, weight) in &offsets {
            let q = center + offset;
            if !source.contains(q.x, q.y) {
                continue;
            }
            if offset != IVec2::ZERO
                && !similar(
                    center_position,
                    center_normal,
                    positions.load(q.x, q.y),
                    normals.load(q.x, q.y),
                    blur.position_threshold,
                    blur.normal_threshold,
                )
            {
                continue;
            }
            sum += source.load(q.x, q.y).x * weight;
            total += weight;
        }
        [Vec4::splat(sum / total)]
    });
    Ok(())
}

/// Reads: level position/distance, screen position/distance, screen
/// normal/roughness, level contribution.
/// Writes: blur radius in radiance texels.
pub(super) fn hit_distance_search(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::HitDistance(search) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(4)?;
    expect_outputs(args.kernel, outputs, 1)?;

    let hits = args.image(0);
    let screen_positions = args.image(1);
    let screen_normals = args.image(2);
    let contributions = args.image(3);
    let r = search.search_radius as i32;

    for_each_pixel::<1>(outputs, args.region, |p, _| {
        let center = p.as_ivec2();
        let contribution = contributions.load(center.x, center.y);
        let screen_position = screen_positions.load(center.x, center.y);
        if contribution.x <= 0.0 || screen_position.w == HIT_DISTANCE_MISS {
            return [Vec4::ZERO];
        }
        let screen_normal = screen_normals.load(center.x, center.y);

        let (mut sum, mut count) = (0.0, 0.0);
        for j in -r..=r {
            for i in -r..=r {
                let q = center + IVec2::new(i, j);
                if !hits.contains(q.x, q.y) {
                    continue;
                }
                if (i, j) != (0, 0)
                    && !similar(
                        screen_position,
                        screen_normal,
                        screen_positions.load(q.x, q.y),
                        screen_normals.load(q.x, q.y),
                        search.position_threshold,
                        search.normal_threshold,
                    )
                {
                    continue;
                }
                let distance = hits.load(q.x, q.y).w;
                sum += if distance == HIT_DISTANCE_MISS {
                    MISS_SEARCH_DISTANCE
                } else {
                    distance
                };
                count += 1.0;
            }
        }

        let average = sum / count;
        let footprint = contribution.y
            * search.roughness_multiplier
            * average
            * search.pixel_scale
            / screen_position.w.max(1e-4);
        [Vec4::splat(footprint.clamp(0.0, search.max_radius))]
    });
    Ok(())
}

/// Source texel span `[start, end)` covered by destination texel `i`.
#[inline]
fn footprint(i: u32, source: u32, destination: u32) -> (f32, f32) {
    let scale = source as f32 / destination as f32;
    (i as f32 * scale, (i + 1) as f32 * scale)
}

/// Reads: radiance mip `i`.
/// Writes: radiance mip `i + 1`, each texel the area-weighted mean of the
/// source texels its footprint overlaps.
pub(super) fn generate_mip(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::Mip(_) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(1)?;
    expect_outputs(args.kernel, outputs, 1)?;

    let source = args.image(0);
    let (dw, dh) = (outputs[0].width(), outputs[0].height());
    let (sw, sh) = (source.width(), source.height());

    for_each_pixel::<1>(outputs, args.region, |p, _| {
        let (x0, x1) = footprint(p.x, sw, dw);
        let (y0, y1) = footprint(p.y, sh, dh);
        let (mut sum, mut area) = (Vec4::ZERO, 0.0);
        for sy in (y0.floor() as u32)..(y1.ceil() as u32).min(sh) {
            let wy = (y1.min(sy as f32 + 1.0) - y0.max(sy as f32)).max(0.0);
            for sx in (x0.floor() as u32)..(x1.ceil() as u32).min(sw) {
                let wx = (x1.min(sx as f32 + 1.0) - x0.max(sx as f32)).max(0.0);
                let w = wx * wy;
                sum += source.load(sx as i32, sy as i32) * w;
                area += w;
            }
        }
        [if area > 0.0 { sum / area } else { Vec4::ZERO }]
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_extents_split_texels_between_neighbours() {
        let (a0, a1) = footprint(0, 5, 2);
        let (b0, b1) = footprint(1, 5, 2);
        assert_eq!((a0, a1), (0.0, 2.5));
        assert_eq!((b0, b1), (2.5, 5.0));
    }
}
