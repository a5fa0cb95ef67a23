use glam::{Vec4, Vec4Swizzles};

use super::{KernelArgs, expect_outputs, for_each_pixel, has_ray};
use crate::errors::Result;
use crate::renderer::core::{BranchKind, PassParams};
use crate::renderer::optics::{self, HIT_DISTANCE_MISS, MediumStack};
use crate::renderer::software::image::Image;

/// Reads: root position/distance.
/// Writes: contribution (weight, accumulated roughness), medium stack.
pub(super) fn seed(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::Medium(medium) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(1)?;
    expect_outputs(args.kernel, outputs, 2)?;

    let stack = MediumStack::root(medium.ambient_index).pack();
    for_each_pixel::<2>(outputs, args.region, |p, _| {
        let hit = args.image(0).load(p.x as i32, p.y as i32).w != HIT_DISTANCE_MISS;
        let weight = if hit { 1.0 } else { 0.0 };
        [Vec4::new(weight, 0.0, 0.0, 0.0), stack]
    });
    Ok(())
}

/// Reads (parent level): direction, position/distance, normal/roughness,
/// albedo/opacity, emissive/metalness, refractive index, contribution; then
/// the child's direction and, for refraction, the parent's medium stack.
/// Writes: child contribution.
pub(super) fn compute(
    args: &KernelArgs<'_, '_>,
    branch: BranchKind,
    outputs: &mut [Image],
) -> Result<()> {
    let PassParams::Medium(medium) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(match branch {
        BranchKind::Reflection => 8,
        BranchKind::Refraction => 9,
    })?;
    expect_outputs(args.kernel, outputs, 1)?;

    for_each_pixel::<1>(outputs, args.region, |p, _| {
        let (x, y) = (p.x as i32, p.y as i32);
        let incident = args.image(0).load(x, y);
        let position = args.image(1).load(x, y);
        let parent = args.image(6).load(x, y);
        let child_direction = args.image(7).load(x, y);
        if parent.x <= 0.0
            || position.w == HIT_DISTANCE_MISS
            || !has_ray(incident)
            || !has_ray(child_direction)
        {
            return [Vec4::ZERO];
        }

        let normal_roughness = args.image(2).load(x, y);
        let albedo_opacity = args.image(3).load(x, y);
        let metalness = args.image(4).load(x, y).w;
        let index = args.image(5).load(x, y).x;
        let normal = normal_roughness.xyz();
        let roughness = normal_roughness.w;

        let reflectance = optics::reflection_weight(
            incident.xyz(),
            normal,
            albedo_opacity.xyz(),
            metalness,
            roughness,
            index,
            medium.ambient_index,
        );
        let term = match branch {
            BranchKind::Reflection => reflectance,
            BranchKind::Refraction => {
                let stack = MediumStack::unpack(args.image(8).load(x, y));
                optics::transmit(incident.xyz(), normal, stack, index, medium.ambient_index)
                    .map_or(0.0, |t| {
                        optics::transmission_weight(&t, albedo_opacity.w, metalness, reflectance)
                    })
            }
        };

        let weight = parent.x * term;
        let accumulated = (parent.y + roughness).clamp(0.0, 1.0);
        [Vec4::new(weight, accumulated, 0.0, 0.0)]
    });
    Ok(())
}
