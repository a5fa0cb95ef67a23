use glam::{Vec3, Vec4, Vec4Swizzles};

use super::{KernelArgs, expect_outputs, for_each_pixel, has_ray};
use crate::errors::Result;
use crate::renderer::core::PassParams;
use crate::renderer::optics::{self, HIT_DISTANCE_MISS, MediumStack};
use crate::renderer::software::image::Image;

/// Writes: origin, direction.
pub(super) fn generate_primary(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::Camera(camera) = args.params else {
        return Err(args.mismatch());
    };
    expect_outputs(args.kernel, outputs, 2)?;

    let position = Vec4::from_array(camera.position).xyz();
    let forward = Vec4::from_array(camera.forward).xyz();
    let right = Vec4::from_array(camera.right).xyz();
    let up = Vec4::from_array(camera.up).xyz();
    let [width, height, tan_half_fov, aspect] = camera.viewport;

    for_each_pixel::<2>(outputs, args.region, |p, _| {
        let u = (p.x as f32 + 0.5) / width;
        let v = (p.y as f32 + 0.5) / height;
        let x = (2.0 * u - 1.0) * tan_half_fov * aspect;
        let y = (1.0 - 2.0 * v) * tan_half_fov;
        let direction = (forward + right * x + up * y).normalize();
        [position.extend(1.0), direction.extend(0.0)]
    });
    Ok(())
}

/// Parent hit attributes shared by both secondary generators.
struct ParentHit {
    incident: Vec3,
    position: Vec3,
    normal: Vec3,
    roughness: f32,
}

fn parent_hit(args: &KernelArgs<'_, '_>, p: glam::UVec2, contribution_slot: usize) -> Option<ParentHit> {
    let (x, y) = (p.x as i32, p.y as i32);
    let direction = args.image(0).load(x, y);
    let position = args.image(1).load(x, y);
    let normal = args.image(2).load(x, y);
    let weight = args.image(contribution_slot).load(x, y).x;
    if weight <= 0.0 || position.w == HIT_DISTANCE_MISS || !has_ray(direction) {
        return None;
    }
    Some(ParentHit {
        incident: direction.xyz(),
        position: position.xyz(),
        normal: normal.xyz(),
        roughness: normal.w,
    })
}

/// Reads: parent direction, position/distance, normal/roughness, contribution.
/// Writes: origin, direction.
pub(super) fn generate_reflection(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::SecondaryRays(params) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(4)?;
    expect_outputs(args.kernel, outputs, 2)?;

    for_each_pixel::<2>(outputs, args.region, |p, _| {
        let Some(hit) = parent_hit(args, p, 3) else {
            return [Vec4::ZERO, Vec4::ZERO];
        };
        let oriented = if hit.incident.dot(hit.normal) < 0.0 {
            hit.normal
        } else {
            -hit.normal
        };
        let mirror = optics::reflect(hit.incident, oriented);
        let spread = hit.roughness * hit.roughness * params.roughness_jitter;
        let direction =
            optics::jitter_direction(mirror, oriented, spread, optics::hash2(p, params.seed));
        let origin = hit.position + oriented * params.ray_bias;
        [origin.extend(1.0), direction.extend(0.0)]
    });
    Ok(())
}

/// Reads: parent direction, position/distance, normal/roughness, refractive
/// index, contribution, medium stack.
/// Writes: origin, direction, medium stack.
pub(super) fn generate_refraction(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::SecondaryRays(params) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(6)?;
    expect_outputs(args.kernel, outputs, 3)?;

    for_each_pixel::<3>(outputs, args.region, |p, _| {
        let stack_texel = args.image(5).load(p.x as i32, p.y as i32);
        let no_ray = [Vec4::ZERO, Vec4::ZERO, stack_texel];
        let Some(hit) = parent_hit(args, p, 4) else {
            return no_ray;
        };
        let index = args.image(3).load(p.x as i32, p.y as i32).x;
        let stack = MediumStack::unpack(stack_texel);
        let Some(t) = optics::transmit(hit.incident, hit.normal, stack, index, params.ambient_index)
        else {
            return no_ray;
        };

        // Continue on the side the new ray travels into.
        let side = if t.direction.dot(hit.normal) < 0.0 {
            -hit.normal
        } else {
            hit.normal
        };
        let origin = hit.position + side * params.ray_bias;
        [origin.extend(1.0), t.direction.extend(0.0), t.stack.pack()]
    });
    Ok(())
}
