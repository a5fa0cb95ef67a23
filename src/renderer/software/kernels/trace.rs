use glam::{Vec4, Vec4Swizzles};

use super::{KernelArgs, expect_outputs, for_each_pixel, has_ray};
use crate::errors::Result;
use crate::renderer::core::PassParams;
use crate::renderer::optics::HIT_DISTANCE_MISS;
use crate::renderer::software::image::Image;
use crate::resources::{MeshHit, Ray};
use crate::scene::Actor;

/// Alpha-tested surfaces are re-queried past rejected hits at most this often.
const MAX_ALPHA_SKIPS: usize = 8;

/// Closest accepted hit of `actor` in `(t_min, t_max)`.
///
/// Rays that miss the actor's bounding box never reach the mesh.
pub(super) fn closest_hit(
    actor: &Actor,
    ray: &Ray,
    t_min: f32,
    t_max: f32,
    alpha_cutoff: f32,
) -> Option<MeshHit> {
    actor.bounding_box().intersect_ray(ray, t_min, t_max)?;

    let material = actor.material();
    let mut near = t_min;
    for _ in 0..=MAX_ALPHA_SKIPS {
        let hit = actor.mesh().intersect(ray, near, t_max)?;
        if !material.alpha_tested || material.opacity(hit.uv) >= alpha_cutoff {
            return Some(hit);
        }
        near = hit.t;
    }
    None
}

/// Writes: position/distance, normal/roughness, albedo/opacity,
/// emissive/metalness, refractive index.
pub(super) fn clear_hits(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    expect_outputs(args.kernel, outputs, 5)?;
    let miss = Vec4::new(0.0, 0.0, 0.0, HIT_DISTANCE_MISS);
    for_each_pixel::<5>(outputs, args.region, |_, _| {
        [miss, Vec4::ZERO, Vec4::ZERO, Vec4::ZERO, Vec4::ZERO]
    });
    Ok(())
}

/// Reads: origin, direction.
/// Read-writes: the five hit targets, kept where they are closer.
pub(super) fn trace_actor(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::Trace { uniforms, actor } = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(2)?;
    expect_outputs(args.kernel, outputs, 5)?;

    for_each_pixel::<5>(outputs, args.region, |p, current| {
        let (x, y) = (p.x as i32, p.y as i32);
        let direction = args.image(1).load(x, y);
        if !has_ray(direction) {
            return current;
        }
        let ray = Ray::new(args.image(0).load(x, y).xyz(), direction.xyz());
        let closest = current[0].w;

        let Some(hit) = closest_hit(actor, &ray, uniforms.t_min, closest, uniforms.alpha_cutoff)
        else {
            return current;
        };
        let surface = actor.material().sample(&hit);
        [
            ray.at(hit.t).extend(hit.t),
            surface.normal.extend(surface.roughness),
            surface.albedo.extend(surface.opacity),
            surface.emissive.extend(surface.metalness),
            Vec4::new(surface.refractive_index, 0.0, 0.0, 0.0),
        ]
    });
    Ok(())
}
