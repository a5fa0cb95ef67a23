use std::f32::consts::PI;

use glam::{Vec3, Vec4, Vec4Swizzles};

use super::trace::closest_hit;
use super::{KernelArgs, expect_outputs, for_each_pixel, has_ray};
use crate::errors::Result;
use crate::renderer::core::PassParams;
use crate::renderer::optics::HIT_DISTANCE_MISS;
use crate::renderer::software::image::Image;
use crate::resources::Ray;

const MAX_SHININESS: f32 = 2048.0;

/// Blinn-Phong exponent matching a GGX-style roughness.
#[inline]
fn shininess(roughness: f32) -> f32 {
    (2.0 / (roughness.powi(4) + 1e-4) - 2.0).clamp(0.0, MAX_SHININESS)
}

/// Reads: direction, position/distance, normal/roughness, albedo/opacity,
/// emissive/metalness.
/// Writes: radiance.
pub(super) fn shade_base(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::Shading(shading) = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(5)?;
    expect_outputs(args.kernel, outputs, 1)?;

    let background = Vec4::from_array(shading.background).xyz();
    let ambient = Vec4::from_array(shading.ambient).xyz();
    for_each_pixel::<1>(outputs, args.region, |p, _| {
        let (x, y) = (p.x as i32, p.y as i32);
        if !has_ray(args.image(0).load(x, y)) {
            return [Vec4::ZERO];
        }
        if args.image(1).load(x, y).w == HIT_DISTANCE_MISS {
            return [background.extend(1.0)];
        }
        let albedo_opacity = args.image(3).load(x, y);
        let emissive = args.image(4).load(x, y).xyz();
        let color = emissive + ambient * albedo_opacity.xyz() * albedo_opacity.w;
        [color.extend(1.0)]
    });
    Ok(())
}

/// Writes: shadow factor 1 (fully lit).
pub(super) fn clear_shadow(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    expect_outputs(args.kernel, outputs, 1)?;
    for_each_pixel::<1>(outputs, args.region, |_, _| [Vec4::ONE]);
    Ok(())
}

/// Reads: position/distance, normal/roughness.
/// Read-writes: shadow factor, attenuated by one occluder.
pub(super) fn trace_shadow(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::Shadow {
        uniforms,
        light,
        occluder,
    } = *args.params
    else {
        return Err(args.mismatch());
    };
    args.expect_reads(2)?;
    expect_outputs(args.kernel, outputs, 1)?;

    let bias = uniforms.occluder.t_min;
    for_each_pixel::<1>(outputs, args.region, |p, [shadow]| {
        let (x, y) = (p.x as i32, p.y as i32);
        let position = args.image(0).load(x, y);
        if position.w == HIT_DISTANCE_MISS || shadow.x <= 0.0 {
            return [shadow];
        }
        let normal = args.image(1).load(x, y).xyz();
        let (to_light, distance, _) = light.incidence(position.xyz());
        let facing = if normal.dot(to_light) >= 0.0 {
            normal
        } else {
            -normal
        };
        let ray = Ray::new(position.xyz() + facing * bias, to_light);

        let Some(hit) = closest_hit(occluder, &ray, bias, distance, uniforms.occluder.alpha_cutoff)
        else {
            return [shadow];
        };
        let surface = occluder.material().sample(&hit);
        let passed = if surface.refractive_index > 0.0 {
            1.0 - surface.opacity
        } else {
            0.0
        };
        [Vec4::splat(shadow.x * passed)]
    });
    Ok(())
}

/// Reads: direction, position/distance, normal/roughness, albedo/opacity,
/// emissive/metalness, shadow factor.
/// Read-writes: radiance, accumulating one light.
pub(super) fn shade_light(args: &KernelArgs<'_, '_>, outputs: &mut [Image]) -> Result<()> {
    let PassParams::Light { uniforms, light } = *args.params else {
        return Err(args.mismatch());
    };
    args.expect_reads(6)?;
    expect_outputs(args.kernel, outputs, 1)?;

    let light_color = uniforms.color();
    for_each_pixel::<1>(outputs, args.region, |p, [radiance]| {
        let (x, y) = (p.x as i32, p.y as i32);
        let direction = args.image(0).load(x, y);
        let position = args.image(1).load(x, y);
        if !has_ray(direction) || position.w == HIT_DISTANCE_MISS {
            return [radiance];
        }
        let shadow = args.image(5).load(x, y).x;
        if shadow <= 0.0 {
            return [radiance];
        }

        let normal_roughness = args.image(2).load(x, y);
        let albedo_opacity = args.image(3).load(x, y);
        let metalness = args.image(4).load(x, y).w;
        let albedo = albedo_opacity.xyz();

        let view = -direction.xyz();
        let normal = normal_roughness.xyz();
        let normal = if normal.dot(view) < 0.0 { -normal } else { normal };
        let (to_light, _, attenuation) = light.incidence(position.xyz());
        let n_dot_l = normal.dot(to_light);
        if n_dot_l <= 0.0 {
            return [radiance];
        }

        let diffuse = albedo * (albedo_opacity.w * (1.0 - metalness) / PI);
        let s = shininess(normal_roughness.w);
        let half = (to_light + view).normalize_or(normal);
        let specular_color = Vec3::splat(0.04).lerp(albedo, metalness);
        let specular =
            specular_color * ((s + 8.0) / (8.0 * PI)) * normal.dot(half).max(0.0).powf(s);

        let lit = (diffuse + specular) * light_color * (n_dot_l * attenuation * shadow);
        [radiance + lit.extend(0.0)]
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shininess_is_capped_for_mirrors() {
        assert_eq!(shininess(0.0), MAX_SHININESS);
        assert!(shininess(1.0) < 1.0);
    }
}
